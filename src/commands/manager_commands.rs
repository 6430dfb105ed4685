use poise::serenity_prelude::{self as serenity, Mentionable};
use poise::CreateReply;
use tracing::instrument;

use super::checks::is_admin_or_owner;
use super::CommandsContainer;
use crate::log;
use crate::store::ConfigStore;
use crate::utils::error::CommonError::NotInAGuild;
use crate::{BotContext, BotData, BotError};

/// CommandsContainer for the Manager commands.
pub struct ManagerCommands;

impl CommandsContainer for ManagerCommands {
    type Data = BotData;
    type Error = BotError;

    fn get_all() -> Vec<poise::Command<Self::Data, Self::Error>> {
        vec![
            set_config(),
            authorize_role(),
            deauthorize_role(),
            set_nitro_role(),
        ]
    }
}

/// Set the guild configuration.
///
/// The log channel receives an embed for every notable bot action in this
/// guild.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
#[instrument(skip(ctx))]
async fn set_config(
    ctx: BotContext<'_>,
    #[description = "Channel where the bot logs its actions"] log_channel: serenity::GuildChannel,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    ctx.data()
        .store
        .update_config(guild_id.get(), |config| {
            config.log_channel_id = Some(log_channel.id.get().to_string());
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Successfully set the log channel to {}.",
                log_channel.mention()
            ))
            .ephemeral(true),
    )
    .await?;

    log::discord_log_info(
        ctx,
        "Configuration updated",
        vec![("Log channel", log_channel.name.as_str(), true)],
    )
    .await?;

    Ok(())
}

/// Allow a role to manage tournaments, giveaways, and moderation flags.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
#[instrument(skip(ctx))]
async fn authorize_role(
    ctx: BotContext<'_>,
    #[description = "Role to authorize"] role: serenity::Role,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let role_id = role.id.get().to_string();

    let config = ctx
        .data()
        .store
        .update_config(guild_id.get(), |config| {
            if !config.policy.authorized_role_ids.contains(&role_id) {
                config.policy.authorized_role_ids.push(role_id.clone());
            }
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "{} is now authorized. ({} authorized role(s))",
                role.mention(),
                config.policy.authorized_role_ids.len()
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Remove a role from the authorization policy.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
#[instrument(skip(ctx))]
async fn deauthorize_role(
    ctx: BotContext<'_>,
    #[description = "Role to deauthorize"] role: serenity::Role,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let role_id = role.id.get().to_string();

    let config = ctx
        .data()
        .store
        .update_config(guild_id.get(), |config| {
            config.policy.authorized_role_ids.retain(|id| *id != role_id);
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "{} is no longer authorized. ({} authorized role(s))",
                role.mention(),
                config.policy.authorized_role_ids.len()
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Set the role that grants a bonus giveaway entry when a giveaway opts in.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
#[instrument(skip(ctx))]
async fn set_nitro_role(
    ctx: BotContext<'_>,
    #[description = "Bonus role (e.g. your Nitro booster role)"] role: serenity::Role,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    ctx.data()
        .store
        .update_config(guild_id.get(), |config| {
            config.nitro_role_id = Some(role.id.get().to_string());
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "{} now grants a bonus entry in giveaways that opt in.",
                role.mention()
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
