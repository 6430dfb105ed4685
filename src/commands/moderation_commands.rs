use std::str::FromStr;

use chrono::Utc;
use poise::serenity_prelude::{self as serenity, ChannelId, Colour, CreateEmbed, Mentionable};
use poise::CreateReply;
use tracing::warn;

use super::checks::{is_admin_or_owner, is_organizer_or_higher};
use super::CommandsContainer;
use crate::store::models::{FlagPriority, GuildConfig};
use crate::store::{ConfigStore, ModerationStore};
use crate::utils::error::CommonError::NotInAGuild;
use crate::{BotContext, BotData, BotError};

/// CommandsContainer for the moderation commands (flags and alt links).
pub struct ModerationCommands;

impl CommandsContainer for ModerationCommands {
    type Data = BotData;
    type Error = BotError;

    fn get_all() -> Vec<poise::Command<Self::Data, Self::Error>> {
        vec![
            flag_add(),
            flag_view(),
            flag_remove(),
            flag_clear(),
            flag_all(),
            flagset_channel(),
            flagset_autoflag(),
            flagset_threshold(),
            flagset_expiry(),
            alt_mark(),
            alt_unmark(),
            alt_view(),
            altset_notify(),
        ]
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
enum PriorityChoice {
    #[name = "Critical"]
    Critical,
    #[name = "High"]
    High,
    #[name = "Medium"]
    Medium,
    #[name = "Manual"]
    Manual,
}

impl From<PriorityChoice> for FlagPriority {
    fn from(choice: PriorityChoice) -> Self {
        match choice {
            PriorityChoice::Critical => FlagPriority::Critical,
            PriorityChoice::High => FlagPriority::High,
            PriorityChoice::Medium => FlagPriority::Medium,
            PriorityChoice::Manual => FlagPriority::Manual,
        }
    }
}

/// Flag a user with a reason and an expiry.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn flag_add(
    ctx: BotContext<'_>,
    #[description = "User to flag"] user: serenity::User,
    #[description = "Why are you flagging this user?"] reason: String,
    #[description = "Days until the flag expires (default 30)"] expiry_days: Option<u32>,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let config = ctx.data().store.get_config(guild_id.get()).await?;

    let days = match expiry_days {
        Some(days) if (1..=365).contains(&days) => days as i64,
        Some(_) | None => config.auto_flag.manual_expiry_days,
    };
    let now = Utc::now().timestamp();

    let flag_id = ctx
        .data()
        .store
        .add_flag(
            guild_id.get(),
            &user.id.to_string(),
            &ctx.author().id.to_string(),
            &reason,
            FlagPriority::Manual,
            days,
            now,
        )
        .await?;

    let embed = CreateEmbed::new()
        .title("✅ Flag Added")
        .description(format!("Flag #{} added to {}", flag_id, user.mention()))
        .colour(Colour::DARK_GREEN)
        .field("Notes", reason.clone(), false)
        .field("Flagged By", ctx.author().mention().to_string(), true)
        .field("Expires", format!("In {} days", days), true);
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    mod_log(
        &ctx,
        &config,
        format!(
            "🚩 **Flag Added** by {}\n**User:** {} ({})\n**Notes:** {}\n**Expires:** {} days",
            ctx.author().mention(),
            user.mention(),
            user.id,
            reason,
            days
        ),
    )
    .await;

    Ok(())
}

/// View a user's active flags.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn flag_view(
    ctx: BotContext<'_>,
    #[description = "User to inspect"] user: serenity::User,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let now = Utc::now().timestamp();

    let flags = ctx
        .data()
        .store
        .user_flags(guild_id.get(), &user.id.to_string(), now)
        .await?;

    if flags.is_empty() {
        ctx.send(
            CreateReply::default()
                .content(format!("{} has no active flags.", user.mention()))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = CreateEmbed::new()
        .title(format!("🚩 Flags for {}", user.name))
        .colour(Colour::ORANGE);
    for flag in flags.iter().take(25) {
        embed = embed.field(
            format!("#{} ({})", flag.id, flag.priority),
            format!(
                "{}\nBy <@{}> • expires <t:{}:R>",
                flag.reason, flag.moderator_id, flag.expires_at
            ),
            false,
        );
    }
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Remove a single flag by its id.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn flag_remove(
    ctx: BotContext<'_>,
    #[description = "Flag id"] flag_id: u64,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let removed = ctx.data().store.remove_flag(guild_id.get(), flag_id).await?;
    let reply = match removed {
        Some(flag) => format!("Removed flag #{} from <@{}>.", flag.id, flag.user_id),
        None => format!("No flag with id {} was found.", flag_id),
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// Clear every flag on a user.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn flag_clear(
    ctx: BotContext<'_>,
    #[description = "User to clear"] user: serenity::User,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let removed = ctx
        .data()
        .store
        .clear_flags(guild_id.get(), &user.id.to_string())
        .await?;
    ctx.send(
        CreateReply::default()
            .content(format!(
                "Cleared {} flag(s) from {}.",
                removed,
                user.mention()
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// List every user with active flags.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn flag_all(ctx: BotContext<'_>) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let now = Utc::now().timestamp();

    let summaries = ctx.data().store.all_flagged(guild_id.get(), now).await?;
    if summaries.is_empty() {
        ctx.send(
            CreateReply::default()
                .content("No users are currently flagged.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = CreateEmbed::new()
        .title("🚩 Flagged Users")
        .colour(Colour::ORANGE);
    for summary in summaries.iter().take(25) {
        embed = embed.field(
            format!("<@{}>", summary.user_id),
            format!(
                "{} flag(s), highest priority: {}",
                summary.flag_count, summary.highest_priority
            ),
            true,
        );
    }
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Set the mod-log channel used for flag and alt notifications.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
async fn flagset_channel(
    ctx: BotContext<'_>,
    #[description = "Mod-log channel"] channel: serenity::GuildChannel,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    ctx.data()
        .store
        .update_config(guild_id.get(), |config| {
            config.mod_log_channel_id = Some(channel.id.get().to_string());
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!("Mod-log channel set to {}.", channel.mention()))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Enable or disable account-age auto-flagging on join.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
async fn flagset_autoflag(
    ctx: BotContext<'_>,
    #[description = "Enable auto-flagging?"] enabled: bool,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    ctx.data()
        .store
        .update_config(guild_id.get(), |config| {
            config.auto_flag.enabled = enabled;
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Account-age auto-flagging is now {}.",
                if enabled { "enabled" } else { "disabled" }
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Set an account-age threshold (critical in hours, high/medium in days).
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
async fn flagset_threshold(
    ctx: BotContext<'_>,
    #[description = "Which threshold"] priority: PriorityChoice,
    #[description = "Critical: hours. High/medium: days."] value: u32,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    if matches!(priority, PriorityChoice::Manual) {
        ctx.send(
            CreateReply::default()
                .content("Manual flags have no account-age threshold.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let value = value.max(1) as i64;
    ctx.data()
        .store
        .update_config(guild_id.get(), |config| match priority {
            PriorityChoice::Critical => config.auto_flag.critical_hours = value,
            PriorityChoice::High => config.auto_flag.high_days = value,
            PriorityChoice::Medium => config.auto_flag.medium_days = value,
            PriorityChoice::Manual => {}
        })
        .await?;

    let unit = if matches!(priority, PriorityChoice::Critical) {
        "hours"
    } else {
        "days"
    };
    ctx.send(
        CreateReply::default()
            .content(format!(
                "{:?} threshold set to {} {}.",
                priority, value, unit
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Set how long flags of a given priority last, in days.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
async fn flagset_expiry(
    ctx: BotContext<'_>,
    #[description = "Which priority"] priority: PriorityChoice,
    #[description = "Days until expiry"] days: u32,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let days = days.clamp(1, 365) as i64;
    ctx.data()
        .store
        .update_config(guild_id.get(), |config| match priority {
            PriorityChoice::Critical => config.auto_flag.critical_expiry_days = days,
            PriorityChoice::High => config.auto_flag.high_expiry_days = days,
            PriorityChoice::Medium => config.auto_flag.medium_expiry_days = days,
            PriorityChoice::Manual => config.auto_flag.manual_expiry_days = days,
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!("{:?} flags now expire after {} days.", priority, days))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Mark two accounts as alts of each other.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn alt_mark(
    ctx: BotContext<'_>,
    #[description = "First account"] user1: serenity::User,
    #[description = "Second account"] user2: serenity::User,
    #[description = "Why are these accounts linked?"] reason: Option<String>,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    if user1.id == user2.id {
        ctx.send(
            CreateReply::default()
                .content("You can't link an account to itself.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let linked = ctx
        .data()
        .store
        .link_alts(
            guild_id.get(),
            &user1.id.to_string(),
            &user2.id.to_string(),
            reason.clone(),
            &ctx.author().id.to_string(),
            Utc::now().timestamp(),
        )
        .await?;

    if !linked {
        ctx.send(
            CreateReply::default()
                .content("Those accounts are already linked.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Linked {} and {} as alts.",
                user1.mention(),
                user2.mention()
            ))
            .ephemeral(true),
    )
    .await?;

    let config = ctx.data().store.get_config(guild_id.get()).await?;
    mod_log(
        &ctx,
        &config,
        format!(
            "👥 **Alts linked** by {}: {} ↔ {}{}",
            ctx.author().mention(),
            user1.mention(),
            user2.mention(),
            reason
                .map(|r| format!("\n**Reason:** {}", r))
                .unwrap_or_default()
        ),
    )
    .await;

    Ok(())
}

/// Remove an alt link between two accounts.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn alt_unmark(
    ctx: BotContext<'_>,
    #[description = "First account"] user1: serenity::User,
    #[description = "Second account"] user2: serenity::User,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let unlinked = ctx
        .data()
        .store
        .unlink_alts(
            guild_id.get(),
            &user1.id.to_string(),
            &user2.id.to_string(),
        )
        .await?;

    let reply = if unlinked {
        format!("Unlinked {} and {}.", user1.mention(), user2.mention())
    } else {
        "Those accounts aren't linked.".to_string()
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// View an account's known alts.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
async fn alt_view(
    ctx: BotContext<'_>,
    #[description = "Account to inspect"] user: serenity::User,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let links = ctx
        .data()
        .store
        .alt_links(guild_id.get(), &user.id.to_string())
        .await?;

    if links.is_empty() {
        ctx.send(
            CreateReply::default()
                .content(format!("{} has no known alts.", user.mention()))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = CreateEmbed::new()
        .title(format!("👥 Known alts of {}", user.name))
        .colour(Colour::BLURPLE);
    for link in links.iter().take(25) {
        embed = embed.field(
            format!("<@{}>", link.other_id),
            format!(
                "Linked <t:{}:R> by <@{}>{}",
                link.linked_at,
                link.linked_by,
                link.reason
                    .as_ref()
                    .map(|r| format!("\n{}", r))
                    .unwrap_or_default()
            ),
            false,
        );
    }
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Toggle mod-log notifications when known alts join or leave.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
async fn altset_notify(
    ctx: BotContext<'_>,
    #[description = "Notify when a known alt joins"] join: Option<bool>,
    #[description = "Notify when a known alt leaves"] leave: Option<bool>,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let config = ctx
        .data()
        .store
        .update_config(guild_id.get(), |config| {
            if let Some(join) = join {
                config.alt_join_notify = join;
            }
            if let Some(leave) = leave {
                config.alt_leave_notify = leave;
            }
        })
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Alt notifications: join {}, leave {}.",
                config.alt_join_notify, config.alt_leave_notify
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Posts to the guild's mod-log channel; failures are logged, never raised.
async fn mod_log(ctx: &BotContext<'_>, config: &GuildConfig, content: String) {
    let Some(channel_id) = &config.mod_log_channel_id else {
        return;
    };
    let channel = match ChannelId::from_str(channel_id) {
        Ok(channel) => channel,
        Err(_) => {
            warn!(%channel_id, "bad mod-log channel id");
            return;
        }
    };
    if let Err(e) = channel.say(ctx.http(), content).await {
        warn!(%channel_id, "mod-log send failed: {e}");
    }
}
