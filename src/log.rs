use std::str::FromStr;
use std::time::SystemTime;

use poise::serenity_prelude::{ChannelId, Colour, CreateEmbed, CreateMessage};
use tracing::{error, info};

use crate::store::ConfigStore;
use crate::utils::error::CommonError::NotInAGuild;
use crate::{BotContext, BotError};

/// Creates an info log message in the current guild's designated log channel.
///
/// Guilds without a configured log channel only get the tracing line.
pub async fn discord_log_info(
    ctx: BotContext<'_>,
    title: &str,
    mut fields: Vec<(&str, &str, bool)>,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    info!("ℹ️ {}\n\n{:#?}", title, fields);

    let config = ctx.data().store.get_config(guild_id.get()).await?;
    let Some(channel) = config.log_channel_id else {
        return Ok(());
    };
    let log_channel = ChannelId::from_str(&channel)?;

    let now_string = format!(
        "<t:{}:F>",
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    );
    fields.push(("Happened at", &now_string, false));

    log_channel
        .send_message(
            ctx,
            CreateMessage::default().embed(
                CreateEmbed::new()
                    .title(format!("ℹ️ {}", title))
                    .fields(fields)
                    .colour(Colour::BLURPLE),
            ),
        )
        .await?;

    Ok(())
}

/// Creates an error log message in the current guild's designated log channel.
pub async fn discord_log_error(
    ctx: BotContext<'_>,
    title: &str,
    mut fields: Vec<(&str, &str, bool)>,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    error!("⚠️ {}\n\n{:#?}", title, fields);

    let config = ctx.data().store.get_config(guild_id.get()).await?;
    let Some(channel) = config.log_channel_id else {
        return Ok(());
    };
    let log_channel = ChannelId::from_str(&channel)?;

    let now_string = format!(
        "<t:{}:F>",
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    );
    fields.push(("Seen at", &now_string, false));

    log_channel
        .send_message(
            ctx,
            CreateMessage::default()
                .content("⚠️ An error occured in a command!")
                .embed(
                    CreateEmbed::new()
                        .title(title.to_string())
                        .description("Please check the logs for more information.")
                        .fields(fields)
                        .colour(Colour::RED),
                ),
        )
        .await?;

    Ok(())
}
