//! Gateway event hooks: account-age auto-flagging and alt join/leave
//! notifications.

use std::str::FromStr;

use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, Member, User};
use tracing::warn;

use crate::moderation::{classify_account_age, describe_account_age, expiry_days_for};
use crate::store::models::GuildConfig;
use crate::store::{ConfigStore, ModerationStore};
use crate::{BotData, BotError};

pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &BotData,
    member: &Member,
) -> Result<(), BotError> {
    if member.user.bot {
        return Ok(());
    }
    let guild_id = member.guild_id.get();
    let user_id = member.user.id.to_string();
    let config = data.store.get_config(guild_id).await?;
    let now = chrono::Utc::now().timestamp();

    if config.alt_join_notify {
        let links = data.store.alt_links(guild_id, &user_id).await?;
        if !links.is_empty() {
            let linked: Vec<String> = links
                .iter()
                .map(|l| format!("<@{}>", l.other_id))
                .collect();
            mod_channel_send(
                ctx,
                &config,
                format!(
                    "👥 **Known alt joined:** <@{}> ({})\nLinked accounts: {}",
                    user_id,
                    member.user.name,
                    linked.join(", ")
                ),
            )
            .await;
        }
    }

    if config.auto_flag.enabled {
        let account_created = member.user.id.created_at().unix_timestamp();
        if let Some(priority) = classify_account_age(account_created, now, &config.auto_flag) {
            let age = describe_account_age(account_created, now);
            let expiry_days = expiry_days_for(priority, &config.auto_flag);
            let bot_id = ctx.cache.current_user().id.to_string();
            let flag_id = data
                .store
                .add_flag(
                    guild_id,
                    &user_id,
                    &bot_id,
                    &format!("Auto-flagged on join: account age {}", age),
                    priority,
                    expiry_days,
                    now,
                )
                .await?;

            mod_channel_send(
                ctx,
                &config,
                format!(
                    "🚩 **Auto-flagged new account** <@{}>: {} priority (flag #{})\nAccount age: {}\nFlag expires in {} days.",
                    user_id, priority, flag_id, age, expiry_days
                ),
            )
            .await;
        }
    }

    Ok(())
}

pub async fn handle_member_remove(
    ctx: &serenity::Context,
    data: &BotData,
    guild_id: GuildId,
    user: &User,
) -> Result<(), BotError> {
    if user.bot {
        return Ok(());
    }
    let config = data.store.get_config(guild_id.get()).await?;
    if !config.alt_leave_notify {
        return Ok(());
    }

    let links = data.store.alt_links(guild_id.get(), &user.id.to_string()).await?;
    if links.is_empty() {
        return Ok(());
    }

    let linked: Vec<String> = links
        .iter()
        .map(|l| format!("<@{}>", l.other_id))
        .collect();
    mod_channel_send(
        ctx,
        &config,
        format!(
            "👥 **Known alt left:** <@{}> ({})\nLinked accounts: {}",
            user.id,
            user.name,
            linked.join(", ")
        ),
    )
    .await;

    Ok(())
}

async fn mod_channel_send(ctx: &serenity::Context, config: &GuildConfig, content: String) {
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
    if let Err(e) = channel.say(&ctx.http, content).await {
        warn!(%channel_id, "mod-log send failed: {e}");
    }
}
