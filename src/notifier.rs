//! The notification seam between the engines and Discord.
//!
//! Engines talk to an abstract [`Notifier`]; the Discord implementation
//! delivers over a guild's broadcast channel and DMs, with claim prompts
//! realized as bounded component-interaction waits. Delivery failures are
//! reported back to the caller, never thrown.

use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude::{
    ButtonStyle, ChannelId, Colour, CreateActionRow, CreateButton, CreateEmbed,
    CreateInteractionResponse, CreateMessage, GuildId, Http, Message, ShardMessenger, UserId,
};
use tracing::warn;

use crate::store::models::Giveaway;
use crate::utils::duration::humanize_seconds;
use crate::BotError;

/// Outcome of a bounded yes/no claim prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResponse {
    Accepted,
    Declined,
    TimedOut,
}

/// Delivery channel for engine announcements and winner prompts.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// Sends to the broadcast channel. Returns false on delivery failure.
    async fn broadcast(&self, message: &str) -> bool;

    /// Whether the user still resolves to a guild member.
    async fn member_exists(&self, user_id: &str) -> bool;

    /// Bounded accept/decline prompt restricted to the named user; any other
    /// user's response is ignored. `Err` means the prompt could not be
    /// delivered anywhere.
    async fn prompt_claim(
        &self,
        user_id: &str,
        giveaway: &Giveaway,
        winner_number: usize,
        timeout: Duration,
    ) -> Result<ClaimResponse, BotError>;

    /// Delivers the prize payload by DM. Returns false on delivery failure.
    async fn deliver_prize(&self, user_id: &str, giveaway: &Giveaway) -> bool;
}

/// Notifier over a guild's configured broadcast channel.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<Http>,
    shard: ShardMessenger,
    guild_id: GuildId,
    channel_id: ChannelId,
}

impl DiscordNotifier {
    pub fn new(
        http: Arc<Http>,
        shard: ShardMessenger,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Self {
        Self {
            http,
            shard,
            guild_id,
            channel_id,
        }
    }

    fn claim_embed(&self, giveaway: &Giveaway, winner_number: usize, timeout: Duration) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title("🎉 You Won a Giveaway!")
            .description(format!(
                "Congratulations! You won **{}**!",
                giveaway.prize
            ))
            .colour(Colour::GOLD);

        if giveaway.winners_count > 1 {
            embed = embed.field(
                "🏆 Winner Position",
                format!(
                    "You are winner #{} of {}",
                    winner_number, giveaway.winners_count
                ),
                false,
            );
        }

        embed
            .field(
                "⏰ Time to Claim",
                format!(
                    "You have **{}** to claim your prize.",
                    humanize_seconds(timeout.as_secs() as i64)
                ),
                false,
            )
            .field(
                "📋 Instructions",
                "Click **Yes** below to receive your prize code.\nClick **No** to decline and we'll pick another winner.",
                false,
            )
    }

    fn claim_buttons() -> CreateActionRow {
        CreateActionRow::Buttons(vec![
            CreateButton::new("claim_yes")
                .label("Yes, I claim this prize!")
                .style(ButtonStyle::Success),
            CreateButton::new("claim_no")
                .label("No, reroll")
                .style(ButtonStyle::Danger),
        ])
    }

    async fn dm_user(&self, user: UserId, message: CreateMessage) -> Result<Message, BotError> {
        let dm = user.create_dm_channel(&*self.http).await?;
        Ok(dm.id.send_message(&*self.http, message).await?)
    }

    fn parse_user(user_id: &str) -> Option<UserId> {
        user_id.parse::<u64>().ok().map(UserId::new)
    }
}

impl Notifier for DiscordNotifier {
    async fn broadcast(&self, message: &str) -> bool {
        match self.channel_id.say(&*self.http, message).await {
            Ok(_) => true,
            Err(e) => {
                warn!(channel_id = %self.channel_id, "broadcast failed: {e}");
                false
            }
        }
    }

    async fn member_exists(&self, user_id: &str) -> bool {
        match Self::parse_user(user_id) {
            Some(user) => self.guild_id.member(&*self.http, user).await.is_ok(),
            None => false,
        }
    }

    async fn prompt_claim(
        &self,
        user_id: &str,
        giveaway: &Giveaway,
        winner_number: usize,
        timeout: Duration,
    ) -> Result<ClaimResponse, BotError> {
        let user = Self::parse_user(user_id)
            .ok_or_else(|| anyhow::anyhow!("invalid user id {user_id}"))?;

        let message = CreateMessage::new()
            .embed(self.claim_embed(giveaway, winner_number, timeout))
            .components(vec![Self::claim_buttons()]);

        // DM first; when DMs are closed, fall back to an in-channel prompt.
        let prompt = match self.dm_user(user, message.clone()).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(%user, "claim DM failed, falling back to channel: {e:#}");
                let fallback = message.content(format!(
                    "<@{}> You won **{}** but I can't DM you! Claim here instead:",
                    user, giveaway.prize
                ));
                self.channel_id.send_message(&*self.http, fallback).await?
            }
        };

        let interaction = prompt
            .await_component_interaction(&self.shard)
            .author_id(user)
            .timeout(timeout)
            .await;

        match interaction {
            Some(interaction) => {
                if let Err(e) = interaction
                    .create_response(&*self.http, CreateInteractionResponse::Acknowledge)
                    .await
                {
                    warn!(%user, "failed to acknowledge claim response: {e}");
                }
                if interaction.data.custom_id == "claim_yes" {
                    Ok(ClaimResponse::Accepted)
                } else {
                    Ok(ClaimResponse::Declined)
                }
            }
            None => Ok(ClaimResponse::TimedOut),
        }
    }

    async fn deliver_prize(&self, user_id: &str, giveaway: &Giveaway) -> bool {
        let Some(user) = Self::parse_user(user_id) else {
            return false;
        };

        let embed = CreateEmbed::new()
            .title("🎁 Your Prize Code")
            .description(format!(
                "**Prize:** {}\n\n**Code/Key:**\n```\n{}\n```",
                giveaway.prize, giveaway.prize_code
            ))
            .colour(Colour::DARK_GREEN);

        match self.dm_user(user, CreateMessage::new().embed(embed)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(%user, "prize delivery DM failed: {e:#}");
                false
            }
        }
    }
}
