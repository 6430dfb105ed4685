//! Background sweeper.
//!
//! Runs on a fixed interval, ending giveaways whose deadline has passed and
//! pruning expired warning flags. The `Open -> PickingWinners` transition
//! fires exactly once per giveaway, so a tick that lands during a slow draw
//! does not re-trigger it.

use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude::{ChannelId, GuildId, Http, ShardMessenger};
use tracing::{debug, error, info, warn};

use crate::draw::{self, EndTransition, GiveawayError, WeightedPicker};
use crate::notifier::{DiscordNotifier, Notifier};
use crate::store::models::GiveawayStatus;
use crate::store::{GiveawayStore, JsonStore, ModerationStore};
use crate::BotError;

/// Seconds between sweeps.
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// Runs forever; spawn it once from setup.
pub async fn run_sweeper(http: Arc<Http>, shard: ShardMessenger, store: JsonStore) {
    info!("giveaway sweeper running every {}s", SWEEP_INTERVAL_SECS);
    loop {
        tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
        if let Err(e) = sweep_once(&http, &shard, &store).await {
            error!("sweep failed: {e:#}");
        }
    }
}

async fn sweep_once(
    http: &Arc<Http>,
    shard: &ShardMessenger,
    store: &JsonStore,
) -> Result<(), BotError> {
    let now = chrono::Utc::now().timestamp();

    for guild_id in store.guild_ids().await? {
        let data = store.read_guild(guild_id).await?;

        if data.flags.iter().any(|f| f.expires_at <= now) {
            let pruned = store.prune_expired_flags(guild_id, now).await?;
            debug!(guild_id, pruned, "pruned expired flags");
        }

        for (id, giveaway) in &data.giveaways {
            if giveaway.status != GiveawayStatus::Open || now < giveaway.end_timestamp {
                continue;
            }
            end_due_giveaway(http, shard, store, guild_id, id).await;
        }
    }

    Ok(())
}

/// Ends one due giveaway and, if it has entries, runs the draw loop.
async fn end_due_giveaway(
    http: &Arc<Http>,
    shard: &ShardMessenger,
    store: &JsonStore,
    guild_id: u64,
    giveaway_id: &str,
) {
    let transition = store
        .with_giveaway(guild_id, giveaway_id, |g| match g {
            Some(g) => draw::begin_end(g),
            None => Err(GiveawayError::NotFound(giveaway_id.to_string())),
        })
        .await;

    let transition = match transition {
        Ok(t) => t,
        Err(e) => {
            error!(guild_id, giveaway_id, "end transition failed: {e:#}");
            return;
        }
    };

    let Ok(snapshot) = store.get_giveaway(guild_id, giveaway_id).await else {
        return;
    };
    let Some(snapshot) = snapshot else { return };
    let Ok(channel_id) = snapshot.channel_id.parse::<u64>() else {
        warn!(guild_id, giveaway_id, "bad channel id on giveaway");
        return;
    };
    let notifier = DiscordNotifier::new(
        http.clone(),
        shard.clone(),
        GuildId::new(guild_id),
        ChannelId::new(channel_id),
    );

    match transition {
        Err(GiveawayError::AlreadyPicking) => {
            // A slower draw from a previous tick still owns this giveaway.
            debug!(guild_id, giveaway_id, "draw already in progress");
        }
        Err(e) => {
            debug!(guild_id, giveaway_id, "skipping ended giveaway: {e}");
        }
        Ok(EndTransition::NoEntries) => {
            notifier
                .broadcast(&format!(
                    "Giveaway for **{}** ended with no entries! 😢",
                    snapshot.prize
                ))
                .await;
        }
        Ok(EndTransition::Picking) => {
            notifier
                .broadcast(&format!(
                    "🎉 The giveaway for **{}** has ended! Picking winners...",
                    snapshot.prize
                ))
                .await;
            let mut picker = WeightedPicker::new();
            match draw::run_draw(store, &notifier, &mut picker, guild_id, giveaway_id).await {
                Ok(outcome) => info!(guild_id, giveaway_id, ?outcome, "draw finished"),
                Err(e) => error!(guild_id, giveaway_id, "draw failed: {e:#}"),
            }
        }
    }
}
