use std::str::FromStr;

use poise::serenity_prelude::{
    self as serenity, ChannelId, Colour, CreateEmbed, CreateMessage, GuildId, Mentionable, RoleId,
};
use poise::CreateReply;
use tracing::{instrument, warn};

use super::checks::{is_admin_or_owner, is_organizer_or_higher};
use super::CommandsContainer;
use crate::draw::{
    self, begin_end, calculate_entry_weight, check_role_requirement, DrawOutcome, EndTransition,
    GiveawayError, WeightedPicker,
};
use crate::log;
use crate::notifier::{DiscordNotifier, Notifier};
use crate::store::models::{entity_id, Giveaway, GiveawayStatus};
use crate::store::{ConfigStore, GiveawayStore};
use crate::utils::duration::HumanDuration;
use crate::utils::error::CommonError::{InvalidWinnersCount, NotInAGuild};
use crate::{BotContext, BotData, BotError};

/// CommandsContainer for the giveaway commands.
pub struct GiveawayCommands;

impl CommandsContainer for GiveawayCommands {
    type Data = BotData;
    type Error = BotError;

    fn get_all() -> Vec<poise::Command<Self::Data, Self::Error>> {
        vec![
            giveaway_create(),
            giveaway_list(),
            giveaway_view(),
            giveaway_enter(),
            giveaway_leave(),
            giveaway_end(),
            giveaway_cancel(),
        ]
    }
}

/// Create a giveaway and announce it in a channel.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx, prize_code))]
#[allow(clippy::too_many_arguments)]
async fn giveaway_create(
    ctx: BotContext<'_>,
    #[description = "Prize name"] prize: String,
    #[description = "Duration, e.g. 24h, 3d, 1w"] duration: String,
    #[description = "Number of winners (1-20)"] winners_count: u32,
    #[description = "Code/key delivered to winners by DM"] prize_code: String,
    #[description = "Time each winner has to claim, e.g. 30m, 1h"] claim_timeout: String,
    #[description = "Channel to announce in"] channel: serenity::GuildChannel,
    #[description = "Extra details about the prize"] description: Option<String>,
    #[description = "Minimum role to enter (higher roles also qualify)"] required_role: Option<
        serenity::Role,
    >,
    #[description = "Grant a bonus entry to the configured nitro role"] nitro_bonus: Option<bool>,
    #[description = "Ad-hoc bonus role for this giveaway"] bonus_role: Option<serenity::Role>,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let duration = match duration.parse::<HumanDuration>() {
        Ok(d) => d,
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
            return Ok(());
        }
    };
    let claim_timeout = match claim_timeout.parse::<HumanDuration>() {
        Ok(d) => d,
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
            return Ok(());
        }
    };
    if !(1..=20).contains(&winners_count) {
        ctx.send(
            CreateReply::default()
                .content(InvalidWinnersCount(winners_count.to_string()).to_string())
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let created_at = chrono::offset::Utc::now().timestamp();
    let end_timestamp = created_at + duration.seconds();
    let giveaway_id = entity_id(guild_id.get(), created_at);

    let giveaway = Giveaway {
        prize: prize.clone(),
        description: description.clone(),
        host_id: ctx.author().id.to_string(),
        channel_id: channel.id.get().to_string(),
        winners_count: winners_count as usize,
        prize_code,
        claim_timeout_seconds: claim_timeout.seconds() as u64,
        end_timestamp,
        entries: Default::default(),
        status: GiveawayStatus::Open,
        winners_picked: Vec::new(),
        winners_claimed: Vec::new(),
        required_role_id: required_role.as_ref().map(|r| r.id.get().to_string()),
        nitro_bonus: nitro_bonus.unwrap_or(false),
        bonus_role_id: bonus_role.as_ref().map(|r| r.id.get().to_string()),
        created_at,
    };

    ctx.data()
        .store
        .insert_giveaway(guild_id.get(), giveaway_id.clone(), giveaway)
        .await?;

    let mut embed = CreateEmbed::new()
        .title(format!("🎉 GIVEAWAY: {}", prize))
        .description(
            description.unwrap_or_else(|| "Enter for a chance to win!".to_string()),
        )
        .colour(Colour::GOLD)
        .field("Winners", winners_count.to_string(), true)
        .field("Ends", format!("<t:{}:R>", end_timestamp), true)
        .field("Hosted by", ctx.author().mention().to_string(), true)
        .field(
            "How to enter",
            format!("`/giveaway_enter giveaway_id:{}`", giveaway_id),
            false,
        );
    if let Some(role) = &required_role {
        embed = embed.field(
            "Required role",
            format!("{} or higher", role.mention()),
            true,
        );
    }
    embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
        "Giveaway ID: {}",
        giveaway_id
    )));

    channel
        .id
        .send_message(ctx.http(), CreateMessage::new().embed(embed))
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Giveaway created in {}! Ends <t:{}:R>",
                channel.mention(),
                end_timestamp
            ))
            .ephemeral(true),
    )
    .await?;

    let winners_str = winners_count.to_string();
    let fields = vec![
        ("Giveaway ID", giveaway_id.as_str(), true),
        ("Prize", prize.as_str(), true),
        ("Winners", winners_str.as_str(), true),
    ];
    log::discord_log_info(ctx, "Giveaway created", fields).await?;

    Ok(())
}

/// List giveaways that are still open.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx))]
async fn giveaway_list(ctx: BotContext<'_>) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let giveaways = ctx.data().store.get_giveaways(guild_id.get()).await?;
    let active: Vec<(&String, &Giveaway)> = giveaways
        .iter()
        .filter(|(_, g)| g.is_open())
        .collect();

    if active.is_empty() {
        ctx.send(
            CreateReply::default()
                .content("No active giveaways.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = CreateEmbed::new()
        .title("🎉 Active Giveaways")
        .colour(Colour::GOLD);
    for (id, giveaway) in active.iter().take(10) {
        embed = embed.field(
            giveaway.prize.clone(),
            format!(
                "Channel: <#{}>\nEntries: {}\nEnds: <t:{}:R>\nID: `{}`",
                giveaway.channel_id,
                giveaway.entries.len(),
                giveaway.end_timestamp,
                id
            ),
            false,
        );
    }

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Show the details of one giveaway.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx))]
async fn giveaway_view(
    ctx: BotContext<'_>,
    #[description = "Giveaway ID"] giveaway_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let Some(giveaway) = ctx
        .data()
        .store
        .get_giveaway(guild_id.get(), &giveaway_id)
        .await?
    else {
        ctx.send(
            CreateReply::default()
                .content(GiveawayError::NotFound(giveaway_id).to_string())
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let tickets: u32 = giveaway.entries.values().sum();
    let mut embed = CreateEmbed::new()
        .title(format!("🎉 {}", giveaway.prize))
        .colour(Colour::GOLD)
        .field("Status", giveaway.status.to_string(), true)
        .field("Winners", giveaway.winners_count.to_string(), true)
        .field("Hosted by", format!("<@{}>", giveaway.host_id), true)
        .field(
            "Entries",
            format!("{} ({} tickets)", giveaway.entries.len(), tickets),
            true,
        )
        .field("Ends", format!("<t:{}:R>", giveaway.end_timestamp), true);
    if let Some(description) = &giveaway.description {
        embed = embed.description(description.clone());
    }
    if !giveaway.winners_picked.is_empty() {
        let picked: Vec<String> = giveaway
            .winners_picked
            .iter()
            .map(|id| format!("<@{}>", id))
            .collect();
        embed = embed.field("Drawn so far", picked.join(", "), false);
    }
    if !giveaway.winners_claimed.is_empty() {
        let claimed: Vec<String> = giveaway
            .winners_claimed
            .iter()
            .map(|id| format!("<@{}>", id))
            .collect();
        embed = embed.field("Claimed", claimed.join(", "), false);
    }

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Enter a giveaway. Entry weight is fixed when you enter.
#[poise::command(slash_command, guild_only)]
async fn giveaway_enter(
    ctx: BotContext<'_>,
    #[description = "Giveaway ID"] giveaway_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let user_id = ctx.author().id.to_string();

    let Some(giveaway) = ctx
        .data()
        .store
        .get_giveaway(guild_id.get(), &giveaway_id)
        .await?
    else {
        ctx.send(
            CreateReply::default()
                .content(GiveawayError::NotFound(giveaway_id).to_string())
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let member = ctx.author_member().await.ok_or(NotInAGuild)?;
    let member_role_ids: Vec<String> =
        member.roles.iter().map(|r| r.get().to_string()).collect();

    // Role gate first: hierarchy comparison, so any higher role substitutes
    // for the named one.
    let required_position = match &giveaway.required_role_id {
        Some(required) => lookup_role_position(&ctx, guild_id, required).await?,
        None => None,
    };
    if giveaway.required_role_id.is_some() && required_position.is_some() {
        let roles = guild_id.roles(ctx.http()).await?;
        let member_positions: Vec<i64> = member
            .roles
            .iter()
            .filter_map(|rid| roles.get(rid))
            .map(|r| r.position as i64)
            .collect();
        if !check_role_requirement(&member_positions, required_position) {
            ctx.send(
                CreateReply::default()
                    .content(GiveawayError::RoleRequirementNotMet.to_string())
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    }

    let config = ctx.data().store.get_config(guild_id.get()).await?;
    let weight = calculate_entry_weight(&member_role_ids, &giveaway, &config);

    let result = ctx
        .data()
        .store
        .with_giveaway(guild_id.get(), &giveaway_id, |giveaway| {
            giveaway
                .ok_or_else(|| GiveawayError::NotFound(giveaway_id.clone()))?
                .enter(&user_id, weight)
        })
        .await?;

    let reply = match result {
        Ok(count) => {
            let mut msg = format!(
                "You've been entered into the giveaway! Good luck! ({} entries)",
                count
            );
            if weight > 1 {
                msg.push_str(&format!(" Your entry counts {} times.", weight));
            }
            msg
        }
        Err(e) => e.to_string(),
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// Withdraw your entry from a giveaway.
#[poise::command(slash_command, guild_only)]
async fn giveaway_leave(
    ctx: BotContext<'_>,
    #[description = "Giveaway ID"] giveaway_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let user_id = ctx.author().id.to_string();

    let result = ctx
        .data()
        .store
        .with_giveaway(guild_id.get(), &giveaway_id, |giveaway| {
            giveaway
                .ok_or_else(|| GiveawayError::NotFound(giveaway_id.clone()))?
                .leave(&user_id)
        })
        .await?;

    let reply = match result {
        Ok(count) => format!("Your entry has been removed. ({} entries left)", count),
        Err(e) => e.to_string(),
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// End a giveaway early and pick winners now. Re-running on a giveaway that
/// is already picking winners resumes the draw (e.g. after a restart lost a
/// claim wait).
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx))]
async fn giveaway_end(
    ctx: BotContext<'_>,
    #[description = "Giveaway ID"] giveaway_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let result = ctx
        .data()
        .store
        .with_giveaway(guild_id.get(), &giveaway_id, |giveaway| {
            let giveaway =
                giveaway.ok_or_else(|| GiveawayError::NotFound(giveaway_id.clone()))?;
            begin_end(giveaway).map(|transition| (transition, giveaway.clone()))
        })
        .await?;

    let (transition, snapshot) = match result {
        Ok(pair) => pair,
        Err(GiveawayError::AlreadyPicking) => {
            // Resume an interrupted draw.
            let snapshot = ctx
                .data()
                .store
                .get_giveaway(guild_id.get(), &giveaway_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("giveaway vanished mid-resume"))?;
            (EndTransition::Picking, snapshot)
        }
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
            return Ok(());
        }
    };

    let notifier = giveaway_notifier(&ctx, guild_id, &snapshot)?;

    if transition == EndTransition::NoEntries {
        notifier
            .broadcast(&format!(
                "Giveaway for **{}** ended with no entries! 😢",
                snapshot.prize
            ))
            .await;
        ctx.send(
            CreateReply::default()
                .content("Giveaway ended with no entries.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Giveaway for **{}** ended. Picking winners...",
                snapshot.prize
            ))
            .ephemeral(true),
    )
    .await?;
    notifier
        .broadcast(&format!(
            "🎉 The giveaway for **{}** has ended! Picking winners...",
            snapshot.prize
        ))
        .await;

    let store = ctx.data().store.clone();
    let mut picker = WeightedPicker::new();
    let outcome =
        draw::run_draw(&store, &notifier, &mut picker, guild_id.get(), &giveaway_id).await?;

    let summary = match outcome {
        DrawOutcome::Complete { claimed } => {
            format!("All {} winner slot(s) claimed.", claimed)
        }
        DrawOutcome::Exhausted { claimed, target } => format!(
            "Entries exhausted: {} of {} winner slot(s) claimed.",
            claimed, target
        ),
        DrawOutcome::Cancelled => "The giveaway was cancelled during the draw.".to_string(),
    };
    ctx.send(CreateReply::default().content(summary.clone()).ephemeral(true))
        .await?;

    let fields = vec![
        ("Giveaway ID", giveaway_id.as_str(), true),
        ("Prize", snapshot.prize.as_str(), true),
        ("Outcome", summary.as_str(), false),
    ];
    log::discord_log_info(ctx, "Giveaway ended", fields).await?;

    Ok(())
}

/// Cancel a giveaway. Already-claimed winners keep their prize; nobody else
/// is drawn.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
#[instrument(skip(ctx))]
async fn giveaway_cancel(
    ctx: BotContext<'_>,
    #[description = "Giveaway ID"] giveaway_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let result = ctx
        .data()
        .store
        .with_giveaway(guild_id.get(), &giveaway_id, |giveaway| {
            let giveaway =
                giveaway.ok_or_else(|| GiveawayError::NotFound(giveaway_id.clone()))?;
            giveaway.cancel().map(|()| giveaway.clone())
        })
        .await?;

    match result {
        Ok(snapshot) => {
            let notifier = giveaway_notifier(&ctx, guild_id, &snapshot)?;
            notifier
                .broadcast(&format!(
                    "The giveaway for **{}** has been cancelled.",
                    snapshot.prize
                ))
                .await;
            ctx.send(
                CreateReply::default()
                    .content(format!("Cancelled giveaway {}.", giveaway_id))
                    .ephemeral(true),
            )
            .await?;

            let fields = vec![
                ("Giveaway ID", giveaway_id.as_str(), true),
                ("Prize", snapshot.prize.as_str(), true),
                ("Cancelled by", ctx.author().name.as_str(), true),
            ];
            log::discord_log_info(ctx, "Giveaway cancelled", fields).await?;
        }
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
        }
    }

    Ok(())
}

/// Builds the notifier for a giveaway's broadcast channel.
fn giveaway_notifier(
    ctx: &BotContext<'_>,
    guild_id: GuildId,
    giveaway: &Giveaway,
) -> Result<DiscordNotifier, BotError> {
    let channel = ChannelId::from_str(&giveaway.channel_id)?;
    let serenity_ctx = ctx.serenity_context();
    Ok(DiscordNotifier::new(
        serenity_ctx.http.clone(),
        serenity_ctx.shard.clone(),
        guild_id,
        channel,
    ))
}

async fn lookup_role_position(
    ctx: &BotContext<'_>,
    guild_id: GuildId,
    role_id: &str,
) -> Result<Option<i64>, BotError> {
    let Ok(role_id) = role_id.parse::<u64>() else {
        warn!(role_id, "bad required role id on giveaway");
        return Ok(None);
    };
    let roles = guild_id.roles(ctx.http()).await?;
    match roles.get(&RoleId::new(role_id)) {
        Some(role) => Ok(Some(role.position as i64)),
        None => {
            warn!(role_id, "required role no longer exists, waiving requirement");
            Ok(None)
        }
    }
}
