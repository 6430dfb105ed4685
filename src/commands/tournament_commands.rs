use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::DateTime;
use poise::serenity_prelude::{self as serenity, ChannelId, CreateEmbed, CreateMessage, Colour, Mentionable};
use poise::CreateReply;
use prettytable::{row, Table};
use tracing::{instrument, warn};

use super::checks::{is_admin_or_owner, is_organizer_or_higher};
use super::CommandsContainer;
use crate::bracket::{RoundResult, TournamentError};
use crate::log;
use crate::store::models::{
    entity_id, Match, Team, TeamMode, Tournament, TournamentKind, TournamentStatus,
};
use crate::store::TournamentStore;
use crate::utils::error::CommonError::{InvalidTeamSize, NotInAGuild};
use crate::utils::mention::parse_user_ids;
use crate::{BotContext, BotData, BotError};

/// CommandsContainer for the tournament commands.
pub struct TournamentCommands;

impl CommandsContainer for TournamentCommands {
    type Data = BotData;
    type Error = BotError;

    fn get_all() -> Vec<poise::Command<Self::Data, Self::Error>> {
        vec![
            tournament_create(),
            tournament_list(),
            tournament_join(),
            tournament_pickup(),
            tournament_team(),
            tournament_leave(),
            tournament_start(),
            tournament_report(),
            tournament_bracket(),
            tournament_cancel(),
        ]
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
enum TournamentTypeChoice {
    #[name = "Solo"]
    Solo,
    #[name = "Team (random teams)"]
    TeamRandom,
    #[name = "Team (premade teams)"]
    TeamPremade,
}

/// Create a new tournament and announce it in a channel.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx))]
async fn tournament_create(
    ctx: BotContext<'_>,
    #[description = "Tournament name"] name: String,
    #[description = "Game or category"] game: String,
    #[description = "Tournament type"] tournament_type: TournamentTypeChoice,
    #[description = "Channel to announce signups in"] channel: serenity::GuildChannel,
    #[description = "Team size (team tournaments only)"] team_size: Option<u32>,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let kind = match tournament_type {
        TournamentTypeChoice::Solo => TournamentKind::Solo,
        TournamentTypeChoice::TeamRandom | TournamentTypeChoice::TeamPremade => {
            let team_size = team_size.unwrap_or(0);
            if !(2..=10).contains(&team_size) {
                ctx.send(
                    CreateReply::default()
                        .content(InvalidTeamSize(team_size.to_string()).to_string())
                        .ephemeral(true),
                )
                .await?;
                return Ok(());
            }
            TournamentKind::Team {
                team_size: team_size as usize,
                team_mode: match tournament_type {
                    TournamentTypeChoice::TeamRandom => TeamMode::Random,
                    _ => TeamMode::Premade,
                },
            }
        }
    };

    let created_at = chrono::offset::Utc::now().timestamp();
    let tournament_id = entity_id(guild_id.get(), created_at);
    let tournament = Tournament {
        name: name.clone(),
        game: game.clone(),
        host_id: ctx.author().id.to_string(),
        channel_id: channel.id.get().to_string(),
        kind,
        participants: Vec::new(),
        teams: BTreeMap::new(),
        pickup_players: Vec::new(),
        status: TournamentStatus::Open,
        bracket: Vec::new(),
        created_at,
    };

    ctx.data()
        .store
        .insert_tournament(guild_id.get(), tournament_id.clone(), tournament)
        .await?;

    let mut embed = CreateEmbed::new()
        .title(format!("🏆 {}", name))
        .description(format!("**Game:** {}", game))
        .colour(Colour::BLUE);
    embed = match kind {
        TournamentKind::Solo => embed
            .field("Type", "Solo (1v1 or FFA)", true)
            .field(
                "How to sign up",
                format!("`/tournament_join tournament_id:{}`", tournament_id),
                false,
            ),
        TournamentKind::Team {
            team_size,
            team_mode: TeamMode::Random,
        } => embed
            .field("Type", format!("Team ({}v{})", team_size, team_size), true)
            .field("Team Mode", "Random", true)
            .field(
                "How to sign up",
                format!(
                    "`/tournament_join tournament_id:{}` (teams are drawn when the bracket starts)",
                    tournament_id
                ),
                false,
            ),
        TournamentKind::Team {
            team_size,
            team_mode: TeamMode::Premade,
        } => embed
            .field("Type", format!("Team ({}v{})", team_size, team_size), true)
            .field("Team Mode", "Premade", true)
            .field(
                "How to sign up",
                format!(
                    "**Captains:** `/tournament_team tournament_id:{id}`\n**Individuals:** `/tournament_pickup tournament_id:{id}` to be assigned to a team that needs players",
                    id = tournament_id
                ),
                false,
            ),
    };
    embed = embed
        .field("Status", TournamentStatus::Open.to_string(), false)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Tournament ID: {}",
            tournament_id
        )));

    channel
        .id
        .send_message(ctx.http(), CreateMessage::new().embed(embed))
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Tournament **{}** created in {}!",
                name,
                channel.mention()
            ))
            .ephemeral(true),
    )
    .await?;

    let fields = vec![
        ("Tournament ID", tournament_id.as_str(), true),
        ("Name", name.as_str(), true),
        ("Game", game.as_str(), true),
    ];
    log::discord_log_info(ctx, "Tournament created", fields).await?;

    Ok(())
}

/// List tournaments that are open or in progress.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx))]
async fn tournament_list(ctx: BotContext<'_>) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let tournaments = ctx.data().store.get_tournaments(guild_id.get()).await?;
    let active: Vec<(&String, &Tournament)> = tournaments
        .iter()
        .filter(|(_, t)| {
            matches!(
                t.status,
                TournamentStatus::Open | TournamentStatus::Started
            )
        })
        .collect();

    if active.is_empty() {
        ctx.send(
            CreateReply::default()
                .content("There are no active tournaments. You can create one with /tournament_create.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut table = Table::new();
    table.set_titles(row!["ID", "Name", "Game", "Signups", "Created At", "Status"]);
    for (id, tournament) in active {
        let signups = match tournament.kind {
            TournamentKind::Team {
                team_mode: TeamMode::Premade,
                ..
            } => format!(
                "{} teams, {} pickups",
                tournament.teams.len(),
                tournament.pickup_players.len()
            ),
            _ => format!("{} participants", tournament.participants.len()),
        };
        table.add_row(row![
            id,
            tournament.name,
            tournament.game,
            signups,
            DateTime::from_timestamp(tournament.created_at, 0)
                .unwrap_or_default()
                .to_rfc2822(),
            tournament.status,
        ]);
    }

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Here are the currently active tournaments\n```\n{}\n```",
                table
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Join a solo or random-team tournament.
#[poise::command(slash_command, guild_only)]
async fn tournament_join(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let user_id = ctx.author().id.to_string();

    let result = ctx
        .data()
        .store
        .with_tournament(guild_id.get(), &tournament_id, |tournament| {
            tournament
                .ok_or_else(|| TournamentError::NotFound(tournament_id.clone()))?
                .join_participant(&user_id)
        })
        .await?;

    let reply = match result {
        Ok(count) => format!("You've joined the tournament! ({} participants)", count),
        Err(e) => e.to_string(),
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// Join the pickup pool of a premade-team tournament.
#[poise::command(slash_command, guild_only)]
async fn tournament_pickup(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let user_id = ctx.author().id.to_string();

    let result = ctx
        .data()
        .store
        .with_tournament(guild_id.get(), &tournament_id, |tournament| {
            tournament
                .ok_or_else(|| TournamentError::NotFound(tournament_id.clone()))?
                .join_pickup(&user_id)
        })
        .await?;

    let reply = match result {
        Ok(count) => format!(
            "✅ You've joined as a pickup player!\n\n⚠️ **Note:** You will be randomly assigned to a team that needs players when the tournament starts. ({} pickup players)",
            count
        ),
        Err(e) => e.to_string(),
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// Register a premade team. Mention the roster, including yourself.
#[poise::command(slash_command, guild_only)]
async fn tournament_team(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
    #[description = "Team name"] team_name: String,
    #[description = "Players (mentions or ids, include yourself)"] players: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let captain = ctx.author().id.to_string();
    let player_ids = parse_user_ids(&players);

    let result = ctx
        .data()
        .store
        .with_tournament(guild_id.get(), &tournament_id, |tournament| {
            let tournament =
                tournament.ok_or_else(|| TournamentError::NotFound(tournament_id.clone()))?;
            tournament
                .register_team(&team_name, player_ids.clone(), &captain)
                .map(|()| match tournament.kind {
                    TournamentKind::Team { team_size, .. } => team_size,
                    TournamentKind::Solo => player_ids.len(),
                })
        })
        .await?;

    let reply = match result {
        Ok(team_size) => {
            let mentions: Vec<String> =
                player_ids.iter().map(|id| format!("<@{}>", id)).collect();
            let mut msg = format!(
                "✅ Team **{}** registered!\n\n**Roster ({}/{}):**\n{}",
                team_name,
                player_ids.len(),
                team_size,
                mentions.join(", ")
            );
            if player_ids.len() < team_size {
                msg.push_str(&format!(
                    "\n\n⚠️ **Incomplete Team:** Your team needs {} more player(s). Pickup players will be randomly assigned to fill your roster when the tournament starts.",
                    team_size - player_ids.len()
                ));
            }
            msg
        }
        Err(e) => e.to_string(),
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// Withdraw your individual signup from a tournament.
#[poise::command(slash_command, guild_only)]
async fn tournament_leave(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;
    let user_id = ctx.author().id.to_string();

    let result = ctx
        .data()
        .store
        .with_tournament(guild_id.get(), &tournament_id, |tournament| {
            tournament
                .ok_or_else(|| TournamentError::NotFound(tournament_id.clone()))?
                .leave(&user_id)
        })
        .await?;

    let reply = match result {
        Ok(()) => "You've left the tournament.".to_string(),
        Err(e) => e.to_string(),
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// Start a tournament: freeze signups and generate the round-1 bracket.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx))]
async fn tournament_start(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let result = ctx
        .data()
        .store
        .with_tournament(guild_id.get(), &tournament_id, |tournament| {
            let tournament =
                tournament.ok_or_else(|| TournamentError::NotFound(tournament_id.clone()))?;
            tournament
                .start(&mut rand::thread_rng())
                .map(|summary| (summary, tournament.clone()))
        })
        .await?;

    let (summary, tournament) = match result {
        Ok(pair) => pair,
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
            return Ok(());
        }
    };

    let mut embed = CreateEmbed::new()
        .title(format!("🏆 {} - Tournament Started!", tournament.name))
        .description(format!("**Game:** {}", tournament.game))
        .colour(Colour::DARK_GREEN);

    if tournament.kind.is_team() {
        embed = embed.field("Teams", teams_text(&tournament.teams), false);
        if summary.leftover_pickups > 0 {
            embed = embed.field(
                "Unassigned Pickups",
                format!(
                    "{} pickup player(s) could not fill a complete team and stay in the pool.",
                    summary.leftover_pickups
                ),
                false,
            );
        }
    } else {
        let mentions: Vec<String> = summary.entrants.iter().map(|e| e.to_string()).collect();
        embed = embed.field(
            format!("Participants ({})", summary.entrants.len()),
            mentions.join(", "),
            false,
        );
    }
    embed = embed.field("Round 1 Pairings", match_lines(&summary.round_one), false);

    announce(&ctx, &tournament.channel_id, CreateMessage::new().embed(embed)).await;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Tournament started! {} matches in Round 1.",
                summary.round_one.len()
            ))
            .ephemeral(true),
    )
    .await?;

    let matches_str = summary.round_one.len().to_string();
    let fields = vec![
        ("Tournament ID", tournament_id.as_str(), true),
        ("Name", tournament.name.as_str(), true),
        ("Round 1 matches", matches_str.as_str(), true),
    ];
    log::discord_log_info(ctx, "Tournament started", fields).await?;

    Ok(())
}

/// Report a match result and advance the bracket.
#[poise::command(slash_command, guild_only, check = "is_organizer_or_higher")]
#[instrument(skip(ctx))]
async fn tournament_report(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
    #[description = "Match number"] match_number: u32,
    #[description = "Winner: team name, mention, or user id"] winner: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let result = ctx
        .data()
        .store
        .with_tournament(guild_id.get(), &tournament_id, |tournament| {
            let tournament =
                tournament.ok_or_else(|| TournamentError::NotFound(tournament_id.clone()))?;
            tournament
                .report_match(match_number, &winner)
                .map(|outcome| (outcome, tournament.clone()))
        })
        .await?;

    let (outcome, tournament) = match result {
        Ok(pair) => pair,
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
            return Ok(());
        }
    };

    announce(
        &ctx,
        &tournament.channel_id,
        CreateMessage::new().content(format!(
            "📊 **Match #{} Result**\n{} vs {}\n**Winner:** {}",
            outcome.match_number, outcome.participant1, outcome.participant2, outcome.winner
        )),
    )
    .await;

    match &outcome.round_result {
        Some(RoundResult::NextRound { round, matches }) => {
            let embed = CreateEmbed::new()
                .title(format!("🏆 {} - Round {}", tournament.name, round))
                .description(match_lines(matches))
                .colour(Colour::BLUE);
            announce(&ctx, &tournament.channel_id, CreateMessage::new().embed(embed)).await;
        }
        Some(RoundResult::Champion(champion)) => {
            announce(
                &ctx,
                &tournament.channel_id,
                CreateMessage::new().content(format!(
                    "🎉 **TOURNAMENT COMPLETE!** 🎉\n\n**Champion:** {}\n**Tournament:** {}",
                    champion, tournament.name
                )),
            )
            .await;
        }
        None => {}
    }

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Match #{} result recorded! Winner: {}",
                outcome.match_number, outcome.winner
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Show the bracket for a tournament.
#[poise::command(slash_command, guild_only)]
async fn tournament_bracket(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let tournament = ctx
        .data()
        .store
        .get_tournament(guild_id.get(), &tournament_id)
        .await?;

    let Some(tournament) = tournament else {
        ctx.send(
            CreateReply::default()
                .content(TournamentError::NotFound(tournament_id).to_string())
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    if tournament.bracket.is_empty() {
        ctx.send(
            CreateReply::default()
                .content("This tournament hasn't started yet, so there is no bracket.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.send(CreateReply::default().embed(bracket_embed(&tournament)))
        .await?;

    Ok(())
}

/// Cancel a tournament. Terminal; signups and reporting stop.
#[poise::command(slash_command, guild_only, check = "is_admin_or_owner")]
#[instrument(skip(ctx))]
async fn tournament_cancel(
    ctx: BotContext<'_>,
    #[description = "Tournament ID"] tournament_id: String,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(NotInAGuild)?;

    let result = ctx
        .data()
        .store
        .with_tournament(guild_id.get(), &tournament_id, |tournament| {
            let tournament =
                tournament.ok_or_else(|| TournamentError::NotFound(tournament_id.clone()))?;
            tournament.cancel().map(|()| tournament.clone())
        })
        .await?;

    match result {
        Ok(tournament) => {
            announce(
                &ctx,
                &tournament.channel_id,
                CreateMessage::new().content(format!(
                    "Tournament **{}** has been cancelled.",
                    tournament.name
                )),
            )
            .await;
            ctx.send(
                CreateReply::default()
                    .content(format!("Cancelled tournament {}.", tournament_id))
                    .ephemeral(true),
            )
            .await?;

            let fields = vec![
                ("Tournament ID", tournament_id.as_str(), true),
                ("Name", tournament.name.as_str(), true),
                ("Cancelled by", ctx.author().name.as_str(), true),
            ];
            log::discord_log_info(ctx, "Tournament cancelled", fields).await?;
        }
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
        }
    }

    Ok(())
}

/// Sends an announcement to a tournament's channel; failures are logged and
/// reported as false, never raised.
async fn announce(ctx: &BotContext<'_>, channel_id: &str, message: CreateMessage) -> bool {
    let channel = match ChannelId::from_str(channel_id) {
        Ok(channel) => channel,
        Err(_) => {
            warn!(channel_id, "bad announcement channel id");
            return false;
        }
    };
    match channel.send_message(ctx.http(), message).await {
        Ok(_) => true,
        Err(e) => {
            warn!(channel_id, "announcement failed: {e}");
            false
        }
    }
}

fn match_lines(matches: &[Match]) -> String {
    matches
        .iter()
        .map(|m| {
            if m.is_bye() {
                return format!(
                    "✅ Match #{}: {} advances (bye)",
                    m.match_number, m.participant1
                );
            }
            let status = if m.completed { "✅" } else { "⏳" };
            let winner = m
                .winner
                .as_ref()
                .map(|w| format!(" → **{} wins!**", w))
                .unwrap_or_default();
            format!(
                "{} Match #{}: {} vs {}{}",
                status, m.match_number, m.participant1, m.participant2, winner
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn teams_text(teams: &BTreeMap<String, Team>) -> String {
    if teams.is_empty() {
        return "No teams".to_string();
    }
    teams
        .iter()
        .map(|(name, team)| {
            let mentions: Vec<String> =
                team.members.iter().map(|id| format!("<@{}>", id)).collect();
            format!("**{}:** {}", name, mentions.join(", "))
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn bracket_embed(tournament: &Tournament) -> CreateEmbed {
    let mut rounds: BTreeMap<u32, Vec<Match>> = BTreeMap::new();
    for m in &tournament.bracket {
        rounds.entry(m.round).or_default().push(m.clone());
    }
    let last_round = rounds.keys().max().copied().unwrap_or(1);

    let mut embed = CreateEmbed::new()
        .title(format!("🏆 {} - Bracket", tournament.name))
        .description(format!("**Game:** {}", tournament.game))
        .colour(Colour::BLUE);
    for (round, matches) in &rounds {
        let label = if *round == last_round && matches.len() == 1 {
            "🏆 Finals".to_string()
        } else {
            format!("Round {}", round)
        };
        embed = embed.field(label, match_lines(matches), false);
    }
    embed
}
