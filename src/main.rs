use std::fs::File;

use tracing::{error, info, info_span, level_filters::LevelFilter};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use poise::{serenity_prelude as serenity, CreateReply};

use commands::{
    giveaway_commands::GiveawayCommands, manager_commands::ManagerCommands,
    moderation_commands::ModerationCommands, tournament_commands::TournamentCommands,
    CommandsContainer,
};
use store::JsonStore;

/// Single-elimination bracket engine.
mod bracket;
/// All the commands that the bot can run, grouped by permission level.
mod commands;
/// Weighted giveaway draw engine.
mod draw;
/// Gateway event hooks (auto-flagging, alt notifications).
mod events;
/// Contains functions for logging.
mod log;
/// Flag and alt-link bookkeeping.
mod moderation;
/// The notification seam between the engines and Discord.
mod notifier;
/// Background sweeper for due giveaways and expired flags.
mod poller;
/// Traits and types used for interacting with the guild store.
mod store;
mod utils;

/// Stores data used by the bot.
///
/// Accessible by all bot commands through Context.
#[derive(Debug, Clone)]
pub struct Data<S> {
    store: S,
}

/// Convenience type for the bot's data with generics filled in.
pub type BotData = Data<JsonStore>;

/// A thread-safe Error type used by the bot.
pub type BotError = anyhow::Error;

/// A context that gives the bot information about the action that invoked it.
///
/// It also includes other useful data such as the guild store. You can access
/// the data in commands by using ``ctx.data()``.
pub type BotContext<'a> = poise::Context<'a, BotData, BotError>;

#[tokio::main]
async fn main() {
    if let Err(e) = setup_tracing() {
        panic!("Error trying to setup tracing: {}", e);
    }

    if let Err(e) = run().await {
        panic!("Error trying to run the bot: {}", e);
    }
}

/// The main function that runs the bot.
async fn run() -> Result<(), BotError> {
    let setup_span = info_span!("bot_setup");
    let _guard = setup_span.enter();
    // Load the .env file only in the development environment (bypassed with the --release flag)
    #[cfg(debug_assertions)]
    dotenv::dotenv().ok();

    let discord_token =
        std::env::var("DISCORD_TOKEN").expect("Expected DISCORD_TOKEN as an environment variable");
    info!("Successfully loaded Discord Token");

    let data_dir =
        std::env::var("SHADY_DATA_DIR").unwrap_or_else(|_| "data/guilds".to_string());
    let store = JsonStore::open(data_dir)?;

    let commands: Vec<_> = vec![
        ManagerCommands::get_all(),
        TournamentCommands::get_all(),
        GiveawayCommands::get_all(),
        ModerationCommands::get_all(),
    ]
    .into_iter()
    .flatten()
    .collect();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            on_error: |error| {
                Box::pin(async move {
                    let error_msg;
                    match error {
                        poise::FrameworkError::NotAnOwner { .. } => return,
                        poise::FrameworkError::GuildOnly { .. } => return,
                        poise::FrameworkError::DmOnly { .. } => return,
                        poise::FrameworkError::UnknownCommand { .. } => return,
                        poise::FrameworkError::CommandCheckFailed { ref error, .. } => match error
                        {
                            Some(error) => error_msg = format!("{}", error),
                            None => return,
                        },
                        poise::FrameworkError::Setup { ref error, .. } => {
                            error_msg = format!("{}", error)
                        }
                        poise::FrameworkError::EventHandler { ref error, .. } => {
                            error_msg = format!("{}", error)
                        }
                        poise::FrameworkError::Command { ref error, .. } => {
                            error_msg = format!("{}", error)
                        }
                        poise::FrameworkError::ArgumentParse { ref error, .. } => {
                            error_msg = format!("{}", error)
                        }
                        _ => error_msg = "No cause available for this error type.".to_string(),
                    }
                    error!("Error in command: {:?}", error);

                    let ctx = match error.ctx() {
                        Some(ctx) => ctx,
                        None => return,
                    };
                    if let Err(e) = ctx
                        .send(
                            CreateReply::default()
                                .content(error_msg.clone())
                                .ephemeral(true),
                        )
                        .await
                    {
                        error!("Error sending error message to user: {}", e);
                    }

                    let user_field = format!("<@{}>", ctx.author().id);
                    let fields = vec![
                        ("Cause", error_msg.as_str(), false),
                        ("User", user_field.as_str(), false),
                    ];
                    log::discord_log_error(ctx, "Command error", fields)
                        .await
                        .unwrap_or_else(|e| {
                            error!("Error sending error message to log channel: {:?}", e)
                        });
                })
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Ready as {}", ready.user.name);

                // Background sweeper: ends due giveaways and prunes expired
                // flags on a fixed interval.
                tokio::spawn(poller::run_sweeper(
                    ctx.http.clone(),
                    ctx.shard.clone(),
                    store.clone(),
                ));

                Ok(Data { store })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(discord_token, intents)
        .framework(framework)
        .await?;

    client.start().await?;

    Ok(())
}

/// Handler for non-command gateway events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, BotError>,
    data: &BotData,
) -> Result<(), BotError> {
    match event {
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = events::handle_member_join(ctx, data, new_member).await {
                error!("Error handling member join: {:?}", e);
            }
        }
        serenity::FullEvent::GuildMemberRemoval {
            guild_id, user, ..
        } => {
            if let Err(e) = events::handle_member_remove(ctx, data, *guild_id, user).await {
                error!("Error handling member removal: {:?}", e);
            }
        }
        _ => {}
    }

    Ok(())
}

/// Sets up the tracing subscriber for the bot.
fn setup_tracing() -> Result<(), BotError> {
    if cfg!(debug_assertions) {
        let filter = EnvFilter::from_default_env()
            .add_directive("none".parse()?)
            .add_directive("shady_bot=info".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::NONE)
            .pretty()
            .init();

        return Ok(());
    }

    let log_file = File::create("debug.log")?;

    // Only errors are logged in production
    tracing_subscriber::fmt::fmt()
        .with_span_events(FmtSpan::NONE)
        .with_max_level(LevelFilter::ERROR)
        .with_writer(log_file)
        .pretty()
        .init();

    Ok(())
}
