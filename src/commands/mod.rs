pub mod checks;
pub mod giveaway_commands;
pub mod manager_commands;
pub mod moderation_commands;
pub mod tournament_commands;

/// A way to group commands together.
///
/// Implementors return their command list from their own module, typically
/// grouped by the permission level the commands require. The commands
/// themselves stay private; only the container is `pub`.
pub trait CommandsContainer {
    type Data;
    type Error;

    fn get_all() -> Vec<poise::Command<Self::Data, Self::Error>>;
}
