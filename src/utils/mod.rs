/// Shared error variants reported by commands.
pub mod error;
/// Parsing for human duration strings like `30m` or `2d`.
pub mod duration;
/// Mention and raw-id parsing helpers.
pub mod mention;
