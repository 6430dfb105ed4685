#[derive(Debug)]
pub enum CommonError {
    NotInAGuild,
    NotAuthorized,
    InvalidDuration(String),
    InvalidWinnersCount(String),
    InvalidTeamSize(String),
}

impl std::fmt::Display for CommonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CommonError::*;
        match self {
            NotInAGuild => write!(f, "You are not in a guild."),
            NotAuthorized => write!(f, "You don't have permission to do that."),
            InvalidDuration(s) => write!(
                f,
                "Invalid duration `{}`. Use formats like `30m`, `2h`, `1d`, `1w`.",
                s
            ),
            InvalidWinnersCount(s) => {
                write!(f, "Winners count `{}` must be a number between 1 and 20.", s)
            }
            InvalidTeamSize(s) => {
                write!(f, "Team size `{}` must be a number between 2 and 10.", s)
            }
        }
    }
}

impl std::error::Error for CommonError {}
