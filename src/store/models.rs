use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use strum::Display;

/// The authorization policy for a guild.
///
/// Injected into command checks as a plain value; nothing reads role lists
/// from disk at call time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthorizationPolicy {
    #[serde(default)]
    pub authorized_role_ids: Vec<String>,
}

impl AuthorizationPolicy {
    /// Whether any of the given role ids is authorized.
    pub fn permits<I, S>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles
            .into_iter()
            .any(|role| self.authorized_role_ids.iter().any(|id| id == role.as_ref()))
    }
}

/// Account-age auto-flagging settings for a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoFlagSettings {
    pub enabled: bool,
    /// Accounts younger than this many hours are flagged as critical.
    pub critical_hours: i64,
    /// Accounts younger than this many days are flagged as high priority.
    pub high_days: i64,
    /// Accounts younger than this many days are flagged as medium priority.
    pub medium_days: i64,
    pub critical_expiry_days: i64,
    pub high_expiry_days: i64,
    pub medium_expiry_days: i64,
    /// Default expiry for manually added flags.
    pub manual_expiry_days: i64,
}

impl Default for AutoFlagSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_hours: 24,
            high_days: 7,
            medium_days: 30,
            critical_expiry_days: 14,
            high_expiry_days: 7,
            medium_expiry_days: 3,
            manual_expiry_days: 30,
        }
    }
}

/// The configuration for a guild within the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildConfig {
    pub log_channel_id: Option<String>,
    pub mod_log_channel_id: Option<String>,
    /// Role granting a +1 giveaway entry bonus when the giveaway opts in.
    pub nitro_role_id: Option<String>,
    #[serde(default)]
    pub policy: AuthorizationPolicy,
    #[serde(default)]
    pub auto_flag: AutoFlagSettings,
    #[serde(default = "default_true")]
    pub alt_join_notify: bool,
    #[serde(default = "default_true")]
    pub alt_leave_notify: bool,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            log_channel_id: None,
            mod_log_channel_id: None,
            nitro_role_id: None,
            policy: AuthorizationPolicy::default(),
            auto_flag: AutoFlagSettings::default(),
            alt_join_notify: true,
            alt_leave_notify: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Generates the opaque id used for tournaments and giveaways.
pub fn entity_id(guild_id: u64, created_at: i64) -> String {
    format!("{}_{}", guild_id, created_at)
}

/// The status of a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    #[strum(to_string = "Open for signups")]
    #[default]
    Open,
    #[strum(to_string = "In progress")]
    Started,
    #[strum(to_string = "Complete")]
    Complete,
    #[strum(to_string = "Cancelled")]
    Cancelled,
}

/// How teams are formed for a team tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TeamMode {
    #[strum(to_string = "Random")]
    Random,
    #[strum(to_string = "Premade")]
    Premade,
}

/// Whether entrants compete individually or as teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TournamentKind {
    Solo,
    Team { team_size: usize, team_mode: TeamMode },
}

impl TournamentKind {
    pub fn is_team(&self) -> bool {
        matches!(self, TournamentKind::Team { .. })
    }
}

/// A registered team and its roster.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Team {
    pub members: Vec<String>,
    pub captain: Option<String>,
}

/// One slot of a bracket match: a player, a team, or the automatic-win
/// placeholder used when an odd number of entrants need pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Entrant {
    Player(String),
    Team(String),
    Bye,
}

impl std::fmt::Display for Entrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entrant::Player(id) => write!(f, "<@{}>", id),
            Entrant::Team(name) => write!(f, "{}", name),
            Entrant::Bye => write!(f, "BYE"),
        }
    }
}

/// A single-elimination bracket match.
///
/// Match numbers are assigned once, strictly increasing across the whole
/// tournament, and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_number: u32,
    pub round: u32,
    pub participant1: Entrant,
    pub participant2: Entrant,
    pub winner: Option<Entrant>,
    pub completed: bool,
}

impl Match {
    pub fn is_bye(&self) -> bool {
        self.participant2 == Entrant::Bye
    }

    pub fn contains(&self, entrant: &Entrant) -> bool {
        self.participant1 == *entrant || self.participant2 == *entrant
    }
}

/// A tournament within the store.
///
/// The store key is the tournament's opaque id (see [`entity_id`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub name: String,
    pub game: String,
    pub host_id: String,
    pub channel_id: String,
    pub kind: TournamentKind,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub teams: BTreeMap<String, Team>,
    #[serde(default)]
    pub pickup_players: Vec<String>,
    #[serde(default)]
    pub status: TournamentStatus,
    #[serde(default)]
    pub bracket: Vec<Match>,
    pub created_at: i64,
}

impl Tournament {
    /// All matches belonging to the given round, in match-number order.
    pub fn round_matches(&self, round: u32) -> impl Iterator<Item = &Match> {
        self.bracket.iter().filter(move |m| m.round == round)
    }
}

/// The status of a giveaway.
///
/// `PickingWinners` doubles as the re-entry guard for the background
/// sweeper: the `Open -> PickingWinners` transition happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
pub enum GiveawayStatus {
    #[strum(to_string = "Open")]
    #[default]
    Open,
    #[strum(to_string = "Picking winners")]
    PickingWinners,
    #[strum(to_string = "Ended")]
    Ended,
    #[strum(to_string = "Cancelled")]
    Cancelled,
}

/// A giveaway within the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Giveaway {
    pub prize: String,
    pub description: Option<String>,
    pub host_id: String,
    pub channel_id: String,
    pub winners_count: usize,
    /// The payload delivered to winners who accept.
    pub prize_code: String,
    pub claim_timeout_seconds: u64,
    pub end_timestamp: i64,
    /// Member id -> entry weight. Weight is fixed at entry time.
    #[serde(default, deserialize_with = "entries_compat")]
    pub entries: BTreeMap<String, u32>,
    #[serde(default)]
    pub status: GiveawayStatus,
    /// Everyone ever drawn, in draw order. A drawn member is never redrawn,
    /// whatever the outcome of their claim prompt.
    #[serde(default)]
    pub winners_picked: Vec<String>,
    /// Subsequence of `winners_picked` that accepted.
    #[serde(default)]
    pub winners_claimed: Vec<String>,
    /// Minimum role to enter; any role at or above its position qualifies.
    pub required_role_id: Option<String>,
    /// Whether the guild's nitro role grants a bonus entry here.
    #[serde(default)]
    pub nitro_bonus: bool,
    /// Ad-hoc bonus role for this giveaway only.
    pub bonus_role_id: Option<String>,
    pub created_at: i64,
}

impl Giveaway {
    pub fn is_open(&self) -> bool {
        self.status == GiveawayStatus::Open
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == GiveawayStatus::Cancelled
    }
}

/// Accepts both the current id -> weight map and the legacy shape where
/// entries were a bare list of member ids (each becoming weight 1).
fn entries_compat<'de, D>(deserializer: D) -> Result<BTreeMap<String, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LegacyId {
        Num(u64),
        Str(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Weighted(BTreeMap<String, u32>),
        Legacy(Vec<LegacyId>),
    }

    Ok(match Shape::deserialize(deserializer)? {
        Shape::Weighted(map) => map,
        Shape::Legacy(ids) => ids
            .into_iter()
            .map(|id| {
                let id = match id {
                    LegacyId::Num(n) => n.to_string(),
                    LegacyId::Str(s) => s,
                };
                (id, 1)
            })
            .collect(),
    })
}

/// The priority of a warning flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FlagPriority {
    #[strum(to_string = "Critical")]
    Critical,
    #[strum(to_string = "High")]
    High,
    #[strum(to_string = "Medium")]
    Medium,
    #[strum(to_string = "Manual")]
    Manual,
}

impl FlagPriority {
    /// Lower rank sorts first when reporting a user's worst flag.
    pub fn rank(&self) -> u8 {
        match self {
            FlagPriority::Critical => 0,
            FlagPriority::High => 1,
            FlagPriority::Medium => 2,
            FlagPriority::Manual => 3,
        }
    }
}

/// A temporary warning flag on a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub id: u64,
    pub user_id: String,
    pub moderator_id: String,
    pub reason: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub priority: FlagPriority,
}

/// One direction of an alt-account link. The reverse direction is stored
/// under the other user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltLink {
    pub other_id: String,
    pub reason: Option<String>,
    pub linked_by: String,
    pub linked_at: i64,
}

fn default_next_flag_id() -> u64 {
    1
}

/// Everything persisted for one guild: one JSON document per guild id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildData {
    #[serde(default)]
    pub config: GuildConfig,
    #[serde(default)]
    pub tournaments: BTreeMap<String, Tournament>,
    #[serde(default)]
    pub giveaways: BTreeMap<String, Giveaway>,
    #[serde(default)]
    pub flags: Vec<Flag>,
    #[serde(default = "default_next_flag_id")]
    pub next_flag_id: u64,
    #[serde(default)]
    pub alts: BTreeMap<String, Vec<AltLink>>,
}

impl Default for GuildData {
    fn default() -> Self {
        Self {
            config: GuildConfig::default(),
            tournaments: BTreeMap::new(),
            giveaways: BTreeMap::new(),
            flags: Vec::new(),
            next_flag_id: 1,
            alts: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_entry_list_migrates_to_weight_one() {
        let json = r#"{
            "prize": "Nitro",
            "description": null,
            "host_id": "1",
            "channel_id": "2",
            "winners_count": 1,
            "prize_code": "abc",
            "claim_timeout_seconds": 3600,
            "end_timestamp": 0,
            "entries": [111, "222"],
            "required_role_id": null,
            "bonus_role_id": null,
            "created_at": 0
        }"#;
        let giveaway: Giveaway = serde_json::from_str(json).unwrap();
        assert_eq!(giveaway.entries.get("111"), Some(&1));
        assert_eq!(giveaway.entries.get("222"), Some(&1));
        assert_eq!(giveaway.entries.len(), 2);
    }

    #[test]
    fn weighted_entry_map_round_trips() {
        let json = r#"{
            "prize": "Key",
            "description": null,
            "host_id": "1",
            "channel_id": "2",
            "winners_count": 2,
            "prize_code": "xyz",
            "claim_timeout_seconds": 60,
            "end_timestamp": 0,
            "entries": {"111": 3, "222": 1},
            "required_role_id": null,
            "bonus_role_id": null,
            "created_at": 0
        }"#;
        let giveaway: Giveaway = serde_json::from_str(json).unwrap();
        assert_eq!(giveaway.entries.get("111"), Some(&3));

        let back = serde_json::to_string(&giveaway).unwrap();
        let again: Giveaway = serde_json::from_str(&back).unwrap();
        assert_eq!(again.entries, giveaway.entries);
    }

    #[test]
    fn policy_permits_any_listed_role() {
        let policy = AuthorizationPolicy {
            authorized_role_ids: vec!["10".to_string(), "20".to_string()],
        };
        assert!(policy.permits(["20"]));
        assert!(!policy.permits(["30"]));
        assert!(!AuthorizationPolicy::default().permits(["10"]));
    }
}
