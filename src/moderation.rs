//! Warning-flag and alt-link bookkeeping.
//!
//! Pure logic only; persistence lives in the store and Discord delivery in
//! the command layer.

use std::collections::BTreeMap;

use crate::store::models::{AltLink, AutoFlagSettings, Flag, FlagPriority};

/// Per-user rollup of active flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSummary {
    pub user_id: String,
    pub flag_count: usize,
    pub highest_priority: FlagPriority,
}

/// Rolls a flag list up into one summary per user, worst flags first.
pub fn summarize_flags(flags: &[Flag]) -> Vec<FlagSummary> {
    let mut by_user: BTreeMap<&str, FlagSummary> = BTreeMap::new();
    for flag in flags {
        let entry = by_user
            .entry(flag.user_id.as_str())
            .or_insert_with(|| FlagSummary {
                user_id: flag.user_id.clone(),
                flag_count: 0,
                highest_priority: FlagPriority::Manual,
            });
        entry.flag_count += 1;
        if flag.priority.rank() < entry.highest_priority.rank() {
            entry.highest_priority = flag.priority;
        }
    }
    let mut summaries: Vec<FlagSummary> = by_user.into_values().collect();
    summaries.sort_by_key(|s| (s.highest_priority.rank(), usize::MAX - s.flag_count));
    summaries
}

/// Classifies an account's age against the guild's auto-flag thresholds.
///
/// Returns `None` when the account is old enough to pass unflagged.
pub fn classify_account_age(
    account_created_at: i64,
    now: i64,
    settings: &AutoFlagSettings,
) -> Option<FlagPriority> {
    let age_seconds = now.saturating_sub(account_created_at);
    if age_seconds < settings.critical_hours * 3_600 {
        Some(FlagPriority::Critical)
    } else if age_seconds < settings.high_days * 86_400 {
        Some(FlagPriority::High)
    } else if age_seconds < settings.medium_days * 86_400 {
        Some(FlagPriority::Medium)
    } else {
        None
    }
}

/// The configured flag lifetime for a priority, in days.
pub fn expiry_days_for(priority: FlagPriority, settings: &AutoFlagSettings) -> i64 {
    match priority {
        FlagPriority::Critical => settings.critical_expiry_days,
        FlagPriority::High => settings.high_expiry_days,
        FlagPriority::Medium => settings.medium_expiry_days,
        FlagPriority::Manual => settings.manual_expiry_days,
    }
}

/// Human-readable account age for flag reasons and notifications.
pub fn describe_account_age(account_created_at: i64, now: i64) -> String {
    let age_seconds = now.saturating_sub(account_created_at).max(0);
    if age_seconds < 86_400 {
        format!("{} hour(s)", age_seconds / 3_600)
    } else {
        format!("{} day(s)", age_seconds / 86_400)
    }
}

/// Links two users bidirectionally. Returns false when the pair was already
/// linked (in which case nothing changes).
pub fn link_alts(
    alts: &mut BTreeMap<String, Vec<AltLink>>,
    user_a: &str,
    user_b: &str,
    reason: Option<String>,
    linked_by: &str,
    now: i64,
) -> bool {
    if is_linked(alts, user_a, user_b) {
        return false;
    }
    for (from, to) in [(user_a, user_b), (user_b, user_a)] {
        alts.entry(from.to_string()).or_default().push(AltLink {
            other_id: to.to_string(),
            reason: reason.clone(),
            linked_by: linked_by.to_string(),
            linked_at: now,
        });
    }
    true
}

/// Removes both directions of a link. Returns false when none existed.
pub fn unlink_alts(
    alts: &mut BTreeMap<String, Vec<AltLink>>,
    user_a: &str,
    user_b: &str,
) -> bool {
    if !is_linked(alts, user_a, user_b) {
        return false;
    }
    for (from, to) in [(user_a, user_b), (user_b, user_a)] {
        if let Some(links) = alts.get_mut(from) {
            links.retain(|l| l.other_id != to);
            if links.is_empty() {
                alts.remove(from);
            }
        }
    }
    true
}

pub fn is_linked(alts: &BTreeMap<String, Vec<AltLink>>, user_a: &str, user_b: &str) -> bool {
    alts.get(user_a)
        .map(|links| links.iter().any(|l| l.other_id == user_b))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600;
    const DAY: i64 = 86_400;

    #[test]
    fn account_age_tiers() {
        let settings = AutoFlagSettings::default();
        let now = 1_000_000 * DAY;

        assert_eq!(
            classify_account_age(now - 2 * HOUR, now, &settings),
            Some(FlagPriority::Critical)
        );
        assert_eq!(
            classify_account_age(now - 3 * DAY, now, &settings),
            Some(FlagPriority::High)
        );
        assert_eq!(
            classify_account_age(now - 20 * DAY, now, &settings),
            Some(FlagPriority::Medium)
        );
        assert_eq!(classify_account_age(now - 31 * DAY, now, &settings), None);

        // Boundary: exactly at the threshold is not "younger than".
        assert_eq!(
            classify_account_age(now - 24 * HOUR, now, &settings),
            Some(FlagPriority::High)
        );
        assert_eq!(
            classify_account_age(now - 30 * DAY, now, &settings),
            None
        );
    }

    #[test]
    fn expiry_follows_priority() {
        let settings = AutoFlagSettings::default();
        assert_eq!(expiry_days_for(FlagPriority::Critical, &settings), 14);
        assert_eq!(expiry_days_for(FlagPriority::High, &settings), 7);
        assert_eq!(expiry_days_for(FlagPriority::Medium, &settings), 3);
        assert_eq!(expiry_days_for(FlagPriority::Manual, &settings), 30);
    }

    #[test]
    fn alt_links_are_bidirectional() {
        let mut alts = BTreeMap::new();
        assert!(link_alts(&mut alts, "1", "2", None, "mod", 0));
        assert!(is_linked(&alts, "1", "2"));
        assert!(is_linked(&alts, "2", "1"));

        // Linking again is a no-op.
        assert!(!link_alts(&mut alts, "2", "1", None, "mod", 5));
        assert_eq!(alts.get("1").unwrap().len(), 1);

        assert!(unlink_alts(&mut alts, "1", "2"));
        assert!(alts.is_empty());
        assert!(!unlink_alts(&mut alts, "1", "2"));
    }

    #[test]
    fn flag_summaries_track_worst_priority() {
        let flag = |user: &str, priority| Flag {
            id: 0,
            user_id: user.to_string(),
            moderator_id: "m".to_string(),
            reason: String::new(),
            created_at: 0,
            expires_at: 100,
            priority,
        };
        let flags = vec![
            flag("1", FlagPriority::Manual),
            flag("1", FlagPriority::High),
            flag("2", FlagPriority::Medium),
        ];
        let summaries = summarize_flags(&flags);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].user_id, "1");
        assert_eq!(summaries[0].flag_count, 2);
        assert_eq!(summaries[0].highest_priority, FlagPriority::High);
    }
}
