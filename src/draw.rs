//! Weighted giveaway draw engine.
//!
//! Entry weights are fixed at entry time. Winner selection draws without
//! replacement from the weighted pool and retries on decline, timeout, or an
//! unresolvable winner until the winner target is met or the pool runs dry.
//! Every mutation goes through the store's read-modify-write, and a draw is
//! persisted before its claim prompt goes out, so a crash mid-notification
//! can never draw the same member twice.

use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::notifier::{ClaimResponse, Notifier};
use crate::store::models::{Giveaway, GiveawayStatus, GuildConfig};
use crate::store::GiveawayStore;
use crate::BotError;

/// Failures reported by giveaway operations. Nothing is persisted when one
/// is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiveawayError {
    NotFound(String),
    AlreadyEnded,
    Cancelled,
    AlreadyEntered,
    NotEntered,
    RoleRequirementNotMet,
    AlreadyPicking,
}

impl std::fmt::Display for GiveawayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use GiveawayError::*;
        match self {
            NotFound(id) => write!(f, "Giveaway {} does not exist.", id),
            AlreadyEnded => write!(f, "This giveaway has already ended."),
            Cancelled => write!(f, "This giveaway was cancelled."),
            AlreadyEntered => write!(f, "You've already entered this giveaway."),
            NotEntered => write!(f, "You haven't entered this giveaway."),
            RoleRequirementNotMet => {
                write!(f, "You don't have the required role to enter this giveaway.")
            }
            AlreadyPicking => write!(f, "Winners are already being picked for this giveaway."),
        }
    }
}

impl std::error::Error for GiveawayError {}

/// Base entry plus one bonus per qualifying role this giveaway opted into.
///
/// Computed once, when the member enters; later role changes don't touch the
/// stored weight.
pub fn calculate_entry_weight(
    member_roles: &[String],
    giveaway: &Giveaway,
    config: &GuildConfig,
) -> u32 {
    let has_role = |id: &String| member_roles.iter().any(|r| r == id);

    let mut weight = 1;
    if giveaway.nitro_bonus {
        if let Some(nitro) = &config.nitro_role_id {
            if has_role(nitro) {
                weight += 1;
            }
        }
    }
    if let Some(bonus) = &giveaway.bonus_role_id {
        if has_role(bonus) {
            weight += 1;
        }
    }
    weight
}

/// Role-hierarchy gate: with no requirement everyone passes; otherwise any
/// role at or above the required role's position qualifies, so a higher role
/// substitutes for the named one.
pub fn check_role_requirement(member_role_positions: &[i64], required_position: Option<i64>) -> bool {
    match required_position {
        None => true,
        Some(min) => member_role_positions.iter().any(|p| *p >= min),
    }
}

/// How an end transition left the giveaway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTransition {
    /// No entries; the giveaway went straight to ended.
    NoEntries,
    /// Entries exist; the giveaway is now picking winners.
    Picking,
}

/// Where a finished draw loop left the giveaway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Every winner slot was claimed.
    Complete { claimed: usize },
    /// Entries ran out first; terminal partial result.
    Exhausted { claimed: usize, target: usize },
    /// The giveaway was cancelled while picking.
    Cancelled,
}

impl Giveaway {
    /// Records an entry with its precomputed weight.
    pub fn enter(&mut self, user_id: &str, weight: u32) -> Result<usize, GiveawayError> {
        self.ensure_open()?;
        if self.entries.contains_key(user_id) {
            return Err(GiveawayError::AlreadyEntered);
        }
        self.entries.insert(user_id.to_string(), weight.max(1));
        Ok(self.entries.len())
    }

    /// Withdraws an entry entirely.
    pub fn leave(&mut self, user_id: &str) -> Result<usize, GiveawayError> {
        self.ensure_open()?;
        if self.entries.remove(user_id).is_none() {
            return Err(GiveawayError::NotEntered);
        }
        Ok(self.entries.len())
    }

    /// Cancels the giveaway. Winners already claimed keep their prize; no
    /// further draw happens.
    pub fn cancel(&mut self) -> Result<(), GiveawayError> {
        match self.status {
            GiveawayStatus::Open | GiveawayStatus::PickingWinners => {
                self.status = GiveawayStatus::Cancelled;
                Ok(())
            }
            GiveawayStatus::Ended => Err(GiveawayError::AlreadyEnded),
            GiveawayStatus::Cancelled => Err(GiveawayError::Cancelled),
        }
    }

    /// Entries that have never been drawn. A drawn member never re-enters
    /// the pool, whatever their claim outcome was.
    pub fn eligible_pool(&self) -> Vec<(String, u32)> {
        self.entries
            .iter()
            .filter(|(id, _)| !self.winners_picked.contains(*id))
            .map(|(id, weight)| (id.clone(), *weight))
            .collect()
    }

    fn ensure_open(&self) -> Result<(), GiveawayError> {
        match self.status {
            GiveawayStatus::Open => Ok(()),
            GiveawayStatus::Cancelled => Err(GiveawayError::Cancelled),
            _ => Err(GiveawayError::AlreadyEnded),
        }
    }
}

/// Transitions a giveaway out of `Open` when its deadline passes or it is
/// ended manually. The `Open -> PickingWinners` edge fires exactly once;
/// a second caller gets `AlreadyPicking`, which is the sweeper's re-entry
/// guard.
pub fn begin_end(giveaway: &mut Giveaway) -> Result<EndTransition, GiveawayError> {
    match giveaway.status {
        GiveawayStatus::Open => {}
        GiveawayStatus::PickingWinners => return Err(GiveawayError::AlreadyPicking),
        GiveawayStatus::Ended => return Err(GiveawayError::AlreadyEnded),
        GiveawayStatus::Cancelled => return Err(GiveawayError::Cancelled),
    }
    if giveaway.entries.is_empty() {
        giveaway.status = GiveawayStatus::Ended;
        Ok(EndTransition::NoEntries)
    } else {
        giveaway.status = GiveawayStatus::PickingWinners;
        Ok(EndTransition::Picking)
    }
}

/// Selects the next winner from a weighted pool.
pub trait EntryPicker {
    fn pick(&mut self, pool: &[(String, u32)]) -> Option<String>;
}

/// Uniform weighted selection: a weight-w entry is w times as likely as a
/// weight-1 entry.
pub struct WeightedPicker<R> {
    rng: R,
}

impl WeightedPicker<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for WeightedPicker<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> WeightedPicker<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> EntryPicker for WeightedPicker<R> {
    fn pick(&mut self, pool: &[(String, u32)]) -> Option<String> {
        let dist = WeightedIndex::new(pool.iter().map(|(_, weight)| *weight)).ok()?;
        Some(pool[dist.sample(&mut self.rng)].0.clone())
    }
}

enum Step {
    Cancelled,
    Satisfied { claimed: usize },
    Exhausted { claimed: usize, target: usize },
    Drawn { winner: String, number: usize, snapshot: Giveaway },
}

/// The core retry loop: draw, persist, prompt, and re-enter until the winner
/// target is met, entries run out, or the giveaway is cancelled.
///
/// Written as a loop so stack depth never depends on the entry pool.
pub async fn run_draw<S, N, P>(
    store: &S,
    notifier: &N,
    picker: &mut P,
    guild_id: u64,
    giveaway_id: &str,
) -> Result<DrawOutcome, BotError>
where
    S: GiveawayStore<Error = BotError>,
    N: Notifier,
    P: EntryPicker,
{
    loop {
        // One atomic read-modify-write covers the satisfaction check, pool
        // build, and draw, so the pick is durable before anyone is notified.
        let step = store
            .with_giveaway(guild_id, giveaway_id, |giveaway| {
                let giveaway =
                    giveaway.ok_or_else(|| GiveawayError::NotFound(giveaway_id.to_string()))?;
                if giveaway.is_cancelled() {
                    return Ok(Step::Cancelled);
                }
                if giveaway.winners_claimed.len() >= giveaway.winners_count {
                    giveaway.status = GiveawayStatus::Ended;
                    return Ok(Step::Satisfied {
                        claimed: giveaway.winners_claimed.len(),
                    });
                }
                let pool = giveaway.eligible_pool();
                match picker.pick(&pool) {
                    None => {
                        giveaway.status = GiveawayStatus::Ended;
                        Ok(Step::Exhausted {
                            claimed: giveaway.winners_claimed.len(),
                            target: giveaway.winners_count,
                        })
                    }
                    Some(winner) => {
                        giveaway.winners_picked.push(winner.clone());
                        Ok(Step::Drawn {
                            winner,
                            number: giveaway.winners_picked.len(),
                            snapshot: giveaway.clone(),
                        })
                    }
                }
            })
            .await?
            .map_err(BotError::from)?;

        let (winner, number, snapshot) = match step {
            Step::Cancelled => return Ok(DrawOutcome::Cancelled),
            Step::Satisfied { claimed } => return Ok(DrawOutcome::Complete { claimed }),
            Step::Exhausted { claimed, target } => {
                let remaining = target.saturating_sub(claimed);
                notifier
                    .broadcast(&format!(
                        "No more eligible entries for **{}**. Still need {} more winner(s) but no one is left to pick from.",
                        giveaway_name(store, guild_id, giveaway_id).await,
                        remaining
                    ))
                    .await;
                return Ok(DrawOutcome::Exhausted { claimed, target });
            }
            Step::Drawn {
                winner,
                number,
                snapshot,
            } => (winner, number, snapshot),
        };

        // An unresolvable winner (left the guild) stays picked and is never
        // retried; move straight on to the next draw.
        if !notifier.member_exists(&winner).await {
            warn!(%winner, giveaway_id, "drawn winner not resolvable, rerolling");
            continue;
        }

        let timeout = Duration::from_secs(snapshot.claim_timeout_seconds);
        let response = match notifier.prompt_claim(&winner, &snapshot, number, timeout).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%winner, giveaway_id, "claim prompt undeliverable: {e:#}");
                notifier
                    .broadcast(&format!(
                        "Couldn't reach <@{}> for **{}**. Picking a new winner...",
                        winner, snapshot.prize
                    ))
                    .await;
                continue;
            }
        };

        // The response is recorded even if the giveaway was cancelled during
        // the wait; the next loop iteration stops before any further draw.
        match response {
            ClaimResponse::Accepted => {
                let claimed_total = store
                    .with_giveaway(guild_id, giveaway_id, |giveaway| {
                        let giveaway = giveaway
                            .ok_or_else(|| GiveawayError::NotFound(giveaway_id.to_string()))?;
                        if !giveaway.winners_claimed.contains(&winner) {
                            giveaway.winners_claimed.push(winner.clone());
                        }
                        Ok::<_, GiveawayError>(giveaway.winners_claimed.len())
                    })
                    .await?
                    .map_err(BotError::from)?;

                if !notifier.deliver_prize(&winner, &snapshot).await {
                    warn!(%winner, giveaway_id, "prize delivery failed");
                }
                let message = if snapshot.winners_count > 1 {
                    format!(
                        "🎉 Congratulations <@{}> for claiming prize #{} of {} for **{}**!",
                        winner, claimed_total, snapshot.winners_count, snapshot.prize
                    )
                } else {
                    format!(
                        "🎉 Congratulations <@{}> for winning **{}**!",
                        winner, snapshot.prize
                    )
                };
                notifier.broadcast(&message).await;
            }
            ClaimResponse::Declined => {
                notifier
                    .broadcast(&format!(
                        "<@{}> declined **{}**. Picking a new winner...",
                        winner, snapshot.prize
                    ))
                    .await;
            }
            ClaimResponse::TimedOut => {
                notifier
                    .broadcast(&format!(
                        "⏰ <@{}> didn't claim **{}** in time. Picking a new winner...",
                        winner, snapshot.prize
                    ))
                    .await;
            }
        }
    }
}

async fn giveaway_name<S>(store: &S, guild_id: u64, giveaway_id: &str) -> String
where
    S: GiveawayStore<Error = BotError>,
{
    store
        .get_giveaway(guild_id, giveaway_id)
        .await
        .ok()
        .flatten()
        .map(|g| g.prize)
        .unwrap_or_else(|| giveaway_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonStore, GiveawayStore};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn giveaway(winners_count: usize, entries: &[(&str, u32)]) -> Giveaway {
        Giveaway {
            prize: "Nitro".to_string(),
            description: None,
            host_id: "h".to_string(),
            channel_id: "c".to_string(),
            winners_count,
            prize_code: "CODE".to_string(),
            claim_timeout_seconds: 60,
            end_timestamp: 100,
            entries: entries
                .iter()
                .map(|(id, w)| (id.to_string(), *w))
                .collect(),
            status: GiveawayStatus::Open,
            winners_picked: Vec::new(),
            winners_claimed: Vec::new(),
            required_role_id: None,
            nitro_bonus: false,
            bonus_role_id: None,
            created_at: 0,
        }
    }

    /// Picker that replays a script, asserting each scripted id is still in
    /// the eligible pool when drawn.
    struct ScriptPicker {
        script: VecDeque<&'static str>,
    }

    impl ScriptPicker {
        fn new(script: &[&'static str]) -> Self {
            Self {
                script: script.iter().copied().collect(),
            }
        }
    }

    impl EntryPicker for ScriptPicker {
        fn pick(&mut self, pool: &[(String, u32)]) -> Option<String> {
            if pool.is_empty() {
                return None;
            }
            let next = self.script.pop_front().expect("script ran dry");
            assert!(
                pool.iter().any(|(id, _)| id == next),
                "scripted winner {} not in pool {:?}",
                next,
                pool
            );
            Some(next.to_string())
        }
    }

    #[derive(Default)]
    struct ScriptNotifier {
        responses: Mutex<VecDeque<ClaimResponse>>,
        missing_members: Vec<String>,
        broadcasts: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
        delivered: Mutex<Vec<String>>,
        cancel_before_response: Mutex<Option<(JsonStore, u64, String)>>,
    }

    impl ScriptNotifier {
        fn with_responses(responses: &[ClaimResponse]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().cloned().collect()),
                ..Default::default()
            }
        }
    }

    impl Notifier for ScriptNotifier {
        async fn broadcast(&self, message: &str) -> bool {
            self.broadcasts.lock().unwrap().push(message.to_string());
            true
        }

        async fn member_exists(&self, user_id: &str) -> bool {
            !self.missing_members.iter().any(|m| m == user_id)
        }

        async fn prompt_claim(
            &self,
            user_id: &str,
            _giveaway: &Giveaway,
            _winner_number: usize,
            _timeout: Duration,
        ) -> Result<ClaimResponse, BotError> {
            self.prompts.lock().unwrap().push(user_id.to_string());
            let cancel = self.cancel_before_response.lock().unwrap().take();
            if let Some((store, guild_id, id)) = cancel {
                store
                    .with_giveaway(guild_id, &id, |g| g.unwrap().cancel())
                    .await
                    .unwrap()
                    .unwrap();
            }
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left");
            Ok(response)
        }

        async fn deliver_prize(&self, user_id: &str, _giveaway: &Giveaway) -> bool {
            self.delivered.lock().unwrap().push(user_id.to_string());
            true
        }
    }

    async fn seeded_store(giveaway: Giveaway) -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store
            .insert_giveaway(1, "1_1".to_string(), giveaway)
            .await
            .unwrap();
        (dir, store)
    }

    async fn end_and_pick(store: &JsonStore) {
        store
            .with_giveaway(1, "1_1", |g| begin_end(g.unwrap()))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn declined_winner_is_never_redrawn() {
        // Scenario: C (weight 3) declines, then A accepts; C must leave the
        // pool for good and only A claims.
        let (_dir, store) =
            seeded_store(giveaway(1, &[("A", 1), ("B", 1), ("C", 3)])).await;
        end_and_pick(&store).await;

        let notifier =
            ScriptNotifier::with_responses(&[ClaimResponse::Declined, ClaimResponse::Accepted]);
        let mut picker = ScriptPicker::new(&["C", "A"]);

        let outcome = run_draw(&store, &notifier, &mut picker, 1, "1_1")
            .await
            .unwrap();
        assert_eq!(outcome, DrawOutcome::Complete { claimed: 1 });

        let g = store.get_giveaway(1, "1_1").await.unwrap().unwrap();
        assert_eq!(g.winners_picked, vec!["C".to_string(), "A".to_string()]);
        assert_eq!(g.winners_claimed, vec!["A".to_string()]);
        assert_eq!(g.status, GiveawayStatus::Ended);
        assert_eq!(notifier.delivered.lock().unwrap().as_slice(), ["A"]);
    }

    #[tokio::test]
    async fn exhausted_pool_ends_with_partial_result() {
        // Two winner slots, one entry: after A claims, the second draw finds
        // an empty pool and terminates with a partial outcome.
        let (_dir, store) = seeded_store(giveaway(2, &[("A", 1)])).await;
        end_and_pick(&store).await;

        let notifier = ScriptNotifier::with_responses(&[ClaimResponse::Accepted]);
        let mut picker = ScriptPicker::new(&["A"]);

        let outcome = run_draw(&store, &notifier, &mut picker, 1, "1_1")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DrawOutcome::Exhausted {
                claimed: 1,
                target: 2
            }
        );

        let g = store.get_giveaway(1, "1_1").await.unwrap().unwrap();
        assert_eq!(g.status, GiveawayStatus::Ended);
        assert_eq!(g.winners_claimed, vec!["A".to_string()]);
        assert!(notifier
            .broadcasts
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("No more eligible entries")));
    }

    #[tokio::test]
    async fn no_member_is_ever_drawn_twice() {
        let (_dir, store) = seeded_store(giveaway(3, &[("A", 2), ("B", 1)])).await;
        end_and_pick(&store).await;

        let notifier =
            ScriptNotifier::with_responses(&[ClaimResponse::Declined, ClaimResponse::TimedOut]);
        let mut picker = ScriptPicker::new(&["A", "B"]);

        let outcome = run_draw(&store, &notifier, &mut picker, 1, "1_1")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DrawOutcome::Exhausted {
                claimed: 0,
                target: 3
            }
        );

        let g = store.get_giveaway(1, "1_1").await.unwrap().unwrap();
        assert_eq!(g.winners_picked, vec!["A".to_string(), "B".to_string()]);
        assert!(g.winners_claimed.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_winner_is_skipped_without_a_prompt() {
        let (_dir, store) = seeded_store(giveaway(1, &[("gone", 5), ("B", 1)])).await;
        end_and_pick(&store).await;

        let mut notifier = ScriptNotifier::with_responses(&[ClaimResponse::Accepted]);
        notifier.missing_members = vec!["gone".to_string()];
        let mut picker = ScriptPicker::new(&["gone", "B"]);

        let outcome = run_draw(&store, &notifier, &mut picker, 1, "1_1")
            .await
            .unwrap();
        assert_eq!(outcome, DrawOutcome::Complete { claimed: 1 });
        assert_eq!(notifier.prompts.lock().unwrap().as_slice(), ["B"]);

        let g = store.get_giveaway(1, "1_1").await.unwrap().unwrap();
        assert_eq!(g.winners_picked, vec!["gone".to_string(), "B".to_string()]);
        assert_eq!(g.winners_claimed, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn acceptance_during_cancellation_is_recorded_but_stops_the_draw() {
        let (_dir, store) = seeded_store(giveaway(2, &[("A", 1), ("B", 1)])).await;
        end_and_pick(&store).await;

        let notifier = ScriptNotifier::with_responses(&[ClaimResponse::Accepted]);
        *notifier.cancel_before_response.lock().unwrap() =
            Some((store.clone(), 1, "1_1".to_string()));
        let mut picker = ScriptPicker::new(&["A"]);

        let outcome = run_draw(&store, &notifier, &mut picker, 1, "1_1")
            .await
            .unwrap();
        assert_eq!(outcome, DrawOutcome::Cancelled);

        let g = store.get_giveaway(1, "1_1").await.unwrap().unwrap();
        assert_eq!(g.status, GiveawayStatus::Cancelled);
        assert_eq!(g.winners_claimed, vec!["A".to_string()]);
        assert_eq!(g.winners_picked, vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn cancelled_giveaway_draws_nothing() {
        let mut g = giveaway(1, &[("A", 1)]);
        g.status = GiveawayStatus::Cancelled;
        let (_dir, store) = seeded_store(g).await;

        let notifier = ScriptNotifier::default();
        let mut picker = ScriptPicker::new(&[]);
        let outcome = run_draw(&store, &notifier, &mut picker, 1, "1_1")
            .await
            .unwrap();
        assert_eq!(outcome, DrawOutcome::Cancelled);
        assert!(notifier.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn end_transition_fires_exactly_once() {
        let mut g = giveaway(1, &[("A", 1)]);
        assert_eq!(begin_end(&mut g), Ok(EndTransition::Picking));
        assert_eq!(begin_end(&mut g), Err(GiveawayError::AlreadyPicking));

        let mut empty = giveaway(1, &[]);
        assert_eq!(begin_end(&mut empty), Ok(EndTransition::NoEntries));
        assert_eq!(empty.status, GiveawayStatus::Ended);
        assert_eq!(begin_end(&mut empty), Err(GiveawayError::AlreadyEnded));
    }

    #[test]
    fn entry_guards() {
        let mut g = giveaway(1, &[]);
        assert_eq!(g.enter("A", 2), Ok(1));
        assert_eq!(g.enter("A", 1), Err(GiveawayError::AlreadyEntered));
        assert_eq!(g.leave("B"), Err(GiveawayError::NotEntered));
        assert_eq!(g.leave("A"), Ok(0));

        g.enter("A", 1).unwrap();
        begin_end(&mut g).unwrap();
        assert_eq!(g.enter("B", 1), Err(GiveawayError::AlreadyEnded));
        assert_eq!(g.leave("A"), Err(GiveawayError::AlreadyEnded));

        let mut cancelled = giveaway(1, &[]);
        cancelled.cancel().unwrap();
        assert_eq!(cancelled.enter("A", 1), Err(GiveawayError::Cancelled));
    }

    #[test]
    fn entry_weight_counts_opted_in_bonus_roles() {
        let mut g = giveaway(1, &[]);
        let mut config = GuildConfig::default();
        config.nitro_role_id = Some("nitro".to_string());

        let roles = vec!["nitro".to_string(), "special".to_string()];
        assert_eq!(calculate_entry_weight(&roles, &g, &config), 1);

        g.nitro_bonus = true;
        assert_eq!(calculate_entry_weight(&roles, &g, &config), 2);

        g.bonus_role_id = Some("special".to_string());
        assert_eq!(calculate_entry_weight(&roles, &g, &config), 3);
        assert_eq!(calculate_entry_weight(&[], &g, &config), 1);
    }

    #[test]
    fn role_requirement_accepts_higher_roles() {
        assert!(check_role_requirement(&[], None));
        assert!(check_role_requirement(&[5], Some(3)));
        assert!(check_role_requirement(&[3], Some(3)));
        assert!(!check_role_requirement(&[2], Some(3)));
        assert!(!check_role_requirement(&[], Some(1)));
    }

    #[test]
    fn draw_frequency_tracks_entry_weight() {
        // weight / total_weight convergence with a fixed seed: B holds 3 of
        // 4 tickets.
        let pool = vec![("A".to_string(), 1), ("B".to_string(), 3)];
        let mut picker = WeightedPicker::with_rng(StdRng::seed_from_u64(42));

        let draws = 4_000;
        let mut b_wins = 0;
        for _ in 0..draws {
            if picker.pick(&pool).as_deref() == Some("B") {
                b_wins += 1;
            }
        }
        let share = b_wins as f64 / draws as f64;
        assert!(
            (share - 0.75).abs() < 0.03,
            "B won {} of {} draws",
            b_wins,
            draws
        );
    }
}
