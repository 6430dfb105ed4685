//! Single-elimination bracket engine.
//!
//! All state lives on the [`Tournament`] entity; these operations validate,
//! mutate, and report. Callers persist the entity through the store and
//! announce the returned summaries.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::store::models::{
    Entrant, Match, Team, TeamMode, Tournament, TournamentKind, TournamentStatus,
};
use crate::utils::mention::parse_user_id;

/// Pool of names for randomly formed teams.
const TEAM_NAMES: [&str; 16] = [
    "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel", "India", "Juliet",
    "Kilo", "Lima", "Mike", "November", "Oscar", "Papa",
];

/// Failures reported by tournament operations.
///
/// Validation and state-conflict failures both land here; nothing is
/// persisted when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TournamentError {
    NotFound(String),
    AlreadyStarted,
    NotStarted,
    AlreadyOver,
    AlreadyJoined,
    NotJoined,
    AlreadyPickup,
    OnRegisteredTeam(String),
    SignupModeMismatch,
    TeamNameTaken(String),
    NoValidPlayers,
    TooManyPlayers { team_size: usize, provided: usize },
    PlayerOnOtherTeam { player: String, team: String },
    NotEnoughEntrants { needed: usize, have: usize },
    NotEnoughTeams { have: usize },
    MatchNotFound(u32),
    MatchAlreadyCompleted(u32),
    InvalidWinner(u32),
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TournamentError::*;
        match self {
            NotFound(id) => write!(f, "Tournament {} does not exist.", id),
            AlreadyStarted => write!(f, "This tournament has already started."),
            NotStarted => write!(f, "This tournament hasn't started yet."),
            AlreadyOver => write!(f, "This tournament is already over."),
            AlreadyJoined => write!(f, "You've already joined this tournament."),
            NotJoined => write!(f, "You haven't joined this tournament."),
            AlreadyPickup => write!(f, "You've already joined as a pickup player."),
            OnRegisteredTeam(team) => write!(f, "You are on registered team **{}**.", team),
            SignupModeMismatch => {
                write!(f, "This tournament uses a different signup mode.")
            }
            TeamNameTaken(name) => write!(f, "Team name **{}** is already taken.", name),
            NoValidPlayers => write!(
                f,
                "No valid players found. Mention players or provide their user ids."
            ),
            TooManyPlayers {
                team_size,
                provided,
            } => write!(
                f,
                "Too many players: team size is {}, you provided {}.",
                team_size, provided
            ),
            PlayerOnOtherTeam { player, team } => {
                write!(f, "<@{}> is already on team **{}**.", player, team)
            }
            NotEnoughEntrants { needed, have } => write!(
                f,
                "Not enough entrants to start: need at least {}, have {}.",
                needed, have
            ),
            NotEnoughTeams { have } => write!(
                f,
                "Not enough complete teams to start: need at least 2, have {}.",
                have
            ),
            MatchNotFound(n) => write!(f, "Match #{} not found.", n),
            MatchAlreadyCompleted(n) => write!(f, "Match #{} already completed.", n),
            InvalidWinner(n) => write!(
                f,
                "Invalid winner: must be one of the participants in match #{}.",
                n
            ),
        }
    }
}

impl std::error::Error for TournamentError {}

/// What starting a tournament produced, for announcements.
#[derive(Debug, Clone)]
pub struct StartSummary {
    pub entrants: Vec<Entrant>,
    pub round_one: Vec<Match>,
    /// Pickup players who could not fill a complete team. They stay in the
    /// pool for audit.
    pub leftover_pickups: usize,
}

/// What closing a round produced.
#[derive(Debug, Clone)]
pub enum RoundResult {
    /// The round closed and these matches were appended for the next round.
    NextRound { round: u32, matches: Vec<Match> },
    /// The round contained the final; the tournament is complete.
    Champion(Entrant),
}

/// The result of recording a match winner.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub match_number: u32,
    pub participant1: Entrant,
    pub participant2: Entrant,
    pub winner: Entrant,
    /// Present only when this report closed its round.
    pub round_result: Option<RoundResult>,
}

/// Shuffles entrants uniformly and pairs them into round 1.
///
/// Every entrant appears in exactly one match; an odd count gives the last
/// shuffled entrant a BYE match that is already completed in their favor.
pub fn generate_bracket(mut entrants: Vec<Entrant>, rng: &mut impl Rng) -> Vec<Match> {
    entrants.shuffle(rng);
    pair_into_round(&entrants, 1, 1)
}

/// Pairs an ordered list into consecutive matches of `round`, numbering from
/// `first_match_number`. Order is preserved, never reshuffled.
fn pair_into_round(entrants: &[Entrant], round: u32, first_match_number: u32) -> Vec<Match> {
    let mut matches = Vec::with_capacity((entrants.len() + 1) / 2);
    let mut number = first_match_number;
    for pair in entrants.chunks(2) {
        matches.push(match pair {
            [one, two] => Match {
                match_number: number,
                round,
                participant1: one.clone(),
                participant2: two.clone(),
                winner: None,
                completed: false,
            },
            _ => Match {
                match_number: number,
                round,
                participant1: pair[0].clone(),
                participant2: Entrant::Bye,
                winner: Some(pair[0].clone()),
                completed: true,
            },
        });
        number += 1;
    }
    matches
}

fn team_name(index: usize) -> String {
    match TEAM_NAMES.get(index) {
        Some(name) => format!("Team {}", name),
        None => format!("Team {}", index + 1),
    }
}

impl Tournament {
    fn ensure_open(&self) -> Result<(), TournamentError> {
        match self.status {
            TournamentStatus::Open => Ok(()),
            TournamentStatus::Started => Err(TournamentError::AlreadyStarted),
            TournamentStatus::Complete | TournamentStatus::Cancelled => {
                Err(TournamentError::AlreadyOver)
            }
        }
    }

    /// Signs an individual up. Valid for solo tournaments and random-team
    /// tournaments; premade-team tournaments sign up via teams or the pickup
    /// pool.
    pub fn join_participant(&mut self, user_id: &str) -> Result<usize, TournamentError> {
        self.ensure_open()?;
        if matches!(
            self.kind,
            TournamentKind::Team {
                team_mode: TeamMode::Premade,
                ..
            }
        ) {
            return Err(TournamentError::SignupModeMismatch);
        }
        if self.participants.iter().any(|p| p == user_id) {
            return Err(TournamentError::AlreadyJoined);
        }
        self.participants.push(user_id.to_string());
        Ok(self.participants.len())
    }

    /// Joins the pickup pool of a premade-team tournament.
    pub fn join_pickup(&mut self, user_id: &str) -> Result<usize, TournamentError> {
        self.ensure_open()?;
        if !matches!(
            self.kind,
            TournamentKind::Team {
                team_mode: TeamMode::Premade,
                ..
            }
        ) {
            return Err(TournamentError::SignupModeMismatch);
        }
        if let Some((name, _)) = self
            .teams
            .iter()
            .find(|(_, team)| team.members.iter().any(|m| m == user_id))
        {
            return Err(TournamentError::OnRegisteredTeam(name.clone()));
        }
        if self.pickup_players.iter().any(|p| p == user_id) {
            return Err(TournamentError::AlreadyPickup);
        }
        self.pickup_players.push(user_id.to_string());
        Ok(self.pickup_players.len())
    }

    /// Registers a premade team. Players already in the pickup pool are
    /// pulled out of it; a roster short of `team_size` is allowed and gets
    /// topped up from the pool at start.
    pub fn register_team(
        &mut self,
        team_name: &str,
        player_ids: Vec<String>,
        captain: &str,
    ) -> Result<(), TournamentError> {
        self.ensure_open()?;
        let team_size = match self.kind {
            TournamentKind::Team {
                team_size,
                team_mode: TeamMode::Premade,
            } => team_size,
            _ => return Err(TournamentError::SignupModeMismatch),
        };
        if self.teams.contains_key(team_name) {
            return Err(TournamentError::TeamNameTaken(team_name.to_string()));
        }
        if player_ids.is_empty() {
            return Err(TournamentError::NoValidPlayers);
        }
        if player_ids.len() > team_size {
            return Err(TournamentError::TooManyPlayers {
                team_size,
                provided: player_ids.len(),
            });
        }
        for (existing_name, existing) in &self.teams {
            if let Some(player) = player_ids.iter().find(|p| existing.members.contains(p)) {
                return Err(TournamentError::PlayerOnOtherTeam {
                    player: player.clone(),
                    team: existing_name.clone(),
                });
            }
        }

        self.pickup_players.retain(|p| !player_ids.contains(p));
        self.teams.insert(
            team_name.to_string(),
            Team {
                members: player_ids,
                captain: Some(captain.to_string()),
            },
        );
        Ok(())
    }

    /// Withdraws an individual signup (participant or pickup player).
    pub fn leave(&mut self, user_id: &str) -> Result<(), TournamentError> {
        self.ensure_open()?;
        if let Some(pos) = self.participants.iter().position(|p| p == user_id) {
            self.participants.remove(pos);
            return Ok(());
        }
        if let Some(pos) = self.pickup_players.iter().position(|p| p == user_id) {
            self.pickup_players.remove(pos);
            return Ok(());
        }
        if let Some((name, _)) = self
            .teams
            .iter()
            .find(|(_, team)| team.members.iter().any(|m| m == user_id))
        {
            return Err(TournamentError::OnRegisteredTeam(name.clone()));
        }
        Err(TournamentError::NotJoined)
    }

    /// Freezes signups, reconciles teams, and generates round 1.
    pub fn start(&mut self, rng: &mut impl Rng) -> Result<StartSummary, TournamentError> {
        self.ensure_open()?;

        let entrants: Vec<Entrant> = match self.kind {
            TournamentKind::Solo => {
                if self.participants.len() < 2 {
                    return Err(TournamentError::NotEnoughEntrants {
                        needed: 2,
                        have: self.participants.len(),
                    });
                }
                self.participants
                    .iter()
                    .cloned()
                    .map(Entrant::Player)
                    .collect()
            }
            TournamentKind::Team {
                team_size,
                team_mode: TeamMode::Random,
            } => {
                if self.participants.len() < team_size * 2 {
                    return Err(TournamentError::NotEnoughEntrants {
                        needed: team_size * 2,
                        have: self.participants.len(),
                    });
                }
                let mut pool = self.participants.clone();
                pool.shuffle(rng);
                self.teams.clear();
                for (index, chunk) in pool.chunks(team_size).enumerate() {
                    if chunk.len() == team_size {
                        self.teams.insert(
                            team_name(index),
                            Team {
                                members: chunk.to_vec(),
                                captain: None,
                            },
                        );
                    }
                }
                if self.teams.len() < 2 {
                    return Err(TournamentError::NotEnoughTeams {
                        have: self.teams.len(),
                    });
                }
                self.teams.keys().cloned().map(Entrant::Team).collect()
            }
            TournamentKind::Team {
                team_size,
                team_mode: TeamMode::Premade,
            } => {
                self.reconcile_pickups(team_size, rng);
                if self.teams.len() < 2 {
                    return Err(TournamentError::NotEnoughTeams {
                        have: self.teams.len(),
                    });
                }
                self.teams.keys().cloned().map(Entrant::Team).collect()
            }
        };

        let bracket = generate_bracket(entrants.clone(), rng);
        self.bracket = bracket.clone();
        self.status = TournamentStatus::Started;

        Ok(StartSummary {
            entrants,
            round_one: bracket,
            leftover_pickups: self.pickup_players.len(),
        })
    }

    /// Premade-team reconciliation: top up existing teams from the shuffled
    /// pickup pool in pool order, form new teams from what remains, then
    /// discard teams still short of `team_size`. Leftover pickup players
    /// that cannot fill a full team stay in the pool.
    fn reconcile_pickups(&mut self, team_size: usize, rng: &mut impl Rng) {
        let mut pool = std::mem::take(&mut self.pickup_players);
        pool.shuffle(rng);

        for team in self.teams.values_mut() {
            let needed = team_size.saturating_sub(team.members.len());
            let take = needed.min(pool.len());
            team.members.extend(pool.drain(..take));
        }

        let mut pickup_counter = 1;
        while pool.len() >= team_size {
            self.teams.insert(
                format!("Pickup Team {}", pickup_counter),
                Team {
                    members: pool.drain(..team_size).collect(),
                    captain: None,
                },
            );
            pickup_counter += 1;
        }

        self.teams.retain(|_, team| team.members.len() >= team_size);
        self.pickup_players = pool;
    }

    /// Resolves a winner argument against a match: a team name for team
    /// tournaments, a raw id or mention for solo ones.
    fn resolve_winner(&self, mat: &Match, winner_input: &str) -> Option<Entrant> {
        let candidate = if self.kind.is_team() {
            Entrant::Team(winner_input.to_string())
        } else {
            Entrant::Player(parse_user_id(winner_input)?)
        };
        mat.contains(&candidate).then_some(candidate)
    }

    /// Records a match result and advances the bracket when the result
    /// closes its round. No other match is touched by the report itself;
    /// round advancement only appends.
    pub fn report_match(
        &mut self,
        match_number: u32,
        winner_input: &str,
    ) -> Result<ReportOutcome, TournamentError> {
        match self.status {
            TournamentStatus::Started => {}
            TournamentStatus::Open => return Err(TournamentError::NotStarted),
            TournamentStatus::Complete | TournamentStatus::Cancelled => {
                return Err(TournamentError::AlreadyOver)
            }
        }

        let index = self
            .bracket
            .iter()
            .position(|m| m.match_number == match_number)
            .ok_or(TournamentError::MatchNotFound(match_number))?;
        if self.bracket[index].completed {
            return Err(TournamentError::MatchAlreadyCompleted(match_number));
        }

        let winner = self
            .resolve_winner(&self.bracket[index], winner_input)
            .ok_or(TournamentError::InvalidWinner(match_number))?;

        let current_round = self.bracket[index].round;
        self.bracket[index].winner = Some(winner.clone());
        self.bracket[index].completed = true;
        let participant1 = self.bracket[index].participant1.clone();
        let participant2 = self.bracket[index].participant2.clone();

        let round_result = if self.round_matches(current_round).all(|m| m.completed) {
            let mut closed: Vec<&Match> = self.round_matches(current_round).collect();
            closed.sort_by_key(|m| m.match_number);
            let winners: Vec<Entrant> = closed
                .iter()
                .filter_map(|m| m.winner.clone())
                .collect();

            if let [champion] = winners.as_slice() {
                self.status = TournamentStatus::Complete;
                Some(RoundResult::Champion(champion.clone()))
            } else {
                let next_number = self
                    .bracket
                    .iter()
                    .map(|m| m.match_number)
                    .max()
                    .unwrap_or(0)
                    + 1;
                let next_round = pair_into_round(&winners, current_round + 1, next_number);
                self.bracket.extend(next_round.iter().cloned());
                Some(RoundResult::NextRound {
                    round: current_round + 1,
                    matches: next_round,
                })
            }
        } else {
            None
        };

        Ok(ReportOutcome {
            match_number,
            participant1,
            participant2,
            winner,
            round_result,
        })
    }

    /// Cancels the tournament. Terminal; no transition leaves it.
    pub fn cancel(&mut self) -> Result<(), TournamentError> {
        match self.status {
            TournamentStatus::Open | TournamentStatus::Started => {
                self.status = TournamentStatus::Cancelled;
                Ok(())
            }
            TournamentStatus::Complete | TournamentStatus::Cancelled => {
                Err(TournamentError::AlreadyOver)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn solo_tournament(participants: &[&str]) -> Tournament {
        Tournament {
            name: "test".to_string(),
            game: "test".to_string(),
            host_id: "h".to_string(),
            channel_id: "c".to_string(),
            kind: TournamentKind::Solo,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            teams: Default::default(),
            pickup_players: Vec::new(),
            status: TournamentStatus::Open,
            bracket: Vec::new(),
            created_at: 0,
        }
    }

    fn premade_tournament(team_size: usize) -> Tournament {
        Tournament {
            kind: TournamentKind::Team {
                team_size,
                team_mode: TeamMode::Premade,
            },
            ..solo_tournament(&[])
        }
    }

    fn players(n: usize) -> Vec<Entrant> {
        (0..n).map(|i| Entrant::Player(i.to_string())).collect()
    }

    proptest! {
        #[test]
        fn bracket_covers_every_entrant_exactly_once(n in 2usize..48, seed in any::<u64>()) {
            let entrants = players(n);
            let mut rng = StdRng::seed_from_u64(seed);
            let bracket = generate_bracket(entrants.clone(), &mut rng);

            prop_assert_eq!(bracket.len(), (n + 1) / 2);

            let byes = bracket.iter().filter(|m| m.is_bye()).count();
            prop_assert_eq!(byes, n % 2);
            for mat in bracket.iter().filter(|m| m.is_bye()) {
                prop_assert!(mat.completed);
                prop_assert_eq!(mat.winner.as_ref(), Some(&mat.participant1));
            }

            let mut seen: Vec<&Entrant> = bracket
                .iter()
                .flat_map(|m| [&m.participant1, &m.participant2])
                .filter(|e| **e != Entrant::Bye)
                .collect();
            seen.sort_by_key(|e| format!("{:?}", e));
            let mut expected: Vec<&Entrant> = entrants.iter().collect();
            expected.sort_by_key(|e| format!("{:?}", e));
            prop_assert_eq!(seen, expected);

            let numbers: Vec<u32> = bracket.iter().map(|m| m.match_number).collect();
            let expected_numbers: Vec<u32> = (1..=bracket.len() as u32).collect();
            prop_assert_eq!(numbers, expected_numbers);
        }

        #[test]
        fn full_tournament_reaches_a_single_champion(n in 2usize..24, seed in any::<u64>()) {
            let ids: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            let id_refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
            let mut tournament = solo_tournament(&id_refs);
            let mut rng = StdRng::seed_from_u64(seed);
            tournament.start(&mut rng).unwrap();

            let mut champion = None;
            let mut last_number = 0;
            for _ in 0..128 {
                let next = tournament
                    .bracket
                    .iter()
                    .find(|m| !m.completed)
                    .map(|m| (m.match_number, m.participant1.to_string()));
                let Some((number, p1)) = next else { break };
                prop_assert!(number > last_number || last_number == 0);
                last_number = number;

                let outcome = tournament.report_match(number, &p1).unwrap();
                if let Some(RoundResult::Champion(winner)) = outcome.round_result {
                    champion = Some(winner);
                }
            }

            prop_assert!(champion.is_some());
            prop_assert_eq!(tournament.status, TournamentStatus::Complete);

            // Single elimination: everyone but the champion loses exactly once.
            let real_matches = tournament.bracket.iter().filter(|m| !m.is_bye()).count();
            prop_assert_eq!(real_matches, n - 1);

            // Match numbers stay strictly increasing in creation order.
            let numbers: Vec<u32> = tournament.bracket.iter().map(|m| m.match_number).collect();
            prop_assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    #[test]
    fn five_entrants_advance_in_winner_order() {
        let mut tournament = solo_tournament(&["a", "b", "c", "d", "e"]);
        let mut rng = StdRng::seed_from_u64(7);
        let summary = tournament.start(&mut rng).unwrap();

        assert_eq!(summary.round_one.len(), 3);
        assert_eq!(
            summary.round_one.iter().filter(|m| m.is_bye()).count(),
            1
        );
        let bye_winner = tournament
            .round_matches(1)
            .find(|m| m.is_bye())
            .and_then(|m| m.winner.clone())
            .unwrap();

        let real: Vec<u32> = tournament
            .round_matches(1)
            .filter(|m| !m.is_bye())
            .map(|m| m.match_number)
            .collect();

        let mut round_one_winners = Vec::new();
        for number in &real {
            let p1 = tournament
                .bracket
                .iter()
                .find(|m| m.match_number == *number)
                .unwrap()
                .participant1
                .to_string();
            let outcome = tournament.report_match(*number, &p1).unwrap();
            round_one_winners.push(outcome.winner);
        }

        // Round 2 pairs the three winners in match-number order: the two
        // real-match winners face each other and the bye winner gets another
        // bye. Winner order is preserved, never reshuffled.
        let round_two: Vec<&Match> = tournament.round_matches(2).collect();
        assert_eq!(round_two.len(), 2);
        assert_eq!(round_two[0].participant1, round_one_winners[0]);
        assert_eq!(round_two[0].participant2, round_one_winners[1]);
        assert_eq!(round_two[1].participant1, bye_winner);
        assert!(round_two[1].is_bye());
        assert!(round_two[1].completed);

        // Finish round 2; round 3 is the final.
        let semi = round_two[0].match_number;
        let semi_p1 = round_two[0].participant1.to_string();
        let outcome = tournament.report_match(semi, &semi_p1).unwrap();
        let Some(RoundResult::NextRound { round, matches }) = outcome.round_result else {
            panic!("expected a next round");
        };
        assert_eq!(round, 3);
        assert_eq!(matches.len(), 1);

        let final_match = matches[0].match_number;
        let final_p2 = matches[0].participant2.to_string();
        let outcome = tournament.report_match(final_match, &final_p2).unwrap();
        let Some(RoundResult::Champion(champion)) = outcome.round_result else {
            panic!("expected a champion");
        };
        assert_eq!(champion, matches[0].participant2);
        assert_eq!(tournament.status, TournamentStatus::Complete);
        assert_eq!(tournament.bracket.len(), 6);
    }

    #[test]
    fn reporting_a_completed_match_fails_cleanly() {
        let mut tournament = solo_tournament(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(1);
        tournament.start(&mut rng).unwrap();

        let p1 = tournament.bracket[0].participant1.to_string();
        tournament.report_match(1, &p1).unwrap();

        let before = tournament.bracket.clone();
        let p2 = tournament.bracket[0].participant2.to_string();
        assert_eq!(
            tournament.report_match(1, &p2).unwrap_err(),
            TournamentError::MatchAlreadyCompleted(1)
        );
        assert_eq!(tournament.bracket.len(), before.len());
        assert_eq!(tournament.bracket[0].winner, before[0].winner);
    }

    #[test]
    fn report_validates_state_match_and_winner() {
        let mut tournament = solo_tournament(&["a", "b"]);
        assert_eq!(
            tournament.report_match(1, "a").unwrap_err(),
            TournamentError::NotStarted
        );

        let mut rng = StdRng::seed_from_u64(1);
        tournament.start(&mut rng).unwrap();
        assert_eq!(
            tournament.report_match(9, "a").unwrap_err(),
            TournamentError::MatchNotFound(9)
        );
        assert_eq!(
            tournament.report_match(1, "zzz").unwrap_err(),
            TournamentError::InvalidWinner(1)
        );
        // Mention-wrapped ids resolve for solo tournaments.
        let p1 = match &tournament.bracket[0].participant1 {
            Entrant::Player(id) => id.clone(),
            other => panic!("unexpected entrant {:?}", other),
        };
        let outcome = tournament
            .report_match(1, &format!("<@!{}>", p1))
            .unwrap();
        assert_eq!(outcome.winner, Entrant::Player(p1));
    }

    #[test]
    fn joins_are_rejected_after_start_or_cancel() {
        let mut tournament = solo_tournament(&["a", "b"]);
        assert_eq!(
            tournament.join_participant("a"),
            Err(TournamentError::AlreadyJoined)
        );

        let mut rng = StdRng::seed_from_u64(1);
        tournament.start(&mut rng).unwrap();
        assert_eq!(
            tournament.join_participant("c"),
            Err(TournamentError::AlreadyStarted)
        );
        assert_eq!(
            tournament.start(&mut rng).unwrap_err(),
            TournamentError::AlreadyStarted
        );

        tournament.cancel().unwrap();
        assert_eq!(
            tournament.report_match(1, "a").unwrap_err(),
            TournamentError::AlreadyOver
        );
        assert_eq!(tournament.cancel(), Err(TournamentError::AlreadyOver));
    }

    #[test]
    fn premade_reconciliation_tops_up_then_forms_pickup_teams() {
        let mut tournament = premade_tournament(3);
        tournament
            .register_team("Alpha", vec!["a1".into(), "a2".into()], "a1")
            .unwrap();
        tournament
            .register_team("Bravo", vec!["b1".into(), "b2".into(), "b3".into()], "b1")
            .unwrap();
        for p in ["p1", "p2", "p3", "p4", "p5"] {
            tournament.join_pickup(p).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(11);
        let summary = tournament.start(&mut rng).unwrap();

        // Alpha topped up to 3, one new pickup team of 3, one player left over.
        assert_eq!(tournament.teams.len(), 3);
        assert_eq!(tournament.teams["Alpha"].members.len(), 3);
        assert_eq!(tournament.teams["Bravo"].members.len(), 3);
        assert_eq!(tournament.teams["Pickup Team 1"].members.len(), 3);
        assert_eq!(tournament.pickup_players.len(), 1);
        assert_eq!(summary.leftover_pickups, 1);
        assert_eq!(summary.round_one.len(), 2);
    }

    #[test]
    fn undersized_teams_are_discarded_at_start() {
        let mut tournament = premade_tournament(3);
        tournament
            .register_team("Alpha", vec!["a1".into()], "a1")
            .unwrap();
        tournament
            .register_team("Bravo", vec!["b1".into(), "b2".into(), "b3".into()], "b1")
            .unwrap();
        tournament
            .register_team("Charlie", vec!["c1".into(), "c2".into(), "c3".into()], "c1")
            .unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let summary = tournament.start(&mut rng).unwrap();

        assert!(!tournament.teams.contains_key("Alpha"));
        assert_eq!(summary.entrants.len(), 2);
    }

    #[test]
    fn random_teams_form_from_complete_chunks_only() {
        let ids: Vec<String> = (0..7).map(|i| format!("p{}", i)).collect();
        let mut tournament = solo_tournament(&[]);
        tournament.kind = TournamentKind::Team {
            team_size: 3,
            team_mode: TeamMode::Random,
        };
        for id in &ids {
            tournament.join_participant(id).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(5);
        tournament.start(&mut rng).unwrap();

        assert_eq!(tournament.teams.len(), 2);
        assert!(tournament
            .teams
            .values()
            .all(|team| team.members.len() == 3));
    }

    #[test]
    fn team_registration_guards() {
        let mut tournament = premade_tournament(3);
        tournament
            .register_team("Alpha", vec!["a1".into(), "a2".into()], "a1")
            .unwrap();

        assert_eq!(
            tournament.register_team("Alpha", vec!["x".into()], "x"),
            Err(TournamentError::TeamNameTaken("Alpha".to_string()))
        );
        assert_eq!(
            tournament.register_team("Bravo", vec![], "x"),
            Err(TournamentError::NoValidPlayers)
        );
        assert_eq!(
            tournament.register_team(
                "Bravo",
                vec!["1".into(), "2".into(), "3".into(), "4".into()],
                "1"
            ),
            Err(TournamentError::TooManyPlayers {
                team_size: 3,
                provided: 4
            })
        );
        assert_eq!(
            tournament.register_team("Bravo", vec!["a1".into()], "a1"),
            Err(TournamentError::PlayerOnOtherTeam {
                player: "a1".to_string(),
                team: "Alpha".to_string()
            })
        );

        // Registering pulls members out of the pickup pool.
        tournament.join_pickup("c1").unwrap();
        tournament
            .register_team("Charlie", vec!["c1".into(), "c2".into()], "c1")
            .unwrap();
        assert!(tournament.pickup_players.is_empty());
    }

    #[test]
    fn leave_removes_signup_but_not_team_members() {
        let mut tournament = solo_tournament(&["a", "b"]);
        tournament.leave("a").unwrap();
        assert_eq!(tournament.participants, vec!["b".to_string()]);
        assert_eq!(tournament.leave("a"), Err(TournamentError::NotJoined));

        let mut premade = premade_tournament(2);
        premade
            .register_team("Alpha", vec!["a1".into(), "a2".into()], "a1")
            .unwrap();
        assert_eq!(
            premade.leave("a1"),
            Err(TournamentError::OnRegisteredTeam("Alpha".to_string()))
        );
    }
}
