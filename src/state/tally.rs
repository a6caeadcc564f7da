//! Vote tally and outcome resolution.
//!
//! Pure functions over (ballots, alive roster, factions): the same inputs
//! always classify to the same outcome.

use crate::error::TallyError;
use crate::types::{Faction, SeatId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Game goes on with a new cycle
    Continue,
    MajorityWins,
    MinorityWins,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Continue)
    }

    pub fn winner(&self) -> Option<Faction> {
        match self {
            Outcome::Continue => None,
            Outcome::MajorityWins => Some(Faction::Majority),
            Outcome::MinorityWins => Some(Faction::Minority),
        }
    }
}

/// Result of one resolved voting round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteOutcome {
    /// None on a tie
    pub eliminated: Option<SeatId>,
    pub counts: BTreeMap<SeatId, u32>,
    /// Voter -> target, public once the round is resolved
    pub ballots: BTreeMap<SeatId, SeatId>,
    pub outcome: Outcome,
}

impl VoteOutcome {
    pub fn is_tie(&self) -> bool {
        self.eliminated.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeRules {
    /// Minority wins once alive majority seats are at or below this count
    pub minority_win_threshold: usize,
}

impl Default for OutcomeRules {
    fn default() -> Self {
        Self {
            minority_win_threshold: 1,
        }
    }
}

/// Count ballots per target
pub fn aggregate_votes(votes: &BTreeMap<SeatId, SeatId>) -> BTreeMap<SeatId, u32> {
    let mut counts: BTreeMap<SeatId, u32> = BTreeMap::new();
    for target in votes.values() {
        *counts.entry(target.clone()).or_insert(0) += 1;
    }
    counts
}

/// Validate the ballots, find the seat with a unique maximum and decide
/// whether the game ends.
pub fn resolve_votes(
    votes: &BTreeMap<SeatId, SeatId>,
    alive: &BTreeSet<SeatId>,
    factions: &BTreeMap<SeatId, Faction>,
    rules: &OutcomeRules,
) -> Result<VoteOutcome, TallyError> {
    if votes.len() > alive.len() {
        return Err(TallyError::TooManyBallots {
            votes: votes.len(),
            alive: alive.len(),
        });
    }
    for (voter, target) in votes {
        if !alive.contains(voter) {
            return Err(TallyError::VoterNotAlive(voter.clone()));
        }
        if !alive.contains(target) {
            return Err(TallyError::TargetNotAlive(target.clone()));
        }
        if voter == target {
            return Err(TallyError::SelfVote(voter.clone()));
        }
    }
    if let Some(missing) = alive.iter().find(|seat| !factions.contains_key(*seat)) {
        return Err(TallyError::MissingFaction(missing.clone()));
    }

    let counts = aggregate_votes(votes);
    let max = counts.values().copied().max().unwrap_or(0);
    let leaders: Vec<&SeatId> = counts
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(seat, _)| seat)
        .collect();

    let eliminated = match leaders.as_slice() {
        [single] if max > 0 => Some((*single).clone()),
        _ => None,
    };

    let outcome = match &eliminated {
        None => Outcome::Continue,
        Some(seat) => match factions[seat] {
            Faction::Minority => Outcome::MajorityWins,
            Faction::Majority => {
                let majority_left = alive
                    .iter()
                    .filter(|s| *s != seat && factions[*s] == Faction::Majority)
                    .count();
                if majority_left <= rules.minority_win_threshold {
                    Outcome::MinorityWins
                } else {
                    Outcome::Continue
                }
            }
        },
    };

    Ok(VoteOutcome {
        eliminated,
        counts,
        ballots: votes.clone(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(seats: &[(&str, Faction)]) -> (BTreeSet<SeatId>, BTreeMap<SeatId, Faction>) {
        let alive = seats.iter().map(|(s, _)| s.to_string()).collect();
        let factions = seats.iter().map(|(s, f)| (s.to_string(), *f)).collect();
        (alive, factions)
    }

    fn ballots(pairs: &[(&str, &str)]) -> BTreeMap<SeatId, SeatId> {
        pairs
            .iter()
            .map(|(v, t)| (v.to_string(), t.to_string()))
            .collect()
    }

    fn four_seats() -> (BTreeSet<SeatId>, BTreeMap<SeatId, Faction>) {
        roster(&[
            ("a", Faction::Majority),
            ("b", Faction::Majority),
            ("c", Faction::Majority),
            ("m", Faction::Minority),
        ])
    }

    #[test]
    fn test_minority_eliminated_majority_wins() {
        let (alive, factions) = four_seats();
        let votes = ballots(&[("a", "m"), ("b", "m"), ("c", "m"), ("m", "a")]);

        let result = resolve_votes(&votes, &alive, &factions, &OutcomeRules::default()).unwrap();

        assert_eq!(result.eliminated.as_deref(), Some("m"));
        assert_eq!(result.outcome, Outcome::MajorityWins);
        assert!(result.outcome.is_terminal());
        assert_eq!(result.counts.get("m"), Some(&3));
        assert_eq!(result.counts.get("a"), Some(&1));
    }

    #[test]
    fn test_majority_eliminated_two_remain_continues() {
        let (alive, factions) = four_seats();
        let votes = ballots(&[("a", "c"), ("b", "c"), ("m", "c"), ("c", "a")]);

        let result = resolve_votes(&votes, &alive, &factions, &OutcomeRules::default()).unwrap();

        assert_eq!(result.eliminated.as_deref(), Some("c"));
        assert_eq!(result.outcome, Outcome::Continue);
        assert!(!result.outcome.is_terminal());
    }

    #[test]
    fn test_majority_eliminated_one_remains_minority_wins() {
        let (alive, factions) = roster(&[
            ("a", Faction::Majority),
            ("b", Faction::Majority),
            ("m", Faction::Minority),
        ]);
        let votes = ballots(&[("a", "b"), ("m", "b"), ("b", "m")]);

        let result = resolve_votes(&votes, &alive, &factions, &OutcomeRules::default()).unwrap();

        assert_eq!(result.eliminated.as_deref(), Some("b"));
        assert_eq!(result.outcome, Outcome::MinorityWins);
        assert_eq!(result.outcome.winner(), Some(Faction::Minority));
    }

    #[test]
    fn test_tie_eliminates_nobody() {
        let (alive, factions) = four_seats();
        let votes = ballots(&[("a", "m"), ("b", "m"), ("c", "a"), ("m", "a")]);

        let result = resolve_votes(&votes, &alive, &factions, &OutcomeRules::default()).unwrap();

        assert!(result.is_tie());
        assert_eq!(result.outcome, Outcome::Continue);
    }

    #[test]
    fn test_no_ballots_is_a_tie() {
        let (alive, factions) = four_seats();
        let result =
            resolve_votes(&BTreeMap::new(), &alive, &factions, &OutcomeRules::default()).unwrap();
        assert!(result.is_tie());
        assert_eq!(result.outcome, Outcome::Continue);
        assert!(result.counts.is_empty());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let (alive, factions) = four_seats();
        let votes = ballots(&[("a", "c"), ("b", "c"), ("m", "c"), ("c", "a")]);
        let strict = OutcomeRules {
            minority_win_threshold: 2,
        };

        let result = resolve_votes(&votes, &alive, &factions, &strict).unwrap();

        assert_eq!(result.outcome, Outcome::MinorityWins);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let (alive, factions) = four_seats();
        let votes = ballots(&[("a", "b"), ("b", "a"), ("c", "m"), ("m", "c")]);
        let rules = OutcomeRules::default();

        let first = resolve_votes(&votes, &alive, &factions, &rules).unwrap();
        for _ in 0..20 {
            assert_eq!(resolve_votes(&votes, &alive, &factions, &rules).unwrap(), first);
        }
    }

    #[test]
    fn test_rejects_more_ballots_than_alive_seats() {
        let (alive, factions) = roster(&[("a", Faction::Majority), ("m", Faction::Minority)]);
        let votes = ballots(&[("a", "m"), ("m", "a"), ("x", "a")]);

        let err = resolve_votes(&votes, &alive, &factions, &OutcomeRules::default()).unwrap_err();

        assert_eq!(err, TallyError::TooManyBallots { votes: 3, alive: 2 });
    }

    #[test]
    fn test_rejects_ballots_involving_dead_seats() {
        let (alive, factions) = four_seats();

        let err = resolve_votes(
            &ballots(&[("ghost", "a")]),
            &alive,
            &factions,
            &OutcomeRules::default(),
        )
        .unwrap_err();
        assert_eq!(err, TallyError::VoterNotAlive("ghost".to_string()));

        let err = resolve_votes(
            &ballots(&[("a", "ghost")]),
            &alive,
            &factions,
            &OutcomeRules::default(),
        )
        .unwrap_err();
        assert_eq!(err, TallyError::TargetNotAlive("ghost".to_string()));

        let err = resolve_votes(
            &ballots(&[("a", "a")]),
            &alive,
            &factions,
            &OutcomeRules::default(),
        )
        .unwrap_err();
        assert_eq!(err, TallyError::SelfVote("a".to_string()));
    }
}
