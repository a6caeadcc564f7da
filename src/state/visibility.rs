//! Per-seat projections of the game state.
//!
//! Every view handed to a client is built here. A seat always sees its own
//! word, never anybody else's, and nothing marks which seat is not human
//! until the final reveal.

use super::lobby::{Lobby, HUMAN_SEATS};
use super::session::{CycleRecord, GameSession};
use super::tally::VoteOutcome;
use crate::error::ActionError;
use crate::types::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LobbyView {
    pub room_code: RoomCode,
    pub members: Vec<HumanSeat>,
    pub seats_needed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfView {
    pub seat_id: SeatId,
    pub display_name: String,
    pub word: String,
    pub alive: bool,
    /// Only once the game is decided
    pub faction: Option<Faction>,
    pub your_turn: bool,
    pub has_described: bool,
    pub has_voted: bool,
    pub vote_target: Option<SeatId>,
    pub guess: Option<SeatId>,
}

/// Another seat, as far as the viewer may know it
#[derive(Debug, Clone, Serialize)]
pub struct SeatInfo {
    pub id: SeatId,
    pub display_name: String,
    pub alive: bool,
    pub has_described: bool,
    pub description: Option<String>,
    pub has_voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_target: Option<SeatId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<Faction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_participant: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuessResult {
    pub seat_id: SeatId,
    pub guessed: SeatId,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalRevealView {
    pub majority_word: String,
    pub minority_word: String,
    pub participant: SeatId,
    pub guesses: Vec<GuessResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub room_code: RoomCode,
    pub phase: GamePhase,
    pub cycle: u32,
    pub version: u64,
    pub you: SelfView,
    /// Seating order
    pub seats: Vec<SeatInfo>,
    pub turn_order: Vec<SeatId>,
    pub current_turn: Option<SeatId>,
    pub discussion: Vec<ChatLine>,
    pub history: Vec<CycleRecord>,
    pub last_result: Option<VoteOutcome>,
    pub winner: Option<Faction>,
    /// A count only: the ids of the guessers would single out the odd seat
    pub guesses_outstanding: usize,
    pub reveal: Option<FinalRevealView>,
}

/// What a connected human sees of their room
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoomView {
    Lobby(LobbyView),
    Game(SeatView),
}

pub fn lobby_view(code: &RoomCode, lobby: &Lobby) -> LobbyView {
    LobbyView {
        room_code: code.clone(),
        members: lobby.members().to_vec(),
        seats_needed: HUMAN_SEATS.saturating_sub(lobby.members().len()),
    }
}

impl GameSession {
    /// True once the last vote decided the game
    fn outcome_decided(&self) -> bool {
        self.phase().is_post_vote()
            && self
                .last_result()
                .is_some_and(|r| r.outcome.is_terminal())
    }

    fn final_reveal(&self) -> FinalRevealView {
        let word_of = |faction: Faction| {
            self.seats()
                .iter()
                .find(|s| s.faction == faction)
                .map(|s| s.word.clone())
                .unwrap_or_default()
        };
        let participant = self.participant().id.clone();
        let guesses = self
            .guesses()
            .iter()
            .map(|(seat_id, guessed)| GuessResult {
                seat_id: seat_id.clone(),
                guessed: guessed.clone(),
                correct: *guessed == participant,
            })
            .collect();

        FinalRevealView {
            majority_word: word_of(Faction::Majority),
            minority_word: word_of(Faction::Minority),
            participant,
            guesses,
        }
    }

    /// Build the view one seat is allowed to see
    pub fn view_for(&self, seat_id: &str) -> Result<SeatView, ActionError> {
        let me = self.seat(seat_id).ok_or(ActionError::UnknownSeat)?;
        let phase = self.phase();
        let revealed = phase == GamePhase::FinalReveal;
        let decided = self.outcome_decided();

        let you = SelfView {
            seat_id: me.id.clone(),
            display_name: me.display_name.clone(),
            word: me.word.clone(),
            alive: me.alive,
            faction: decided.then_some(me.faction),
            your_turn: self.current_turn() == Some(&me.id),
            has_described: me.has_described,
            has_voted: me.has_voted,
            vote_target: me.vote_target.clone(),
            guess: self.guesses().get(&me.id).cloned(),
        };

        let seats = self
            .seats()
            .iter()
            .map(|s| SeatInfo {
                id: s.id.clone(),
                display_name: s.display_name.clone(),
                alive: s.alive,
                has_described: s.has_described,
                description: s.description.clone(),
                has_voted: s.has_voted,
                vote_target: if phase.is_post_vote() {
                    s.vote_target.clone()
                } else {
                    None
                },
                word: revealed.then(|| s.word.clone()),
                faction: revealed.then_some(s.faction),
                is_participant: revealed.then_some(s.is_participant),
            })
            .collect();

        Ok(SeatView {
            room_code: self.code().clone(),
            phase,
            cycle: self.cycle(),
            version: self.version(),
            you,
            seats,
            turn_order: self.turn_order().to_vec(),
            current_turn: self.current_turn().cloned(),
            discussion: self.transcript().to_vec(),
            history: self.history().to_vec(),
            last_result: if phase.is_post_vote() {
                self.last_result().cloned()
            } else {
                None
            },
            winner: if decided { self.winner() } else { None },
            guesses_outstanding: self.pending_guesses().len(),
            reveal: revealed.then(|| self.final_reveal()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::tests::{
        alive_majority, cast_votes, finish_descriptions, minority, new_session, reach_voting,
    };
    use std::collections::BTreeSet;

    fn first_human(s: &GameSession) -> SeatId {
        s.human_ids().next().unwrap().clone()
    }

    #[test]
    fn test_own_word_only() {
        let s = new_session(1);
        let viewer = first_human(&s);
        let view = s.view_for(&viewer).unwrap();

        assert_eq!(view.you.word, s.seat(&viewer).unwrap().word);
        assert!(view.you.faction.is_none());
        assert!(view.reveal.is_none());

        let json = serde_json::to_value(&view).unwrap();
        for seat in json["seats"].as_array().unwrap() {
            assert!(seat.get("word").is_none());
            assert!(seat.get("faction").is_none());
            assert!(seat.get("is_participant").is_none());
        }
        // The other word appears nowhere in the serialized view
        let other_word = s
            .seats()
            .iter()
            .find(|x| x.word != view.you.word)
            .unwrap()
            .word
            .clone();
        assert!(!json.to_string().contains(&format!("\"{}\"", other_word)));
    }

    #[test]
    fn test_unknown_viewer() {
        let s = new_session(2);
        assert_eq!(s.view_for("ghost").unwrap_err(), ActionError::UnknownSeat);
    }

    #[test]
    fn test_vote_targets_hidden_until_results() {
        let mut s = new_session(3);
        reach_voting(&mut s);
        let humans: Vec<SeatId> = s.human_ids().cloned().collect();
        s.submit_vote(&humans[0], &humans[1]).unwrap();

        let view = s.view_for(&humans[1]).unwrap();
        let voter = view.seats.iter().find(|x| x.id == humans[0]).unwrap();
        assert!(voter.has_voted);
        assert!(voter.vote_target.is_none());
        assert!(view.last_result.is_none());

        // The voter sees their own ballot
        let own = s.view_for(&humans[0]).unwrap();
        assert_eq!(own.you.vote_target.as_ref(), Some(&humans[1]));
    }

    #[test]
    fn test_results_show_ballots_but_not_factions_when_game_continues() {
        let mut s = new_session(4);
        reach_voting(&mut s);
        let ids: Vec<SeatId> = s.seats().iter().map(|x| x.id.clone()).collect();
        let plan = vec![
            (ids[0].clone(), ids[1].clone()),
            (ids[1].clone(), ids[0].clone()),
            (ids[2].clone(), ids[0].clone()),
            (ids[3].clone(), ids[1].clone()),
        ];
        cast_votes(&mut s, &plan);
        assert_eq!(s.phase(), GamePhase::Results);

        let viewer = first_human(&s);
        let view = s.view_for(&viewer).unwrap();
        assert!(view.last_result.as_ref().unwrap().is_tie());
        assert!(view.seats.iter().all(|x| x.vote_target.is_some()));
        assert!(view.you.faction.is_none());
        assert!(view.winner.is_none());
        assert!(view.seats.iter().all(|x| x.is_participant.is_none()));
    }

    #[test]
    fn test_terminal_results_reveal_winner_and_own_faction() {
        let mut s = new_session(5);
        reach_voting(&mut s);
        let min = minority(&s);
        let maj = alive_majority(&s);
        let mut plan: Vec<(SeatId, SeatId)> =
            maj.iter().map(|m| (m.clone(), min.clone())).collect();
        plan.push((min.clone(), maj[0].clone()));
        cast_votes(&mut s, &plan);

        let viewer = first_human(&s);
        let view = s.view_for(&viewer).unwrap();
        assert_eq!(view.winner, Some(Faction::Majority));
        assert_eq!(view.you.faction, Some(s.seat(&viewer).unwrap().faction));
        // Still no participant marker before the final reveal
        assert!(view.seats.iter().all(|x| x.is_participant.is_none()));
    }

    #[test]
    fn test_final_reveal_shows_everything() {
        let mut s = new_session(6);
        reach_voting(&mut s);
        let min = minority(&s);
        let maj = alive_majority(&s);
        let mut plan: Vec<(SeatId, SeatId)> =
            maj.iter().map(|m| (m.clone(), min.clone())).collect();
        plan.push((min.clone(), maj[0].clone()));
        cast_votes(&mut s, &plan);
        s.advance_phase().unwrap();

        let participant = s.participant().id.clone();
        let humans: Vec<SeatId> = s.human_ids().cloned().collect();
        s.submit_guess(&humans[0], &participant).unwrap();

        let pending = s.view_for(&humans[0]).unwrap();
        assert_eq!(pending.phase, GamePhase::GuessPhase);
        assert_eq!(pending.you.guess.as_ref(), Some(&participant));
        assert_eq!(pending.guesses_outstanding, 2);
        assert!(pending.reveal.is_none());

        s.submit_guess(&humans[1], &humans[2]).unwrap();
        s.submit_guess(&humans[2], &participant).unwrap();

        let view = s.view_for(&humans[1]).unwrap();
        let reveal = view.reveal.unwrap();
        assert_eq!(reveal.participant, participant);
        assert_eq!(reveal.guesses.len(), 3);
        assert_eq!(reveal.guesses.iter().filter(|g| g.correct).count(), 2);
        assert_eq!(reveal.minority_word, s.seat(&min).unwrap().word);
        assert!(view
            .seats
            .iter()
            .all(|x| x.word.is_some() && x.faction.is_some()));
        let flagged: Vec<&SeatInfo> = view
            .seats
            .iter()
            .filter(|x| x.is_participant == Some(true))
            .collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, participant);
    }

    /// Play to a decided game: the majority votes out the minority seat
    fn decide_game(s: &mut GameSession) {
        reach_voting(s);
        let min = minority(s);
        let maj = alive_majority(s);
        let mut plan: Vec<(SeatId, SeatId)> =
            maj.iter().map(|m| (m.clone(), min.clone())).collect();
        plan.push((min.clone(), maj[0].clone()));
        cast_votes(s, &plan);
    }

    #[test]
    fn test_guess_phase_does_not_list_guessers() {
        let mut s = new_session(7);
        decide_game(&mut s);
        assert_eq!(s.advance_phase().unwrap(), GamePhase::GuessPhase);

        let viewer = first_human(&s);
        let view = s.view_for(&viewer).unwrap();
        assert_eq!(view.guesses_outstanding, 3);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("pending_guesses").is_none());

        let participant = s.participant().id.clone();
        s.submit_guess(&viewer, &participant).unwrap();
        let after = s.view_for(&viewer).unwrap();
        assert_eq!(after.guesses_outstanding, 2);
        assert!(after.you.guess.is_some());
    }

    /// Every string array and every object key set in a serialized view
    fn id_sets(value: &serde_json::Value, out: &mut Vec<BTreeSet<String>>) {
        match value {
            serde_json::Value::Array(items) => {
                let strings: Option<BTreeSet<String>> = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect();
                if let Some(set) = strings {
                    out.push(set);
                }
                items.iter().for_each(|v| id_sets(v, out));
            }
            serde_json::Value::Object(map) => {
                out.push(map.keys().cloned().collect());
                map.values().for_each(|v| id_sets(v, out));
            }
            _ => {}
        }
    }

    fn assert_no_view_singles_out_participant(s: &GameSession) {
        let humans: BTreeSet<String> = s.human_ids().cloned().collect();
        for seat in s.seats() {
            let view = s.view_for(&seat.id).unwrap();
            let json = serde_json::to_value(&view).unwrap();
            let mut sets = Vec::new();
            id_sets(&json, &mut sets);
            assert!(
                sets.iter().all(|set| *set != humans),
                "{:?} view exposes the human seats as a group",
                s.phase()
            );
            assert!(view.seats.iter().all(|x| x.is_participant.is_none()));
        }
    }

    #[test]
    fn test_views_before_final_reveal_never_single_out_participant() {
        for seed in 0..8 {
            let mut s = new_session(seed);
            assert_no_view_singles_out_participant(&s);

            finish_descriptions(&mut s);
            assert_no_view_singles_out_participant(&s);
            s.advance_phase().unwrap();
            assert_no_view_singles_out_participant(&s);

            let min = minority(&s);
            let maj = alive_majority(&s);
            let mut plan: Vec<(SeatId, SeatId)> =
                maj.iter().map(|m| (m.clone(), min.clone())).collect();
            plan.push((min.clone(), maj[0].clone()));
            cast_votes(&mut s, &plan[..2]);
            assert_no_view_singles_out_participant(&s);
            cast_votes(&mut s, &plan[2..]);
            assert_eq!(s.phase(), GamePhase::Results);
            assert_no_view_singles_out_participant(&s);

            s.advance_phase().unwrap();
            let participant = s.participant().id.clone();
            let humans: Vec<SeatId> = s.human_ids().cloned().collect();
            for (i, guesser) in humans.iter().enumerate() {
                assert_eq!(s.phase(), GamePhase::GuessPhase);
                assert_no_view_singles_out_participant(&s);
                let target = if i == 0 { &participant } else { &humans[0] };
                s.submit_guess(guesser, target).unwrap();
            }
            assert_eq!(s.phase(), GamePhase::FinalReveal);
        }
    }

    #[test]
    fn test_lobby_view_counts_missing_seats() {
        let mut lobby = Lobby::new();
        lobby.join("Alice").unwrap();
        let view = lobby_view(&"ABCDE".to_string(), &lobby);
        assert_eq!(view.seats_needed, 2);

        let json = serde_json::to_value(RoomView::Lobby(view)).unwrap();
        assert_eq!(json["state"], "lobby");
        assert_eq!(json["members"][0]["display_name"], "Alice");
    }
}
