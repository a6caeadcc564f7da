//! The per-room game state machine.
//!
//! `GameSession` is synchronous and owns every seat. Each public operation
//! validates first and mutates only on success, so a rejected action never
//! leaves a partial update behind. Moves of the non-human seat are modelled as
//! an explicit pending request: the session issues it, the caller fetches it
//! with `next_move_request`, and the reply comes back through
//! `apply_participant_move` tagged with the request id.

use super::lobby::HUMAN_SEATS;
use super::sequencer::TurnSequencer;
use super::tally::{aggregate_votes, resolve_votes, Outcome, OutcomeRules, VoteOutcome};
use crate::config::GameConfig;
use crate::error::{ActionError, StartError};
use crate::participant::{fallback, MoveContext, MoveRequest, SeatRef};
use crate::types::*;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Limits a session enforces on submitted content
#[derive(Debug, Clone)]
pub struct SessionRules {
    pub max_description_chars: usize,
    pub max_message_chars: usize,
    pub outcome: OutcomeRules,
}

impl From<&GameConfig> for SessionRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            // A zero limit would reject even the fallback text
            max_description_chars: config.max_description_chars.max(1),
            max_message_chars: config.max_message_chars.max(1),
            outcome: OutcomeRules {
                minority_win_threshold: config.minority_win_threshold,
            },
        }
    }
}

/// Public archive of a finished cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: u32,
    pub descriptions: Vec<ChatLine>,
    pub discussion: Vec<ChatLine>,
    pub result: Option<VoteOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingMove {
    id: RequestId,
    kind: MoveKind,
    dispatched: bool,
}

#[derive(Debug)]
pub struct GameSession {
    code: RoomCode,
    rules: SessionRules,
    phase: GamePhase,
    cycle: u32,
    version: u64,
    /// Fixed seating order for the whole game
    seats: Vec<Seat>,
    alive: BTreeSet<SeatId>,
    sequencer: TurnSequencer,
    /// Description order of the current cycle
    description_lines: Vec<ChatLine>,
    transcript: Vec<ChatLine>,
    history: Vec<CycleRecord>,
    last_result: Option<VoteOutcome>,
    winner: Option<Faction>,
    guesses: BTreeMap<SeatId, SeatId>,
    pending_guesses: BTreeSet<SeatId>,
    pending_move: Option<PendingMove>,
    next_request_id: RequestId,
    rng: StdRng,
}

/// Check if a phase transition is valid
fn is_valid_phase_transition(from: GamePhase, to: GamePhase) -> bool {
    use GamePhase::*;

    matches!(
        (from, to),
        (Lobby, Description)
            | (Description, Discussion)
            | (Discussion, Voting)
            | (Voting, Results)
            | (Results, Description)
            | (Results, GuessPhase)
            | (GuessPhase, FinalReveal)
    )
}

/// Pick a display name for the non-human seat that no human already uses
fn pick_participant_name(pool: &[String], humans: &[HumanSeat], rng: &mut StdRng) -> String {
    let taken: BTreeSet<String> = humans
        .iter()
        .map(|h| h.display_name.to_lowercase())
        .collect();
    let free: Vec<&String> = pool
        .iter()
        .filter(|name| !taken.contains(&name.to_lowercase()))
        .collect();

    if let Some(name) = free.choose(rng) {
        return (*name).clone();
    }
    loop {
        let name = format!("Guest{}", rng.random_range(100..1000));
        if !taken.contains(&name.to_lowercase()) {
            break name;
        }
    }
}

fn validate_text(text: &str, max: usize) -> Result<String, ActionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ActionError::EmptyText);
    }
    if trimmed.chars().count() > max {
        return Err(ActionError::TextTooLong { max });
    }
    Ok(trimmed.to_string())
}

impl GameSession {
    /// Start a game for exactly three humans plus one non-human seat
    pub fn new(
        code: RoomCode,
        humans: Vec<HumanSeat>,
        config: &GameConfig,
        mut rng: StdRng,
    ) -> Result<Self, StartError> {
        if humans.len() != HUMAN_SEATS {
            return Err(StartError::WrongSeatCount {
                expected: HUMAN_SEATS,
                actual: humans.len(),
            });
        }
        let mut ids = BTreeSet::new();
        for human in &humans {
            if !ids.insert(human.id.clone()) {
                return Err(StartError::DuplicateSeat(human.id.clone()));
            }
        }

        let pair = config
            .word_pairs
            .choose(&mut rng)
            .ok_or(StartError::NoWordPairs)?
            .clone();
        let pair = if rng.random_bool(0.5) {
            pair.flipped()
        } else {
            pair
        };

        let participant_name = pick_participant_name(&config.participant_names, &humans, &mut rng);
        let mut roster: Vec<(SeatId, String, bool)> = humans
            .into_iter()
            .map(|h| (h.id, h.display_name, false))
            .collect();
        roster.push((ulid::Ulid::new().to_string(), participant_name, true));
        roster.shuffle(&mut rng);

        let minority = rng.random_range(0..roster.len());
        let seats: Vec<Seat> = roster
            .into_iter()
            .enumerate()
            .map(|(i, (id, display_name, is_participant))| {
                let faction = if i == minority {
                    Faction::Minority
                } else {
                    Faction::Majority
                };
                Seat {
                    id,
                    display_name,
                    is_participant,
                    faction,
                    word: pair.word_for(faction).to_string(),
                    description: None,
                    vote_target: None,
                    has_described: false,
                    has_voted: false,
                    alive: true,
                }
            })
            .collect();

        let alive: BTreeSet<SeatId> = seats.iter().map(|s| s.id.clone()).collect();
        let sequencer = TurnSequencer::shuffled(alive.iter().cloned(), &mut rng);

        let mut session = Self {
            code,
            rules: SessionRules::from(config),
            phase: GamePhase::Lobby,
            cycle: 1,
            version: 1,
            seats,
            alive,
            sequencer,
            description_lines: Vec::new(),
            transcript: Vec::new(),
            history: Vec::new(),
            last_result: None,
            winner: None,
            guesses: BTreeMap::new(),
            pending_guesses: BTreeSet::new(),
            pending_move: None,
            next_request_id: 1,
            rng,
        };
        session.transition(GamePhase::Description);
        session.prepare_turn();
        Ok(session)
    }

    // ========== Accessors ==========

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Bumped on every accepted mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rules(&self) -> &SessionRules {
        &self.rules
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == seat_id)
    }

    pub fn alive(&self) -> &BTreeSet<SeatId> {
        &self.alive
    }

    pub fn turn_order(&self) -> &[SeatId] {
        self.sequencer.order()
    }

    /// Seat whose description is due, only while describing
    pub fn current_turn(&self) -> Option<&SeatId> {
        if self.phase == GamePhase::Description {
            self.sequencer.current()
        } else {
            None
        }
    }

    pub fn description_lines(&self) -> &[ChatLine] {
        &self.description_lines
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    pub fn history(&self) -> &[CycleRecord] {
        &self.history
    }

    pub fn last_result(&self) -> Option<&VoteOutcome> {
        self.last_result.as_ref()
    }

    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    pub fn guesses(&self) -> &BTreeMap<SeatId, SeatId> {
        &self.guesses
    }

    pub fn pending_guesses(&self) -> &BTreeSet<SeatId> {
        &self.pending_guesses
    }

    pub fn participant(&self) -> &Seat {
        &self.seats[self.participant_index()]
    }

    pub fn human_ids(&self) -> impl Iterator<Item = &SeatId> {
        self.seats
            .iter()
            .filter(|s| !s.is_participant)
            .map(|s| &s.id)
    }

    /// True while a participant move has been issued but not answered
    pub fn awaiting_participant(&self) -> bool {
        self.pending_move.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::FinalReveal
    }

    // ========== Internal helpers ==========

    fn participant_index(&self) -> usize {
        // Exactly one participant seat exists from construction on
        self.seats
            .iter()
            .position(|s| s.is_participant)
            .unwrap_or_default()
    }

    fn seat_index(&self, seat_id: &str) -> Result<usize, ActionError> {
        self.seats
            .iter()
            .position(|s| s.id == seat_id)
            .ok_or(ActionError::UnknownSeat)
    }

    fn human_index(&self, seat_id: &str) -> Result<usize, ActionError> {
        let idx = self.seat_index(seat_id)?;
        if self.seats[idx].is_participant {
            // The non-human seat only acts through the adapter
            return Err(ActionError::NotYourTurn);
        }
        Ok(idx)
    }

    fn require_phase(&self, expected: GamePhase) -> Result<(), ActionError> {
        if self.phase != expected {
            return Err(ActionError::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn require_alive(&self, idx: usize) -> Result<(), ActionError> {
        if !self.seats[idx].alive {
            return Err(ActionError::SeatEliminated);
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn transition(&mut self, to: GamePhase) {
        if !is_valid_phase_transition(self.phase, to) {
            tracing::error!(
                "Room {}: invalid phase transition from {:?} to {:?}",
                self.code,
                self.phase,
                to
            );
        }
        tracing::debug!(
            "Room {}: phase {:?} -> {:?} (cycle {})",
            self.code,
            self.phase,
            to,
            self.cycle
        );
        self.phase = to;
    }

    fn request_move(&mut self, kind: MoveKind) {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.pending_move = Some(PendingMove {
            id,
            kind,
            dispatched: false,
        });
    }

    fn participant_alive(&self) -> bool {
        self.participant().alive
    }

    /// Issue a description request if the turn reached the non-human seat
    fn prepare_turn(&mut self) {
        let participant_turn = self
            .sequencer
            .current()
            .and_then(|id| self.seat(id))
            .is_some_and(|s| s.is_participant);
        if participant_turn {
            self.request_move(MoveKind::Description);
        }
    }

    // ========== Description ==========

    pub fn submit_description(&mut self, seat_id: &str, text: &str) -> Result<(), ActionError> {
        self.require_phase(GamePhase::Description)?;
        let idx = self.human_index(seat_id)?;
        self.record_description(idx, text)
    }

    fn record_description(&mut self, idx: usize, text: &str) -> Result<(), ActionError> {
        self.require_phase(GamePhase::Description)?;
        self.require_alive(idx)?;
        if self.sequencer.current() != Some(&self.seats[idx].id) {
            return Err(ActionError::NotYourTurn);
        }
        let text = validate_text(text, self.rules.max_description_chars)?;

        let seat = &mut self.seats[idx];
        seat.description = Some(text.clone());
        seat.has_described = true;
        let line = ChatLine::new(seat, text);
        self.description_lines.push(line);
        self.sequencer.advance();
        self.touch();

        if self.sequencer.is_finished() {
            self.open_discussion();
        } else {
            self.prepare_turn();
        }
        Ok(())
    }

    // ========== Discussion ==========

    fn open_discussion(&mut self) {
        self.transition(GamePhase::Discussion);
        self.pending_move = None;
        if self.participant_alive() {
            self.request_move(MoveKind::Discussion);
        }
    }

    pub fn submit_discussion_message(
        &mut self,
        seat_id: &str,
        text: &str,
    ) -> Result<(), ActionError> {
        self.require_phase(GamePhase::Discussion)?;
        let idx = self.human_index(seat_id)?;
        self.record_message(idx, text)
    }

    fn record_message(&mut self, idx: usize, text: &str) -> Result<(), ActionError> {
        self.require_phase(GamePhase::Discussion)?;
        self.require_alive(idx)?;
        let text = validate_text(text, self.rules.max_message_chars)?;
        let line = ChatLine::new(&self.seats[idx], text);
        self.transcript.push(line);
        self.touch();
        Ok(())
    }

    /// Discussion time budget elapsed; ignored if that cycle's discussion is over
    pub fn expire_discussion(&mut self, cycle: u32) -> bool {
        if self.phase != GamePhase::Discussion || self.cycle != cycle {
            return false;
        }
        self.open_voting();
        true
    }

    // ========== Voting ==========

    fn open_voting(&mut self) {
        for seat in &mut self.seats {
            seat.vote_target = None;
            seat.has_voted = false;
        }
        self.transition(GamePhase::Voting);
        self.pending_move = None;
        if self.participant_alive() {
            self.request_move(MoveKind::Vote);
        }
        self.touch();
    }

    pub fn submit_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), ActionError> {
        self.require_phase(GamePhase::Voting)?;
        let idx = self.human_index(voter_id)?;
        self.record_vote(idx, target_id)
    }

    fn record_vote(&mut self, idx: usize, target_id: &str) -> Result<(), ActionError> {
        self.require_phase(GamePhase::Voting)?;
        self.require_alive(idx)?;
        if self.seats[idx].has_voted {
            return Err(ActionError::AlreadyVoted);
        }
        let target = self
            .seat_index(target_id)
            .map_err(|_| ActionError::UnknownTarget)?;
        if target == idx {
            return Err(ActionError::SelfTarget);
        }
        if !self.seats[target].alive {
            return Err(ActionError::TargetNotAlive);
        }

        let target_id = self.seats[target].id.clone();
        let seat = &mut self.seats[idx];
        seat.vote_target = Some(target_id);
        seat.has_voted = true;
        self.touch();

        let all_voted = self
            .seats
            .iter()
            .filter(|s| s.alive)
            .all(|s| s.has_voted);
        if all_voted {
            self.resolve_round();
        }
        Ok(())
    }

    fn resolve_round(&mut self) {
        let ballots: BTreeMap<SeatId, SeatId> = self
            .seats
            .iter()
            .filter(|s| s.alive)
            .filter_map(|s| Some((s.id.clone(), s.vote_target.clone()?)))
            .collect();
        let factions: BTreeMap<SeatId, Faction> = self
            .seats
            .iter()
            .map(|s| (s.id.clone(), s.faction))
            .collect();

        let result = match resolve_votes(&ballots, &self.alive, &factions, &self.rules.outcome) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    "Room {}: vote tally invariant violated: {}; treating as a tie",
                    self.code,
                    e
                );
                VoteOutcome {
                    eliminated: None,
                    counts: aggregate_votes(&ballots),
                    ballots,
                    outcome: Outcome::Continue,
                }
            }
        };

        if let Some(eliminated) = &result.eliminated {
            if let Some(seat) = self.seats.iter_mut().find(|s| &s.id == eliminated) {
                seat.alive = false;
            }
            self.alive.remove(eliminated);
        }
        tracing::info!(
            "Room {}: cycle {} resolved, eliminated={:?}, outcome={:?}",
            self.code,
            self.cycle,
            result.eliminated,
            result.outcome
        );

        self.winner = result.outcome.winner();
        self.last_result = Some(result);
        self.pending_move = None;
        self.transition(GamePhase::Results);
        self.touch();
    }

    // ========== Results ==========

    /// Explicit "move on": ends discussion early or leaves Results
    pub fn advance_phase(&mut self) -> Result<GamePhase, ActionError> {
        match self.phase {
            GamePhase::Discussion => self.open_voting(),
            GamePhase::Results => self.leave_results(),
            other => return Err(ActionError::CannotAdvance(other)),
        }
        Ok(self.phase)
    }

    /// Results display time elapsed; ignored if that cycle's results are gone
    pub fn expire_results(&mut self, cycle: u32) -> bool {
        if self.phase != GamePhase::Results || self.cycle != cycle {
            return false;
        }
        self.leave_results();
        true
    }

    fn leave_results(&mut self) {
        let terminal = self
            .last_result
            .as_ref()
            .is_some_and(|r| r.outcome.is_terminal());

        if terminal {
            self.pending_guesses = self.human_ids().cloned().collect();
            self.transition(GamePhase::GuessPhase);
            self.touch();
        } else {
            self.start_next_cycle();
        }
    }

    fn start_next_cycle(&mut self) {
        self.history.push(CycleRecord {
            cycle: self.cycle,
            descriptions: std::mem::take(&mut self.description_lines),
            discussion: std::mem::take(&mut self.transcript),
            result: self.last_result.clone(),
        });

        self.cycle += 1;
        for seat in &mut self.seats {
            seat.reset_submissions();
        }
        self.sequencer = TurnSequencer::shuffled(self.alive.iter().cloned(), &mut self.rng);
        self.transition(GamePhase::Description);
        self.prepare_turn();
        self.touch();
    }

    // ========== Guessing ==========

    pub fn submit_guess(&mut self, seat_id: &str, guessed_id: &str) -> Result<(), ActionError> {
        self.require_phase(GamePhase::GuessPhase)?;
        let idx = self
            .human_index(seat_id)
            .map_err(|e| match e {
                ActionError::NotYourTurn => ActionError::NotAGuesser,
                other => other,
            })?;
        let seat_id = self.seats[idx].id.clone();
        if self.guesses.contains_key(&seat_id) {
            return Err(ActionError::AlreadyGuessed);
        }
        let guessed = self
            .seat_index(guessed_id)
            .map_err(|_| ActionError::UnknownTarget)?;
        if guessed == idx {
            return Err(ActionError::SelfTarget);
        }

        let guessed_id = self.seats[guessed].id.clone();
        self.guesses.insert(seat_id.clone(), guessed_id);
        self.pending_guesses.remove(&seat_id);
        self.touch();

        if self.pending_guesses.is_empty() {
            self.transition(GamePhase::FinalReveal);
            tracing::info!("Room {}: all guesses in, final reveal", self.code);
        }
        Ok(())
    }

    // ========== Participant adapter ==========

    /// Take the pending participant request if it has not been handed out yet
    pub fn next_move_request(&mut self) -> Option<MoveRequest> {
        let pending = self.pending_move.as_mut()?;
        if pending.dispatched {
            return None;
        }
        pending.dispatched = true;
        let (request_id, kind) = (pending.id, pending.kind);
        Some(MoveRequest {
            request_id,
            context: self.move_context(kind),
        })
    }

    /// Context shown to the non-human seat: only what that seat may observe
    pub fn move_context(&self, kind: MoveKind) -> MoveContext {
        let me = self.participant();
        let others: Vec<SeatRef> = self
            .seats
            .iter()
            .filter(|s| !s.is_participant)
            .map(SeatRef::from)
            .collect();
        let eligible_targets = match kind {
            MoveKind::Vote => others.iter().filter(|s| s.alive).cloned().collect(),
            _ => Vec::new(),
        };
        let descriptions = self
            .history
            .iter()
            .flat_map(|record| record.descriptions.iter().cloned())
            .chain(self.description_lines.iter().cloned())
            .collect();
        let max_chars = match kind {
            MoveKind::Description => self.rules.max_description_chars,
            _ => self.rules.max_message_chars,
        };

        MoveContext {
            kind,
            cycle: self.cycle,
            seat_name: me.display_name.clone(),
            word: me.word.clone(),
            stance: Stance::from(me.faction),
            others,
            descriptions,
            transcript: self.transcript.clone(),
            eligible_targets,
            max_chars,
        }
    }

    /// Apply the reply to a participant request. `None` (or a move the
    /// session rejects) is replaced by the local fallback.
    pub fn apply_participant_move(
        &mut self,
        request_id: RequestId,
        mv: Option<ParticipantMove>,
    ) -> Result<(), ActionError> {
        let kind = match &self.pending_move {
            Some(pending) if pending.id == request_id => pending.kind,
            _ => return Err(ActionError::StaleParticipantMove),
        };
        self.pending_move = None;
        let idx = self.participant_index();

        if let Some(mv) = mv {
            match self.apply_move(idx, kind, mv) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(
                    "Room {}: participant {:?} move rejected ({}), using fallback",
                    self.code,
                    kind,
                    e
                ),
            }
        } else {
            tracing::warn!(
                "Room {}: no usable participant {:?} move, using fallback",
                self.code,
                kind
            );
        }

        let fallback = self.fallback_move(kind);
        self.apply_move(idx, kind, fallback)
    }

    fn apply_move(
        &mut self,
        idx: usize,
        kind: MoveKind,
        mv: ParticipantMove,
    ) -> Result<(), ActionError> {
        match (kind, mv) {
            (MoveKind::Description, ParticipantMove::Utterance(text)) => {
                self.record_description(idx, &text)
            }
            (MoveKind::Discussion, ParticipantMove::Utterance(text)) => {
                self.record_message(idx, &text)
            }
            (MoveKind::Vote, ParticipantMove::Vote(target)) => self.record_vote(idx, &target),
            _ => Err(ActionError::StaleParticipantMove),
        }
    }

    fn fallback_move(&mut self, kind: MoveKind) -> ParticipantMove {
        match kind {
            MoveKind::Vote => {
                let me = self.participant().id.clone();
                let eligible: Vec<SeatId> = self
                    .alive
                    .iter()
                    .filter(|id| **id != me)
                    .cloned()
                    .collect();
                match eligible.choose(&mut self.rng) {
                    Some(target) => ParticipantMove::Vote(target.clone()),
                    None => ParticipantMove::Vote(me),
                }
            }
            MoveKind::Description | MoveKind::Discussion => {
                let max = match kind {
                    MoveKind::Description => self.rules.max_description_chars,
                    _ => self.rules.max_message_chars,
                };
                let text = fallback::utterance(kind, &mut self.rng);
                ParticipantMove::Utterance(text.chars().take(max).collect())
            }
        }
    }
}
