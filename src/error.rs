//! Error taxonomy for joins, in-game actions and tally invariants.
//!
//! Every error carries a stable wire code so transports can report why an
//! action was rejected without matching on display strings.

use crate::types::{GamePhase, SeatId};
use thiserror::Error;

/// Rejected join attempts (no state change)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Display name is already taken in this room")]
    DuplicateName,
    #[error("Display name must be 1 to {max} characters")]
    InvalidName { max: usize },
    #[error("Game already in progress")]
    GameInProgress,
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::RoomNotFound => "ROOM_NOT_FOUND",
            JoinError::RoomFull => "ROOM_FULL",
            JoinError::DuplicateName => "DUPLICATE_NAME",
            JoinError::InvalidName { .. } => "INVALID_NAME",
            JoinError::GameInProgress => "GAME_IN_PROGRESS",
        }
    }
}

/// Rejected game actions (no state change)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Room is closed")]
    RoomClosed,
    #[error("Unknown seat")]
    UnknownSeat,
    #[error("Action requires phase {expected}, but the game is in {actual}")]
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("Eliminated seats cannot act")]
    SeatEliminated,
    #[error("Target seat is not alive")]
    TargetNotAlive,
    #[error("You cannot target yourself")]
    SelfTarget,
    #[error("Unknown target seat")]
    UnknownTarget,
    #[error("You have already voted this round")]
    AlreadyVoted,
    #[error("You have already submitted a guess")]
    AlreadyGuessed,
    #[error("Only human seats submit guesses")]
    NotAGuesser,
    #[error("Text must not be empty")]
    EmptyText,
    #[error("Text exceeds {max} characters")]
    TextTooLong { max: usize },
    #[error("Cannot advance from phase {0}")]
    CannotAdvance(GamePhase),
    #[error("Participant move does not match the pending request")]
    StaleParticipantMove,
}

impl ActionError {
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::RoomClosed => "ROOM_CLOSED",
            ActionError::UnknownSeat => "UNKNOWN_SEAT",
            ActionError::WrongPhase { .. } => "WRONG_PHASE",
            ActionError::NotYourTurn => "NOT_YOUR_TURN",
            ActionError::SeatEliminated => "SEAT_ELIMINATED",
            ActionError::TargetNotAlive => "TARGET_NOT_ALIVE",
            ActionError::SelfTarget => "SELF_TARGET",
            ActionError::UnknownTarget => "UNKNOWN_TARGET",
            ActionError::AlreadyVoted => "ALREADY_VOTED",
            ActionError::AlreadyGuessed => "ALREADY_GUESSED",
            ActionError::NotAGuesser => "NOT_A_GUESSER",
            ActionError::EmptyText => "EMPTY_TEXT",
            ActionError::TextTooLong { .. } => "TEXT_TOO_LONG",
            ActionError::CannotAdvance(_) => "CANNOT_ADVANCE",
            ActionError::StaleParticipantMove => "STALE_PARTICIPANT_MOVE",
        }
    }
}

/// Session construction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("A game needs exactly {expected} human seats, got {actual}")]
    WrongSeatCount { expected: usize, actual: usize },
    #[error("Duplicate seat id {0}")]
    DuplicateSeat(SeatId),
    #[error("No word pairs configured")]
    NoWordPairs,
}

/// Ballot sets that cannot come from a valid voting round
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TallyError {
    #[error("{votes} ballots cast but only {alive} seats are alive")]
    TooManyBallots { votes: usize, alive: usize },
    #[error("Ballot cast by non-alive seat {0}")]
    VoterNotAlive(SeatId),
    #[error("Ballot names non-alive seat {0}")]
    TargetNotAlive(SeatId),
    #[error("Seat {0} voted for itself")]
    SelfVote(SeatId),
    #[error("Seat {0} has no faction")]
    MissingFaction(SeatId),
}
