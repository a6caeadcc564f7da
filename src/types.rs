use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type SeatId = String;
pub type RoomCode = String;
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    Description,
    Discussion,
    Voting,
    Results,
    GuessPhase,
    FinalReveal,
}

impl GamePhase {
    /// Phases in which the outcome of the game may already be decided
    pub fn is_post_vote(&self) -> bool {
        matches!(
            self,
            GamePhase::Results | GamePhase::GuessPhase | GamePhase::FinalReveal
        )
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Majority,
    Minority,
}

/// How the non-human seat should play, derived from its faction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Majority seat: find and vote out whoever holds the other word
    SeekOutlier,
    /// Minority seat: stay vague and blend in with the majority
    BlendIn,
}

impl From<Faction> for Stance {
    fn from(faction: Faction) -> Self {
        match faction {
            Faction::Majority => Stance::SeekOutlier,
            Faction::Minority => Stance::BlendIn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordPair {
    pub majority: String,
    pub minority: String,
}

impl WordPair {
    pub fn new(majority: impl Into<String>, minority: impl Into<String>) -> Self {
        Self {
            majority: majority.into(),
            minority: minority.into(),
        }
    }

    pub fn word_for(&self, faction: Faction) -> &str {
        match faction {
            Faction::Majority => &self.majority,
            Faction::Minority => &self.minority,
        }
    }

    /// Same pair with the two words swapped
    pub fn flipped(&self) -> Self {
        Self {
            majority: self.minority.clone(),
            minority: self.majority.clone(),
        }
    }
}

/// A human waiting in a lobby, handed to the session at game start
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanSeat {
    pub id: SeatId,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub display_name: String,
    pub is_participant: bool,
    pub faction: Faction,
    pub word: String,
    pub description: Option<String>,
    pub vote_target: Option<SeatId>,
    pub has_described: bool,
    pub has_voted: bool,
    pub alive: bool,
}

impl Seat {
    /// Clear everything a seat submitted during a cycle
    pub fn reset_submissions(&mut self) {
        self.description = None;
        self.vote_target = None;
        self.has_described = false;
        self.has_voted = false;
    }
}

/// One line of public text: a description or a discussion message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatLine {
    pub seat_id: SeatId,
    pub display_name: String,
    pub text: String,
    pub ts: String,
}

impl ChatLine {
    pub fn new(seat: &Seat, text: String) -> Self {
        Self {
            seat_id: seat.id.clone(),
            display_name: seat.display_name.clone(),
            text,
            ts: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Which kind of move is requested from the non-human seat
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Description,
    Discussion,
    Vote,
}

/// A move produced by (or on behalf of) the non-human seat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantMove {
    Utterance(String),
    Vote(SeatId),
}
