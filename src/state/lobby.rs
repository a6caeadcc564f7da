use crate::error::JoinError;
use crate::types::{HumanSeat, SeatId};

/// Number of human seats in every game
pub const HUMAN_SEATS: usize = 3;
pub const MAX_NAME_CHARS: usize = 24;

/// Pre-game membership of one room
#[derive(Debug, Clone, Default)]
pub struct Lobby {
    members: Vec<HumanSeat>,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self) -> &[HumanSeat] {
        &self.members
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= HUMAN_SEATS
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, seat_id: &SeatId) -> bool {
        self.members.iter().any(|m| &m.id == seat_id)
    }

    /// Add a human with a fresh seat id
    pub fn join(&mut self, display_name: &str) -> Result<SeatId, JoinError> {
        let name = display_name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(JoinError::InvalidName {
                max: MAX_NAME_CHARS,
            });
        }
        if self.is_full() {
            return Err(JoinError::RoomFull);
        }
        if self
            .members
            .iter()
            .any(|m| m.display_name.to_lowercase() == name.to_lowercase())
        {
            return Err(JoinError::DuplicateName);
        }

        let seat = HumanSeat {
            id: ulid::Ulid::new().to_string(),
            display_name: name.to_string(),
        };
        let id = seat.id.clone();
        self.members.push(seat);
        Ok(id)
    }

    /// Remove a member, returning it if present
    pub fn leave(&mut self, seat_id: &SeatId) -> Option<HumanSeat> {
        let pos = self.members.iter().position(|m| &m.id == seat_id)?;
        Some(self.members.remove(pos))
    }
}
