use super::room::RoomHandle;
use crate::config::GameConfig;
use crate::error::JoinError;
use crate::participant::ParticipantBrain;
use crate::types::{RoomCode, SeatId};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Safe character set for short codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

/// Generate a random short code (5 characters)
fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Codes are case-insensitive on input
pub fn normalize_code(code: &str) -> RoomCode {
    code.trim().to_uppercase()
}

/// All live rooms, keyed by short code
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomCode, RoomHandle>>>,
    config: Arc<GameConfig>,
    brain: Arc<dyn ParticipantBrain>,
}

impl RoomRegistry {
    pub fn new(config: Arc<GameConfig>, brain: Arc<dyn ParticipantBrain>) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config,
            brain,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Create an empty room with a fresh code and start its actor
    pub async fn create_room(&self) -> RoomHandle {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let handle = RoomHandle::spawn(
            code.clone(),
            self.config.clone(),
            self.brain.clone(),
            self.clone(),
        );
        rooms.insert(code.clone(), handle.clone());
        tracing::info!(room.code = %code, rooms = rooms.len(), "Room created");
        handle
    }

    pub async fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(&normalize_code(code)).cloned()
    }

    /// Join a room by code, returning its handle and the new seat id
    pub async fn join_room(
        &self,
        code: &str,
        display_name: &str,
    ) -> Result<(RoomHandle, SeatId), JoinError> {
        let handle = self.get(code).await.ok_or(JoinError::RoomNotFound)?;
        let seat_id = handle.join(display_name.to_string()).await?;
        Ok((handle, seat_id))
    }

    /// Drop a room from the index; returns whether it was present
    pub async fn remove(&self, code: &str) -> bool {
        let removed = self.rooms.write().await.remove(&normalize_code(code)).is_some();
        if removed {
            tracing::info!(room.code = %code, "Room removed from registry");
        }
        removed
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
