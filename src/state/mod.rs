pub mod lobby;
pub mod registry;
pub mod room;
pub mod sequencer;
pub mod session;
pub mod tally;
pub mod visibility;

pub use registry::RoomRegistry;
pub use room::{RoomEvent, RoomHandle, RoomStatus, SeatAction};
pub use session::GameSession;
pub use visibility::{RoomView, SeatView};

use crate::config::GameConfig;
use crate::participant::ParticipantBrain;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: RoomRegistry,
}

impl AppState {
    pub fn new(config: GameConfig, brain: Arc<dyn ParticipantBrain>) -> Self {
        Self {
            registry: RoomRegistry::new(Arc::new(config), brain),
        }
    }
}
