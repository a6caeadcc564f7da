use crate::error::{ActionError, JoinError};
use crate::state::{RoomView, SeatAction};
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    Describe { text: String },
    Chat { text: String },
    Vote { target: SeatId },
    Guess { target: SeatId },
    Advance,
}

impl From<ClientMessage> for SeatAction {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Describe { text } => SeatAction::Describe(text),
            ClientMessage::Chat { text } => SeatAction::Chat(text),
            ClientMessage::Vote { target } => SeatAction::Vote(target),
            ClientMessage::Guess { target } => SeatAction::Guess(target),
            ClientMessage::Advance => SeatAction::Advance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        room_code: RoomCode,
        seat_id: SeatId,
        server_now: String,
    },
    View {
        view: RoomView,
    },
    /// Action accepted
    Ack,
    Error {
        code: String,
        msg: String,
    },
    RoomClosed {
        reason: String,
    },
}

impl From<&ActionError> for ServerMessage {
    fn from(e: &ActionError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}

impl From<&JoinError> for ServerMessage {
    fn from(e: &JoinError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}
