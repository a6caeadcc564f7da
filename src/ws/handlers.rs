//! WebSocket message dispatch
//!
//! A socket is bound to one seat at connect time, so every client message is
//! applied on behalf of that seat only.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{RoomHandle, SeatAction};
use crate::types::SeatId;

/// Apply a client message to the room and build the reply
pub async fn handle_message(
    msg: ClientMessage,
    room: &RoomHandle,
    seat_id: &SeatId,
) -> ServerMessage {
    let action = SeatAction::from(msg);
    tracing::debug!(room.code = %room.code(), seat.id = %seat_id, ?action, "Client action");

    match room.act(seat_id.clone(), action).await {
        Ok(()) => ServerMessage::Ack,
        Err(e) => ServerMessage::from(&e),
    }
}

/// Fetch the seat's current view as a server message
pub async fn view_message(room: &RoomHandle, seat_id: &SeatId) -> ServerMessage {
    match room.view(seat_id.clone()).await {
        Ok(view) => ServerMessage::View { view },
        Err(e) => ServerMessage::from(&e),
    }
}
