//! HTTP API endpoints for room management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::JoinError;
use crate::protocol::ServerMessage;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct CreatedRoom {
    pub code: String,
}

/// Create a new, empty room.
///
/// POST /api/rooms
pub async fn create_room(State(state): State<Arc<AppState>>) -> (StatusCode, Json<CreatedRoom>) {
    let room = state.registry.create_room().await;
    (
        StatusCode::CREATED,
        Json(CreatedRoom {
            code: room.code().clone(),
        }),
    )
}

/// Public status of a room.
///
/// GET /api/rooms/{code}
pub async fn room_status(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Response {
    let status = match state.registry.get(&code).await {
        Some(room) => room.status().await,
        None => None,
    };

    match status {
        Some(status) => Json(status).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ServerMessage::Error {
                code: JoinError::RoomNotFound.code().to_string(),
                msg: format!("No room with code {}", code),
            }),
        )
            .into_response(),
    }
}
