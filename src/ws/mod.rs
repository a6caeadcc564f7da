pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::SplitSink, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::{AppState, RoomEvent};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: String,
    pub name: String,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={:?}, name={:?}",
        params.room,
        params.name
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Serialize and send one message; false if the socket is gone
async fn send_json(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (room, seat_id) = match state.registry.join_room(&params.room, &params.name).await {
        Ok(joined) => joined,
        Err(e) => {
            tracing::info!("Join rejected: {}", e);
            let _ = send_json(&mut sender, &ServerMessage::from(&e)).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let mut events = room.subscribe();

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        room_code: room.code().clone(),
        seat_id: seat_id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    let initial = handlers::view_message(&room, &seat_id).await;
    if !send_json(&mut sender, &welcome).await || !send_json(&mut sender, &initial).await {
        tracing::error!("Failed to send welcome message");
        room.leave(seat_id).await;
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(RoomEvent::Updated { .. }) | Err(RecvError::Lagged(_)) => {
                        let view = handlers::view_message(&room, &seat_id).await;
                        if !send_json(&mut sender, &view).await {
                            break;
                        }
                    }
                    Ok(RoomEvent::Closed { reason }) => {
                        let _ = send_json(&mut sender, &ServerMessage::RoomClosed { reason }).await;
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &room, &seat_id).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                }
                            }
                        };
                        if !send_json(&mut sender, &response).await {
                            tracing::error!("Failed to send response");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(room.code = %room.code(), seat.id = %seat_id, "WebSocket connection closed");
    room.leave(seat_id).await;
}
