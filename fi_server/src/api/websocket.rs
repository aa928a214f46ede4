//! WebSocket transport between a participant and a room actor.
//!
//! Each connection is one participant. Text frames from the client are
//! handed to the room verbatim; everything the room addresses to the
//! participant is written back verbatim. Acknowledgments, retransmissions
//! and duplicate suppression all happen inside the room, so this layer only
//! moves frames.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{room_id}?player=<name>&role=<role>`
//! 2. Server checks the room exists and upgrades
//! 3. The participant joins the room with a fresh outbox
//! 4. Server spawns a send task draining the outbox into the socket
//! 5. On disconnect the participant leaves the room
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws/4f1c...?player=ann&role=pilot');
//!
//! ws.onmessage = (event) => {
//!   const [id, type, roomId, from, to, isAck] = event.data.split('|');
//!   if (isAck !== 'true') {
//!     ws.send(`${id}|MESSAGE_ACK|${roomId}|ann|${from}|true`);
//!   }
//! };
//!
//! ws.send(`1|GAME_START|${roomId}|ann||false`);
//! ```

use std::str::FromStr;

use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use flood_isle::{
    PlayerName, RoleKind,
    room::{RoomError, RoomHandle, RoomId, RoomResponse},
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::AppState;
use crate::{logging, metrics};

/// Frames buffered per participant before the room treats them as lost
const OUTBOX_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    player: String,
    role: Option<String>,
}

/// Upgrade HTTP connection to WebSocket for a room.
///
/// # Path Parameters
///
/// - `room_id`: Room to join
///
/// # Query Parameters
///
/// - `player`: Participant name, unique within the room
/// - `role`: Optional requested role (`pilot`, `engineer`, ...)
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// Returns `404 Not Found` for an unknown room and `400 Bad Request` for an
/// empty name or unknown role.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<RoomId>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let Some(room) = state.rooms.get_room(room_id).await else {
        return (StatusCode::NOT_FOUND, "Room not found").into_response();
    };

    let name = PlayerName::new(&query.player);
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Player name must not be empty").into_response();
    }

    let role = match query.role.as_deref().map(RoleKind::from_str).transpose() {
        Ok(role) => role,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, room, name, role))
}

/// Handle an established WebSocket connection.
///
/// # Arguments
///
/// - `socket`: The WebSocket connection
/// - `room`: Room the participant joins
/// - `name`: Participant name
/// - `role`: Requested role, if any
async fn handle_socket(socket: WebSocket, room: RoomHandle, name: PlayerName, role: Option<RoleKind>) {
    let (mut sender, mut receiver) = socket.split();
    let room_id = room.room_id().to_string();

    logging::log_connection_event("connected", &room_id, name.as_str());
    metrics::websocket_connections_total();
    metrics::websocket_connections_active(1.0);

    let (outbox, mut frames) = mpsc::channel::<String>(OUTBOX_CAPACITY);
    let joined = match room.join(name.clone(), role, outbox).await {
        Ok(RoomResponse::Success) => Ok(()),
        Ok(response) => Err(response.error_message().unwrap_or_default()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(reason) = joined {
        warn!("{} could not join room {}: {}", name, room_id, reason);
        let close = CloseFrame {
            code: close_code::POLICY,
            reason: reason.into(),
        };
        let _ = sender.send(Message::Close(Some(close))).await;
        metrics::websocket_connections_active(-1.0);
        return;
    }

    // The outbox closes when the room drops the participant.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
            metrics::frames_sent();
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::frames_received();
                match room.deliver_frame(name.clone(), text.as_str().to_owned()).await {
                    Ok(RoomResponse::BadFrame(e)) => {
                        logging::log_rejected_frame(&room_id, name.as_str(), &e.to_string());
                        metrics::frames_rejected("malformed");
                    }
                    Ok(RoomResponse::Rejected(violation)) => {
                        info!("{} in room {}: {}", name, room_id, violation);
                        metrics::frames_rejected("rule");
                    }
                    Ok(RoomResponse::Error(RoomError::NotInRoom(_))) | Err(RoomError::Closed) => break,
                    Ok(RoomResponse::Error(e)) => warn!("Room {} refused frame from {}: {}", room_id, name, e),
                    Ok(RoomResponse::Success | RoomResponse::Ignored) => {}
                    Err(e) => {
                        error!("Room {} failed: {}", room_id, e);
                        break;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary frame from {} in room {}", name, room_id);
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    match room.leave(name.clone()).await {
        Ok(RoomResponse::Success) => info!("{} left room {} on disconnect", name, room_id),
        // Already gone: left with a LEAVE_ROOM frame or the room closed.
        Ok(_) | Err(_) => {}
    }

    metrics::websocket_connections_active(-1.0);
    logging::log_connection_event("disconnected", &room_id, name.as_str());
}
