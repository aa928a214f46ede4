//! Room management API handlers.
//!
//! This module provides HTTP REST endpoints for rooms:
//! - Listing all open rooms with their participants and phase
//! - Creating a room from the server defaults
//! - Getting the state of a specific room
//! - Closing a room
//!
//! Gameplay itself never goes through these endpoints; it travels as
//! envelopes over the room's websocket.
//!
//! # Examples
//!
//! Create a room:
//! ```bash
//! curl -X POST http://localhost:3000/api/rooms \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Lagoon", "max_players": 3}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use flood_isle::room::{RoomError, RoomId, RoomStateResponse};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{metrics, observer};

#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub max_players: Option<usize>,
    /// Fixes the island layout and every shuffle of the room's games
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: RoomError) -> ApiError {
    let status = match err {
        RoomError::NotFound(_) => StatusCode::NOT_FOUND,
        RoomError::Closed => StatusCode::GONE,
        RoomError::TooManyRooms(_) => StatusCode::SERVICE_UNAVAILABLE,
        RoomError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::CONFLICT,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// List all open rooms.
///
/// # Response
///
/// Returns `200 OK` with the state of every open room, oldest first.
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomStateResponse>> {
    Json(state.rooms.list_rooms().await)
}

/// Create a room.
///
/// Every field of the body is optional; missing fields take the server
/// defaults.
///
/// # Response
///
/// Returns `201 Created` with the new room's state.
///
/// # Errors
///
/// - `400 Bad Request`: The resulting room configuration is invalid
/// - `503 Service Unavailable`: The server already runs its maximum number of rooms
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomStateResponse>), ApiError> {
    let room_number = state.rooms.room_count().await + 1;
    let name = request
        .name
        .unwrap_or_else(|| format!("Room {room_number}"));

    let mut config = state.config.room_config(&name);
    if let Some(max_players) = request.max_players {
        config.max_players = max_players;
    }
    config.game.seed = request.seed;

    let handle = state.rooms.create_room(config).await.map_err(api_error)?;
    observer::spawn_room_observer(&handle).await;
    metrics::rooms_created_total();
    metrics::active_rooms(state.rooms.room_count().await);

    let room = handle.state().await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Get the state of a room.
///
/// # Errors
///
/// - `404 Not Found`: Room doesn't exist or has closed
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomStateResponse>, ApiError> {
    let handle = state
        .rooms
        .get_room(room_id)
        .await
        .ok_or_else(|| api_error(RoomError::NotFound(room_id)))?;

    handle.state().await.map(Json).map_err(api_error)
}

/// Close a room. Every participant receives a final notice and is
/// disconnected.
///
/// # Response
///
/// Returns `204 No Content`.
///
/// # Errors
///
/// - `404 Not Found`: Room doesn't exist
pub async fn close_room(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<StatusCode, ApiError> {
    state.rooms.close_room(room_id).await.map_err(api_error)?;
    metrics::active_rooms(state.rooms.room_count().await);
    Ok(StatusCode::NO_CONTENT)
}
