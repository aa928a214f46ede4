//! HTTP/WebSocket API for the room server.
//!
//! Rooms are managed over a small REST surface; gameplay happens over one
//! websocket per participant, carrying pipe-delimited envelopes in both
//! directions.
//!
//! # Modules
//!
//! - [`rooms`]: Room management (list, create, inspect, close)
//! - [`websocket`]: Per-participant frame transport into a room actor
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                          - Health check
//! GET    /api/rooms                       - List open rooms
//! POST   /api/rooms                       - Create a room
//! GET    /api/rooms/{room_id}             - Room state
//! DELETE /api/rooms/{room_id}             - Close a room
//! GET    /ws/{room_id}?player=NAME&role=R - Join a room over websocket
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use fi_server::{api::{AppState, create_router}, config::ServerConfig};
//! use flood_isle::room::RoomManager;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(RoomManager::default(), ServerConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use flood_isle::room::RoomManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// This state is cloned for each request; the room manager shares its
/// registry and the configuration sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomManager,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(rooms: RoomManager, config: ServerConfig) -> Self {
        Self {
            rooms,
            config: Arc::new(config),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Arguments
///
/// - `state`: Application state with the room manager
///
/// # Returns
///
/// Configured Axum router ready to serve requests
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route(
            "/rooms/{room_id}",
            get(rooms::get_room).delete(rooms::close_room),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{room_id}", get(websocket::websocket_handler))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` while the room registry answers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"0.4.0","rooms":{"active_count":1,"max":64}}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let room_count = state.rooms.room_count().await;

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": {
            "active_count": room_count,
            "max": state.rooms.max_rooms(),
        },
    });

    (StatusCode::OK, Json(response))
}
