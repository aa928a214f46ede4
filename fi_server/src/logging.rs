//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; those records are
//! bridged into the same `tracing` subscriber so one filter controls both.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var.
///
/// # Example
///
/// ```no_run
/// use fi_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flood_isle=info,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a websocket connection lifecycle event
///
/// # Arguments
///
/// * `event` - What happened (`connected`, `joined`, `disconnected`, ...)
/// * `room_id` - Room the connection belongs to
/// * `player` - Participant name
///
/// # Example
///
/// ```
/// use fi_server::logging::log_connection_event;
///
/// log_connection_event("connected", "4f1c", "ann");
/// ```
pub fn log_connection_event(event: &str, room_id: &str, player: &str) {
    tracing::info!(
        event = event,
        room_id = room_id,
        player = player,
        "Connection event"
    );
}

/// Log a frame the room refused to decode
///
/// # Arguments
///
/// * `room_id` - Room the frame was sent to
/// * `player` - Sender
/// * `reason` - Decode error
pub fn log_rejected_frame(room_id: &str, player: &str, reason: &str) {
    tracing::warn!(
        room_id = room_id,
        player = player,
        reason = reason,
        "Rejected malformed frame"
    );
}

/// Log a participant whose envelopes exhausted their retries
///
/// # Arguments
///
/// * `room_id` - Room the participant belongs to
/// * `player` - Participant that stopped acknowledging
pub fn log_delivery_failure(room_id: &str, player: &str) {
    tracing::warn!(
        room_id = room_id,
        player = player,
        "DELIVERY: participant degraded after exhausting retries"
    );
}

/// Log the end of a game
///
/// # Arguments
///
/// * `room_id` - Room the game ran in
/// * `outcome` - `won` or the loss reason
pub fn log_game_over(room_id: &str, outcome: &str) {
    tracing::info!(room_id = room_id, outcome = outcome, "Game over");
}
