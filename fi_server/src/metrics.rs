//! Prometheus metrics for monitoring room server health.
//!
//! Metrics are exposed in Prometheus text format for scraping by monitoring
//! systems. Until [`init_metrics`] installs the exporter every recording
//! function is a no-op.
//!
//! # Metrics Categories
//!
//! - **WebSocket Metrics**: Connections, frames received/sent/rejected
//! - **Room Metrics**: Rooms created, active rooms
//! - **Delivery Metrics**: Participants degraded after exhausting retries
//! - **Game Metrics**: Games started and finished
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use fi_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connections_total();
//! metrics::frames_received();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Track a connection opening (`1.0`) or closing (`-1.0`).
pub fn websocket_connections_active(delta: f64) {
    metrics::gauge!("websocket_connections_active").increment(delta);
}

/// Increment frames received from participants.
pub fn frames_received() {
    metrics::counter!("frames_received_total").increment(1);
}

/// Increment frames written to participants.
pub fn frames_sent() {
    metrics::counter!("frames_sent_total").increment(1);
}

/// Increment frames the room refused, labelled `malformed` or `rule`.
pub fn frames_rejected(kind: &'static str) {
    metrics::counter!("frames_rejected_total", "kind" => kind).increment(1);
}

// ============================================================================
// Room Metrics
// ============================================================================

/// Increment rooms created counter.
pub fn rooms_created_total() {
    metrics::counter!("rooms_created_total").increment(1);
}

/// Set current open rooms count.
pub fn active_rooms(count: usize) {
    metrics::gauge!("active_rooms").set(count as f64);
}

// ============================================================================
// Delivery Metrics
// ============================================================================

/// Increment participants marked degraded.
pub fn participants_degraded_total() {
    metrics::counter!("participants_degraded_total").increment(1);
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Increment games started counter.
pub fn games_started_total() {
    metrics::counter!("games_started_total").increment(1);
}

/// Increment games finished counter with the outcome label.
pub fn games_finished_total(won: bool) {
    metrics::counter!("games_finished_total",
        "outcome" => if won { "won" } else { "lost" }
    )
    .increment(1);
}
