//! Multi-room flood isle server using async actor model.
//!
//! This server spawns RoomActor instances managed by RoomManager and serves
//! them over HTTP and websockets.

use std::net::SocketAddr;

use anyhow::Error;
use fi_server::{
    api,
    config::ServerConfig,
    logging, metrics, observer,
};
use flood_isle::room::RoomManager;
use log::{error, info};
use pico_args::Arguments;

const HELP: &str = "\
Run a multi-room flood isle server

USAGE:
  fi_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --metrics-bind  IP:PORT  Prometheus scrape address   [default: env METRICS_BIND, disabled when unset]
  --rooms         N        Number of rooms to create   [default: env INITIAL_ROOMS or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter address
  MAX_ROOMS                Maximum number of open rooms
  ROOM_MAX_PLAYERS         Participants per room (2-4)
  ROOM_ACTIONS_PER_TURN    Actions per turn
  ROOM_HAND_LIMIT          Cards held before discarding
  RETRY_INTERVAL_MS        Delay between retransmissions
  MAX_RETRIES              Retransmissions before a participant is degraded
  RUST_LOG                 Log filter
";

struct Args {
    bind: Option<SocketAddr>,
    metrics_bind: Option<SocketAddr>,
    rooms: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
        rooms: pargs.opt_value_from_str("--rooms")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.metrics_bind, args.rooms)?;
    config.validate()?;
    info!("Starting multi-room flood isle server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics at http://{}/metrics", addr);
    }

    let rooms = RoomManager::new(config.max_rooms);

    info!("Creating {} initial room(s)...", config.initial_rooms);
    for i in 0..config.initial_rooms {
        match rooms.create_room(config.room_config(&format!("Room {}", i + 1))).await {
            Ok(handle) => {
                observer::spawn_room_observer(&handle).await;
                metrics::rooms_created_total();
                info!("Created room {} with ID {}", i + 1, handle.room_id());
            }
            Err(e) => {
                error!("Failed to create room {}: {}", i + 1, e);
            }
        }
    }
    metrics::active_rooms(rooms.room_count().await);

    for room in rooms.list_rooms().await {
        info!(
            "  - {} (ID: {}) - {}/{} players",
            room.room_name,
            room.room_id,
            room.players.len(),
            room.max_players
        );
    }

    let bind = config.bind;
    let app = api::create_router(api::AppState::new(rooms, config));

    info!("Starting HTTP/WebSocket server on {}", bind);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind, e))?;

    info!("Server is running at http://{}. Press Ctrl+C to stop.", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
