//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use flood_isle::{
    constants::{MAX_PLAYERS, MIN_PLAYERS},
    room::{RoomConfig, manager::DEFAULT_MAX_ROOMS},
};
use std::net::SocketAddr;

/// Default address the HTTP/WebSocket server binds to
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape address; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Maximum number of rooms open at once
    pub max_rooms: usize,
    /// Number of rooms to create on startup
    pub initial_rooms: usize,
    /// Defaults applied to every room the server creates
    pub room_defaults: RoomDefaultsConfig,
}

/// Default room configuration
#[derive(Debug, Clone)]
pub struct RoomDefaultsConfig {
    /// Maximum participants per room
    pub max_players: usize,
    /// Actions each player gets per turn
    pub actions_per_turn: usize,
    /// Cards a player may hold before discarding
    pub hand_limit: usize,
    /// Delay between retransmissions in milliseconds
    pub retry_interval_ms: u64,
    /// Retransmissions before a participant is marked degraded
    pub max_retries: u32,
}

impl Default for RoomDefaultsConfig {
    fn default() -> Self {
        let room = RoomConfig::default();
        Self {
            max_players: room.max_players,
            actions_per_turn: room.game.actions_per_turn,
            hand_limit: room.game.hand_limit,
            retry_interval_ms: room.retry_interval_ms,
            max_retries: room.max_retries,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `metrics_override` - Optional metrics address override (from CLI args)
    /// * `rooms_override` - Optional number of startup rooms (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        metrics_override: Option<SocketAddr>,
        rooms_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr_env("SERVER_BIND")?.unwrap_or(default_bind()?),
        };

        let metrics_bind = match metrics_override {
            Some(addr) => Some(addr),
            None => parse_addr_env("METRICS_BIND")?,
        };

        let defaults = RoomDefaultsConfig::default();
        let room_defaults = RoomDefaultsConfig {
            max_players: parse_env_or("ROOM_MAX_PLAYERS", defaults.max_players),
            actions_per_turn: parse_env_or("ROOM_ACTIONS_PER_TURN", defaults.actions_per_turn),
            hand_limit: parse_env_or("ROOM_HAND_LIMIT", defaults.hand_limit),
            retry_interval_ms: parse_env_or("RETRY_INTERVAL_MS", defaults.retry_interval_ms),
            max_retries: parse_env_or("MAX_RETRIES", defaults.max_retries),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            max_rooms: parse_env_or("MAX_ROOMS", DEFAULT_MAX_ROOMS),
            initial_rooms: rooms_override.unwrap_or_else(|| parse_env_or("INITIAL_ROOMS", 1)),
            room_defaults,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rooms == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_ROOMS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.initial_rooms > self.max_rooms {
            return Err(ConfigError::Invalid {
                var: "INITIAL_ROOMS".to_string(),
                reason: format!("Cannot exceed max rooms ({})", self.max_rooms),
            });
        }

        let players = self.room_defaults.max_players;
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
            return Err(ConfigError::Invalid {
                var: "ROOM_MAX_PLAYERS".to_string(),
                reason: format!("Must be between {MIN_PLAYERS} and {MAX_PLAYERS}"),
            });
        }

        if self.room_defaults.actions_per_turn == 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_ACTIONS_PER_TURN".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.room_defaults.hand_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_HAND_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.room_defaults.retry_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "RETRY_INTERVAL_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Room configuration for a new room with the server defaults applied
    pub fn room_config(&self, name: &str) -> RoomConfig {
        let mut room = RoomConfig {
            name: name.to_string(),
            max_players: self.room_defaults.max_players,
            retry_interval_ms: self.room_defaults.retry_interval_ms,
            max_retries: self.room_defaults.max_retries,
            ..RoomConfig::default()
        };
        room.game.actions_per_turn = self.room_defaults.actions_per_turn;
        room.game.hand_limit = self.room_defaults.hand_limit;
        room
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 6969)),
            metrics_bind: None,
            max_rooms: DEFAULT_MAX_ROOMS,
            initial_rooms: 1,
            room_defaults: RoomDefaultsConfig::default(),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("Default {DEFAULT_BIND} is not an address"),
    })
}

/// Reads a socket address variable. Unset is `None`; set but unparsable is an error.
fn parse_addr_env(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("{value:?} is not an IP:PORT address"),
        }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
