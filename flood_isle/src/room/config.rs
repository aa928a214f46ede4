//! Room configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    game::{
        GameSettings, TileTable,
        constants::{MAX_PLAYERS, MIN_PLAYERS},
    },
    net::delivery::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, RetryPolicy},
};

/// Room configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Room name
    pub name: String,

    /// Players needed before the host may start (default: 2)
    pub min_players: usize,

    /// Maximum number of participants (default: 4)
    pub max_players: usize,

    /// Delay between retransmissions of an unacknowledged envelope
    pub retry_interval_ms: u64,

    /// Retransmissions before a receiver is marked degraded
    pub max_retries: u32,

    /// Out-of-order message ids remembered per sender for duplicate suppression
    pub dedup_window: usize,

    /// Rule parameters handed to every game played in the room
    pub game: GameSettings,

    /// Tile names used to lay out the island
    pub tiles: TileTable,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: "Flood Isle".to_string(),
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
            max_retries: DEFAULT_MAX_RETRIES,
            dedup_window: 1024,
            game: GameSettings::default(),
            tiles: TileTable::default(),
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Room name must not be empty".to_string());
        }

        if self.min_players < MIN_PLAYERS || self.max_players > MAX_PLAYERS {
            return Err(format!(
                "Player limits must lie between {MIN_PLAYERS} and {MAX_PLAYERS}"
            ));
        }

        if self.min_players > self.max_players {
            return Err("Min players must not exceed max players".to_string());
        }

        if self.retry_interval_ms == 0 {
            return Err("Retry interval must be positive".to_string());
        }

        if self.dedup_window == 0 {
            return Err("Dedup window must be positive".to_string());
        }

        self.game.validate()?;
        self.tiles.validate()?;

        if !self.tiles.contains(&self.game.extraction_tile) {
            return Err(format!(
                "Extraction tile {:?} is not in the tile table",
                self.game.extraction_tile
            ));
        }

        Ok(())
    }

    /// Retry policy for the room's delivery tracker
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: self.retry_interval(),
            max_retries: self.max_retries,
        }
    }

    /// Retry interval as a duration; also the actor's sweep tick
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}
