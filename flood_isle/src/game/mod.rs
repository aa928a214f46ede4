//! Game rules engine.
//!
//! This module provides the authoritative rule set:
//! - Value types for positions, tiles, cards and players
//! - The island board and its tile table
//! - The treasure and flood decks
//! - Role-polymorphic movement and action rules
//! - The flood lifecycle and the turn state machine

pub mod board;
pub mod constants;
pub mod deck;
pub mod entities;
pub mod errors;
pub mod events;
pub mod flood;
pub mod intent;
pub mod roles;
pub mod state_machine;

pub use board::{Island, TileSpec, TileTable};
pub use deck::{Deck, DeckManager};
pub use entities::{Card, CardKind, Player, PlayerName, Position, SpecialCard, Tile, TileState, TreasureType};
pub use errors::{DeckError, ParseValueError, Pile, RuleViolation};
pub use events::GameEvent;
pub use intent::Intent;
pub use roles::{Role, RoleKind, RoleRules};
pub use state_machine::{Game, GameSettings, GameSnapshot, LossReason, Outcome, Phase, PlayerSnapshot};
