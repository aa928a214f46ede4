//! # Flood Isle
//!
//! Authoritative rules engine for a cooperative flood-island board game, plus
//! the reliable-delivery layer that keeps every participant of a room in sync.
//!
//! Players share an island of named tiles that progressively flood and sink.
//! Each player has a role that overrides how they move or act. The team wins
//! by capturing all four treasures and flying off from the extraction tile;
//! it loses when the island swallows something essential first.
//!
//! ## Architecture
//!
//! A turn passes through a fixed sequence of phases:
//!
//! - **TurnStart**: The current player's per-turn state is reset
//! - **Actions**: Up to three actions (move, shore up, give, capture, direct)
//! - **DrawTreasure**: Two treasure cards, Water Rise handled as drawn
//! - **DrawFlood**: Flood cards per the water level schedule
//! - **TurnEnd**: Play passes to the next player
//!
//! Role behaviour is a closed set of variants dispatched with `enum_dispatch`.
//!
//! ## Core Modules
//!
//! - [`game`]: Board, decks, roles, flood lifecycle and the turn state machine
//! - [`net`]: Pipe-delimited envelopes, the event/intent codec and delivery tracking
//! - [`room`]: Per-room actors, rosters and the room registry
//!
//! ## Example
//!
//! ```
//! use flood_isle::{Game, GameSettings, Intent, PlayerName, RoleKind, TileTable};
//!
//! let roster = [
//!     (PlayerName::new("ann"), RoleKind::Pilot),
//!     (PlayerName::new("bob"), RoleKind::Engineer),
//! ];
//! let mut game = Game::new(GameSettings::default().with_seed(1), &TileTable::default(), &roster)?;
//! game.start()?;
//! game.apply(&PlayerName::new("ann"), Intent::EndTurn)?;
//! # Ok::<(), flood_isle::RuleViolation>(())
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Game, GameEvent, GameSettings, GameSnapshot, Intent, Phase, PlayerName, Position, RoleKind,
    RuleViolation, TileState, TileTable, TreasureType,
    constants::{self, MAX_PLAYERS, MIN_PLAYERS},
};

/// Wire envelopes and reliable delivery.
pub mod net;
pub use net::{DeliveryTracker, FormatError, Message, MessageId, MessageType};

/// Rooms: rosters, actors and the room registry.
pub mod room;
pub use room::{RoomConfig, RoomHandle, RoomManager};
