//! Room module providing multi-room support with an async actor model.
//!
//! This module implements:
//! - RoomActor: Async actor owning one room's roster, game and delivery tracker
//! - RoomManager: Registry spawning and closing room actors
//! - Roster: Join order, host hand-over and per-participant outboxes
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each room runs in a separate Tokio task with an mpsc message inbox. Intents
//! and raw wire frames are applied one at a time; validated game events are
//! broadcast as envelopes to every participant and fanned out to observers.
//! A sweep on the retry interval retransmits unacknowledged envelopes.
//!
//! ## Example
//!
//! ```no_run
//! use flood_isle::game::{Intent, PlayerName};
//! use flood_isle::room::{RoomConfig, RoomManager};
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), flood_isle::room::RoomError> {
//! let manager = RoomManager::default();
//! let room = manager.create_room(RoomConfig::default()).await?;
//!
//! let (outbox, mut frames) = mpsc::channel(64);
//! room.join(PlayerName::new("ann"), None, outbox).await?;
//! room.submit_intent(PlayerName::new("ann"), Intent::StartGame).await?;
//!
//! while let Some(frame) = frames.recv().await {
//!     println!("{frame}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod roster;

pub use actor::{ROOM_SENDER, RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use manager::RoomManager;
pub use messages::{RoomError, RoomEvent, RoomId, RoomMessage, RoomResponse, RoomStateResponse};
pub use roster::{Participant, Roster};
