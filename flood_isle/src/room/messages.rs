//! Room actor message types.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{
    game::{GameEvent, GameSnapshot, Intent, PlayerName, RoleKind, RuleViolation},
    net::FormatError,
};

/// Identifier of a room, also used as the envelope `roomId` field.
pub type RoomId = Uuid;

/// Messages that can be sent to a RoomActor
#[derive(Debug)]
pub enum RoomMessage {
    /// Join the room, receiving wire frames on `outbox`
    Join {
        name: PlayerName,
        role: Option<RoleKind>,
        outbox: mpsc::Sender<String>,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Leave the room
    Leave {
        name: PlayerName,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Apply an intent on behalf of a participant
    SubmitIntent {
        name: PlayerName,
        intent: Intent,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Raw wire frame received on a participant's connection
    DeliverFrame {
        name: PlayerName,
        frame: String,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Get current room state
    GetState {
        response: oneshot::Sender<RoomStateResponse>,
    },

    /// Get a copy of the game state, if a game is running
    GetSnapshot {
        response: oneshot::Sender<Option<GameSnapshot>>,
    },

    /// Subscribe to room events
    Subscribe {
        observer: String,
        sender: mpsc::Sender<RoomEvent>,
    },

    /// Unsubscribe from room events
    Unsubscribe { observer: String },

    /// Close the room
    Close {
        response: oneshot::Sender<RoomResponse>,
    },
}

/// Notification fanned out to room observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A validated game mutation
    Game(GameEvent),
    /// A participant joined
    PlayerJoined { name: PlayerName, is_host: bool },
    /// A participant left
    PlayerLeft { name: PlayerName },
    /// Host moved to another participant
    HostChanged { host: PlayerName },
    /// A participant stopped acknowledging and was sent a resync
    ConnectivityDegraded { name: PlayerName },
}

/// Response from room operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomResponse {
    /// Operation succeeded
    Success,

    /// Frame was an acknowledgment or a duplicate and changed nothing
    Ignored,

    /// Intent was rejected by the rules
    Rejected(RuleViolation),

    /// Frame could not be decoded
    BadFrame(FormatError),

    /// Room-level failure
    Error(RoomError),
}

impl RoomResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, RoomResponse::Success | RoomResponse::Ignored)
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            RoomResponse::Success | RoomResponse::Ignored => None,
            RoomResponse::Rejected(violation) => Some(format!("Rejected: {violation}")),
            RoomResponse::BadFrame(err) => Some(format!("Malformed frame: {err}")),
            RoomResponse::Error(err) => Some(err.to_string()),
        }
    }
}

impl From<RoomError> for RoomResponse {
    fn from(err: RoomError) -> Self {
        RoomResponse::Error(err)
    }
}

/// Room-level errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room is closed")]
    Closed,

    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("room is full")]
    RoomFull,

    #[error("too many rooms (limit {0})")]
    TooManyRooms(usize),

    #[error("name {0} is already taken")]
    NameTaken(PlayerName),

    #[error("role {0} is already taken")]
    RoleTaken(RoleKind),

    #[error("{0} is not in this room")]
    NotInRoom(PlayerName),

    #[error("invalid room configuration: {0}")]
    InvalidConfig(String),
}

/// Room state response
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomStateResponse {
    /// Room ID
    pub room_id: RoomId,

    /// Room name
    pub room_name: String,

    /// Participants in join order
    pub players: Vec<String>,

    /// Current host
    pub host: Option<String>,

    /// Maximum players
    pub max_players: usize,

    /// Current game phase, `lobby` before the first game
    pub phase: String,

    /// Envelopes still waiting on acknowledgments
    pub pending_deliveries: usize,

    /// Participants marked degraded
    pub degraded: Vec<String>,

    /// Room creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_and_messages() {
        assert!(RoomResponse::Success.is_success());
        assert!(RoomResponse::Ignored.is_success());
        assert_eq!(RoomResponse::Success.error_message(), None);

        let rejected = RoomResponse::Rejected(RuleViolation::OutOfTurn);
        assert!(!rejected.is_success());
        assert!(rejected.error_message().unwrap().starts_with("Rejected: "));

        let full: RoomResponse = RoomError::RoomFull.into();
        assert_eq!(full.error_message().as_deref(), Some("room is full"));
    }
}
