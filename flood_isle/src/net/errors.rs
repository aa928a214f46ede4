//! Wire format error types.

use thiserror::Error;

/// Errors decoding or constructing a wire envelope. A format error rejects
/// the single frame; the connection stays up.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FormatError {
    #[error("expected at least {min} fields, got {actual}")]
    TooFewFields { min: usize, actual: usize },

    #[error("unknown message type {0:?}")]
    UnknownType(String),

    #[error("payload segment {0:?} must contain exactly one '='")]
    BadPayloadPair(String),

    #[error("invalid message id {0:?}")]
    BadMessageId(String),

    #[error("invalid ack flag {0:?}, expected true or false")]
    BadAckFlag(String),

    #[error("{field} contains a reserved character")]
    ForbiddenCharacter { field: &'static str },

    #[error("{message_type} is missing field {key:?}")]
    MissingField {
        message_type: &'static str,
        key: &'static str,
    },

    #[error("{0} is not a player intent")]
    NotAnIntent(&'static str),

    #[error("bad value for {key:?}: {reason}")]
    BadFieldValue { key: &'static str, reason: String },
}

/// Result type for wire operations.
pub type Result<T> = std::result::Result<T, FormatError>;
