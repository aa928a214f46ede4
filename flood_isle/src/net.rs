//! Networking layer: envelopes, their wire format and reliable delivery.
//!
//! Transport is left to the caller. This module turns game values into
//! pipe-delimited envelopes and back, and tracks which receivers still owe
//! an acknowledgment for each envelope.

/// Conversion between game events/intents and envelope payloads.
pub mod codec;

/// Acknowledgment tracking, retries and duplicate suppression.
pub mod delivery;

/// Wire format error types.
pub mod errors;

/// The message envelope and its encoding.
pub mod messages;

pub use delivery::{AckOutcome, DeliveryTracker, Deduplicator, RetryPolicy, UnconfirmedMessage};
pub use errors::FormatError;
pub use messages::{Message, MessageId, MessageIds, MessageType};
