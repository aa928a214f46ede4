//! Message envelope and its pipe-delimited wire format.
//!
//! ```text
//! messageId|TYPE_NAME|roomId|from|to|isAck|key1=val1|key2=val2|...
//! ```
//!
//! An empty `to` means broadcast. `isAck` is `true` or `false`. Header
//! fields and payload keys/values never contain `|` or `=`; constructors
//! and setters replace both with `_`.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use super::errors::{FormatError, Result};

/// Minimum number of pipe-separated fields in a valid envelope.
pub const MIN_FIELDS: usize = 4;

const FIELD_SEPARATOR: char = '|';
const PAIR_SEPARATOR: char = '=';

/// Closed set of envelope types.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum MessageType {
    PlayerMove,
    ShoreUp,
    GiveCard,
    CaptureTreasure,
    DrawTreasureCard,
    DrawFloodCard,
    GameStart,
    TurnStart,
    PlayerJoin,
    PlayerLeave,
    UpdateRoom,
    EndTurn,
    DiscardCard,
    NavigatorDirectedMove,
    HelicopterMove,
    SandbagsUse,
    GameOver,
    LeaveRoom,
    MessageAck,
}

impl MessageType {
    pub const ALL: [MessageType; 19] = [
        Self::PlayerMove,
        Self::ShoreUp,
        Self::GiveCard,
        Self::CaptureTreasure,
        Self::DrawTreasureCard,
        Self::DrawFloodCard,
        Self::GameStart,
        Self::TurnStart,
        Self::PlayerJoin,
        Self::PlayerLeave,
        Self::UpdateRoom,
        Self::EndTurn,
        Self::DiscardCard,
        Self::NavigatorDirectedMove,
        Self::HelicopterMove,
        Self::SandbagsUse,
        Self::GameOver,
        Self::LeaveRoom,
        Self::MessageAck,
    ];

    /// Wire name of the type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlayerMove => "PLAYER_MOVE",
            Self::ShoreUp => "SHORE_UP",
            Self::GiveCard => "GIVE_CARD",
            Self::CaptureTreasure => "CAPTURE_TREASURE",
            Self::DrawTreasureCard => "DRAW_TREASURE_CARD",
            Self::DrawFloodCard => "DRAW_FLOOD_CARD",
            Self::GameStart => "GAME_START",
            Self::TurnStart => "TURN_START",
            Self::PlayerJoin => "PLAYER_JOIN",
            Self::PlayerLeave => "PLAYER_LEAVE",
            Self::UpdateRoom => "UPDATE_ROOM",
            Self::EndTurn => "END_TURN",
            Self::DiscardCard => "DISCARD_CARD",
            Self::NavigatorDirectedMove => "NAVIGATOR_DIRECTED_MOVE",
            Self::HelicopterMove => "HELICOPTER_MOVE",
            Self::SandbagsUse => "SANDBAGS_USE",
            Self::GameOver => "GAME_OVER",
            Self::LeaveRoom => "LEAVE_ROOM",
            Self::MessageAck => "MESSAGE_ACK",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FormatError::UnknownType(s.to_string()))
    }
}

/// Envelope identifier, unique per sender.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MessageId {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse()
            .map(Self)
            .map_err(|_| FormatError::BadMessageId(s.to_string()))
    }
}

/// Monotonic id source shared by everything sending on behalf of one
/// identity.
#[derive(Debug)]
pub struct MessageIds(AtomicU64);

impl MessageIds {
    pub const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn starting_at(first: u64) -> Self {
        Self(AtomicU64::new(first))
    }

    pub fn next(&self) -> MessageId {
        MessageId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MessageIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces the wire format's reserved characters.
pub fn sanitize(value: &str) -> String {
    value.replace([FIELD_SEPARATOR, PAIR_SEPARATOR, '\n', '\r'], "_")
}

/// One unit of network communication.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Message {
    id: MessageId,
    message_type: MessageType,
    room_id: String,
    from: String,
    to: Option<String>,
    is_ack: bool,
    payload: Vec<(String, String)>,
}

impl Message {
    pub fn new(id: MessageId, message_type: MessageType, room_id: &str, from: &str) -> Self {
        Self {
            id,
            message_type,
            room_id: sanitize(room_id),
            from: sanitize(from),
            to: None,
            is_ack: false,
            payload: Vec::new(),
        }
    }

    /// Acknowledgment of `original`, sent by `from` back to its sender. It
    /// reuses the original id and is never itself acknowledged.
    pub fn ack(original: &Message, from: &str) -> Self {
        let mut ack = Self::new(original.id, MessageType::MessageAck, &original.room_id, from);
        ack.to = Some(original.from.clone());
        ack.is_ack = true;
        ack
    }

    /// Addresses the message to a single receiver.
    #[must_use]
    pub fn to(mut self, receiver: &str) -> Self {
        self.set_to(Some(receiver));
        self
    }

    /// Appends a payload pair.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: impl fmt::Display) {
        self.payload.push((sanitize(key), sanitize(&value.to_string())));
    }

    // === Accessors ===

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn receiver(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }

    pub fn is_ack(&self) -> bool {
        self.is_ack
    }

    pub fn payload(&self) -> &[(String, String)] {
        &self.payload
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`Message::get`], failing with [`FormatError::MissingField`].
    pub fn require(&self, key: &'static str) -> Result<&str> {
        self.get(key).ok_or(FormatError::MissingField {
            message_type: self.message_type.as_str(),
            key,
        })
    }

    // === Setters ===

    pub fn set_id(&mut self, id: MessageId) {
        self.id = id;
    }

    pub fn set_room_id(&mut self, room_id: &str) {
        self.room_id = sanitize(room_id);
    }

    pub fn set_from(&mut self, from: &str) {
        self.from = sanitize(from);
    }

    pub fn set_to(&mut self, to: Option<&str>) {
        self.to = to.filter(|to| !to.is_empty()).map(sanitize);
    }

    pub fn set_ack(&mut self, is_ack: bool) {
        self.is_ack = is_ack;
    }

    // === Wire format ===

    pub fn encode(&self) -> String {
        let mut out = format!(
            "{}|{}|{}|{}|{}|{}",
            self.id,
            self.message_type,
            self.room_id,
            self.from,
            self.to.as_deref().unwrap_or_default(),
            self.is_ack
        );
        for (key, value) in &self.payload {
            out.push(FIELD_SEPARATOR);
            out.push_str(key);
            out.push(PAIR_SEPARATOR);
            out.push_str(value);
        }
        out
    }

    /// Parses one envelope.
    ///
    /// A missing `to` decodes as broadcast and a missing `isAck` as `false`.
    /// Empty payload segments are skipped.
    pub fn decode(frame: &str) -> Result<Self> {
        let fields: Vec<&str> = frame.split(FIELD_SEPARATOR).collect();
        if fields.len() < MIN_FIELDS {
            return Err(FormatError::TooFewFields {
                min: MIN_FIELDS,
                actual: fields.len(),
            });
        }

        let id = fields[0].parse()?;
        let message_type = fields[1].parse()?;
        let room_id = header_field("roomId", fields[2])?;
        let from = header_field("from", fields[3])?;
        let to = match fields.get(4) {
            Some(to) if !to.is_empty() => Some(header_field("to", to)?),
            _ => None,
        };
        let is_ack = match fields.get(5) {
            None => false,
            Some(&"true") => true,
            Some(&"false") => false,
            Some(other) => return Err(FormatError::BadAckFlag((*other).to_string())),
        };

        let mut payload = Vec::with_capacity(fields.len().saturating_sub(6));
        for segment in fields.iter().skip(6).filter(|s| !s.is_empty()) {
            let mut parts = segment.split(PAIR_SEPARATOR);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => payload.push((key.to_string(), value.to_string())),
                _ => return Err(FormatError::BadPayloadPair((*segment).to_string())),
            }
        }

        Ok(Self {
            id,
            message_type,
            room_id,
            from,
            to,
            is_ack,
            payload,
        })
    }
}

fn header_field(field: &'static str, value: &str) -> Result<String> {
    if value.contains(PAIR_SEPARATOR) {
        return Err(FormatError::ForbiddenCharacter { field });
    }
    Ok(value.to_string())
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} from {}", self.message_type, self.id, self.from)?;
        if let Some(to) = &self.to {
            write!(f, " to {to}")?;
        }
        Ok(())
    }
}
