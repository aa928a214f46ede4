use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

use super::{
    constants,
    errors::ParseValueError,
    roles::{Role, RoleKind, RoleRules},
};

/// Grid coordinate of a tile on the island.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Up, right, down, left.
    #[must_use]
    pub const fn orthogonal_neighbors(self) -> [Position; 4] {
        let Self { x, y } = self;
        [
            Self::new(x, y - 1),
            Self::new(x + 1, y),
            Self::new(x, y + 1),
            Self::new(x - 1, y),
        ]
    }

    /// The full 8-neighborhood: orthogonal neighbors followed by diagonals.
    #[must_use]
    pub const fn surrounding(self) -> [Position; 8] {
        let Self { x, y } = self;
        [
            Self::new(x, y - 1),
            Self::new(x + 1, y),
            Self::new(x, y + 1),
            Self::new(x - 1, y),
            Self::new(x - 1, y - 1),
            Self::new(x + 1, y - 1),
            Self::new(x + 1, y + 1),
            Self::new(x - 1, y + 1),
        ]
    }

    #[must_use]
    pub const fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Row-major ordering key, used wherever a deterministic pick is needed.
    #[must_use]
    pub const fn row_major(self) -> (i32, i32) {
        (self.y, self.x)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| ParseValueError::new("position", s))?;
        match (x.trim().parse(), y.trim().parse()) {
            (Ok(x), Ok(y)) => Ok(Self::new(x, y)),
            _ => Err(ParseValueError::new("position", s)),
        }
    }
}

/// Flood state of a tile. A tile only ever moves Normal -> Flooded -> Sunk,
/// or back from Flooded to Normal when shored up.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TileState {
    #[default]
    Normal,
    Flooded,
    Sunk,
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Normal => "normal",
            Self::Flooded => "flooded",
            Self::Sunk => "sunk",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for TileState {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "flooded" => Ok(Self::Flooded),
            "sunk" => Ok(Self::Sunk),
            _ => Err(ParseValueError::new("tile state", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TreasureType {
    Earth,
    Ocean,
    Fire,
    Wind,
}

impl TreasureType {
    pub const ALL: [TreasureType; 4] = [Self::Earth, Self::Ocean, Self::Fire, Self::Wind];
}

impl fmt::Display for TreasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Earth => "earth",
            Self::Ocean => "ocean",
            Self::Fire => "fire",
            Self::Wind => "wind",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for TreasureType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earth" => Ok(Self::Earth),
            "ocean" => Ok(Self::Ocean),
            "fire" => Ok(Self::Fire),
            "wind" => Ok(Self::Wind),
            _ => Err(ParseValueError::new("treasure", s)),
        }
    }
}

/// A cell of the island.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Tile {
    pub name: String,
    pub position: Position,
    pub state: TileState,
    pub treasure: Option<TreasureType>,
}

impl Tile {
    pub fn new(name: &str, position: Position) -> Self {
        Self {
            name: name.to_string(),
            position,
            state: TileState::Normal,
            treasure: None,
        }
    }

    #[must_use]
    pub fn with_treasure(mut self, treasure: TreasureType) -> Self {
        self.treasure = Some(treasure);
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: TileState) -> Self {
        self.state = state;
        self
    }

    pub fn is_sunk(&self) -> bool {
        self.state == TileState::Sunk
    }

    pub fn is_flooded(&self) -> bool {
        self.state == TileState::Flooded
    }
}

/// Name of a participant. Characters reserved by the wire format and the
/// payload list separators are replaced so a name can always be encoded
/// verbatim.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(s: &str) -> Self {
        let mut name: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '|' | '=' | ',' | ';' | ':' => '_',
                c if c.is_whitespace() => '_',
                c => c,
            })
            .collect();
        if let Some((idx, _)) = name.char_indices().nth(constants::MAX_NAME_LENGTH) {
            name.truncate(idx);
        }
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SpecialCard {
    WaterRise,
    Helicopter,
    Sandbags,
}

impl fmt::Display for SpecialCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::WaterRise => "water_rise",
            Self::Helicopter => "helicopter",
            Self::Sandbags => "sandbags",
        };
        write!(f, "{repr}")
    }
}

/// What a card is. The variant fixes which data is present: a treasure card
/// carries only a treasure type, a flood card only its tile, and special
/// cards neither.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CardKind {
    Treasure(TreasureType),
    Flood { tile: String, position: Position },
    Special(SpecialCard),
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Treasure(treasure) => write!(f, "treasure:{treasure}"),
            Self::Flood { tile, .. } => write!(f, "flood:{tile}"),
            Self::Special(special) => write!(f, "{special}"),
        }
    }
}

impl FromStr for CardKind {
    type Err = ParseValueError;

    /// Parses hand cards only. Flood cards never sit in a hand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water_rise" => Ok(Self::Special(SpecialCard::WaterRise)),
            "helicopter" => Ok(Self::Special(SpecialCard::Helicopter)),
            "sandbags" => Ok(Self::Special(SpecialCard::Sandbags)),
            _ => match s.strip_prefix("treasure:") {
                Some(treasure) => Ok(Self::Treasure(treasure.parse()?)),
                None => Err(ParseValueError::new("card", s)),
            },
        }
    }
}

/// A card together with the player currently holding it. `holder` is `None`
/// while the card sits in a deck or discard pile.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub kind: CardKind,
    pub holder: Option<PlayerName>,
}

impl Card {
    pub fn treasure(treasure: TreasureType) -> Self {
        CardKind::Treasure(treasure).into()
    }

    pub fn flood(tile: &Tile) -> Self {
        CardKind::Flood {
            tile: tile.name.clone(),
            position: tile.position,
        }
        .into()
    }

    pub fn special(special: SpecialCard) -> Self {
        CardKind::Special(special).into()
    }

    pub fn treasure_type(&self) -> Option<TreasureType> {
        match self.kind {
            CardKind::Treasure(treasure) => Some(treasure),
            _ => None,
        }
    }

    pub fn flood_position(&self) -> Option<Position> {
        match self.kind {
            CardKind::Flood { position, .. } => Some(position),
            _ => None,
        }
    }

    pub fn is_special(&self, special: SpecialCard) -> bool {
        self.kind == CardKind::Special(special)
    }
}

impl From<CardKind> for Card {
    fn from(kind: CardKind) -> Self {
        Self { kind, holder: None }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// A player on the island.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Player {
    pub name: PlayerName,
    pub position: Position,
    pub hand: Vec<Card>,
    pub role: Role,
    /// Actions spent during the current turn.
    pub actions_taken: usize,
    pub captured: BTreeSet<TreasureType>,
}

impl Player {
    pub fn new(name: PlayerName, role: RoleKind, position: Position) -> Self {
        Self {
            name,
            position,
            hand: Vec::with_capacity(constants::DEFAULT_HAND_LIMIT + 2),
            role: role.into(),
            actions_taken: 0,
            captured: BTreeSet::new(),
        }
    }

    /// Clears per-turn state, including the role's own flags.
    pub fn reset_state(&mut self) {
        self.actions_taken = 0;
        self.role.reset_state();
    }

    pub fn role_kind(&self) -> RoleKind {
        self.role.kind()
    }

    pub fn receive(&mut self, mut card: Card) {
        card.holder = Some(self.name.clone());
        self.hand.push(card);
    }

    /// Removes the first card of the given kind from the hand.
    pub fn take_card(&mut self, kind: &CardKind) -> Option<Card> {
        let idx = self.hand.iter().position(|card| &card.kind == kind)?;
        let mut card = self.hand.remove(idx);
        card.holder = None;
        Some(card)
    }

    pub fn holds(&self, kind: &CardKind) -> bool {
        self.hand.iter().any(|card| &card.kind == kind)
    }

    pub fn treasure_count(&self, treasure: TreasureType) -> usize {
        self.hand
            .iter()
            .filter(|card| card.treasure_type() == Some(treasure))
            .count()
    }
}
