//! Role-specific movement and action rules.
//!
//! Every role answers the same questions (where can I move, what can I shore
//! up, who can I give cards to) through [`RoleRules`]. [`Role`] is a closed
//! enum dispatched with `enum_dispatch`, and each variant carries only its
//! own per-turn state.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashSet, VecDeque},
    fmt,
    str::FromStr,
};

use super::{
    board::Island,
    constants::NAVIGATOR_DIRECTED_MOVES,
    entities::{PlayerName, Position, TileState},
    errors::ParseValueError,
};

/// Orthogonal neighbors a player can stand on.
pub fn default_moves(from: Position, island: &Island) -> HashSet<Position> {
    from.orthogonal_neighbors()
        .into_iter()
        .filter(|&pos| island.is_standable(pos))
        .collect()
}

/// Flooded tiles within Manhattan distance 1, the player's own tile included.
pub fn default_shore_targets(from: Position, island: &Island) -> HashSet<Position> {
    std::iter::once(from)
        .chain(from.orthogonal_neighbors())
        .filter(|&pos| island.is_flooded(pos))
        .collect()
}

/// Queries and per-turn bookkeeping shared by all roles.
#[enum_dispatch]
pub trait RoleRules {
    fn kind(&self) -> RoleKind;

    /// Tiles the player may move to with one move action.
    fn move_destinations(&self, from: Position, island: &Island) -> HashSet<Position> {
        default_moves(from, island)
    }

    /// Tiles the player may reach when the tile under them sinks. Unlike a
    /// move action this never depends on per-turn flags.
    fn swim_destinations(&self, from: Position, island: &Island) -> HashSet<Position> {
        self.move_destinations(from, island)
    }

    fn shore_up_targets(&self, from: Position, island: &Island) -> HashSet<Position> {
        default_shore_targets(from, island)
    }

    /// Tiles a single shore-up action may cover right now.
    fn max_shore_up_targets(&self) -> usize {
        1
    }

    /// Whether a card can pass from a player at `giver` to one at `recipient`.
    fn can_give_to(&self, giver: Position, recipient: Position) -> bool {
        giver == recipient
    }

    fn record_move(&mut self, _from: Position, _to: Position) {}

    fn record_shore_up(&mut self) {}

    /// Clears per-turn flags. Called at the start of the player's turn.
    fn reset_state(&mut self) {}
}

/// Moves and shores up across all eight surrounding tiles.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Explorer;

impl RoleRules for Explorer {
    fn kind(&self) -> RoleKind {
        RoleKind::Explorer
    }

    fn move_destinations(&self, from: Position, island: &Island) -> HashSet<Position> {
        from.surrounding()
            .into_iter()
            .filter(|&pos| island.is_standable(pos))
            .collect()
    }

    fn shore_up_targets(&self, from: Position, island: &Island) -> HashSet<Position> {
        std::iter::once(from)
            .chain(from.surrounding())
            .filter(|&pos| island.is_flooded(pos))
            .collect()
    }
}

/// Flies once per turn to any tile on the island.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pilot {
    pub has_flown: bool,
}

impl Pilot {
    fn flight_destinations(from: Position, island: &Island) -> HashSet<Position> {
        island
            .tiles()
            .filter(|tile| !tile.is_sunk() && tile.position != from)
            .map(|tile| tile.position)
            .collect()
    }
}

impl RoleRules for Pilot {
    fn kind(&self) -> RoleKind {
        RoleKind::Pilot
    }

    fn move_destinations(&self, from: Position, island: &Island) -> HashSet<Position> {
        if self.has_flown {
            default_moves(from, island)
        } else {
            Self::flight_destinations(from, island)
        }
    }

    fn swim_destinations(&self, from: Position, island: &Island) -> HashSet<Position> {
        Self::flight_destinations(from, island)
    }

    /// Any move made while the flight is available spends it.
    fn record_move(&mut self, _from: Position, _to: Position) {
        self.has_flown = true;
    }

    fn reset_state(&mut self) {
        self.has_flown = false;
    }
}

/// A navigator direction in progress.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Direction {
    pub target: PlayerName,
    pub moves_left: u8,
}

/// Moves other players instead of gaining a movement bonus.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Navigator {
    pub directing: Option<Direction>,
}

impl Navigator {
    /// Starts directing `target`, replacing any unfinished direction.
    pub fn direct(&mut self, target: PlayerName) {
        self.directing = Some(Direction {
            target,
            moves_left: NAVIGATOR_DIRECTED_MOVES,
        });
    }

    pub fn target(&self) -> Option<&PlayerName> {
        self.directing.as_ref().map(|d| &d.target)
    }

    /// Spends one directed move. Returns the moves left afterwards.
    pub fn spend_directed_move(&mut self) -> u8 {
        let Some(direction) = self.directing.as_mut() else {
            return 0;
        };
        direction.moves_left = direction.moves_left.saturating_sub(1);
        let left = direction.moves_left;
        if left == 0 {
            self.directing = None;
        }
        left
    }

    pub fn clear_direction(&mut self) {
        self.directing = None;
    }
}

impl RoleRules for Navigator {
    fn kind(&self) -> RoleKind {
        RoleKind::Navigator
    }

    fn reset_state(&mut self) {
        self.clear_direction();
    }
}

/// Swims through flooded and sunk tiles.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Diver;

impl RoleRules for Diver {
    fn kind(&self) -> RoleKind {
        RoleKind::Diver
    }

    /// Breadth-first search over orthogonal steps. Flooded and sunk tiles
    /// extend the frontier, normal tiles end it. Sunk tiles are never
    /// destinations. The starting tile is always expanded.
    fn move_destinations(&self, from: Position, island: &Island) -> HashSet<Position> {
        let mut reachable = HashSet::new();
        let mut visited = HashSet::from([from]);
        let mut frontier = VecDeque::from([from]);

        while let Some(pos) = frontier.pop_front() {
            for next in pos.orthogonal_neighbors() {
                if !visited.insert(next) {
                    continue;
                }
                match island.state_of(next) {
                    Some(TileState::Normal) => {
                        reachable.insert(next);
                    }
                    Some(TileState::Flooded) => {
                        reachable.insert(next);
                        frontier.push_back(next);
                    }
                    Some(TileState::Sunk) => frontier.push_back(next),
                    None => {}
                }
            }
        }
        reachable
    }
}

/// Shores up two tiles with the first shore-up action of a turn.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Engineer {
    pub double_shore_available: bool,
}

impl Default for Engineer {
    fn default() -> Self {
        Self {
            double_shore_available: true,
        }
    }
}

impl RoleRules for Engineer {
    fn kind(&self) -> RoleKind {
        RoleKind::Engineer
    }

    fn max_shore_up_targets(&self) -> usize {
        if self.double_shore_available { 2 } else { 1 }
    }

    fn record_shore_up(&mut self) {
        self.double_shore_available = false;
    }

    fn reset_state(&mut self) {
        self.double_shore_available = true;
    }
}

/// Gives cards to any player, wherever they stand.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Messenger;

impl RoleRules for Messenger {
    fn kind(&self) -> RoleKind {
        RoleKind::Messenger
    }

    fn can_give_to(&self, _giver: Position, _recipient: Position) -> bool {
        true
    }
}

#[enum_dispatch(RoleRules)]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Role {
    Explorer(Explorer),
    Pilot(Pilot),
    Navigator(Navigator),
    Diver(Diver),
    Engineer(Engineer),
    Messenger(Messenger),
}

impl Role {
    pub fn as_navigator_mut(&mut self) -> Option<&mut Navigator> {
        match self {
            Self::Navigator(navigator) => Some(navigator),
            _ => None,
        }
    }

    pub fn as_navigator(&self) -> Option<&Navigator> {
        match self {
            Self::Navigator(navigator) => Some(navigator),
            _ => None,
        }
    }
}

/// Stateless role tag, used for assignment and on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum RoleKind {
    Explorer,
    Pilot,
    Navigator,
    Diver,
    Engineer,
    Messenger,
}

impl RoleKind {
    pub const ALL: [RoleKind; 6] = [
        Self::Explorer,
        Self::Pilot,
        Self::Navigator,
        Self::Diver,
        Self::Engineer,
        Self::Messenger,
    ];
}

impl From<RoleKind> for Role {
    fn from(kind: RoleKind) -> Self {
        match kind {
            RoleKind::Explorer => Explorer.into(),
            RoleKind::Pilot => Pilot::default().into(),
            RoleKind::Navigator => Navigator::default().into(),
            RoleKind::Diver => Diver.into(),
            RoleKind::Engineer => Engineer::default().into(),
            RoleKind::Messenger => Messenger.into(),
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Explorer => "explorer",
            Self::Pilot => "pilot",
            Self::Navigator => "navigator",
            Self::Diver => "diver",
            Self::Engineer => "engineer",
            Self::Messenger => "messenger",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for RoleKind {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| ParseValueError::new("role", s))
    }
}
