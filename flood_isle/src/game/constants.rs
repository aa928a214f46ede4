//! Rule constants and defaults for a standard game.

/// Actions a player may take per turn.
pub const DEFAULT_ACTIONS_PER_TURN: usize = 3;

/// Treasure cards drawn at the end of each turn.
pub const DEFAULT_TREASURE_DRAWS_PER_TURN: usize = 2;

/// Cards a player may hold before being forced to discard.
pub const DEFAULT_HAND_LIMIT: usize = 5;

/// Treasure cards dealt to each player during setup.
pub const DEFAULT_STARTING_TREASURE_CARDS: usize = 2;

/// Flood cards flipped during setup.
pub const DEFAULT_INITIAL_FLOODS: usize = 6;

pub const DEFAULT_STARTING_WATER_LEVEL: usize = 1;

/// Reaching this water level loses the game.
pub const DEFAULT_LOSING_WATER_LEVEL: usize = 10;

/// Flood cards drawn per turn, indexed by `water_level - 1`.
pub const DEFAULT_FLOOD_SCHEDULE: [usize; 9] = [2, 2, 3, 3, 3, 4, 4, 5, 5];

pub const DEFAULT_EXTRACTION_TILE: &str = "Fools' Landing";

// Treasure deck composition.
pub const TREASURE_CARDS_PER_TYPE: usize = 4;
pub const HELICOPTER_CARDS: usize = 3;
pub const SANDBAGS_CARDS: usize = 2;
pub const WATER_RISE_CARDS: usize = 3;

/// Matching treasure cards discarded to capture a treasure.
pub const CARDS_TO_CAPTURE: usize = 4;

/// Moves granted to the target of a single navigator direction.
pub const NAVIGATOR_DIRECTED_MOVES: u8 = 2;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// Player names are truncated to this many characters.
pub const MAX_NAME_LENGTH: usize = 24;
