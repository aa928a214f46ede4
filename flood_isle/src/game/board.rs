//! The island board and its tile table.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{
    entities::{Position, Tile, TileState, TreasureType},
    roles::RoleKind,
};

/// Cells per row of the standard island, each row centred in a 6x6 grid.
const ISLAND_ROWS: [usize; 6] = [2, 4, 6, 6, 4, 2];
const ISLAND_WIDTH: usize = 6;

/// One entry of the tile table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TileSpec {
    pub name: String,
    pub treasure: Option<TreasureType>,
    /// Role that begins the game on this tile.
    pub starting_role: Option<RoleKind>,
}

impl TileSpec {
    fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            treasure: None,
            starting_role: None,
        }
    }

    fn treasure(name: &str, treasure: TreasureType) -> Self {
        Self {
            treasure: Some(treasure),
            ..Self::plain(name)
        }
    }

    fn start(name: &str, role: RoleKind) -> Self {
        Self {
            starting_role: Some(role),
            ..Self::plain(name)
        }
    }
}

/// Immutable table of tile names injected into [`Island::build`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TileTable {
    pub tiles: Vec<TileSpec>,
}

impl Default for TileTable {
    fn default() -> Self {
        use RoleKind::*;
        use TreasureType::*;

        let tiles = vec![
            TileSpec::start("Fools' Landing", Pilot),
            TileSpec::start("Bronze Gate", Engineer),
            TileSpec::start("Copper Gate", Explorer),
            TileSpec::start("Gold Gate", Navigator),
            TileSpec::start("Iron Gate", Diver),
            TileSpec::start("Silver Gate", Messenger),
            TileSpec::treasure("Temple of the Moon", Earth),
            TileSpec::treasure("Temple of the Sun", Earth),
            TileSpec::treasure("Coral Palace", Ocean),
            TileSpec::treasure("Tidal Palace", Ocean),
            TileSpec::treasure("Cave of Embers", Fire),
            TileSpec::treasure("Cave of Shadows", Fire),
            TileSpec::treasure("Howling Garden", Wind),
            TileSpec::treasure("Whispering Garden", Wind),
            TileSpec::plain("Breakers Bridge"),
            TileSpec::plain("Cliffs of Abandon"),
            TileSpec::plain("Crimson Forest"),
            TileSpec::plain("Dunes of Deception"),
            TileSpec::plain("Lost Lagoon"),
            TileSpec::plain("Misty Marsh"),
            TileSpec::plain("Observatory"),
            TileSpec::plain("Phantom Rock"),
            TileSpec::plain("Twilight Hollow"),
            TileSpec::plain("Watchtower"),
        ];
        Self { tiles }
    }
}

impl TileTable {
    /// Checks the table fits the island layout and names are unique.
    pub fn validate(&self) -> Result<(), String> {
        let cells = standard_layout().len();
        if self.tiles.len() != cells {
            return Err(format!(
                "tile table has {} tiles, island layout needs {cells}",
                self.tiles.len()
            ));
        }

        let mut names = HashSet::new();
        for spec in &self.tiles {
            if spec.name.is_empty() {
                return Err("tile names must not be empty".to_string());
            }
            if !names.insert(spec.name.as_str()) {
                return Err(format!("duplicate tile name {:?}", spec.name));
            }
        }

        let mut roles = HashSet::new();
        for role in self.tiles.iter().filter_map(|spec| spec.starting_role) {
            if !roles.insert(role) {
                return Err(format!("{role} has more than one starting tile"));
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tiles.iter().any(|spec| spec.name == name)
    }
}

/// Cell positions of the standard island, in row-major order.
pub fn standard_layout() -> Vec<Position> {
    let mut cells = Vec::with_capacity(ISLAND_ROWS.iter().sum());
    for (y, &width) in ISLAND_ROWS.iter().enumerate() {
        let offset = (ISLAND_WIDTH - width) / 2;
        for x in offset..offset + width {
            cells.push(Position::new(x as i32, y as i32));
        }
    }
    cells
}

/// Mapping from position to tile, with a name index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Island {
    tiles: HashMap<Position, Tile>,
    names: HashMap<String, Position>,
    starts: HashMap<RoleKind, Position>,
}

impl Island {
    /// Lays the table's tiles out over the standard island shape. The
    /// tile-to-cell assignment is a permutation fixed by `seed`.
    pub fn build(table: &TileTable, seed: u64) -> Self {
        let mut cells = standard_layout();
        let mut rng = StdRng::seed_from_u64(seed);
        cells.shuffle(&mut rng);

        let mut island = Self::default();
        for (spec, position) in table.tiles.iter().zip(cells) {
            let mut tile = Tile::new(&spec.name, position);
            tile.treasure = spec.treasure;
            if let Some(role) = spec.starting_role {
                island.starts.insert(role, position);
            }
            island.insert(tile);
        }
        island
    }

    /// Builds an island from explicit tiles. Later tiles replace earlier
    /// ones at the same position.
    pub fn from_tiles(tiles: impl IntoIterator<Item = Tile>) -> Self {
        let mut island = Self::default();
        for tile in tiles {
            island.insert(tile);
        }
        island
    }

    /// Marks `position` as the starting tile of `role`.
    #[must_use]
    pub fn with_start(mut self, role: RoleKind, position: Position) -> Self {
        self.starts.insert(role, position);
        self
    }

    fn insert(&mut self, tile: Tile) {
        if let Some(old) = self.tiles.get(&tile.position) {
            self.names.remove(&old.name);
        }
        self.names.insert(tile.name.clone(), tile.position);
        self.tiles.insert(tile.position, tile);
    }

    pub fn get(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub(super) fn get_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.tiles.get_mut(&position)
    }

    pub fn by_name(&self, name: &str) -> Option<&Tile> {
        self.names.get(name).and_then(|pos| self.tiles.get(pos))
    }

    pub fn position_of(&self, name: &str) -> Option<Position> {
        self.names.get(name).copied()
    }

    pub fn state_of(&self, position: Position) -> Option<TileState> {
        self.get(position).map(|tile| tile.state)
    }

    pub fn starting_position(&self, role: RoleKind) -> Option<Position> {
        self.starts.get(&role).copied()
    }

    /// A player can stand on any tile that exists and hasn't sunk.
    pub fn is_standable(&self, position: Position) -> bool {
        self.get(position).is_some_and(|tile| !tile.is_sunk())
    }

    pub fn is_flooded(&self, position: Position) -> bool {
        self.get(position).is_some_and(Tile::is_flooded)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Tiles sorted row-major, for deterministic iteration.
    pub fn sorted_tiles(&self) -> Vec<&Tile> {
        let mut tiles: Vec<_> = self.tiles.values().collect();
        tiles.sort_by_key(|tile| tile.position.row_major());
        tiles
    }

    pub fn treasure_tiles(&self, treasure: TreasureType) -> Vec<&Tile> {
        self.tiles
            .values()
            .filter(|tile| tile.treasure == Some(treasure))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
