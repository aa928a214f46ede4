//! Tile flood lifecycle and flood card resolution.

use super::{
    board::Island,
    deck::DeckManager,
    entities::{Position, TileState},
};

/// Result of resolving one flood card.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FloodOutcome {
    pub tile: String,
    pub position: Position,
    /// State after the card was resolved.
    pub state: TileState,
    /// False when the tile had already sunk and the card did nothing.
    pub changed: bool,
}

/// Floods the tile at `position`: Normal becomes Flooded, Flooded becomes
/// Sunk, Sunk stays Sunk. Returns the resulting state, or `None` when there
/// is no tile there.
pub fn flood(island: &mut Island, position: Position) -> Option<TileState> {
    let tile = island.get_mut(position)?;
    tile.state = match tile.state {
        TileState::Normal => TileState::Flooded,
        TileState::Flooded | TileState::Sunk => TileState::Sunk,
    };
    Some(tile.state)
}

/// Shores up the tile at `position`. Only a Flooded tile changes; a sunk
/// tile never comes back.
pub fn shore_up(island: &mut Island, position: Position) -> Option<TileState> {
    let tile = island.get_mut(position)?;
    if tile.state == TileState::Flooded {
        tile.state = TileState::Normal;
    }
    Some(tile.state)
}

/// Draws up to `count` flood cards and floods the tile named by each. Every
/// drawn card ends up in the flood discard. Stops early only if both flood
/// piles are empty.
pub fn draw_flood_cards(island: &mut Island, decks: &mut DeckManager, count: usize) -> Vec<FloodOutcome> {
    let mut outcomes = Vec::with_capacity(count);
    for _ in 0..count {
        let card = match decks.draw_flood() {
            Ok(card) => card,
            Err(err) => {
                log::warn!("Stopping flood draw early: {err}");
                break;
            }
        };

        if let Some(position) = card.flood_position() {
            let before = island.state_of(position);
            if let Some(state) = flood(island, position) {
                let tile = island.get(position).map(|t| t.name.clone()).unwrap_or_default();
                outcomes.push(FloodOutcome {
                    tile,
                    position,
                    state,
                    changed: before != Some(state),
                });
            }
        }
        decks.discard_flood(card);
    }
    outcomes
}

/// Flood cards drawn per turn at `water_level`. Levels past the end of the
/// schedule use its last entry.
pub fn flood_draw_count(water_level: usize, schedule: &[usize]) -> usize {
    let idx = water_level.saturating_sub(1);
    schedule
        .get(idx)
        .or_else(|| schedule.last())
        .copied()
        .unwrap_or(0)
}
