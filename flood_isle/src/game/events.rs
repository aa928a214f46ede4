use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    entities::{CardKind, PlayerName, Position, TreasureType},
    roles::RoleKind,
    state_machine::{Outcome, Phase},
};

/// Validated changes to the game, in the order they happened. These are
/// what gets broadcast and what observers render.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum GameEvent {
    GameStarted {
        players: Vec<(PlayerName, RoleKind, Position)>,
        water_level: usize,
    },
    TurnStarted {
        player: PlayerName,
        turn: usize,
    },
    PlayerMoved {
        player: PlayerName,
        from: Position,
        to: Position,
    },
    FloodCardDrawn {
        tile: String,
        position: Position,
    },
    TileFlooded {
        tile: String,
        position: Position,
    },
    TileSank {
        tile: String,
        position: Position,
    },
    TileShoredUp {
        tile: String,
        position: Position,
    },
    CardDrawn {
        player: PlayerName,
        card: CardKind,
    },
    WaterRose {
        level: usize,
    },
    CardGiven {
        from: PlayerName,
        to: PlayerName,
        card: CardKind,
    },
    CardDiscarded {
        player: PlayerName,
        card: CardKind,
    },
    TreasureCaptured {
        player: PlayerName,
        treasure: TreasureType,
    },
    NavigatorDirecting {
        navigator: PlayerName,
        target: PlayerName,
        moves: u8,
    },
    HelicopterLifted {
        holder: PlayerName,
        passengers: Vec<PlayerName>,
        /// `None` when the helicopter leaves the island.
        to: Option<Position>,
    },
    SandbagsUsed {
        player: PlayerName,
        position: Position,
    },
    PhaseChanged {
        phase: Phase,
    },
    TurnEnded {
        player: PlayerName,
    },
    GameOver {
        outcome: Outcome,
    },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::GameStarted { players, .. } => {
                let names: Vec<String> = players
                    .iter()
                    .map(|(name, role, _)| format!("{name} ({role})"))
                    .collect();
                format!("game started with {}", names.join(", "))
            }
            Self::TurnStarted { player, turn } => format!("turn {turn}: {player}'s turn"),
            Self::PlayerMoved { player, to, .. } => format!("{player} moved to {to}"),
            Self::FloodCardDrawn { tile, .. } => format!("flood card drawn for {tile}"),
            Self::TileFlooded { tile, .. } => format!("{tile} flooded"),
            Self::TileSank { tile, .. } => format!("{tile} sank"),
            Self::TileShoredUp { tile, .. } => format!("{tile} shored up"),
            Self::CardDrawn { player, card } => format!("{player} drew {card}"),
            Self::WaterRose { level } => format!("water rose to level {level}"),
            Self::CardGiven { from, to, card } => format!("{from} gave {card} to {to}"),
            Self::CardDiscarded { player, card } => format!("{player} discarded {card}"),
            Self::TreasureCaptured { player, treasure } => {
                format!("{player} captured the {treasure} treasure")
            }
            Self::NavigatorDirecting {
                navigator, target, ..
            } => format!("{navigator} is directing {target}"),
            Self::HelicopterLifted {
                holder,
                passengers,
                to,
            } => {
                let names: Vec<&str> = passengers.iter().map(PlayerName::as_str).collect();
                match to {
                    Some(to) => format!("{holder} flew {} to {to}", names.join(", ")),
                    None => format!("{holder} lifted everyone off the island"),
                }
            }
            Self::SandbagsUsed { player, position } => {
                format!("{player} sandbagged {position}")
            }
            Self::PhaseChanged { phase } => format!("phase: {phase}"),
            Self::TurnEnded { player } => format!("{player}'s turn ended"),
            Self::GameOver { outcome } => format!("game over: {outcome}"),
        };
        write!(f, "{repr}")
    }
}
