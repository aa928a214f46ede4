use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{CardKind, PlayerName, Position};

/// Something a player asks to do. Intents are validated against the rules
/// before anything changes.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Intent {
    StartGame,
    Move {
        to: Position,
    },
    ShoreUp {
        targets: Vec<Position>,
    },
    GiveCard {
        to: PlayerName,
        card: CardKind,
    },
    CaptureTreasure,
    DrawTreasureCard,
    DrawFloodCard,
    /// Ends the action phase early.
    EndTurn,
    DiscardCard {
        card: CardKind,
    },
    NavigatorDirect {
        target: PlayerName,
    },
    NavigatorDirectedMove {
        to: Position,
    },
    HelicopterMove {
        passengers: Vec<PlayerName>,
        /// `None` lifts everyone off the island.
        to: Option<Position>,
    },
    SandbagsUse {
        target: Position,
    },
}

impl Intent {
    /// Intents that spend one of the turn's actions.
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Self::Move { .. }
                | Self::ShoreUp { .. }
                | Self::GiveCard { .. }
                | Self::CaptureTreasure
                | Self::NavigatorDirect { .. }
        )
    }

    /// Intents any player may submit outside their own turn.
    pub fn is_out_of_turn(&self) -> bool {
        matches!(
            self,
            Self::DiscardCard { .. } | Self::HelicopterMove { .. } | Self::SandbagsUse { .. }
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::StartGame => "start game".to_string(),
            Self::Move { to } => format!("move to {to}"),
            Self::ShoreUp { targets } => {
                let targets: Vec<String> = targets.iter().map(ToString::to_string).collect();
                format!("shore up {}", targets.join(" and "))
            }
            Self::GiveCard { to, card } => format!("give {card} to {to}"),
            Self::CaptureTreasure => "capture treasure".to_string(),
            Self::DrawTreasureCard => "draw treasure card".to_string(),
            Self::DrawFloodCard => "draw flood card".to_string(),
            Self::EndTurn => "end turn".to_string(),
            Self::DiscardCard { card } => format!("discard {card}"),
            Self::NavigatorDirect { target } => format!("direct {target}"),
            Self::NavigatorDirectedMove { to } => format!("directed move to {to}"),
            Self::HelicopterMove { to: Some(to), .. } => format!("helicopter to {to}"),
            Self::HelicopterMove { to: None, .. } => "helicopter lift off".to_string(),
            Self::SandbagsUse { target } => format!("sandbag {target}"),
        };
        write!(f, "{repr}")
    }
}
