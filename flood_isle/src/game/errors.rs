//! Rule engine error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{PlayerName, Position, TreasureType};

/// Reasons an intent is rejected. Rejected intents are never applied and
/// never broadcast.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum RuleViolation {
    #[error("game already started")]
    GameAlreadyStarted,
    #[error("game has not started")]
    GameNotStarted,
    #[error("game is over")]
    GameOver,
    #[error("need {min}-{max} players")]
    InvalidPlayerCount { min: usize, max: usize },
    #[error("role already taken")]
    RoleTaken,
    #[error("player {0} does not exist")]
    UnknownPlayer(PlayerName),
    #[error("not your turn")]
    OutOfTurn,
    #[error("not allowed during the {0} phase")]
    WrongPhase(String),
    #[error("no actions remaining this turn")]
    NoActionsRemaining,
    #[error("{0} must discard down to the hand limit first")]
    HandLimitExceeded(PlayerName),
    #[error("hand is within the limit, nothing to discard")]
    NoDiscardRequired,
    #[error("can't move to {0}")]
    IllegalMove(Position),
    #[error("can't shore up {0}")]
    IllegalShoreUp(Position),
    #[error("can shore up at most {max} tile(s) with this action")]
    TooManyShoreUpTargets { max: usize },
    #[error("shore up needs at least one target")]
    NoShoreUpTarget,
    #[error("can't give a card to {0}")]
    IllegalRecipient(PlayerName),
    #[error("card not in hand")]
    CardNotHeld,
    #[error("only treasure cards can be given")]
    NotATreasureCard,
    #[error("no treasure to capture here")]
    NoTreasureHere,
    #[error("{0} treasure already captured")]
    TreasureAlreadyCaptured(TreasureType),
    #[error("need {needed} {treasure} cards to capture")]
    NotEnoughTreasureCards {
        treasure: TreasureType,
        needed: usize,
    },
    #[error("only the navigator can direct other players")]
    NotNavigator,
    #[error("the navigator can't direct themselves")]
    CannotDirectSelf,
    #[error("no player is being directed")]
    NotDirecting,
    #[error("helicopter needs at least one passenger")]
    NoPassengers,
    #[error("helicopter passengers must share a tile")]
    PassengersSplit,
    #[error("can't fly to {0}")]
    IllegalFlight(Position),
    #[error("can't lift off yet")]
    CannotLiftOff,
    #[error("tile at {0} isn't flooded")]
    NotFlooded(Position),
    #[error("only the host can do that")]
    NotHost,
    #[error("invalid game state: {0}")]
    InternalState(String),
}

/// Which pile a draw was attempted on.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Pile {
    Treasure,
    Flood,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DeckError {
    #[error("{pile:?} deck is empty")]
    EmptyDeck { pile: Pile },
}

/// Failure to parse a textual game value such as a position or card name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseValueError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
