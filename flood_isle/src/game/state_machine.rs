//! Turn and game state machine.
//!
//! [`Game`] owns the island, the decks and the players, and is the only
//! place game state changes. Every change goes through [`Game::apply`],
//! which validates an [`Intent`] against the current phase and the acting
//! player's role before mutating anything. Accepted intents queue
//! [`GameEvent`]s that callers drain and broadcast.
//!
//! Phases run `TurnStart -> Actions -> DrawTreasure -> DrawFlood -> TurnEnd`
//! and then on to the next player's `TurnStart`. Loss conditions are checked
//! after every mutation and end the game immediately.

use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashSet, VecDeque},
    fmt,
    str::FromStr,
};

use super::{
    board::{Island, TileTable},
    constants::{
        CARDS_TO_CAPTURE, DEFAULT_ACTIONS_PER_TURN, DEFAULT_EXTRACTION_TILE, DEFAULT_FLOOD_SCHEDULE,
        DEFAULT_HAND_LIMIT, DEFAULT_INITIAL_FLOODS, DEFAULT_LOSING_WATER_LEVEL,
        DEFAULT_STARTING_TREASURE_CARDS, DEFAULT_STARTING_WATER_LEVEL,
        DEFAULT_TREASURE_DRAWS_PER_TURN, MAX_PLAYERS, MIN_PLAYERS, NAVIGATOR_DIRECTED_MOVES,
    },
    deck::DeckManager,
    entities::{CardKind, Player, PlayerName, Position, SpecialCard, Tile, TileState, TreasureType},
    errors::{ParseValueError, RuleViolation},
    events::GameEvent,
    flood::{self, FloodOutcome},
    intent::Intent,
    roles::{RoleKind, RoleRules, default_moves},
};

/// Rule parameters for a single game.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameSettings {
    pub actions_per_turn: usize,
    pub treasure_draws_per_turn: usize,
    pub hand_limit: usize,
    pub starting_treasure_cards: usize,
    pub initial_floods: usize,
    pub starting_water_level: usize,
    pub losing_water_level: usize,
    /// Flood cards drawn per turn, indexed by `water_level - 1`.
    pub flood_schedule: Vec<usize>,
    pub extraction_tile: String,
    /// Seed for the island layout and every shuffle. Random when unset.
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            actions_per_turn: DEFAULT_ACTIONS_PER_TURN,
            treasure_draws_per_turn: DEFAULT_TREASURE_DRAWS_PER_TURN,
            hand_limit: DEFAULT_HAND_LIMIT,
            starting_treasure_cards: DEFAULT_STARTING_TREASURE_CARDS,
            initial_floods: DEFAULT_INITIAL_FLOODS,
            starting_water_level: DEFAULT_STARTING_WATER_LEVEL,
            losing_water_level: DEFAULT_LOSING_WATER_LEVEL,
            flood_schedule: DEFAULT_FLOOD_SCHEDULE.to_vec(),
            extraction_tile: DEFAULT_EXTRACTION_TILE.to_string(),
            seed: None,
        }
    }
}

impl GameSettings {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.actions_per_turn == 0 {
            return Err("actions_per_turn must be at least 1".to_string());
        }
        if self.hand_limit == 0 {
            return Err("hand_limit must be at least 1".to_string());
        }
        if self.flood_schedule.is_empty() {
            return Err("flood_schedule must not be empty".to_string());
        }
        if self.starting_water_level == 0 || self.starting_water_level >= self.losing_water_level {
            return Err(format!(
                "starting_water_level ({}) must be between 1 and losing_water_level ({})",
                self.starting_water_level, self.losing_water_level
            ));
        }
        if self.extraction_tile.is_empty() {
            return Err("extraction_tile must not be empty".to_string());
        }
        Ok(())
    }
}

/// Why a game was lost.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum LossReason {
    ExtractionTileSunk,
    TreasureLost(TreasureType),
    PlayerStranded(PlayerName),
    WaterLevelTooHigh,
    TreasureDeckExhausted,
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtractionTileSunk => write!(f, "extraction_tile_sunk"),
            Self::TreasureLost(treasure) => write!(f, "treasure_lost:{treasure}"),
            Self::PlayerStranded(name) => write!(f, "player_stranded:{name}"),
            Self::WaterLevelTooHigh => write!(f, "water_level"),
            Self::TreasureDeckExhausted => write!(f, "treasure_deck_exhausted"),
        }
    }
}

impl FromStr for LossReason {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, arg) = match s.split_once(':') {
            Some((head, arg)) => (head, Some(arg)),
            None => (s, None),
        };
        match (head, arg) {
            ("extraction_tile_sunk", None) => Ok(Self::ExtractionTileSunk),
            ("treasure_lost", Some(treasure)) => Ok(Self::TreasureLost(treasure.parse()?)),
            ("player_stranded", Some(name)) => Ok(Self::PlayerStranded(PlayerName::new(name))),
            ("water_level", None) => Ok(Self::WaterLevelTooHigh),
            ("treasure_deck_exhausted", None) => Ok(Self::TreasureDeckExhausted),
            _ => Err(ParseValueError::new("loss reason", s)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Outcome {
    Won,
    Lost(LossReason),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Won => write!(f, "won"),
            Self::Lost(reason) => write!(f, "lost:{reason}"),
        }
    }
}

impl FromStr for Outcome {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "won" => Ok(Self::Won),
            _ => match s.strip_prefix("lost:") {
                Some(reason) => Ok(Self::Lost(reason.parse()?)),
                None => Err(ParseValueError::new("outcome", s)),
            },
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Phase {
    #[default]
    Initializing,
    TurnStart,
    Actions,
    DrawTreasure,
    DrawFlood,
    TurnEnd,
    GameOver(Outcome),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Initializing => "initializing".to_string(),
            Self::TurnStart => "turn_start".to_string(),
            Self::Actions => "actions".to_string(),
            Self::DrawTreasure => "draw_treasure".to_string(),
            Self::DrawFlood => "draw_flood".to_string(),
            Self::TurnEnd => "turn_end".to_string(),
            Self::GameOver(outcome) => format!("game_over:{outcome}"),
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Phase {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(Self::Initializing),
            "turn_start" => Ok(Self::TurnStart),
            "actions" => Ok(Self::Actions),
            "draw_treasure" => Ok(Self::DrawTreasure),
            "draw_flood" => Ok(Self::DrawFlood),
            "turn_end" => Ok(Self::TurnEnd),
            _ => match s.strip_prefix("game_over:") {
                Some(outcome) => Ok(Self::GameOver(outcome.parse()?)),
                None => Err(ParseValueError::new("phase", s)),
            },
        }
    }
}

/// A player as seen in a snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub name: PlayerName,
    pub role: RoleKind,
    pub position: Position,
    pub hand: Vec<CardKind>,
    pub captured: BTreeSet<TreasureType>,
}

/// Copy of the observable game state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub turn: usize,
    pub current_player: Option<PlayerName>,
    pub actions_left: usize,
    pub water_level: usize,
    /// Row-major.
    pub tiles: Vec<Tile>,
    pub players: Vec<PlayerSnapshot>,
    pub treasure_deck: usize,
    pub flood_deck: usize,
}

#[derive(Clone, Debug)]
pub struct Game {
    settings: GameSettings,
    island: Island,
    decks: DeckManager,
    players: Vec<Player>,
    current: usize,
    phase: Phase,
    water_level: usize,
    treasure_draws_left: usize,
    flood_draws_left: usize,
    turn: usize,
    events: VecDeque<GameEvent>,
}

impl Game {
    /// Builds a game for the given roster: lays out the island, shuffles
    /// both decks and places each player on their role's starting tile.
    ///
    /// # Arguments
    ///
    /// * `settings` - Rule parameters; `settings.seed` fixes every shuffle
    /// * `table` - Tile names to lay out
    /// * `roster` - Players in turn order with their roles
    ///
    /// # Returns
    ///
    /// * `Result<Game, RuleViolation>` - The game in the `Initializing` phase
    pub fn new(
        settings: GameSettings,
        table: &TileTable,
        roster: &[(PlayerName, RoleKind)],
    ) -> Result<Self, RuleViolation> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&roster.len()) {
            return Err(RuleViolation::InvalidPlayerCount {
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
            });
        }
        let mut roles = HashSet::new();
        if !roster.iter().all(|(_, role)| roles.insert(*role)) {
            return Err(RuleViolation::RoleTaken);
        }

        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let island = Island::build(table, rng.random());
        let decks = DeckManager::new(&island, rng.random());

        let landing = island
            .position_of(&settings.extraction_tile)
            .ok_or_else(|| {
                RuleViolation::InternalState(format!(
                    "extraction tile {:?} is not on the island",
                    settings.extraction_tile
                ))
            })?;
        let players = roster
            .iter()
            .map(|(name, role)| {
                let start = island.starting_position(*role).unwrap_or(landing);
                Player::new(name.clone(), *role, start)
            })
            .collect();

        info!("Game created with seed {seed}");
        Ok(Self::from_parts(settings, island, decks, players))
    }

    /// Assembles a game from prepared parts without shuffling or placing
    /// anything.
    pub fn from_parts(
        settings: GameSettings,
        island: Island,
        decks: DeckManager,
        players: Vec<Player>,
    ) -> Self {
        let water_level = settings.starting_water_level;
        Self {
            settings,
            island,
            decks,
            players,
            current: 0,
            phase: Phase::Initializing,
            water_level,
            treasure_draws_left: 0,
            flood_draws_left: 0,
            turn: 0,
            events: VecDeque::new(),
        }
    }

    /// Runs setup (initial floods and starting hands) and begins the first
    /// turn.
    pub fn start(&mut self) -> Result<(), RuleViolation> {
        if self.phase != Phase::Initializing {
            return Err(RuleViolation::GameAlreadyStarted);
        }
        if self.players.is_empty() {
            return Err(RuleViolation::InvalidPlayerCount {
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
            });
        }

        let players = self
            .players
            .iter()
            .map(|p| (p.name.clone(), p.role_kind(), p.position))
            .collect();
        self.push_event(GameEvent::GameStarted {
            players,
            water_level: self.water_level,
        });

        let outcomes = flood::draw_flood_cards(
            &mut self.island,
            &mut self.decks,
            self.settings.initial_floods,
        );
        self.resolve_floods(outcomes);
        self.deal_starting_hands();

        info!(
            "Game started with {} players at water level {}",
            self.players.len(),
            self.water_level
        );
        if !self.check_end_conditions() {
            self.begin_turn();
        }
        Ok(())
    }

    /// Water Rise cards drawn while dealing are set aside and shuffled back
    /// in once every hand is dealt.
    fn deal_starting_hands(&mut self) {
        let mut set_aside = Vec::new();
        for idx in 0..self.players.len() {
            let mut dealt = 0;
            while dealt < self.settings.starting_treasure_cards {
                let Ok(card) = self.decks.draw_treasure() else {
                    break;
                };
                if card.is_special(SpecialCard::WaterRise) {
                    set_aside.push(card);
                    continue;
                }
                self.push_event(GameEvent::CardDrawn {
                    player: self.players[idx].name.clone(),
                    card: card.kind.clone(),
                });
                self.players[idx].receive(card);
                dealt += 1;
            }
        }
        for card in set_aside {
            self.decks.put_back_treasure(card);
        }
    }

    /// Validates and applies an intent from `actor`.
    ///
    /// # Arguments
    ///
    /// * `actor` - The player submitting the intent
    /// * `intent` - What they want to do
    ///
    /// # Returns
    ///
    /// * `Result<(), RuleViolation>` - Ok if applied; nothing changes on error
    pub fn apply(&mut self, actor: &PlayerName, intent: Intent) -> Result<(), RuleViolation> {
        match (&self.phase, &intent) {
            (Phase::GameOver(_), _) => return Err(RuleViolation::GameOver),
            (Phase::Initializing, Intent::StartGame) => return self.start(),
            (Phase::Initializing, _) => return Err(RuleViolation::GameNotStarted),
            (_, Intent::StartGame) => return Err(RuleViolation::GameAlreadyStarted),
            _ => {}
        }

        let idx = self.player_index(actor)?;
        if !intent.is_out_of_turn() {
            if idx != self.current {
                return Err(RuleViolation::OutOfTurn);
            }
            if let Some(player) = self.over_hand_limit() {
                return Err(RuleViolation::HandLimitExceeded(player.name.clone()));
            }
        }

        let is_action = intent.is_action();
        let is_direct = matches!(intent, Intent::NavigatorDirect { .. });
        if is_action {
            if self.phase != Phase::Actions {
                return Err(self.wrong_phase());
            }
            if self.actions_left() == 0 {
                return Err(RuleViolation::NoActionsRemaining);
            }
        }

        debug!("{actor}: {intent}");
        match intent {
            Intent::StartGame => return Err(RuleViolation::GameAlreadyStarted),
            Intent::Move { to } => self.move_player(idx, to)?,
            Intent::ShoreUp { targets } => self.shore_up(idx, targets)?,
            Intent::GiveCard { to, card } => self.give_card(idx, &to, card)?,
            Intent::CaptureTreasure => self.capture_treasure(idx)?,
            Intent::DrawTreasureCard => self.draw_treasure_card()?,
            Intent::DrawFloodCard => self.draw_flood_card()?,
            Intent::EndTurn => self.end_actions()?,
            Intent::DiscardCard { card } => self.discard_card(idx, card)?,
            Intent::NavigatorDirect { target } => self.navigator_direct(idx, target)?,
            Intent::NavigatorDirectedMove { to } => self.navigator_directed_move(idx, to)?,
            Intent::HelicopterMove { passengers, to } => self.helicopter(idx, passengers, to)?,
            Intent::SandbagsUse { target } => self.sandbags(idx, target)?,
        }

        if is_action {
            let player = &mut self.players[idx];
            player.actions_taken += 1;
            if !is_direct && let Some(navigator) = player.role.as_navigator_mut() {
                navigator.clear_direction();
            }
        }

        if !self.check_end_conditions() {
            self.finish_actions_if_spent();
        }
        Ok(())
    }

    // === Actions ===

    fn move_player(&mut self, idx: usize, to: Position) -> Result<(), RuleViolation> {
        let player = &self.players[idx];
        let from = player.position;
        if !player.role.move_destinations(from, &self.island).contains(&to) {
            return Err(RuleViolation::IllegalMove(to));
        }
        self.players[idx].role.record_move(from, to);
        self.relocate(idx, to);
        Ok(())
    }

    fn shore_up(&mut self, idx: usize, targets: Vec<Position>) -> Result<(), RuleViolation> {
        if targets.is_empty() {
            return Err(RuleViolation::NoShoreUpTarget);
        }
        let mut unique = Vec::with_capacity(targets.len());
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }

        let player = &self.players[idx];
        let max = player.role.max_shore_up_targets();
        if unique.len() > max {
            return Err(RuleViolation::TooManyShoreUpTargets { max });
        }
        let allowed = player.role.shore_up_targets(player.position, &self.island);
        if let Some(&bad) = unique.iter().find(|target| !allowed.contains(target)) {
            return Err(RuleViolation::IllegalShoreUp(bad));
        }

        for target in unique {
            flood::shore_up(&mut self.island, target);
            self.push_tile_event(target, TileState::Normal);
        }
        self.players[idx].role.record_shore_up();
        Ok(())
    }

    fn give_card(&mut self, idx: usize, to: &PlayerName, card: CardKind) -> Result<(), RuleViolation> {
        if !matches!(card, CardKind::Treasure(_)) {
            return Err(RuleViolation::NotATreasureCard);
        }
        let recipient = self.player_index(to)?;
        let giver = &self.players[idx];
        if recipient == idx
            || !giver
                .role
                .can_give_to(giver.position, self.players[recipient].position)
        {
            return Err(RuleViolation::IllegalRecipient(to.clone()));
        }

        let taken = self.players[idx]
            .take_card(&card)
            .ok_or(RuleViolation::CardNotHeld)?;
        self.players[recipient].receive(taken);
        self.push_event(GameEvent::CardGiven {
            from: self.players[idx].name.clone(),
            to: to.clone(),
            card,
        });
        Ok(())
    }

    fn capture_treasure(&mut self, idx: usize) -> Result<(), RuleViolation> {
        let player = &self.players[idx];
        let treasure = self
            .island
            .get(player.position)
            .and_then(|tile| tile.treasure)
            .ok_or(RuleViolation::NoTreasureHere)?;
        if self.captured_treasures().contains(&treasure) {
            return Err(RuleViolation::TreasureAlreadyCaptured(treasure));
        }
        if player.treasure_count(treasure) < CARDS_TO_CAPTURE {
            return Err(RuleViolation::NotEnoughTreasureCards {
                treasure,
                needed: CARDS_TO_CAPTURE,
            });
        }

        let kind = CardKind::Treasure(treasure);
        for _ in 0..CARDS_TO_CAPTURE {
            if let Some(card) = self.players[idx].take_card(&kind) {
                self.decks.discard_treasure(card);
            }
        }
        let player = &mut self.players[idx];
        player.captured.insert(treasure);
        let name = player.name.clone();
        info!("{name} captured the {treasure} treasure");
        self.push_event(GameEvent::TreasureCaptured {
            player: name,
            treasure,
        });
        Ok(())
    }

    fn navigator_direct(&mut self, idx: usize, target: PlayerName) -> Result<(), RuleViolation> {
        if self.players[idx].role.as_navigator().is_none() {
            return Err(RuleViolation::NotNavigator);
        }
        if self.players[idx].name == target {
            return Err(RuleViolation::CannotDirectSelf);
        }
        self.player_index(&target)?;

        let navigator = &mut self.players[idx];
        if let Some(role) = navigator.role.as_navigator_mut() {
            role.direct(target.clone());
        }
        self.push_event(GameEvent::NavigatorDirecting {
            navigator: self.players[idx].name.clone(),
            target,
            moves: NAVIGATOR_DIRECTED_MOVES,
        });
        Ok(())
    }

    /// Directed moves are free: the action was spent on the direction.
    fn navigator_directed_move(&mut self, idx: usize, to: Position) -> Result<(), RuleViolation> {
        if self.phase != Phase::Actions {
            return Err(self.wrong_phase());
        }
        let target = self.players[idx]
            .role
            .as_navigator()
            .ok_or(RuleViolation::NotNavigator)?
            .target()
            .cloned()
            .ok_or(RuleViolation::NotDirecting)?;
        let moved = self.player_index(&target)?;
        if !default_moves(self.players[moved].position, &self.island).contains(&to) {
            return Err(RuleViolation::IllegalMove(to));
        }

        if let Some(navigator) = self.players[idx].role.as_navigator_mut() {
            navigator.spend_directed_move();
        }
        self.relocate(moved, to);
        Ok(())
    }

    // === Special cards ===

    fn helicopter(
        &mut self,
        idx: usize,
        passengers: Vec<PlayerName>,
        to: Option<Position>,
    ) -> Result<(), RuleViolation> {
        let card_kind = CardKind::Special(SpecialCard::Helicopter);
        if !self.players[idx].holds(&card_kind) {
            return Err(RuleViolation::CardNotHeld);
        }

        let Some(to) = to else {
            if !self.can_lift_off() {
                return Err(RuleViolation::CannotLiftOff);
            }
            self.play_special(idx, &card_kind);
            let passengers = self.players.iter().map(|p| p.name.clone()).collect();
            self.push_event(GameEvent::HelicopterLifted {
                holder: self.players[idx].name.clone(),
                passengers,
                to: None,
            });
            self.finish(Outcome::Won);
            return Ok(());
        };

        let mut riders: Vec<usize> = Vec::with_capacity(passengers.len());
        for name in &passengers {
            let rider = self.player_index(name)?;
            if !riders.contains(&rider) {
                riders.push(rider);
            }
        }
        let Some(&first) = riders.first() else {
            return Err(RuleViolation::NoPassengers);
        };
        let origin = self.players[first].position;
        if riders.iter().any(|&r| self.players[r].position != origin) {
            return Err(RuleViolation::PassengersSplit);
        }
        if to == origin || !self.island.is_standable(to) {
            return Err(RuleViolation::IllegalFlight(to));
        }

        self.play_special(idx, &card_kind);
        for &rider in &riders {
            self.relocate(rider, to);
        }
        self.push_event(GameEvent::HelicopterLifted {
            holder: self.players[idx].name.clone(),
            passengers: riders.iter().map(|&r| self.players[r].name.clone()).collect(),
            to: Some(to),
        });
        Ok(())
    }

    fn sandbags(&mut self, idx: usize, target: Position) -> Result<(), RuleViolation> {
        let card_kind = CardKind::Special(SpecialCard::Sandbags);
        if !self.players[idx].holds(&card_kind) {
            return Err(RuleViolation::CardNotHeld);
        }
        if !self.island.is_flooded(target) {
            return Err(RuleViolation::NotFlooded(target));
        }

        self.play_special(idx, &card_kind);
        flood::shore_up(&mut self.island, target);
        self.push_event(GameEvent::SandbagsUsed {
            player: self.players[idx].name.clone(),
            position: target,
        });
        self.push_tile_event(target, TileState::Normal);
        Ok(())
    }

    fn play_special(&mut self, idx: usize, kind: &CardKind) {
        if let Some(card) = self.players[idx].take_card(kind) {
            self.decks.discard_treasure(card);
        }
    }

    fn discard_card(&mut self, idx: usize, card: CardKind) -> Result<(), RuleViolation> {
        if self.players[idx].hand.len() <= self.settings.hand_limit {
            return Err(RuleViolation::NoDiscardRequired);
        }
        let discarded = self.players[idx]
            .take_card(&card)
            .ok_or(RuleViolation::CardNotHeld)?;
        self.decks.discard_treasure(discarded);
        self.push_event(GameEvent::CardDiscarded {
            player: self.players[idx].name.clone(),
            card,
        });
        Ok(())
    }

    // === Draw phases ===

    fn end_actions(&mut self) -> Result<(), RuleViolation> {
        if self.phase != Phase::Actions {
            return Err(self.wrong_phase());
        }
        self.enter_draw_treasure();
        Ok(())
    }

    fn draw_treasure_card(&mut self) -> Result<(), RuleViolation> {
        match self.phase {
            Phase::Actions => self.enter_draw_treasure(),
            Phase::DrawTreasure => {}
            _ => return Err(self.wrong_phase()),
        }
        if self.phase != Phase::DrawTreasure {
            return Ok(());
        }

        let card = match self.decks.draw_treasure() {
            Ok(card) => card,
            Err(err) => {
                debug!("{err}");
                self.finish(Outcome::Lost(LossReason::TreasureDeckExhausted));
                return Ok(());
            }
        };
        let player = &mut self.players[self.current];
        self.events.push_back(GameEvent::CardDrawn {
            player: player.name.clone(),
            card: card.kind.clone(),
        });
        if card.is_special(SpecialCard::WaterRise) {
            self.decks.discard_treasure(card);
            self.raise_water();
        } else {
            player.receive(card);
        }

        self.treasure_draws_left = self.treasure_draws_left.saturating_sub(1);
        if !self.check_end_conditions() && self.treasure_draws_left == 0 {
            self.enter_draw_flood();
        }
        Ok(())
    }

    fn draw_flood_card(&mut self) -> Result<(), RuleViolation> {
        if self.phase != Phase::DrawFlood {
            return Err(self.wrong_phase());
        }
        let outcomes = flood::draw_flood_cards(&mut self.island, &mut self.decks, 1);
        self.resolve_floods(outcomes);

        self.flood_draws_left = self.flood_draws_left.saturating_sub(1);
        if !self.check_end_conditions() && self.flood_draws_left == 0 {
            self.end_turn();
        }
        Ok(())
    }

    fn raise_water(&mut self) {
        self.water_level += 1;
        self.decks.water_rise();
        info!("Water rose to level {}", self.water_level);
        self.push_event(GameEvent::WaterRose {
            level: self.water_level,
        });
    }

    /// Publishes flood results and moves players off tiles that sank.
    fn resolve_floods(&mut self, outcomes: Vec<FloodOutcome>) {
        for outcome in outcomes {
            if self.is_over() {
                return;
            }
            self.push_event(GameEvent::FloodCardDrawn {
                tile: outcome.tile.clone(),
                position: outcome.position,
            });
            if !outcome.changed {
                continue;
            }
            self.push_tile_event(outcome.position, outcome.state);
            if outcome.state == TileState::Sunk {
                self.swim_from(outcome.position);
            }
        }
    }

    /// Every player on the sunk tile swims to the first destination of
    /// their role's swim set in row-major order. No destination means the
    /// player drowns.
    fn swim_from(&mut self, sunk: Position) {
        let swimmers: Vec<usize> = (0..self.players.len())
            .filter(|&idx| self.players[idx].position == sunk)
            .collect();
        for idx in swimmers {
            let destination = self.players[idx]
                .role
                .swim_destinations(sunk, &self.island)
                .into_iter()
                .min_by_key(|pos| pos.row_major());
            match destination {
                Some(to) => self.relocate(idx, to),
                None => {
                    let name = self.players[idx].name.clone();
                    self.finish(Outcome::Lost(LossReason::PlayerStranded(name)));
                    return;
                }
            }
        }
    }

    // === Phase transitions ===

    fn begin_turn(&mut self) {
        self.set_phase(Phase::TurnStart);
        self.turn += 1;
        let player = &mut self.players[self.current];
        player.reset_state();
        let name = player.name.clone();
        debug!("Turn {} begins for {name}", self.turn);
        self.push_event(GameEvent::TurnStarted {
            player: name,
            turn: self.turn,
        });
        self.treasure_draws_left = self.settings.treasure_draws_per_turn;
        self.flood_draws_left = 0;
        self.set_phase(Phase::Actions);
    }

    fn finish_actions_if_spent(&mut self) {
        if self.phase == Phase::Actions && self.actions_left() == 0 && !self.direction_pending() {
            self.enter_draw_treasure();
        }
    }

    fn enter_draw_treasure(&mut self) {
        self.set_phase(Phase::DrawTreasure);
        if self.treasure_draws_left == 0 {
            self.enter_draw_flood();
        }
    }

    fn enter_draw_flood(&mut self) {
        self.flood_draws_left = flood::flood_draw_count(self.water_level, &self.settings.flood_schedule);
        self.set_phase(Phase::DrawFlood);
        if self.flood_draws_left == 0 {
            self.end_turn();
        }
    }

    fn end_turn(&mut self) {
        self.set_phase(Phase::TurnEnd);
        self.push_event(GameEvent::TurnEnded {
            player: self.players[self.current].name.clone(),
        });
        self.current = (self.current + 1) % self.players.len();
        self.begin_turn();
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase.clone();
        self.push_event(GameEvent::PhaseChanged { phase });
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.is_over() {
            return;
        }
        info!("Game over after {} turns: {outcome}", self.turn);
        self.phase = Phase::GameOver(outcome.clone());
        self.push_event(GameEvent::GameOver { outcome });
    }

    /// Ends the game if a loss condition holds. Returns whether the game is
    /// over.
    fn check_end_conditions(&mut self) -> bool {
        if self.is_over() {
            return true;
        }
        match self.loss_reason() {
            Some(reason) => {
                self.finish(Outcome::Lost(reason));
                true
            }
            None => false,
        }
    }

    fn loss_reason(&self) -> Option<LossReason> {
        if self
            .island
            .by_name(&self.settings.extraction_tile)
            .is_some_and(Tile::is_sunk)
        {
            return Some(LossReason::ExtractionTileSunk);
        }

        let captured = self.captured_treasures();
        for treasure in TreasureType::ALL {
            if captured.contains(&treasure) {
                continue;
            }
            let tiles = self.island.treasure_tiles(treasure);
            if !tiles.is_empty() && tiles.iter().all(|tile| tile.is_sunk()) {
                return Some(LossReason::TreasureLost(treasure));
            }
        }

        if self.water_level >= self.settings.losing_water_level {
            return Some(LossReason::WaterLevelTooHigh);
        }
        None
    }

    // === Helpers ===

    fn relocate(&mut self, idx: usize, to: Position) {
        let player = &mut self.players[idx];
        let from = player.position;
        player.position = to;
        let player = player.name.clone();
        self.push_event(GameEvent::PlayerMoved { player, from, to });
    }

    fn push_tile_event(&mut self, position: Position, state: TileState) {
        let tile = self
            .island
            .get(position)
            .map(|tile| tile.name.clone())
            .unwrap_or_default();
        let event = match state {
            TileState::Normal => GameEvent::TileShoredUp { tile, position },
            TileState::Flooded => GameEvent::TileFlooded { tile, position },
            TileState::Sunk => GameEvent::TileSank { tile, position },
        };
        self.push_event(event);
    }

    fn push_event(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    fn player_index(&self, name: &PlayerName) -> Result<usize, RuleViolation> {
        self.players
            .iter()
            .position(|p| &p.name == name)
            .ok_or_else(|| RuleViolation::UnknownPlayer(name.clone()))
    }

    fn over_hand_limit(&self) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.hand.len() > self.settings.hand_limit)
    }

    fn direction_pending(&self) -> bool {
        self.players[self.current]
            .role
            .as_navigator()
            .is_some_and(|navigator| navigator.directing.is_some())
    }

    fn wrong_phase(&self) -> RuleViolation {
        RuleViolation::WrongPhase(self.phase.to_string())
    }

    fn can_lift_off(&self) -> bool {
        let Some(landing) = self.island.position_of(&self.settings.extraction_tile) else {
            return false;
        };
        self.captured_treasures().len() == TreasureType::ALL.len()
            && self.players.iter().all(|p| p.position == landing)
    }

    // === Queries ===

    pub fn legal_moves(&self, name: &PlayerName) -> Result<HashSet<Position>, RuleViolation> {
        let player = &self.players[self.player_index(name)?];
        Ok(player.role.move_destinations(player.position, &self.island))
    }

    pub fn legal_shore_ups(&self, name: &PlayerName) -> Result<HashSet<Position>, RuleViolation> {
        let player = &self.players[self.player_index(name)?];
        Ok(player.role.shore_up_targets(player.position, &self.island))
    }

    /// Players `name` may give a treasure card to right now.
    pub fn give_card_recipients(&self, name: &PlayerName) -> Result<Vec<PlayerName>, RuleViolation> {
        let giver = &self.players[self.player_index(name)?];
        Ok(self
            .players
            .iter()
            .filter(|p| p.name != giver.name && giver.role.can_give_to(giver.position, p.position))
            .map(|p| p.name.clone())
            .collect())
    }

    pub fn captured_treasures(&self) -> BTreeSet<TreasureType> {
        self.players
            .iter()
            .flat_map(|p| p.captured.iter().copied())
            .collect()
    }

    pub fn actions_left(&self) -> usize {
        self.players.get(self.current).map_or(0, |p| {
            self.settings.actions_per_turn.saturating_sub(p.actions_taken)
        })
    }

    pub fn current_player(&self) -> Option<&Player> {
        match self.phase {
            Phase::Initializing | Phase::GameOver(_) => None,
            _ => self.players.get(self.current),
        }
    }

    pub fn player(&self, name: &PlayerName) -> Option<&Player> {
        self.players.iter().find(|p| &p.name == name)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn island(&self) -> &Island {
        &self.island
    }

    pub fn decks(&self) -> &DeckManager {
        &self.decks
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver(_))
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.phase {
            Phase::GameOver(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn water_level(&self) -> usize {
        self.water_level
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn drain_events(&mut self) -> VecDeque<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase.clone(),
            turn: self.turn,
            current_player: self.current_player().map(|p| p.name.clone()),
            actions_left: self.actions_left(),
            water_level: self.water_level,
            tiles: self.island.sorted_tiles().into_iter().cloned().collect(),
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    name: p.name.clone(),
                    role: p.role_kind(),
                    position: p.position,
                    hand: p.hand.iter().map(|card| card.kind.clone()).collect(),
                    captured: p.captured.clone(),
                })
                .collect(),
            treasure_deck: self.decks.treasure_deck().len(),
            flood_deck: self.decks.flood_deck().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<(PlayerName, RoleKind)> {
        vec![
            (PlayerName::new("ann"), RoleKind::Pilot),
            (PlayerName::new("bo"), RoleKind::Diver),
        ]
    }

    fn seeded_game(seed: u64) -> Game {
        let settings = GameSettings::default().with_seed(seed);
        Game::new(settings, &TileTable::default(), &roster()).unwrap()
    }

    // === Settings ===

    #[test]
    fn test_default_settings_valid() {
        assert!(GameSettings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let settings = GameSettings {
            starting_water_level: 10,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = GameSettings {
            flood_schedule: vec![],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    // === Wire names ===

    #[test]
    fn test_phase_roundtrip() {
        let phases = [
            Phase::Initializing,
            Phase::Actions,
            Phase::DrawFlood,
            Phase::GameOver(Outcome::Won),
            Phase::GameOver(Outcome::Lost(LossReason::TreasureLost(TreasureType::Fire))),
            Phase::GameOver(Outcome::Lost(LossReason::PlayerStranded("ann".into()))),
        ];
        for phase in phases {
            assert_eq!(phase.to_string().parse::<Phase>().unwrap(), phase);
        }
        assert!("game_over".parse::<Phase>().is_err());
    }

    // === Construction ===

    #[test]
    fn test_new_rejects_bad_rosters() {
        let one = vec![(PlayerName::new("ann"), RoleKind::Pilot)];
        assert_eq!(
            Game::new(GameSettings::default(), &TileTable::default(), &one).unwrap_err(),
            RuleViolation::InvalidPlayerCount { min: 2, max: 4 }
        );

        let dup = vec![
            (PlayerName::new("ann"), RoleKind::Pilot),
            (PlayerName::new("bo"), RoleKind::Pilot),
        ];
        assert_eq!(
            Game::new(GameSettings::default(), &TileTable::default(), &dup).unwrap_err(),
            RuleViolation::RoleTaken
        );
    }

    #[test]
    fn test_players_start_on_role_tiles() {
        let game = seeded_game(4);
        let landing = game.island().position_of("Fools' Landing").unwrap();
        let iron = game.island().position_of("Iron Gate").unwrap();
        assert_eq!(game.player(&"ann".into()).unwrap().position, landing);
        assert_eq!(game.player(&"bo".into()).unwrap().position, iron);
    }

    #[test]
    fn test_same_seed_same_game() {
        let mut a = seeded_game(21);
        let mut b = seeded_game(21);
        a.start().unwrap();
        b.start().unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.drain_events(), b.drain_events());
    }

    // === Setup ===

    #[test]
    fn test_start_runs_setup() {
        let mut game = seeded_game(8);
        assert!(game.apply(&"ann".into(), Intent::Move { to: Position::new(0, 0) }).is_err());
        game.apply(&"ann".into(), Intent::StartGame).unwrap();

        assert_eq!(*game.phase(), Phase::Actions);
        assert_eq!(game.turn(), 1);
        assert_eq!(game.current_player().unwrap().name, PlayerName::new("ann"));
        assert_eq!(
            game.island().tiles().filter(|t| t.is_flooded()).count(),
            DEFAULT_INITIAL_FLOODS
        );
        for player in game.players() {
            assert_eq!(player.hand.len(), DEFAULT_STARTING_TREASURE_CARDS);
            assert!(!player.holds(&CardKind::Special(SpecialCard::WaterRise)));
        }
        assert_eq!(game.decks().treasure_deck().len(), 28 - 4);

        let events = game.drain_events();
        assert!(matches!(events.front(), Some(GameEvent::GameStarted { .. })));
        assert!(events.contains(&GameEvent::TurnStarted {
            player: "ann".into(),
            turn: 1
        }));
        assert_eq!(
            game.apply(&"ann".into(), Intent::StartGame),
            Err(RuleViolation::GameAlreadyStarted)
        );
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let mut game = seeded_game(2);
        game.start().unwrap();
        let before = game.snapshot();
        assert_eq!(
            game.apply(&"bo".into(), Intent::EndTurn),
            Err(RuleViolation::OutOfTurn)
        );
        assert_eq!(
            game.apply(&"cy".into(), Intent::EndTurn),
            Err(RuleViolation::UnknownPlayer("cy".into()))
        );
        assert_eq!(game.snapshot(), before);
    }
}
