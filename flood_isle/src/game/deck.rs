//! Card piles and the deck manager.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{
    board::Island,
    constants::{HELICOPTER_CARDS, SANDBAGS_CARDS, TREASURE_CARDS_PER_TYPE, WATER_RISE_CARDS},
    entities::{Card, SpecialCard, TreasureType},
    errors::{DeckError, Pile},
};

/// An ordered pile of cards. The top of the pile is the end of the vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Deck {
    pile: Pile,
    cards: Vec<Card>,
}

impl Deck {
    pub fn new(pile: Pile, cards: Vec<Card>) -> Self {
        Self { pile, cards }
    }

    /// Permutes the pile. The same seed always produces the same order for
    /// the same starting pile.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.cards.shuffle(&mut rng);
    }

    /// Removes and returns the top card.
    pub fn draw(&mut self) -> Result<Card, DeckError> {
        self.cards
            .pop()
            .ok_or(DeckError::EmptyDeck { pile: self.pile })
    }

    /// Places a card on top of the pile.
    pub fn push(&mut self, mut card: Card) {
        card.holder = None;
        self.cards.push(card);
    }

    pub fn peek(&self) -> Option<&Card> {
        self.cards.last()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Four cards per treasure type plus the fixed special cards, unshuffled.
pub fn treasure_deck(treasures: &[TreasureType]) -> Deck {
    let mut cards = Vec::with_capacity(
        treasures.len() * TREASURE_CARDS_PER_TYPE + HELICOPTER_CARDS + SANDBAGS_CARDS + WATER_RISE_CARDS,
    );
    for &treasure in treasures {
        cards.extend((0..TREASURE_CARDS_PER_TYPE).map(|_| Card::treasure(treasure)));
    }
    cards.extend((0..HELICOPTER_CARDS).map(|_| Card::special(SpecialCard::Helicopter)));
    cards.extend((0..SANDBAGS_CARDS).map(|_| Card::special(SpecialCard::Sandbags)));
    cards.extend((0..WATER_RISE_CARDS).map(|_| Card::special(SpecialCard::WaterRise)));
    Deck::new(Pile::Treasure, cards)
}

/// One flood card per tile, in row-major tile order, unshuffled.
pub fn flood_deck(island: &Island) -> Deck {
    let cards = island.sorted_tiles().into_iter().map(Card::flood).collect();
    Deck::new(Pile::Flood, cards)
}

/// Owns the treasure and flood piles and their discards.
///
/// Every shuffle after construction draws its seed from an internal RNG
/// seeded once, so a whole game is reproducible from a single seed.
#[derive(Clone, Debug)]
pub struct DeckManager {
    treasure: Deck,
    treasure_discard: Vec<Card>,
    flood: Deck,
    flood_discard: Vec<Card>,
    rng: StdRng,
}

impl DeckManager {
    /// Builds and shuffles both decks for the given island.
    pub fn new(island: &Island, seed: u64) -> Self {
        Self::from_decks(treasure_deck(&TreasureType::ALL), flood_deck(island), seed)
    }

    /// Takes pre-built decks and shuffles them with seeds derived from `seed`.
    pub fn from_decks(mut treasure: Deck, mut flood: Deck, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        treasure.shuffle(rng.random());
        flood.shuffle(rng.random());
        Self::stacked(treasure, flood, rng.random())
    }

    /// Takes decks as-is, without shuffling. Later reshuffles still use
    /// `seed`.
    pub fn stacked(treasure: Deck, flood: Deck, seed: u64) -> Self {
        Self {
            treasure,
            treasure_discard: Vec::new(),
            flood,
            flood_discard: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws from the treasure deck. The treasure deck is never reshuffled:
    /// an empty draw pile is an error the caller turns into a loss.
    pub fn draw_treasure(&mut self) -> Result<Card, DeckError> {
        self.treasure.draw()
    }

    /// Draws from the flood deck, first reshuffling the flood discard into
    /// the draw pile if the draw pile is empty.
    pub fn draw_flood(&mut self) -> Result<Card, DeckError> {
        if self.flood.is_empty() {
            self.reshuffle_flood_discard();
        }
        self.flood.draw()
    }

    pub fn discard_treasure(&mut self, mut card: Card) {
        card.holder = None;
        self.treasure_discard.push(card);
    }

    pub fn discard_flood(&mut self, mut card: Card) {
        card.holder = None;
        self.flood_discard.push(card);
    }

    /// Returns a card to the treasure deck and reshuffles it.
    pub fn put_back_treasure(&mut self, card: Card) {
        self.treasure.push(card);
        let seed = self.rng.random();
        self.treasure.shuffle(seed);
    }

    /// Water Rise: the flood discard is shuffled and placed on top of the
    /// flood draw pile, so recently flooded tiles come up first.
    pub fn water_rise(&mut self) {
        self.reshuffle_flood_discard();
    }

    fn reshuffle_flood_discard(&mut self) {
        if self.flood_discard.is_empty() {
            return;
        }
        let mut returned = Deck::new(Pile::Flood, std::mem::take(&mut self.flood_discard));
        returned.shuffle(self.rng.random());
        for card in returned.cards {
            self.flood.push(card);
        }
        log::debug!("Flood discard reshuffled, {} cards in draw pile", self.flood.len());
    }

    pub fn treasure_deck(&self) -> &Deck {
        &self.treasure
    }

    pub fn flood_deck(&self) -> &Deck {
        &self.flood
    }

    pub fn treasure_discard(&self) -> &[Card] {
        &self.treasure_discard
    }

    pub fn flood_discard(&self) -> &[Card] {
        &self.flood_discard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{CardKind, Position, Tile};

    fn small_island() -> Island {
        Island::from_tiles((0..4).map(|x| Tile::new(&format!("t{x}"), Position::new(x, 0))))
    }

    // === Composition Tests ===

    #[test]
    fn test_treasure_deck_composition() {
        let deck = treasure_deck(&TreasureType::ALL);
        assert_eq!(deck.len(), 28);

        for treasure in TreasureType::ALL {
            let count = deck
                .cards()
                .iter()
                .filter(|card| card.treasure_type() == Some(treasure))
                .count();
            assert_eq!(count, 4, "{treasure} count");
        }
        let count = |special| deck.cards().iter().filter(|c| c.is_special(special)).count();
        assert_eq!(count(SpecialCard::Helicopter), 3);
        assert_eq!(count(SpecialCard::Sandbags), 2);
        assert_eq!(count(SpecialCard::WaterRise), 3);
    }

    #[test]
    fn test_flood_deck_matches_tiles() {
        let island = small_island();
        let deck = flood_deck(&island);
        assert_eq!(deck.len(), island.len());
        for card in deck.cards() {
            let CardKind::Flood { tile, position } = &card.kind else {
                panic!("non-flood card in flood deck");
            };
            assert_eq!(island.position_of(tile), Some(*position));
        }
    }

    // === Shuffle and Draw Tests ===

    #[test]
    fn test_shuffle_is_deterministic() {
        let mut a = treasure_deck(&TreasureType::ALL);
        let mut b = treasure_deck(&TreasureType::ALL);
        a.shuffle(42);
        b.shuffle(42);
        assert_eq!(a, b);

        let mut c = treasure_deck(&TreasureType::ALL);
        c.shuffle(43);
        assert_ne!(a, c);
    }

    #[test]
    fn test_draw_empty_deck() {
        let mut deck = Deck::new(Pile::Treasure, vec![Card::treasure(TreasureType::Earth)]);
        assert!(deck.draw().is_ok());
        assert_eq!(
            deck.draw(),
            Err(DeckError::EmptyDeck {
                pile: Pile::Treasure
            })
        );
    }

    #[test]
    fn test_treasure_deck_never_reshuffles() {
        let treasure = Deck::new(Pile::Treasure, vec![Card::treasure(TreasureType::Fire)]);
        let mut decks = DeckManager::stacked(treasure, flood_deck(&small_island()), 1);
        let card = decks.draw_treasure().unwrap();
        decks.discard_treasure(card);
        assert!(decks.draw_treasure().is_err());
        assert_eq!(decks.treasure_discard().len(), 1);
    }

    #[test]
    fn test_flood_deck_reshuffles_discard() {
        let mut decks = DeckManager::new(&small_island(), 5);
        for _ in 0..4 {
            let card = decks.draw_flood().unwrap();
            decks.discard_flood(card);
        }
        assert!(decks.flood_deck().is_empty());
        assert!(decks.draw_flood().is_ok());
        assert_eq!(decks.flood_deck().len(), 3);
        assert!(decks.flood_discard().is_empty());
    }

    #[test]
    fn test_water_rise_puts_discard_on_top() {
        let mut decks = DeckManager::new(&small_island(), 9);
        let first = decks.draw_flood().unwrap();
        let first_tile = first.kind.clone();
        decks.discard_flood(first);

        decks.water_rise();
        assert!(decks.flood_discard().is_empty());
        assert_eq!(decks.flood_deck().len(), 4);
        assert_eq!(decks.draw_flood().unwrap().kind, first_tile);
    }

    #[test]
    fn test_put_back_treasure_keeps_count() {
        let mut decks = DeckManager::new(&small_island(), 11);
        let card = decks.draw_treasure().unwrap();
        assert_eq!(decks.treasure_deck().len(), 27);
        decks.put_back_treasure(card);
        assert_eq!(decks.treasure_deck().len(), 28);
    }
}
