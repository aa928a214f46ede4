/// Property-based tests for the rules engine and the wire format using proptest
///
/// These tests check the invariants that must hold for any tile history, any
/// island layout and any envelope contents, not just the hand-picked cases
/// of the unit tests.
use flood_isle::{
    game::{
        Card, CardKind, Deck, DeckManager, Island, Pile, Position, Role, RoleKind, RoleRules,
        SpecialCard, Tile, TileState, TreasureType,
        constants::{HELICOPTER_CARDS, SANDBAGS_CARDS, TREASURE_CARDS_PER_TYPE, WATER_RISE_CARDS},
        flood::{flood, shore_up},
        roles::default_moves,
    },
    net::{Message, MessageId, MessageType},
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug)]
enum TileOp {
    Flood,
    ShoreUp,
}

fn tile_op_strategy() -> impl Strategy<Value = TileOp> {
    prop_oneof![Just(TileOp::Flood), Just(TileOp::ShoreUp)]
}

fn tile_state_strategy() -> impl Strategy<Value = TileState> {
    prop_oneof![
        3 => Just(TileState::Normal),
        2 => Just(TileState::Flooded),
        1 => Just(TileState::Sunk),
    ]
}

fn role_strategy() -> impl Strategy<Value = RoleKind> {
    prop::sample::select(RoleKind::ALL.to_vec())
}

fn message_type_strategy() -> impl Strategy<Value = MessageType> {
    prop::sample::select(MessageType::ALL.to_vec())
}

// Strategy to generate a 5x5 island with arbitrary tile states
fn island_strategy() -> impl Strategy<Value = Island> {
    prop::collection::vec(tile_state_strategy(), 25).prop_map(|states| {
        let tiles = states.into_iter().enumerate().map(|(i, state)| {
            let (x, y) = ((i % 5) as i32, (i / 5) as i32);
            Tile::new(&format!("{x}-{y}"), Position::new(x, y)).with_state(state)
        });
        Island::from_tiles(tiles)
    })
}

fn single_tile() -> Island {
    Island::from_tiles([Tile::new("Observatory", Position::new(0, 0))])
}

fn counts(deck: &Deck) -> HashMap<CardKind, usize> {
    let mut counts = HashMap::new();
    for card in deck.cards() {
        *counts.entry(card.kind.clone()).or_insert(0) += 1;
    }
    counts
}

proptest! {
    // === Tile lifecycle ===

    #[test]
    fn test_tile_state_never_leaves_sunk(ops in prop::collection::vec(tile_op_strategy(), 0..20)) {
        let mut island = single_tile();
        let origin = Position::new(0, 0);
        let mut previous = TileState::Normal;

        for op in ops {
            let next = match op {
                TileOp::Flood => flood(&mut island, origin),
                TileOp::ShoreUp => shore_up(&mut island, origin),
            };
            let next = next.unwrap();

            if previous == TileState::Sunk {
                prop_assert_eq!(next, TileState::Sunk, "a sunk tile must stay sunk");
            }
            match op {
                TileOp::Flood => prop_assert_ne!(next, TileState::Normal),
                TileOp::ShoreUp => prop_assert!(
                    previous == TileState::Sunk || next == TileState::Normal,
                    "shoring up must dry any tile that has not sunk"
                ),
            }
            previous = next;
        }
    }

    #[test]
    fn test_two_floods_without_shoring_sink(extra_floods in 0usize..5) {
        let mut island = single_tile();
        let origin = Position::new(0, 0);

        prop_assert_eq!(flood(&mut island, origin), Some(TileState::Flooded));
        prop_assert_eq!(flood(&mut island, origin), Some(TileState::Sunk));
        for _ in 0..extra_floods {
            prop_assert_eq!(flood(&mut island, origin), Some(TileState::Sunk));
        }
        prop_assert_eq!(shore_up(&mut island, origin), Some(TileState::Sunk));
    }

    // === Movement ===

    #[test]
    fn test_move_destinations_are_never_sunk(
        island in island_strategy(),
        role in role_strategy(),
        x in 0i32..5,
        y in 0i32..5,
    ) {
        let role = Role::from(role);
        let from = Position::new(x, y);

        for to in role.move_destinations(from, &island) {
            prop_assert!(island.is_standable(to), "{} may not move onto {to}", role.kind());
            prop_assert_ne!(to, from);
        }
    }

    #[test]
    fn test_diver_reaches_at_least_default_moves(
        island in island_strategy(),
        x in 0i32..5,
        y in 0i32..5,
    ) {
        let from = Position::new(x, y);
        let diver = Role::from(RoleKind::Diver).move_destinations(from, &island);
        let walker = default_moves(from, &island);

        prop_assert!(walker.is_subset(&diver));
    }

    #[test]
    fn test_shore_targets_are_flooded(
        island in island_strategy(),
        role in role_strategy(),
        x in 0i32..5,
        y in 0i32..5,
    ) {
        let role = Role::from(role);
        for target in role.shore_up_targets(Position::new(x, y), &island) {
            prop_assert_eq!(island.state_of(target), Some(TileState::Flooded));
        }
    }

    // === Decks ===

    #[test]
    fn test_seeded_shuffle_is_deterministic(seed in any::<u64>()) {
        let fresh = || flood_isle::game::deck::treasure_deck(&TreasureType::ALL);
        let mut first = fresh();
        let mut second = fresh();
        first.shuffle(seed);
        second.shuffle(seed);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(counts(&first), counts(&fresh()));
    }

    #[test]
    fn test_new_decks_have_standard_composition(island in island_strategy(), seed in any::<u64>()) {
        let decks = DeckManager::new(&island, seed);
        let treasure = counts(decks.treasure_deck());

        for kind in TreasureType::ALL {
            prop_assert_eq!(treasure.get(&CardKind::Treasure(kind)), Some(&TREASURE_CARDS_PER_TYPE));
        }
        prop_assert_eq!(
            treasure.get(&CardKind::Special(SpecialCard::Helicopter)),
            Some(&HELICOPTER_CARDS)
        );
        prop_assert_eq!(
            treasure.get(&CardKind::Special(SpecialCard::Sandbags)),
            Some(&SANDBAGS_CARDS)
        );
        prop_assert_eq!(
            treasure.get(&CardKind::Special(SpecialCard::WaterRise)),
            Some(&WATER_RISE_CARDS)
        );

        let flood_positions: HashSet<Position> = decks
            .flood_deck()
            .cards()
            .iter()
            .filter_map(Card::flood_position)
            .collect();
        prop_assert_eq!(decks.flood_deck().len(), island.len());
        prop_assert_eq!(flood_positions.len(), island.len());
    }

    #[test]
    fn test_flood_draws_recycle_the_discard(draws in 1usize..60, seed in any::<u64>()) {
        let island = single_tile();
        let flood_cards: Vec<Card> = island.tiles().map(Card::flood).collect();
        let mut decks = DeckManager::stacked(
            Deck::new(Pile::Treasure, Vec::new()),
            Deck::new(Pile::Flood, flood_cards),
            seed,
        );

        for _ in 0..draws {
            let card = decks.draw_flood().unwrap();
            decks.discard_flood(card);
        }
        prop_assert_eq!(decks.flood_deck().len() + decks.flood_discard().len(), 1);
    }

    // === Wire format ===

    #[test]
    fn test_envelope_survives_the_wire(
        id in any::<u64>(),
        message_type in message_type_strategy(),
        room_id in "\\PC{0,12}",
        from in "\\PC{0,12}",
        to in proptest::option::of("\\PC{0,12}"),
        payload in prop::collection::vec(("\\PC{0,8}", "\\PC{0,12}"), 0..6),
    ) {
        let mut message = Message::new(MessageId(id), message_type, &room_id, &from);
        message.set_to(to.as_deref());
        for (key, value) in &payload {
            message.push(key, value);
        }

        let decoded = Message::decode(&message.encode()).unwrap();
        prop_assert_eq!(&decoded, &message);
        prop_assert_eq!(decoded.payload().len(), payload.len());
        prop_assert_eq!(decoded.is_broadcast(), to.as_deref().is_none_or(str::is_empty));
    }

    #[test]
    fn test_ack_echoes_the_original_id(id in any::<u64>(), message_type in message_type_strategy()) {
        let original = Message::new(MessageId(id), message_type, "lagoon", "room");
        let ack = Message::decode(&Message::ack(&original, "ann").encode()).unwrap();

        prop_assert!(ack.is_ack());
        prop_assert_eq!(ack.id(), original.id());
        prop_assert_eq!(ack.receiver(), Some("room"));
        prop_assert_eq!(ack.message_type(), MessageType::MessageAck);
    }
}
