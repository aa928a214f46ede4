use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flood_isle::{
    game::{
        Game, GameSettings, Intent, Island, Phase, PlayerName, Position, Role, RoleKind, RoleRules,
        Tile, TileState, TileTable,
    },
    net::{
        Message, MessageId,
        codec::{decode_event, encode_event},
    },
};
use std::hint::black_box;

const ROLES: [RoleKind; 4] = [
    RoleKind::Pilot,
    RoleKind::Engineer,
    RoleKind::Diver,
    RoleKind::Navigator,
];

/// Helper to create a started game with N players
fn setup_game_with_players(n_players: usize) -> Game {
    let roster: Vec<_> = (0..n_players)
        .map(|i| (PlayerName::new(&format!("player{i}")), ROLES[i]))
        .collect();
    let mut game = Game::new(GameSettings::default().with_seed(7), &TileTable::default(), &roster).unwrap();
    game.start().unwrap();
    game.drain_events();
    game
}

/// A `size` x `size` island where every other row is flooded, giving the
/// diver long corridors to search.
fn striped_island(size: i32) -> Island {
    let tiles = (0..size).flat_map(|y| {
        (0..size).map(move |x| {
            let state = if y % 2 == 0 { TileState::Flooded } else { TileState::Normal };
            Tile::new(&format!("{x}-{y}"), Position::new(x, y)).with_state(state)
        })
    });
    Island::from_tiles(tiles)
}

/// Plays the current player's turn to completion: end the action phase and
/// draw every treasure and flood card owed.
fn play_turn(game: &mut Game) {
    let name = match game.current_player() {
        Some(player) => player.name.clone(),
        None => return,
    };
    let _ = game.apply(&name, Intent::EndTurn);
    for _ in 0..32 {
        let intent = match game.phase() {
            Phase::DrawTreasure => Intent::DrawTreasureCard,
            Phase::DrawFlood => Intent::DrawFloodCard,
            _ => break,
        };
        if game.apply(&name, intent).is_err() {
            break;
        }
    }
}

/// Benchmark legal move queries for every role on the standard island
fn bench_legal_moves(c: &mut Criterion) {
    let game = setup_game_with_players(4);
    let names: Vec<PlayerName> = game.players().iter().map(|p| p.name.clone()).collect();

    c.bench_function("legal_moves_4_players", |b| {
        b.iter(|| {
            names
                .iter()
                .map(|name| game.legal_moves(black_box(name)).map(|moves| moves.len()))
                .collect::<Vec<_>>()
        });
    });
}

/// Benchmark the diver search with growing islands
fn bench_diver_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("diver_search");
    let diver = Role::from(RoleKind::Diver);

    for size in [6, 12, 24].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{size}x{size}")), size, |b, &size| {
            let island = striped_island(size);
            b.iter(|| diver.move_destinations(black_box(Position::new(0, 0)), &island));
        });
    }

    group.finish();
}

/// Benchmark a full turn including treasure and flood draws
fn bench_full_turn(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_turn");

    for n_players in [2, 4].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n_players}_players")),
            n_players,
            |b, &n| {
                let game = setup_game_with_players(n);
                b.iter(|| {
                    let mut game = game.clone();
                    play_turn(&mut game);
                    game.drain_events()
                });
            },
        );
    }

    group.finish();
}

/// Benchmark encoding and decoding the events of a game start
fn bench_event_codec(c: &mut Criterion) {
    let roster = [
        (PlayerName::new("ann"), RoleKind::Pilot),
        (PlayerName::new("bob"), RoleKind::Engineer),
    ];
    let mut game = Game::new(GameSettings::default().with_seed(7), &TileTable::default(), &roster).unwrap();
    game.start().unwrap();
    let events: Vec<_> = game.drain_events().into_iter().collect();
    let frames: Vec<String> = events
        .iter()
        .enumerate()
        .map(|(i, event)| encode_event(event, MessageId(i as u64), "lagoon", "room").encode())
        .collect();

    c.bench_function("encode_start_events", |b| {
        b.iter(|| {
            events
                .iter()
                .map(|event| encode_event(black_box(event), MessageId(1), "lagoon", "room").encode())
                .collect::<Vec<_>>()
        });
    });

    c.bench_function("decode_start_events", |b| {
        b.iter(|| {
            frames
                .iter()
                .map(|frame| Message::decode(black_box(frame)).and_then(|m| decode_event(&m)))
                .collect::<Vec<_>>()
        });
    });
}

criterion_group!(rules, bench_legal_moves, bench_diver_search, bench_full_turn);

criterion_group!(wire, bench_event_codec);

criterion_main!(rules, wire);
