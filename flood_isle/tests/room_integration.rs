//! Integration tests for rooms
//!
//! Participants are simulated with plain mpsc outboxes standing in for
//! websocket connections. Frames travel in the pipe-delimited wire format in
//! both directions.

use std::time::Duration;

use flood_isle::{
    game::{GameEvent, Intent, PlayerName, RuleViolation},
    net::{
        Message, MessageId, MessageType,
        codec::{decode_snapshot_tiles, encode_intent},
    },
    room::{RoomConfig, RoomEvent, RoomHandle, RoomManager, RoomResponse},
};
use tokio::sync::mpsc;

fn config() -> RoomConfig {
    let mut config = RoomConfig {
        name: "Lagoon".to_string(),
        ..RoomConfig::default()
    };
    config.game.seed = Some(3);
    config
}

async fn join(handle: &RoomHandle, name: &str) -> mpsc::Receiver<String> {
    let (outbox, frames) = mpsc::channel(512);
    let response = handle
        .join(PlayerName::new(name), None, outbox)
        .await
        .unwrap();
    assert_eq!(response, RoomResponse::Success);
    frames
}

/// Drains a participant's outbox, acknowledging every non-ack frame.
async fn ack_all(handle: &RoomHandle, name: &str, frames: &mut mpsc::Receiver<String>) -> Vec<Message> {
    let mut received = Vec::new();
    while let Ok(frame) = frames.try_recv() {
        let message = Message::decode(&frame).unwrap();
        if !message.is_ack() {
            let ack = Message::ack(&message, name).encode();
            let response = handle.deliver_frame(PlayerName::new(name), ack).await.unwrap();
            assert_eq!(response, RoomResponse::Ignored);
        }
        received.push(message);
    }
    received
}

fn intent_frame(handle: &RoomHandle, intent: &Intent, id: u64, from: &str) -> String {
    encode_intent(intent, MessageId(id), &handle.room_id().to_string(), from).encode()
}

// === Game start ===

#[tokio::test]
async fn test_game_starts_from_host_frame_and_converges() {
    let manager = RoomManager::default();
    let room = manager.create_room(config()).await.unwrap();
    let mut ann = join(&room, "ann").await;
    let mut bob = join(&room, "bob").await;

    let frame = intent_frame(&room, &Intent::StartGame, 1, "bob");
    let response = room.deliver_frame(PlayerName::new("bob"), frame).await.unwrap();
    assert_eq!(response, RoomResponse::Rejected(RuleViolation::NotHost));

    let frame = intent_frame(&room, &Intent::StartGame, 1, "ann");
    let response = room.deliver_frame(PlayerName::new("ann"), frame).await.unwrap();
    assert_eq!(response, RoomResponse::Success);

    let ann_frames = ack_all(&room, "ann", &mut ann).await;
    let bob_frames = ack_all(&room, "bob", &mut bob).await;

    assert!(ann_frames.iter().any(|m| m.is_ack() && m.id() == MessageId(1)));
    assert!(
        bob_frames
            .iter()
            .any(|m| m.message_type() == MessageType::GameStart && m.is_broadcast())
    );
    assert!(bob_frames.iter().any(|m| m.get("event") == Some("rejected")));

    let state = room.state().await.unwrap();
    assert_eq!(state.phase, "actions");
    assert_eq!(state.pending_deliveries, 0);
    assert_eq!(state.host.as_deref(), Some("ann"));

    let snapshot = room.snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.current_player, Some(PlayerName::new("ann")));
    assert_eq!(snapshot.players.len(), 2);
}

#[tokio::test]
async fn test_duplicate_frame_is_acked_but_applied_once() {
    let manager = RoomManager::default();
    let room = manager.create_room(config()).await.unwrap();
    let mut ann = join(&room, "ann").await;
    let _bob = join(&room, "bob").await;
    room.submit_intent(PlayerName::new("ann"), Intent::StartGame)
        .await
        .unwrap();
    ack_all(&room, "ann", &mut ann).await;

    let frame = intent_frame(&room, &Intent::EndTurn, 40, "ann");
    let first = room.deliver_frame(PlayerName::new("ann"), frame.clone()).await.unwrap();
    let second = room.deliver_frame(PlayerName::new("ann"), frame).await.unwrap();
    assert_eq!(first, RoomResponse::Success);
    assert_eq!(second, RoomResponse::Ignored);

    let acks = ack_all(&room, "ann", &mut ann)
        .await
        .into_iter()
        .filter(|m| m.is_ack() && m.id() == MessageId(40))
        .count();
    assert_eq!(acks, 2);
    assert_eq!(room.state().await.unwrap().phase, "draw_treasure");
}

// === Rejections ===

#[tokio::test]
async fn test_rejected_intent_is_reported_only_to_sender() {
    let manager = RoomManager::default();
    let room = manager.create_room(config()).await.unwrap();
    let mut ann = join(&room, "ann").await;
    let mut bob = join(&room, "bob").await;
    room.submit_intent(PlayerName::new("ann"), Intent::StartGame)
        .await
        .unwrap();
    ack_all(&room, "ann", &mut ann).await;
    ack_all(&room, "bob", &mut bob).await;
    let before = room.snapshot().await.unwrap();

    let frame = intent_frame(&room, &Intent::EndTurn, 5, "bob");
    let response = room.deliver_frame(PlayerName::new("bob"), frame).await.unwrap();
    assert_eq!(response, RoomResponse::Rejected(RuleViolation::OutOfTurn));

    let bob_frames = ack_all(&room, "bob", &mut bob).await;
    let rejection = bob_frames
        .iter()
        .find(|m| m.get("event") == Some("rejected"))
        .unwrap();
    assert_eq!(rejection.receiver(), Some("bob"));
    assert_eq!(rejection.get("reason"), Some("not your turn"));
    assert_eq!(rejection.get("ref"), Some("5"));

    assert!(ack_all(&room, "ann", &mut ann).await.is_empty());
    assert_eq!(room.snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn test_malformed_frames_keep_connection() {
    let manager = RoomManager::default();
    let room = manager.create_room(config()).await.unwrap();
    let _ann = join(&room, "ann").await;

    for frame in ["", "1|NOPE|r|ann", "1|PLAYER_MOVE|r|ann||false|to"] {
        let response = room.deliver_frame(PlayerName::new("ann"), frame.to_string()).await.unwrap();
        assert!(matches!(response, RoomResponse::BadFrame(_)), "{frame:?}");
    }

    // Still a member and still answered.
    assert_eq!(room.state().await.unwrap().players, vec!["ann".to_string()]);
}

// === Membership ===

#[tokio::test]
async fn test_host_hand_over_and_leave_broadcast() {
    let manager = RoomManager::default();
    let room = manager.create_room(config()).await.unwrap();
    let (observer, mut events) = mpsc::channel(256);
    room.subscribe("ui", observer).await.unwrap();

    let _ann = join(&room, "ann").await;
    let mut bob = join(&room, "bob").await;

    let frame = intent_frame(&room, &Intent::StartGame, 1, "ann");
    let leave = Message::new(MessageId(2), MessageType::LeaveRoom, &room.room_id().to_string(), "ann").encode();
    room.deliver_frame(PlayerName::new("ann"), frame).await.unwrap();
    let response = room.deliver_frame(PlayerName::new("ann"), leave).await.unwrap();
    assert_eq!(response, RoomResponse::Success);

    let bob_frames = ack_all(&room, "bob", &mut bob).await;
    assert!(
        bob_frames
            .iter()
            .any(|m| m.message_type() == MessageType::PlayerLeave && m.get("player") == Some("ann"))
    );
    assert!(bob_frames.iter().any(|m| m.get("event") == Some("abandoned")));
    assert!(bob_frames.iter().any(|m| m.get("host") == Some("bob")));

    let state = room.state().await.unwrap();
    assert_eq!(state.host.as_deref(), Some("bob"));
    assert_eq!(state.phase, "lobby");

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&RoomEvent::PlayerJoined {
        name: PlayerName::new("ann"),
        is_host: true,
    }));
    assert!(seen.iter().any(|e| matches!(e, RoomEvent::Game(GameEvent::GameStarted { .. }))));
    assert!(seen.contains(&RoomEvent::HostChanged {
        host: PlayerName::new("bob"),
    }));
}

#[tokio::test]
async fn test_late_joiner_receives_resync() {
    let manager = RoomManager::default();
    let room = manager.create_room(config()).await.unwrap();
    let _ann = join(&room, "ann").await;
    let _bob = join(&room, "bob").await;
    room.submit_intent(PlayerName::new("ann"), Intent::StartGame)
        .await
        .unwrap();

    let mut cid = join(&room, "cid").await;
    let frames = ack_all(&room, "cid", &mut cid).await;
    let resync = frames
        .iter()
        .find(|m| m.get("event") == Some("resync"))
        .unwrap();
    assert_eq!(decode_snapshot_tiles(resync).unwrap().len(), 24);
    assert_eq!(resync.get("current"), Some("ann"));

    let response = room
        .submit_intent(PlayerName::new("cid"), Intent::EndTurn)
        .await
        .unwrap();
    assert_eq!(
        response,
        RoomResponse::Rejected(RuleViolation::UnknownPlayer(PlayerName::new("cid")))
    );
}

// === Delivery failures ===

#[tokio::test]
async fn test_silent_participant_is_degraded_and_resynced() {
    let mut config = config();
    config.retry_interval_ms = 50;
    config.max_retries = 2;

    let manager = RoomManager::default();
    let room = manager.create_room(config).await.unwrap();
    let (observer, mut events) = mpsc::channel(256);
    room.subscribe("ui", observer).await.unwrap();

    let mut ann = join(&room, "ann").await;
    let mut bob = join(&room, "bob").await;
    room.submit_intent(PlayerName::new("ann"), Intent::StartGame)
        .await
        .unwrap();
    ack_all(&room, "ann", &mut ann).await;

    tokio::time::sleep(Duration::from_millis(600)).await;

    // Only the latest resync is still waiting on bob.
    let state = room.state().await.unwrap();
    assert_eq!(state.degraded, vec!["bob".to_string()]);
    assert_eq!(state.pending_deliveries, 1);

    let mut bob_frames = Vec::new();
    while let Ok(frame) = bob.try_recv() {
        bob_frames.push(Message::decode(&frame).unwrap());
    }
    assert!(bob_frames.iter().any(|m| m.get("event") == Some("resync")));

    let mut degraded = false;
    while let Ok(event) = events.try_recv() {
        degraded |= event == RoomEvent::ConnectivityDegraded {
            name: PlayerName::new("bob"),
        };
    }
    assert!(degraded);

    // Any frame from bob clears the flag.
    let frame = intent_frame(&room, &Intent::EndTurn, 77, "bob");
    room.deliver_frame(PlayerName::new("bob"), frame).await.unwrap();
    assert!(room.state().await.unwrap().degraded.is_empty());
}

#[tokio::test]
async fn test_degraded_participant_recovers_after_repeated_outages() {
    let mut config = config();
    config.retry_interval_ms = 50;
    config.max_retries = 1;

    let manager = RoomManager::default();
    let room = manager.create_room(config).await.unwrap();
    let mut ann = join(&room, "ann").await;
    let mut bob = join(&room, "bob").await;
    room.submit_intent(PlayerName::new("ann"), Intent::StartGame)
        .await
        .unwrap();
    ack_all(&room, "ann", &mut ann).await;

    // Bob stays silent through several retry ceilings.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut resyncs = std::collections::BTreeSet::new();
    let mut frames = Vec::new();
    while let Ok(frame) = bob.try_recv() {
        let message = Message::decode(&frame).unwrap();
        if message.get("event") == Some("resync") {
            resyncs.insert(message.id());
        }
        frames.push(message);
    }
    assert!(resyncs.len() >= 2, "expected a resync per outage, got {resyncs:?}");
    assert_eq!(room.state().await.unwrap().degraded, vec!["bob".to_string()]);

    // Bob answers the latest resync and gets a fresh one.
    let latest = frames
        .iter()
        .filter(|m| m.get("event") == Some("resync"))
        .max_by_key(|m| m.id())
        .unwrap();
    let ack = Message::ack(latest, "bob").encode();
    room.deliver_frame(PlayerName::new("bob"), ack).await.unwrap();
    assert!(room.state().await.unwrap().degraded.is_empty());

    let fresh = ack_all(&room, "bob", &mut bob).await;
    let snapshot = room.snapshot().await.unwrap().unwrap();
    let resync = fresh
        .iter()
        .find(|m| m.get("event") == Some("resync") && m.id() > latest.id())
        .unwrap();
    assert_eq!(resync.get("phase"), Some(snapshot.phase.to_string().as_str()));
    assert_eq!(decode_snapshot_tiles(resync).unwrap().len(), snapshot.tiles.len());
    assert_eq!(room.state().await.unwrap().pending_deliveries, 0);
}

#[tokio::test]
async fn test_closed_room_stops_answering() {
    let manager = RoomManager::default();
    let room = manager.create_room(config()).await.unwrap();
    let mut ann = join(&room, "ann").await;

    manager.close_room(room.room_id()).await.unwrap();
    let notice = Message::decode(&ann.recv().await.unwrap()).unwrap();
    assert_eq!(notice.get("event"), Some("closed"));
    assert!(ann.recv().await.is_none());
    assert!(room.state().await.is_err());
}
