//! Server-side room observer.
//!
//! Every room the server creates gets one observer task subscribed to its
//! event fan-out. It turns room events into log lines and metrics; it never
//! feeds anything back into the room.

use flood_isle::{
    GameEvent,
    game::Outcome,
    room::{RoomEvent, RoomHandle},
};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{logging, metrics};

/// Name the observer subscribes under
pub const OBSERVER_NAME: &str = "server";

const EVENT_BUFFER: usize = 256;

/// Subscribe to `room` and record its events until the room closes.
pub async fn spawn_room_observer(room: &RoomHandle) -> Option<JoinHandle<()>> {
    let (sender, mut events) = mpsc::channel(EVENT_BUFFER);
    if let Err(e) = room.subscribe(OBSERVER_NAME, sender).await {
        log::warn!("Failed to observe room {}: {}", room.room_id(), e);
        return None;
    }

    let room_id = room.room_id().to_string();
    Some(tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            record(&room_id, &event);
        }
        log::debug!("Observer for room {} stopped", room_id);
    }))
}

fn record(room_id: &str, event: &RoomEvent) {
    match event {
        RoomEvent::ConnectivityDegraded { name } => {
            logging::log_delivery_failure(room_id, name.as_str());
            metrics::participants_degraded_total();
        }
        RoomEvent::Game(GameEvent::GameStarted { .. }) => metrics::games_started_total(),
        RoomEvent::Game(GameEvent::GameOver { outcome }) => {
            logging::log_game_over(room_id, &outcome.to_string());
            metrics::games_finished_total(*outcome == Outcome::Won);
        }
        RoomEvent::HostChanged { host } => {
            log::info!("Room {} host is now {}", room_id, host);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flood_isle::{
        Intent, PlayerName,
        room::{RoomConfig, RoomManager, RoomResponse},
    };

    #[tokio::test]
    async fn test_observer_stops_with_room() {
        let manager = RoomManager::default();
        let room = manager.create_room(RoomConfig::default()).await.unwrap();
        let task = spawn_room_observer(&room).await.unwrap();

        let (outbox, _frames) = mpsc::channel(64);
        room.join(PlayerName::new("ann"), None, outbox.clone()).await.unwrap();
        room.join(PlayerName::new("bob"), None, outbox).await.unwrap();
        let response = room
            .submit_intent(PlayerName::new("ann"), Intent::StartGame)
            .await
            .unwrap();
        assert_eq!(response, RoomResponse::Success);

        manager.close_room(room.room_id()).await.unwrap();
        task.await.unwrap();
    }
}
