//! Room actor implementation with async message handling.
//!
//! One actor owns one room: its roster, the running game and the delivery
//! tracker. Every mutation is serialized through the actor's inbox, so the
//! game only ever sees one intent at a time.

use super::{
    config::RoomConfig,
    messages::{RoomError, RoomEvent, RoomId, RoomMessage, RoomResponse, RoomStateResponse},
    roster::{Participant, Roster},
};
use crate::{
    game::{
        Game, GameEvent, GameSnapshot, Intent, PlayerName, RoleKind, RuleViolation,
        constants::MAX_PLAYERS,
    },
    net::{
        Deduplicator, DeliveryTracker, FormatError, Message, MessageIds, MessageType,
        codec::{decode_intent, encode_event, encode_snapshot},
        delivery::AckOutcome,
    },
};
use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, MissedTickBehavior, interval},
};

/// Sender identity used on every envelope the room itself originates.
pub const ROOM_SENDER: &str = "room";

const INBOX_CAPACITY: usize = 100;

/// Room actor handle for sending messages
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: RoomId,
}

impl RoomHandle {
    /// Create a new room handle
    pub fn new(sender: mpsc::Sender<RoomMessage>, room_id: RoomId) -> Self {
        Self { sender, room_id }
    }

    /// Get room ID
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the room
    pub async fn send(&self, message: RoomMessage) -> Result<(), RoomError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| RoomError::Closed)
    }

    /// Join the room. Wire frames for this participant arrive on `outbox`.
    pub async fn join(
        &self,
        name: PlayerName,
        role: Option<RoleKind>,
        outbox: mpsc::Sender<String>,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Join {
            name,
            role,
            outbox,
            response,
        })
        .await
    }

    pub async fn leave(&self, name: PlayerName) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Leave { name, response })
            .await
    }

    /// Apply an intent on behalf of `name`.
    pub async fn submit_intent(
        &self,
        name: PlayerName,
        intent: Intent,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::SubmitIntent {
            name,
            intent,
            response,
        })
        .await
    }

    /// Hand a raw wire frame received from `name` to the room.
    pub async fn deliver_frame(
        &self,
        name: PlayerName,
        frame: String,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::DeliverFrame {
            name,
            frame,
            response,
        })
        .await
    }

    pub async fn state(&self) -> Result<RoomStateResponse, RoomError> {
        self.request(|response| RoomMessage::GetState { response })
            .await
    }

    pub async fn snapshot(&self) -> Result<Option<GameSnapshot>, RoomError> {
        self.request(|response| RoomMessage::GetSnapshot { response })
            .await
    }

    /// Subscribe `observer` to room events.
    pub async fn subscribe(
        &self,
        observer: &str,
        sender: mpsc::Sender<RoomEvent>,
    ) -> Result<(), RoomError> {
        self.send(RoomMessage::Subscribe {
            observer: observer.to_string(),
            sender,
        })
        .await
    }

    pub async fn unsubscribe(&self, observer: &str) -> Result<(), RoomError> {
        self.send(RoomMessage::Unsubscribe {
            observer: observer.to_string(),
        })
        .await
    }

    pub async fn close(&self) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Close { response })
            .await
    }
}

/// Room actor managing a single game room
pub struct RoomActor {
    /// Room ID
    id: RoomId,

    /// Wire form of the room ID
    wire_id: String,

    /// Room configuration
    config: RoomConfig,

    /// Current or most recent game
    game: Option<Game>,

    /// Connected participants
    roster: Roster,

    /// Envelopes waiting on acknowledgments
    tracker: DeliveryTracker,

    /// Recently applied inbound envelopes
    dedup: Deduplicator,

    /// Outbound envelope ids
    ids: MessageIds,

    /// Message inbox
    inbox: mpsc::Receiver<RoomMessage>,

    /// Observers of room events
    subscribers: HashMap<String, mpsc::Sender<RoomEvent>>,

    /// Is room closed
    is_closed: bool,

    /// Creation time
    created_at: chrono::DateTime<chrono::Utc>,
}

impl RoomActor {
    /// Create a new room actor
    ///
    /// # Arguments
    ///
    /// * `id` - Room ID
    /// * `config` - Room configuration
    ///
    /// # Returns
    ///
    /// * `(RoomActor, RoomHandle)` - Actor and handle for sending messages
    pub fn new(id: RoomId, config: RoomConfig) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);

        let actor = Self {
            id,
            wire_id: id.to_string(),
            tracker: DeliveryTracker::new(config.retry_policy()),
            dedup: Deduplicator::new(config.dedup_window),
            config,
            game: None,
            roster: Roster::new(),
            ids: MessageIds::new(),
            inbox,
            subscribers: HashMap::new(),
            is_closed: false,
            created_at: chrono::Utc::now(),
        };

        (actor, RoomHandle::new(sender, id))
    }

    /// Run the room actor event loop
    pub async fn run(mut self) {
        log::info!("Room {} '{}' starting", self.id, self.config.name);

        let mut sweep_interval = interval(self.config.retry_interval());
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    self.handle_message(message);

                    if self.is_closed {
                        break;
                    }
                }

                _ = sweep_interval.tick() => {
                    self.sweep(Instant::now());
                }
            }
        }

        log::info!("Room {} '{}' closed", self.id, self.config.name);
    }

    /// Handle a room message
    fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                name,
                role,
                outbox,
                response,
            } => {
                let result = self.handle_join(name, role, outbox);
                let _ = response.send(result);
            }

            RoomMessage::Leave { name, response } => {
                let result = self.handle_leave(&name);
                let _ = response.send(result);
            }

            RoomMessage::SubmitIntent {
                name,
                intent,
                response,
            } => {
                let result = self.handle_intent(&name, intent);
                let _ = response.send(result);
            }

            RoomMessage::DeliverFrame {
                name,
                frame,
                response,
            } => {
                let result = self.handle_frame(&name, &frame);
                let _ = response.send(result);
            }

            RoomMessage::GetState { response } => {
                let _ = response.send(self.state());
            }

            RoomMessage::GetSnapshot { response } => {
                let _ = response.send(self.game.as_ref().map(Game::snapshot));
            }

            RoomMessage::Subscribe { observer, sender } => {
                log::debug!("Observer {} subscribed to room {}", observer, self.id);
                self.subscribers.insert(observer, sender);
            }

            RoomMessage::Unsubscribe { observer } => {
                log::debug!("Observer {} unsubscribed from room {}", observer, self.id);
                self.subscribers.remove(&observer);
            }

            RoomMessage::Close { response } => {
                let notice = self.envelope(MessageType::UpdateRoom).with("event", "closed");
                for receiver in self.roster.receivers_except(ROOM_SENDER) {
                    self.roster.send_to(&receiver, notice.encode());
                }
                self.is_closed = true;
                let _ = response.send(RoomResponse::Success);
            }
        }
    }

    // === Membership ===

    fn handle_join(
        &mut self,
        name: PlayerName,
        role: Option<RoleKind>,
        outbox: mpsc::Sender<String>,
    ) -> RoomResponse {
        if name.is_empty() || name.as_str() == ROOM_SENDER {
            return RoomError::NameTaken(name).into();
        }

        let participant = Participant::new(name.clone(), role, outbox);
        let is_host = match self.roster.join(participant, self.config.max_players) {
            Ok(is_host) => is_host,
            Err(err) => return err.into(),
        };
        log::info!("{} joined room {} (host: {})", name, self.id, is_host);

        let announcement = self
            .envelope(MessageType::PlayerJoin)
            .with("player", &name)
            .with("host", is_host);
        self.broadcast_except(announcement, name.as_str());

        // Late joiners see the game in progress.
        self.send_resync(name.as_str());

        self.publish(RoomEvent::PlayerJoined { name, is_host });
        RoomResponse::Success
    }

    fn handle_leave(&mut self, name: &PlayerName) -> RoomResponse {
        let Some((_, new_host)) = self.roster.leave(name) else {
            return RoomError::NotInRoom(name.clone()).into();
        };
        log::info!("{} left room {}", name, self.id);

        self.tracker.forget_receiver(name.as_str());
        self.dedup.forget_sender(name.as_str());

        let announcement = self.envelope(MessageType::PlayerLeave).with("player", name);
        self.broadcast_except(announcement, ROOM_SENDER);

        if let Some(game) = &self.game
            && !game.is_over()
            && game.player(name).is_some()
        {
            log::warn!("Room {}: game abandoned after {} left", self.id, name);
            self.game = None;
            let notice = self
                .envelope(MessageType::UpdateRoom)
                .with("event", "abandoned")
                .with("player", name);
            self.broadcast_except(notice, ROOM_SENDER);
        }

        if let Some(host) = new_host {
            log::info!("Room {}: host is now {}", self.id, host);
            let notice = self
                .envelope(MessageType::UpdateRoom)
                .with("event", "host")
                .with("host", &host);
            self.broadcast_except(notice, ROOM_SENDER);
            self.publish(RoomEvent::HostChanged { host });
        }

        self.publish(RoomEvent::PlayerLeft { name: name.clone() });
        RoomResponse::Success
    }

    // === Intents ===

    /// Validates and applies one intent, broadcasting whatever it changed.
    fn handle_intent(&mut self, name: &PlayerName, intent: Intent) -> RoomResponse {
        if !self.roster.contains(name) {
            return RoomError::NotInRoom(name.clone()).into();
        }

        let result = match intent {
            Intent::StartGame => self.start_game(name),
            intent => match self.game.as_mut() {
                Some(game) => game.apply(name, intent),
                None => Err(RuleViolation::GameNotStarted),
            },
        };

        match result {
            Ok(()) => {
                self.flush_events();
                RoomResponse::Success
            }
            Err(violation) => {
                log::debug!("Room {}: rejected intent from {}: {}", self.id, name, violation);
                RoomResponse::Rejected(violation)
            }
        }
    }

    fn start_game(&mut self, name: &PlayerName) -> Result<(), RuleViolation> {
        if !self.roster.is_host(name) {
            return Err(RuleViolation::NotHost);
        }
        if self.game.as_ref().is_some_and(|game| !game.is_over()) {
            return Err(RuleViolation::GameAlreadyStarted);
        }
        if self.roster.len() < self.config.min_players {
            return Err(RuleViolation::InvalidPlayerCount {
                min: self.config.min_players,
                max: self.config.max_players.min(MAX_PLAYERS),
            });
        }

        let seed = self.config.game.seed.unwrap_or_else(rand::random);
        let roles = self.roster.assign_roles(seed);
        let settings = self.config.game.clone().with_seed(seed);

        let mut game = Game::new(settings, &self.config.tiles, &roles)?;
        game.start()?;
        self.game = Some(game);

        log::info!("Room {}: game started by {} with seed {}", self.id, name, seed);
        Ok(())
    }

    /// Broadcasts and publishes every event the game produced.
    fn flush_events(&mut self) {
        let events = match self.game.as_mut() {
            Some(game) => game.drain_events(),
            None => return,
        };

        for event in events {
            if let GameEvent::GameOver { outcome } = &event {
                log::info!("Room {}: game over, {}", self.id, outcome);
            }
            let message = encode_event(&event, self.ids.next(), &self.wire_id, ROOM_SENDER);
            self.broadcast_except(message, ROOM_SENDER);
            self.publish(RoomEvent::Game(event));
        }
    }

    // === Wire frames ===

    /// Decodes an inbound frame, acknowledges it and applies it once.
    fn handle_frame(&mut self, name: &PlayerName, frame: &str) -> RoomResponse {
        if !self.roster.contains(name) {
            return RoomError::NotInRoom(name.clone()).into();
        }

        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("Room {}: dropping malformed frame from {}: {}", self.id, name, err);
                return RoomResponse::BadFrame(err);
            }
        };
        if let Err(err) = self.check_origin(name, &message) {
            log::warn!("Room {}: dropping frame from {}: {}", self.id, name, err);
            return RoomResponse::BadFrame(err);
        }

        if self.roster.set_degraded(name.as_str(), false) {
            log::info!("Room {}: {} is reachable again, resyncing", self.id, name);
            self.send_resync(name.as_str());
        }

        if message.is_ack() {
            if self.tracker.acknowledge(message.id(), name.as_str()) == AckOutcome::Converged {
                log::debug!("Room {}: message {} converged", self.id, message.id());
            }
            return RoomResponse::Ignored;
        }

        self.roster
            .send_to(name.as_str(), Message::ack(&message, ROOM_SENDER).encode());

        if !self.dedup.first_sighting(name.as_str(), message.id()) {
            log::debug!("Room {}: duplicate {} from {}", self.id, message.id(), name);
            return RoomResponse::Ignored;
        }

        if message.message_type() == MessageType::LeaveRoom {
            return self.handle_leave(name);
        }

        let intent = match decode_intent(&message) {
            Ok(intent) => intent,
            Err(err) => {
                log::warn!("Room {}: unusable frame from {}: {}", self.id, name, err);
                return RoomResponse::BadFrame(err);
            }
        };

        let response = self.handle_intent(name, intent);
        if let RoomResponse::Rejected(violation) = &response {
            let rejection = self
                .envelope(MessageType::UpdateRoom)
                .to(name.as_str())
                .with("event", "rejected")
                .with("intent", message.message_type())
                .with("ref", message.id())
                .with("reason", violation);
            self.send_direct(rejection);
        }
        response
    }

    /// The envelope must come from the connection's participant and target
    /// this room.
    fn check_origin(&self, name: &PlayerName, message: &Message) -> Result<(), FormatError> {
        if message.from() != name.as_str() {
            return Err(FormatError::BadFieldValue {
                key: "from",
                reason: format!("{:?} does not match connection {}", message.from(), name),
            });
        }
        if message.room_id() != self.wire_id {
            return Err(FormatError::BadFieldValue {
                key: "roomId",
                reason: format!("{:?} is not this room", message.room_id()),
            });
        }
        Ok(())
    }

    // === Delivery ===

    fn envelope(&self, message_type: MessageType) -> Message {
        Message::new(self.ids.next(), message_type, &self.wire_id, ROOM_SENDER)
    }

    /// Sends to every member except `sender` and tracks their acks.
    fn broadcast_except(&self, message: Message, sender: &str) {
        let receivers = self.roster.receivers_except(sender);
        let frame = message.encode();
        for receiver in &receivers {
            if !self.roster.send_to(receiver, frame.clone()) {
                log::debug!("Room {}: {} is disconnected", self.id, receiver);
            }
        }
        self.tracker.track(&message, receivers, Instant::now());
    }

    /// Sends to the message's single receiver and tracks its ack.
    fn send_direct(&self, message: Message) {
        let Some(receiver) = message.receiver().map(str::to_string) else {
            return self.broadcast_except(message, ROOM_SENDER);
        };
        self.roster.send_to(&receiver, message.encode());
        self.tracker.track(&message, [receiver], Instant::now());
    }

    fn resync_message(&self, receiver: &str) -> Option<Message> {
        let game = self.game.as_ref()?;
        Some(encode_snapshot(&game.snapshot(), self.ids.next(), &self.wire_id, ROOM_SENDER).to(receiver))
    }

    /// Sends `receiver` a tracked snapshot of the game in progress, if any.
    fn send_resync(&self, receiver: &str) {
        if let Some(resync) = self.resync_message(receiver) {
            self.send_direct(resync);
        }
    }

    /// Retransmits overdue envelopes and degrades receivers that ran out of
    /// retries.
    fn sweep(&mut self, now: Instant) {
        let report = self.tracker.sweep(now);
        if report.is_empty() {
            return;
        }

        for retransmission in &report.retransmissions {
            self.roster
                .send_to(&retransmission.receiver, retransmission.message.encode());
        }

        for receiver in report.failed_receivers() {
            self.degrade(&receiver);
        }
    }

    /// Replaces everything pending for a receiver that ran out of retries
    /// with a fresh snapshot. The snapshot is tracked like any envelope, so
    /// every later outage ends in another resync.
    fn degrade(&mut self, receiver: &str) {
        let dropped = self.tracker.forget_receiver(receiver);
        let name = PlayerName::new(receiver);
        if !self.roster.contains(&name) {
            return;
        }
        log::warn!(
            "Room {}: {} stopped acknowledging, dropped {} pending messages",
            self.id,
            receiver,
            dropped
        );

        self.send_resync(receiver);
        if self.roster.set_degraded(receiver, true) {
            self.publish(RoomEvent::ConnectivityDegraded { name });
        }
    }

    // === Observers ===

    /// Fan a room event out to every observer
    fn publish(&mut self, event: RoomEvent) {
        let room_id = self.id;
        self.subscribers.retain(|observer, sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Observer {} of room {} is lagging", observer, room_id);
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Observer {} of room {} went away", observer, room_id);
                    false
                }
            }
        });
    }

    fn state(&self) -> RoomStateResponse {
        RoomStateResponse {
            room_id: self.id,
            room_name: self.config.name.clone(),
            players: self.roster.names().iter().map(ToString::to_string).collect(),
            host: self.roster.host().map(ToString::to_string),
            max_players: self.config.max_players,
            phase: self
                .game
                .as_ref()
                .map_or_else(|| "lobby".to_string(), |game| game.phase().to_string()),
            pending_deliveries: self.tracker.len(),
            degraded: self.roster.degraded().iter().map(ToString::to_string).collect(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeSet, time::Duration};

    fn config() -> RoomConfig {
        let mut config = RoomConfig::default();
        config.game.seed = Some(7);
        config
    }

    fn participant(actor: &mut RoomActor, name: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(256);
        let response = actor.handle_join(PlayerName::new(name), None, tx);
        assert_eq!(response, RoomResponse::Success);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(Message::decode(&frame).unwrap());
        }
        out
    }

    /// Drains a participant's frames and acknowledges every non-ack.
    fn ack_all(actor: &mut RoomActor, name: &str, rx: &mut mpsc::Receiver<String>) -> Vec<Message> {
        let frames = drain(rx);
        for message in frames.iter().filter(|m| !m.is_ack()) {
            let ack = Message::ack(message, name).encode();
            assert_eq!(actor.handle_frame(&PlayerName::new(name), &ack), RoomResponse::Ignored);
        }
        frames
    }

    fn resync_ids(frames: &[Message]) -> BTreeSet<crate::net::MessageId> {
        frames
            .iter()
            .filter(|m| m.get("event") == Some("resync"))
            .map(Message::id)
            .collect()
    }

    // === Membership ===

    #[tokio::test]
    async fn test_join_is_announced_to_others() {
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config());
        let mut ann = participant(&mut actor, "ann");
        let mut bob = participant(&mut actor, "bob");

        let frames = drain(&mut ann);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_type(), MessageType::PlayerJoin);
        assert_eq!(frames[0].get("player"), Some("bob"));
        assert!(drain(&mut bob).is_empty());
        assert_eq!(actor.tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_room_name_is_reserved() {
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config());
        let (tx, _rx) = mpsc::channel(8);
        let response = actor.handle_join(PlayerName::new(ROOM_SENDER), None, tx);
        assert!(matches!(response, RoomResponse::Error(RoomError::NameTaken(_))));
    }

    // === Intents ===

    #[tokio::test]
    async fn test_only_host_starts_game() {
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config());
        let _ann = participant(&mut actor, "ann");
        let _bob = participant(&mut actor, "bob");

        let response = actor.handle_intent(&PlayerName::new("bob"), Intent::StartGame);
        assert_eq!(response, RoomResponse::Rejected(RuleViolation::NotHost));

        let response = actor.handle_intent(&PlayerName::new("ann"), Intent::StartGame);
        assert_eq!(response, RoomResponse::Success);
        assert!(actor.game.is_some());
    }

    #[tokio::test]
    async fn test_start_requires_min_players() {
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config());
        let _ann = participant(&mut actor, "ann");

        let response = actor.handle_intent(&PlayerName::new("ann"), Intent::StartGame);
        assert!(matches!(
            response,
            RoomResponse::Rejected(RuleViolation::InvalidPlayerCount { .. })
        ));
    }

    // === Frames ===

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config());
        let _ann = participant(&mut actor, "ann");

        let response = actor.handle_frame(&PlayerName::new("ann"), "1|PLAYER_MOVE");
        assert!(matches!(response, RoomResponse::BadFrame(FormatError::TooFewFields { .. })));
    }

    #[tokio::test]
    async fn test_frame_is_acked_and_deduplicated() {
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config());
        let mut ann = participant(&mut actor, "ann");
        let _bob = participant(&mut actor, "bob");
        drain(&mut ann);

        let frame = Message::new(crate::net::MessageId(9), MessageType::GameStart, &actor.wire_id, "ann").encode();
        let first = actor.handle_frame(&PlayerName::new("ann"), &frame);
        assert_eq!(first, RoomResponse::Success);
        let second = actor.handle_frame(&PlayerName::new("ann"), &frame);
        assert_eq!(second, RoomResponse::Ignored);

        let acks: Vec<Message> = drain(&mut ann).into_iter().filter(Message::is_ack).collect();
        assert_eq!(acks.len(), 2);
        assert!(acks.iter().all(|ack| ack.id() == crate::net::MessageId(9)));
    }

    #[tokio::test]
    async fn test_spoofed_sender_is_rejected() {
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config());
        let _ann = participant(&mut actor, "ann");
        let _bob = participant(&mut actor, "bob");

        let frame = Message::new(crate::net::MessageId(1), MessageType::EndTurn, &actor.wire_id, "bob").encode();
        let response = actor.handle_frame(&PlayerName::new("ann"), &frame);
        assert!(matches!(
            response,
            RoomResponse::BadFrame(FormatError::BadFieldValue { key: "from", .. })
        ));
    }

    // === Delivery ===

    #[tokio::test]
    async fn test_silent_receiver_is_degraded() {
        let mut config = config();
        config.max_retries = 1;
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config);
        let (observer_tx, mut observer_rx) = mpsc::channel(16);
        actor.subscribers.insert("ui".to_string(), observer_tx);

        let _ann = participant(&mut actor, "ann");
        let _bob = participant(&mut actor, "bob");

        let later = Instant::now() + Duration::from_secs(5);
        actor.sweep(later);
        actor.sweep(later + Duration::from_secs(5));

        assert_eq!(actor.roster.degraded(), vec![PlayerName::new("ann")]);
        assert!(actor.tracker.is_empty());

        let mut saw_degraded = false;
        while let Ok(event) = observer_rx.try_recv() {
            if event == (RoomEvent::ConnectivityDegraded { name: PlayerName::new("ann") }) {
                saw_degraded = true;
            }
        }
        assert!(saw_degraded);
    }

    #[tokio::test]
    async fn test_every_outage_ends_in_resync() {
        let mut config = config();
        config.max_retries = 1;
        let (mut actor, _handle) = RoomActor::new(RoomId::new_v4(), config);
        let mut ann = participant(&mut actor, "ann");
        let mut bob = participant(&mut actor, "bob");
        assert_eq!(actor.handle_intent(&PlayerName::new("ann"), Intent::StartGame), RoomResponse::Success);
        ack_all(&mut actor, "bob", &mut bob);

        // First outage: ann never acknowledges the game start.
        let start = Instant::now();
        actor.sweep(start + Duration::from_secs(5));
        actor.sweep(start + Duration::from_secs(10));
        let mut seen = drain(&mut ann);
        assert_eq!(resync_ids(&seen).len(), 1);
        assert_eq!(actor.roster.degraded(), vec![PlayerName::new("ann")]);

        // Second outage: a mutation made while ann is degraded is lost too.
        let current = actor.game.as_ref().unwrap().current_player().unwrap().name.clone();
        assert_eq!(actor.handle_intent(&current, Intent::EndTurn), RoomResponse::Success);
        ack_all(&mut actor, "bob", &mut bob);
        actor.sweep(start + Duration::from_secs(15));
        actor.sweep(start + Duration::from_secs(20));
        seen.extend(drain(&mut ann));

        let resyncs = resync_ids(&seen);
        assert_eq!(resyncs.len(), 2);
        let latest = *resyncs.iter().next_back().unwrap();
        assert_eq!(
            actor.tracker.pending_receivers(latest),
            Some(BTreeSet::from(["ann".to_string()]))
        );
        let phase = actor.game.as_ref().unwrap().phase().to_string();
        let snapshot = seen.iter().find(|m| m.id() == latest).unwrap();
        assert_eq!(snapshot.get("phase"), Some(phase.as_str()));

        // Heard from again: the flag clears and a fresh snapshot goes out.
        let ack = Message::ack(snapshot, "ann").encode();
        assert_eq!(actor.handle_frame(&PlayerName::new("ann"), &ack), RoomResponse::Ignored);
        assert!(actor.roster.degraded().is_empty());

        let frames = ack_all(&mut actor, "ann", &mut ann);
        let fresh = resync_ids(&frames);
        assert_eq!(fresh.len(), 1);
        assert!(fresh.iter().all(|id| *id > latest));
        assert!(actor.tracker.is_empty());
    }
}
