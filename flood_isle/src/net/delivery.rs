//! Per-receiver acknowledgment tracking with retries.
//!
//! Every envelope sent to a set of receivers is registered as an
//! [`UnconfirmedMessage`]. Acks remove receivers from its pending set and
//! the entry is dropped once the set is empty. A periodic [`DeliveryTracker::sweep`]
//! retransmits the unchanged envelope to whoever is still pending, and gives
//! up on receivers once the retry ceiling is reached.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;

use super::messages::{Message, MessageId, MessageType};

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// How often and how many times to retransmit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// A sent envelope still waiting on acknowledgments.
#[derive(Clone, Debug)]
pub struct UnconfirmedMessage {
    message: Message,
    pending: BTreeSet<String>,
    retries: u32,
    last_sent: Instant,
}

impl UnconfirmedMessage {
    pub fn new(message: Message, receivers: impl IntoIterator<Item = String>, sent_at: Instant) -> Self {
        Self {
            message,
            pending: receivers.into_iter().collect(),
            retries: 0,
            last_sent: sent_at,
        }
    }

    /// Removes `receiver` from the pending set. Returns whether it was there.
    pub fn acknowledge(&mut self, receiver: &str) -> bool {
        self.pending.remove(receiver)
    }

    pub fn has_pending_receivers(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Result of applying one ack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AckOutcome {
    /// No tracked message with that id, or the sender wasn't pending.
    Unknown,
    /// Receivers still pending after this ack.
    Pending(usize),
    /// The last pending receiver acknowledged; the entry is gone.
    Converged,
}

/// An envelope to send again to one receiver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Retransmission {
    pub receiver: String,
    pub message: Message,
}

/// A receiver that never acknowledged within the retry ceiling.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeliveryFailure {
    pub receiver: String,
    pub message_id: MessageId,
    pub message_type: MessageType,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SweepReport {
    pub retransmissions: Vec<Retransmission>,
    pub failures: Vec<DeliveryFailure>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.retransmissions.is_empty() && self.failures.is_empty()
    }

    /// Distinct receivers that failed during this sweep.
    pub fn failed_receivers(&self) -> BTreeSet<String> {
        self.failures.iter().map(|f| f.receiver.clone()).collect()
    }
}

/// Tracks unconfirmed envelopes. Safe to share between the task that sends
/// and acknowledges and the task that sweeps.
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    policy: RetryPolicy,
    unconfirmed: Mutex<HashMap<MessageId, UnconfirmedMessage>>,
}

impl DeliveryTracker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            unconfirmed: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<MessageId, UnconfirmedMessage>> {
        self.unconfirmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `message` as sent to `receivers` at `now`. The tracker keeps
    /// its own copy. Nothing is tracked for an empty receiver set or for
    /// acks, which are never acknowledged.
    pub fn track(&self, message: &Message, receivers: impl IntoIterator<Item = String>, now: Instant) -> bool {
        if message.is_ack() {
            return false;
        }
        let entry = UnconfirmedMessage::new(message.clone(), receivers, now);
        if !entry.has_pending_receivers() {
            return false;
        }
        self.entries().insert(message.id(), entry);
        true
    }

    pub fn acknowledge(&self, id: MessageId, receiver: &str) -> AckOutcome {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(&id) else {
            return AckOutcome::Unknown;
        };
        if !entry.acknowledge(receiver) {
            return AckOutcome::Unknown;
        }
        if entry.has_pending_receivers() {
            AckOutcome::Pending(entry.pending.len())
        } else {
            entries.remove(&id);
            AckOutcome::Converged
        }
    }

    /// Drops `receiver` from every pending set, e.g. when it leaves the room
    /// or is handed over to a resync. Returns how many entries it was
    /// pending on.
    pub fn forget_receiver(&self, receiver: &str) -> usize {
        let mut entries = self.entries();
        let mut count = 0;
        entries.retain(|_, entry| {
            if entry.acknowledge(receiver) {
                count += 1;
            }
            entry.has_pending_receivers()
        });
        count
    }

    /// Retransmits every entry whose interval has elapsed, and gives up on
    /// entries that already used all their retries.
    pub fn sweep(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();
        let mut entries = self.entries();
        let policy = self.policy;

        entries.retain(|id, entry| {
            if now.saturating_duration_since(entry.last_sent) < policy.interval {
                return true;
            }
            if entry.retries >= policy.max_retries {
                report
                    .failures
                    .extend(entry.pending.iter().map(|receiver| DeliveryFailure {
                        receiver: receiver.clone(),
                        message_id: *id,
                        message_type: entry.message.message_type(),
                    }));
                return false;
            }
            entry.retries += 1;
            entry.last_sent = now;
            report
                .retransmissions
                .extend(entry.pending.iter().map(|receiver| Retransmission {
                    receiver: receiver.clone(),
                    message: entry.message.clone(),
                }));
            true
        });

        if !report.is_empty() {
            log::debug!(
                "Delivery sweep: {} retransmissions, {} failures, {} still tracked",
                report.retransmissions.len(),
                report.failures.len(),
                entries.len()
            );
        }
        report
    }

    pub fn pending_receivers(&self, id: MessageId) -> Option<BTreeSet<String>> {
        self.entries().get(&id).map(|entry| entry.pending.clone())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Applied ids of one sender: everything below `next` plus the ids seen
/// ahead of it.
#[derive(Debug)]
struct SenderWindow {
    next: u64,
    ahead: BTreeSet<u64>,
}

impl SenderWindow {
    fn starting_at(first: u64) -> Self {
        Self {
            next: first,
            ahead: BTreeSet::new(),
        }
    }

    fn contains(&self, id: u64) -> bool {
        id < self.next || self.ahead.contains(&id)
    }

    /// Moves `next` past every id that is now contiguous.
    fn advance(&mut self) {
        while self.ahead.remove(&self.next) {
            self.next += 1;
        }
    }
}

/// Applies each `(sender, id)` pair at most once.
///
/// Ids from one sender are monotonic, so each sender keeps a watermark below
/// which every id counts as applied, plus the ids that arrived ahead of it.
/// At most `capacity` ids are held ahead of a watermark; past that the
/// watermark jumps over the oldest gap.
#[derive(Debug)]
pub struct Deduplicator {
    capacity: usize,
    senders: HashMap<String, SenderWindow>,
}

impl Deduplicator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            senders: HashMap::new(),
        }
    }

    /// Returns `true` the first time a pair is seen.
    pub fn first_sighting(&mut self, from: &str, id: MessageId) -> bool {
        let window = self
            .senders
            .entry(from.to_string())
            .or_insert_with(|| SenderWindow::starting_at(id.0));
        if window.contains(id.0) {
            return false;
        }

        window.ahead.insert(id.0);
        window.advance();
        if window.ahead.len() > self.capacity
            && let Some(oldest) = window.ahead.pop_first()
        {
            window.next = oldest + 1;
            window.advance();
        }
        true
    }

    /// Forgets everything seen from `from`.
    pub fn forget_sender(&mut self, from: &str) {
        self.senders.remove(from);
    }

    /// Number of senders with a window.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
