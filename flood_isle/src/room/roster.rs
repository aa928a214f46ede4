//! Room membership: who is connected, in what order, and how to reach them.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::messages::RoomError;
use crate::game::{PlayerName, RoleKind};

/// A connected member of a room.
#[derive(Debug)]
pub struct Participant {
    name: PlayerName,
    requested_role: Option<RoleKind>,
    outbox: mpsc::Sender<String>,
    degraded: bool,
}

impl Participant {
    pub fn new(name: PlayerName, requested_role: Option<RoleKind>, outbox: mpsc::Sender<String>) -> Self {
        Self {
            name,
            requested_role,
            outbox,
            degraded: false,
        }
    }

    pub fn name(&self) -> &PlayerName {
        &self.name
    }

    pub fn requested_role(&self) -> Option<RoleKind> {
        self.requested_role
    }

    /// Whether the participant missed an envelope past the retry ceiling and
    /// has not been heard from since.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Queues one wire frame without waiting. A full outbox drops the frame;
    /// the delivery tracker will send it again.
    ///
    /// # Returns
    ///
    /// * `bool` - false once the connection's receiving half is gone
    pub fn send(&self, frame: String) -> bool {
        match self.outbox.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Outbox of {} is full, dropping frame", self.name);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Members of a room in join order. The first member is the host.
#[derive(Debug, Default)]
pub struct Roster {
    members: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant at the end of the join order.
    ///
    /// # Arguments
    ///
    /// * `participant` - The joining member
    /// * `capacity` - Maximum number of members
    ///
    /// # Returns
    ///
    /// * `Result<bool, RoomError>` - Whether the participant became host
    pub fn join(&mut self, participant: Participant, capacity: usize) -> Result<bool, RoomError> {
        if self.contains(participant.name()) {
            return Err(RoomError::NameTaken(participant.name.clone()));
        }
        if let Some(role) = participant.requested_role
            && self.members.iter().any(|m| m.requested_role == Some(role))
        {
            return Err(RoomError::RoleTaken(role));
        }
        if self.members.len() >= capacity {
            return Err(RoomError::RoomFull);
        }

        self.members.push(participant);
        Ok(self.members.len() == 1)
    }

    /// Removes a participant.
    ///
    /// # Returns
    ///
    /// * `Option<(Participant, Option<PlayerName>)>` - The removed member and,
    ///   when the host left and someone remains, the new host
    pub fn leave(&mut self, name: &PlayerName) -> Option<(Participant, Option<PlayerName>)> {
        let index = self.members.iter().position(|m| m.name() == name)?;
        let removed = self.members.remove(index);
        let new_host = if index == 0 {
            self.host().cloned()
        } else {
            None
        };
        Some((removed, new_host))
    }

    pub fn host(&self) -> Option<&PlayerName> {
        self.members.first().map(Participant::name)
    }

    pub fn is_host(&self, name: &PlayerName) -> bool {
        self.host() == Some(name)
    }

    pub fn contains(&self, name: &PlayerName) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &PlayerName) -> Option<&Participant> {
        self.members.iter().find(|m| m.name() == name)
    }

    fn get_by_str(&self, name: &str) -> Option<&Participant> {
        self.members.iter().find(|m| m.name().as_str() == name)
    }

    pub fn names(&self) -> Vec<PlayerName> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    /// Wire identities of every member except `sender`. These are the
    /// receivers that must acknowledge an envelope from `sender`.
    pub fn receivers_except(&self, sender: &str) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.name.to_string())
            .filter(|name| name != sender)
            .collect()
    }

    /// Sends a frame to one member by wire identity.
    ///
    /// # Returns
    ///
    /// * `bool` - false if the member is unknown or disconnected
    pub fn send_to(&self, receiver: &str, frame: String) -> bool {
        self.get_by_str(receiver).is_some_and(|m| m.send(frame))
    }

    pub fn set_degraded(&mut self, name: &str, degraded: bool) -> bool {
        match self.members.iter_mut().find(|m| m.name.as_str() == name) {
            Some(member) if member.degraded != degraded => {
                member.degraded = degraded;
                true
            }
            _ => false,
        }
    }

    pub fn degraded(&self) -> Vec<PlayerName> {
        self.members
            .iter()
            .filter(|m| m.degraded)
            .map(|m| m.name.clone())
            .collect()
    }

    /// Assigns roles for a new game. Requested roles are kept; everyone else
    /// draws from the remaining roles in a seeded shuffle.
    ///
    /// # Returns
    ///
    /// * `Vec<(PlayerName, RoleKind)>` - Members in turn (join) order
    pub fn assign_roles(&self, seed: u64) -> Vec<(PlayerName, RoleKind)> {
        let mut free: Vec<RoleKind> = RoleKind::ALL
            .into_iter()
            .filter(|role| !self.members.iter().any(|m| m.requested_role == Some(*role)))
            .collect();
        free.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut free = free.into_iter();
        self.members
            .iter()
            .filter_map(|m| {
                let role = m.requested_role.or_else(|| free.next())?;
                Some((m.name.clone(), role))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
