//! Room manager for spawning and managing multiple room actors.

use super::{
    actor::{RoomActor, RoomHandle},
    config::RoomConfig,
    messages::{RoomError, RoomId, RoomStateResponse},
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Default cap on concurrently open rooms
pub const DEFAULT_MAX_ROOMS: usize = 64;

/// Room manager for managing multiple room instances
#[derive(Clone, Debug)]
pub struct RoomManager {
    /// Active room handles
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,

    /// Maximum number of open rooms
    max_rooms: usize,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROOMS)
    }
}

impl RoomManager {
    /// Create a new room manager
    ///
    /// # Arguments
    ///
    /// * `max_rooms` - Maximum number of rooms open at once
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            max_rooms,
        }
    }

    /// Create and spawn a new room
    ///
    /// # Arguments
    ///
    /// * `config` - Room configuration
    ///
    /// # Returns
    ///
    /// * `Result<RoomHandle, RoomError>` - Handle of the running room
    pub async fn create_room(&self, config: RoomConfig) -> Result<RoomHandle, RoomError> {
        config.validate().map_err(RoomError::InvalidConfig)?;

        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, handle| !handle.is_closed());
        if rooms.len() >= self.max_rooms {
            return Err(RoomError::TooManyRooms(self.max_rooms));
        }

        let room_id = RoomId::new_v4();
        let name = config.name.clone();
        let (actor, handle) = RoomActor::new(room_id, config);
        rooms.insert(room_id, handle.clone());
        drop(rooms);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Created and spawned room {} '{}'", room_id, name);
        Ok(handle)
    }

    /// Get a room handle
    pub async fn get_room(&self, room_id: RoomId) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(&room_id).filter(|handle| !handle.is_closed()).cloned()
    }

    /// List all open rooms
    ///
    /// # Returns
    ///
    /// * `Vec<RoomStateResponse>` - State of every room that answered
    pub async fn list_rooms(&self) -> Vec<RoomStateResponse> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();

        let mut states = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.state().await {
                Ok(state) => states.push(state),
                Err(_) => log::debug!("Room {} did not answer, skipping", handle.room_id()),
            }
        }
        states.sort_by_key(|state| state.created_at);
        states
    }

    /// Close a room
    ///
    /// # Arguments
    ///
    /// * `room_id` - Room ID
    ///
    /// # Returns
    ///
    /// * `Result<(), RoomError>` - Success or error
    pub async fn close_room(&self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .write()
            .await
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;

        // An actor that already stopped is as good as closed.
        if let Err(err) = handle.close().await {
            log::debug!("Room {} was already stopped: {}", room_id, err);
        }

        log::info!("Closed room {}", room_id);
        Ok(())
    }

    /// Number of rooms currently registered
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub fn max_rooms(&self) -> usize {
        self.max_rooms
    }
}
