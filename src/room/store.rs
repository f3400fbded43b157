//! Durable keyed room storage with expiry and a public-room index.
//!
//! The [`RoomStore`] trait is the seam between the engine and whatever
//! backs the shared state; it is constructed explicitly and injected into
//! handlers, never reached through module state. [`MemoryRoomStore`] is the
//! reference backend. Writes are full overwrites with no version check —
//! concurrent writers follow a last-writer-wins policy.
//!
//! The store never emits game events; side effects here are limited to its
//! own records and the public-room index.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use super::model::{Player, PlayerUpdate, Room, RoomPhase, RoomSettings};
use crate::error::StoreError;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Default record time-to-live (24 hours). Every successful write resets
/// the deadline, so abandoned rooms self-clean.
pub const DEFAULT_ROOM_TTL: Duration = Duration::from_secs(86_400);

/// Attempts to find a vacant id before giving up on room creation.
const ID_ATTEMPTS: usize = 8;

// ============================================================================
// Listing and outcome types
// ============================================================================

/// Entry in the public-room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicRoom {
    /// Room id.
    pub id: String,
    /// Current player count.
    pub player_count: usize,
    /// Room capacity.
    pub max_players: usize,
    /// Categories the room draws words from.
    pub category_ids: Vec<i64>,
}

/// Outcome of [`RoomStore::remove_player`].
#[derive(Debug, Clone)]
pub enum RemovePlayerOutcome {
    /// The room was deleted: it emptied, or the host left.
    Deleted {
        /// Whether the removed player was the host.
        was_host: bool,
    },
    /// The room persists; carries the post-removal state.
    Remaining(Room),
}

// ============================================================================
// Trait
// ============================================================================

/// Keyed storage for [`Room`] records.
///
/// Lookup is case-insensitive: an exact key match is preferred, otherwise
/// identifiers are compared ignoring ASCII case. Expired records are
/// reported as [`StoreError::NotFound`].
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Creates a room with a fresh id and `host` as its only player.
    async fn create(&self, settings: RoomSettings, host: Player) -> Result<Room>;

    /// Fetches a room by id.
    async fn get(&self, id: &str) -> Result<Room>;

    /// Persists `room` as a full overwrite, refreshing its TTL and the
    /// public-room index.
    async fn save(&self, room: &Room) -> Result<()>;

    /// Deletes a room and its index entries. Deleting an absent room is
    /// not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Adds `player` to the room and persists.
    async fn add_player(&self, room_id: &str, player: Player) -> Result<Room>;

    /// Removes a player; deletes the room when it empties or the host
    /// leaves.
    async fn remove_player(&self, room_id: &str, player_id: &str) -> Result<RemovePlayerOutcome>;

    /// Applies an explicit [`PlayerUpdate`] to one player and persists.
    async fn update_player(
        &self,
        room_id: &str,
        player_id: &str,
        update: PlayerUpdate,
    ) -> Result<Room>;

    /// Lists public rooms still in the lobby phase, ordered by player
    /// count descending.
    async fn list_public_rooms(&self) -> Result<Vec<PublicRoom>>;
}

// ============================================================================
// In-memory backend
// ============================================================================

struct StoredRoom {
    room: Room,
    deadline: Instant,
}

/// In-memory [`RoomStore`] backend.
///
/// Records live in a [`DashMap`] with a per-record expiry deadline;
/// expired entries are reaped lazily on access. The public-room index is a
/// side map from room id to player count, updated on every save.
pub struct MemoryRoomStore {
    rooms: DashMap<String, StoredRoom>,
    public_index: DashMap<String, usize>,
    ttl: Duration,
}

impl MemoryRoomStore {
    /// Creates a store with the given record TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            public_index: DashMap::new(),
            ttl,
        }
    }

    /// Resolves `id` to the exact stored key, scanning case-insensitively
    /// when no exact match exists.
    fn resolve_key(&self, id: &str) -> Option<String> {
        if self.rooms.contains_key(id) {
            return Some(id.to_string());
        }
        self.rooms
            .iter()
            .map(|entry| entry.key().clone())
            .find(|key| key.eq_ignore_ascii_case(id))
    }

    /// Fetches by exact key, reaping the record if its deadline passed.
    fn get_live(&self, key: &str) -> Option<Room> {
        {
            let entry = self.rooms.get(key)?;
            if Instant::now() < entry.deadline {
                return Some(entry.room.clone());
            }
            // Guard dropped here so the removal below cannot deadlock.
        }
        debug!(room_id = %key, "reaping expired room");
        self.rooms.remove(key);
        self.public_index.remove(key);
        None
    }

    fn write(&self, room: &Room) {
        self.rooms.insert(
            room.id.clone(),
            StoredRoom {
                room: room.clone(),
                deadline: Instant::now() + self.ttl,
            },
        );
        if room.settings.is_public {
            self.public_index
                .insert(room.id.clone(), room.player_count());
        } else {
            self.public_index.remove(&room.id);
        }
    }
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_TTL)
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create(&self, settings: RoomSettings, host: Player) -> Result<Room> {
        let id = (0..ID_ATTEMPTS)
            .map(|_| Room::generate_id())
            .find(|candidate| !self.rooms.contains_key(candidate))
            .ok_or_else(|| StoreError::Backend("could not allocate a room id".to_string()))?;

        let room = Room::new(id, host, settings);
        self.write(&room);
        debug!(room_id = %room.id, "room created");
        Ok(room)
    }

    async fn get(&self, id: &str) -> Result<Room> {
        let key = self
            .resolve_key(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.get_live(&key)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save(&self, room: &Room) -> Result<()> {
        self.write(room);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if let Some(key) = self.resolve_key(id) {
            self.rooms.remove(&key);
            self.public_index.remove(&key);
        }
        Ok(())
    }

    async fn add_player(&self, room_id: &str, player: Player) -> Result<Room> {
        let mut room = self.get(room_id).await?;
        room.players.insert(player.id.clone(), player);
        self.write(&room);
        Ok(room)
    }

    async fn remove_player(&self, room_id: &str, player_id: &str) -> Result<RemovePlayerOutcome> {
        let mut room = self.get(room_id).await?;
        if room.players.remove(player_id).is_none() {
            return Err(StoreError::NotFound(format!(
                "player {player_id} in room {room_id}"
            )));
        }

        let was_host = player_id == room.host_id;
        if room.players.is_empty() || was_host {
            self.delete(&room.id).await?;
            return Ok(RemovePlayerOutcome::Deleted { was_host });
        }

        self.write(&room);
        Ok(RemovePlayerOutcome::Remaining(room))
    }

    async fn update_player(
        &self,
        room_id: &str,
        player_id: &str,
        update: PlayerUpdate,
    ) -> Result<Room> {
        let mut room = self.get(room_id).await?;
        let player = room.players.get_mut(player_id).ok_or_else(|| {
            StoreError::NotFound(format!("player {player_id} in room {room_id}"))
        })?;
        update.apply(player);
        self.write(&room);
        Ok(room)
    }

    async fn list_public_rooms(&self) -> Result<Vec<PublicRoom>> {
        let mut ids: Vec<(String, usize)> = self
            .public_index
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut rooms = Vec::with_capacity(ids.len());
        for (id, _) in ids {
            let Some(room) = self.get_live(&id) else {
                continue;
            };
            if room.phase == RoomPhase::Waiting && room.settings.is_public {
                rooms.push(PublicRoom {
                    id: room.id.clone(),
                    player_count: room.player_count(),
                    max_players: room.settings.max_players,
                    category_ids: room.settings.category_ids.clone(),
                });
            }
        }
        Ok(rooms)
    }
}

// ============================================================================
// Tests
// ============================================================================
