//! Session registry: live connections and local fan-out.
//!
//! Maps each socket to its outbound channel and, once the player joins a
//! room, to their `{player_id, room_id, username}` binding. The registry
//! is constructed explicitly at startup and injected into handlers; it is
//! the only path from a room id to the sockets of this process.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::trace;

use crate::protocol::ServerEvent;

/// Opaque id of one live connection on this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room binding of a connection after a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Player id inside the room.
    pub player_id: String,
    /// The joined room.
    pub room_id: String,
    /// Display name at join/rename time.
    pub username: String,
}

struct Connection {
    tx: mpsc::UnboundedSender<ServerEvent>,
    session: Option<Session>,
}

/// Registry of this instance's live connections.
#[derive(Default)]
pub struct SessionRegistry {
    connections: DashMap<u64, Connection>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh connection and returns its id.
    pub fn register(&self, tx: mpsc::UnboundedSender<ServerEvent>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.connections.insert(id, Connection { tx, session: None });
        crate::observability::metrics::set_connections_active(self.connections.len());
        ConnectionId(id)
    }

    /// Binds a connection to a room after a successful join.
    pub fn bind(&self, id: ConnectionId, session: Session) {
        if let Some(mut conn) = self.connections.get_mut(&id.0) {
            conn.session = Some(session);
        }
    }

    /// Clears a connection's room binding (explicit leave).
    pub fn unbind(&self, id: ConnectionId) -> Option<Session> {
        self.connections
            .get_mut(&id.0)
            .and_then(|mut conn| conn.session.take())
    }

    /// The connection's current room binding, if any.
    #[must_use]
    pub fn session(&self, id: ConnectionId) -> Option<Session> {
        self.connections
            .get(&id.0)
            .and_then(|conn| conn.session.clone())
    }

    /// Updates the cached username after a rename.
    pub fn set_username(&self, id: ConnectionId, username: &str) {
        if let Some(mut conn) = self.connections.get_mut(&id.0) {
            if let Some(session) = conn.session.as_mut() {
                session.username = username.to_string();
            }
        }
    }

    /// Drops a connection, returning its binding for disconnect cleanup.
    pub fn unregister(&self, id: ConnectionId) -> Option<Session> {
        let removed = self
            .connections
            .remove(&id.0)
            .and_then(|(_, conn)| conn.session);
        crate::observability::metrics::set_connections_active(self.connections.len());
        removed
    }

    /// Sends one event to one connection. Closed sockets are ignored;
    /// the disconnect path cleans them up.
    pub fn send(&self, id: ConnectionId, event: &ServerEvent) {
        if let Some(conn) = self.connections.get(&id.0) {
            let _ = conn.tx.send(event.clone());
        }
    }

    /// Sends one event to every local connection bound to `room_id`.
    pub fn broadcast_room(&self, room_id: &str, event: &ServerEvent) {
        let mut delivered = 0usize;
        for conn in &self.connections {
            if conn
                .session
                .as_ref()
                .is_some_and(|s| s.room_id == room_id)
            {
                let _ = conn.tx.send(event.clone());
                delivered += 1;
            }
        }
        trace!(room_id, delivered, "room broadcast");
    }

    /// The connections of this instance currently bound to `room_id`.
    #[must_use]
    pub fn room_members(&self, room_id: &str) -> Vec<(ConnectionId, Session)> {
        self.connections
            .iter()
            .filter_map(|conn| {
                conn.session
                    .as_ref()
                    .filter(|s| s.room_id == room_id)
                    .map(|s| (ConnectionId(*conn.key()), s.clone()))
            })
            .collect()
    }

    /// Number of live connections on this instance.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
