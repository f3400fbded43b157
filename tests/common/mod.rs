//! Shared integration-test harness: an `AppState` over in-memory
//! collaborators plus channel-backed fake connections, so the full
//! handler → store → broadcast path runs without sockets.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;

use wordspy::catalog::StaticCatalog;
use wordspy::config::AppConfig;
use wordspy::protocol::{ClientEvent, ServerEvent};
use wordspy::relay::{EventRelay, InProcessRelay};
use wordspy::room::model::{Player, Room, RoomSettings};
use wordspy::room::store::{MemoryRoomStore, RoomStore};
use wordspy::server::{AppState, SharedState};
use wordspy::session::ConnectionId;
use wordspy::view::RoomView;

/// Words every test state serves (category 1, Spanish).
pub const TEST_WORDS: &[&str] = &["gato", "perro", "pez"];

/// Builds a state over fresh in-memory collaborators.
pub fn test_state() -> SharedState {
    test_state_with_relay(Arc::new(InProcessRelay::default()))
}

/// Builds a state over a caller-supplied relay (for sibling-instance
/// tests).
pub fn test_state_with_relay(relay: Arc<InProcessRelay>) -> SharedState {
    let store = Arc::new(MemoryRoomStore::default());
    let catalog = Arc::new(StaticCatalog::from_values(1, "es", TEST_WORDS));
    let relay: Arc<dyn EventRelay> = relay;
    AppState::new(AppConfig::default(), store, catalog, relay)
}

/// Creates a room owned by `host_name` directly through the store, the
/// way the REST shell does.
pub async fn create_room(state: &SharedState, host_name: &str) -> Room {
    let settings = RoomSettings {
        category_ids: vec![1],
        ..RoomSettings::default()
    };
    state
        .store
        .create(settings, Player::host(host_name))
        .await
        .expect("room creation")
}

/// A fake socket: a registered connection plus its outbound channel.
pub struct TestClient {
    pub conn: ConnectionId,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    /// Registers a new connection on the state.
    pub fn connect(state: &SharedState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = state.sessions.register(tx);
        Self { conn, rx }
    }

    /// Sends one client event through the full dispatch path.
    pub async fn send(&self, state: &SharedState, event: ClientEvent) {
        wordspy::handlers::dispatch(state, self.conn, event).await;
    }

    /// Joins a room, driving the same handler the socket loop does.
    pub async fn join(&self, state: &SharedState, room_id: &str, username: &str) {
        self.join_with_password(state, room_id, username, None).await;
    }

    /// Joins with a password attempt.
    pub async fn join_with_password(
        &self,
        state: &SharedState,
        room_id: &str,
        username: &str,
        password: Option<&str>,
    ) {
        self.send(
            state,
            ClientEvent::JoinRoom {
                room_id: room_id.to_string(),
                username: username.to_string(),
                password: password.map(ToString::to_string),
            },
        )
        .await;
    }

    /// Drains every event queued so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Drains and returns the latest room projection, if any arrived.
    pub fn last_room_state(&mut self) -> Option<RoomView> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::RoomState(view) => Some(view),
                _ => None,
            })
            .last()
    }

    /// Drains and returns the error messages received.
    pub fn errors(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::Error { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Waits (briefly) for the next event — for relay fan-out, which is
    /// asynchronous.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        tokio::time::timeout(std::time::Duration::from_secs(1), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// This client's player id inside `room_id`, from the registry.
    pub fn player_id(&self, state: &SharedState) -> String {
        state
            .sessions
            .session(self.conn)
            .expect("client is in a room")
            .player_id
    }
}

/// Joins `names` into a fresh room and drains the join chatter.
/// Returns the state, the room id, and one client per name.
pub async fn room_with_players(names: &[&str]) -> (SharedState, String, Vec<TestClient>) {
    let state = test_state();
    let room = create_room(&state, names[0]).await;

    let mut clients = Vec::with_capacity(names.len());
    for name in names {
        let client = TestClient::connect(&state);
        client.join(&state, &room.id, name).await;
        clients.push(client);
    }
    for client in &mut clients {
        client.drain();
    }
    (state, room.id, clients)
}

/// Readies every non-host player (hosts start ready).
pub async fn ready_all(state: &SharedState, room_id: &str, clients: &mut [TestClient]) {
    let room = state.store.get(room_id).await.unwrap();
    for client in clients.iter() {
        let player_id = client.player_id(state);
        if !room.players[&player_id].is_ready {
            client
                .send(
                    state,
                    ClientEvent::ToggleReady {
                        room_id: room_id.to_string(),
                    },
                )
                .await;
        }
    }
    for client in clients.iter_mut() {
        client.drain();
    }
}
