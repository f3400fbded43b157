//! Wire-level event envelopes.
//!
//! Client and server events travel as tagged JSON envelopes
//! `{"event": "...", "data": {...}}`. Serialization lives here, apart
//! from the domain types: domain enums know nothing about the wire, and
//! handlers only ever see the typed variants.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::relay::{CloseReason, DomainEvent};
use crate::view::RoomView;

// ============================================================================
// Client → server
// ============================================================================

/// Settings the host may supply with `start_game`.
///
/// When present, all fields apply (absent keys fall back to the defaults
/// below), replacing the room's variant-role and timer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSettings {
    /// Deal a detective this round.
    #[serde(default)]
    pub detective_enabled: bool,
    /// Deal a joker this round.
    #[serde(default)]
    pub joker_enabled: bool,
    /// Voting duration in seconds.
    #[serde(default = "default_voting_time")]
    pub voting_time: u64,
    /// Whether the discussion timer override is active.
    #[serde(default)]
    pub discussion_timer_enabled: bool,
    /// Discussion duration in seconds.
    #[serde(default = "default_discussion_time")]
    pub discussion_time: u64,
}

const fn default_voting_time() -> u64 {
    60
}

const fn default_discussion_time() -> u64 {
    300
}

/// Events a client may send over the socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join (or reconnect to) a room.
    JoinRoom {
        /// Target room.
        room_id: String,
        /// Display name; doubles as the reconnection key.
        username: String,
        /// Password for private rooms.
        #[serde(default)]
        password: Option<String>,
    },
    /// Leave the current room.
    LeaveRoom {
        /// Room to leave.
        room_id: String,
    },
    /// Rename within the room.
    UpdateUsername {
        /// Room the player is in.
        room_id: String,
        /// Desired name (trimmed server-side, max 20 chars).
        new_username: String,
    },
    /// Toggle lobby readiness.
    ToggleReady {
        /// Room the player is in.
        room_id: String,
    },
    /// Start a round (host only).
    StartGame {
        /// Room to start.
        room_id: String,
        /// Word language; defaults to `"es"`.
        #[serde(default)]
        language: Option<String>,
        /// Replacement category set.
        #[serde(default)]
        category_ids: Option<Vec<i64>>,
        /// Replacement variant-role and timer settings.
        #[serde(default)]
        settings: Option<StartSettings>,
    },
    /// Ask to move to the voting phase.
    RequestVote {
        /// Room the player is in.
        room_id: String,
    },
    /// Vote for a player.
    Vote {
        /// Room the player is in.
        room_id: String,
        /// The accused player.
        voted_for_id: String,
    },
    /// Return the room to the lobby (host only, results phase).
    BackToLobby {
        /// Room to reset.
        room_id: String,
    },
    /// Opaque passthrough broadcast to the room.
    GameEvent {
        /// Room to broadcast in.
        room_id: String,
        /// Application-defined kind.
        event_type: String,
        /// Application-defined payload.
        #[serde(default)]
        payload: Value,
    },
}

// ============================================================================
// Server → client
// ============================================================================

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake acknowledgement carrying the connection id.
    Connected {
        /// Connection id.
        sid: String,
    },
    /// Per-viewer filtered room projection.
    RoomState(RoomView),
    /// A player joined the room.
    PlayerJoined {
        /// New player's id.
        player_id: String,
        /// New player's name.
        username: String,
    },
    /// A player left the room.
    PlayerLeft {
        /// Leaving player's id.
        player_id: String,
        /// Leaving player's name.
        username: String,
    },
    /// The room was closed.
    RoomClosed {
        /// The closed room.
        room_id: String,
        /// Why it closed.
        reason: CloseReason,
    },
    /// Acknowledges the sender's own leave.
    LeftRoom {
        /// Room left.
        room_id: String,
    },
    /// A player renamed themselves.
    UsernameChanged {
        /// Player id.
        player_id: String,
        /// Previous name.
        old_username: String,
        /// New name.
        new_username: String,
    },
    /// A player toggled readiness.
    PlayerReadyChanged {
        /// Player id.
        player_id: String,
        /// Player name.
        username: String,
        /// New readiness flag.
        is_ready: bool,
    },
    /// Voting progress.
    VoteUpdate {
        /// Votes recorded so far.
        votes_submitted: usize,
        /// Players in the room.
        total_players: usize,
    },
    /// Opaque in-game event.
    GameEvent {
        /// Application-defined kind.
        event_type: String,
        /// Originating player, when player-triggered.
        player_id: Option<String>,
        /// Application-defined payload.
        payload: Value,
    },
    /// A request failed; the connection stays open.
    Error {
        /// Client-facing description.
        message: String,
    },
}

impl ServerEvent {
    /// Builds the relayed counterpart of a domain event, for fan-out to
    /// sockets on instances that did not perform the mutation.
    ///
    /// Room-scoped addressing is the caller's job; the `room_id` is
    /// dropped from payloads that carried it only for routing.
    #[must_use]
    pub fn from_domain(event: DomainEvent) -> Self {
        match event {
            DomainEvent::PlayerJoined {
                player_id, username, ..
            } => Self::PlayerJoined {
                player_id,
                username,
            },
            DomainEvent::PlayerLeft {
                player_id, username, ..
            } => Self::PlayerLeft {
                player_id,
                username,
            },
            DomainEvent::RoomClosed { room_id, reason } => Self::RoomClosed { room_id, reason },
            DomainEvent::GameEvent {
                player_id,
                event_type,
                payload,
                ..
            } => Self::GameEvent {
                event_type,
                player_id,
                payload,
            },
            DomainEvent::UsernameChanged {
                player_id,
                old_username,
                new_username,
                ..
            } => Self::UsernameChanged {
                player_id,
                old_username,
                new_username,
            },
            DomainEvent::PlayerReadyChanged {
                player_id,
                username,
                is_ready,
                ..
            } => Self::PlayerReadyChanged {
                player_id,
                username,
                is_ready,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
