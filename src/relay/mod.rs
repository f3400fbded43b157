//! Cross-instance event relay.
//!
//! Server processes sharing one Room Store stay in sync through a small
//! set of domain events published to a broadcast medium keyed by event
//! type. The relay is notification-only: authoritative state always lives
//! in the Room Store, frames never carry full room state, and delivery is
//! best-effort, at-most-once, ordered only within a channel.
//!
//! Frames carry the publishing instance's origin id so a process can skip
//! its own frames — its local sockets already received the direct
//! broadcast.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::error::RelayError;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Buffered frames per subscriber before lag drops old ones.
pub const RELAY_CAPACITY: usize = 256;

// ============================================================================
// Domain events
// ============================================================================

/// Why a room was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The host left; the room dies with them.
    HostLeft,
    /// The last player left.
    RoomEmpty,
}

/// A domain event published across instances.
///
/// The serde tag doubles as the relay channel name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A player joined a room.
    PlayerJoined {
        /// Room joined.
        room_id: String,
        /// New player's id.
        player_id: String,
        /// New player's name.
        username: String,
    },
    /// A player left a room that still exists.
    PlayerLeft {
        /// Room left.
        room_id: String,
        /// Leaving player's id.
        player_id: String,
        /// Leaving player's name.
        username: String,
        /// Players still in the room.
        remaining_players: usize,
    },
    /// A room was deleted.
    RoomClosed {
        /// The closed room.
        room_id: String,
        /// Why it closed.
        reason: CloseReason,
    },
    /// Opaque in-game event passthrough (including phase-change
    /// notifications).
    GameEvent {
        /// Room the event belongs to.
        room_id: String,
        /// Originating player, when player-triggered.
        player_id: Option<String>,
        /// Application-defined event kind.
        event_type: String,
        /// Application-defined payload.
        payload: serde_json::Value,
    },
    /// A player renamed themselves.
    UsernameChanged {
        /// Room the player is in.
        room_id: String,
        /// Player id.
        player_id: String,
        /// Previous name.
        old_username: String,
        /// New name.
        new_username: String,
    },
    /// A player toggled readiness.
    PlayerReadyChanged {
        /// Room the player is in.
        room_id: String,
        /// Player id.
        player_id: String,
        /// Player name.
        username: String,
        /// New readiness flag.
        is_ready: bool,
    },
}

impl DomainEvent {
    /// The room this event belongs to.
    #[must_use]
    pub fn room_id(&self) -> &str {
        match self {
            Self::PlayerJoined { room_id, .. }
            | Self::PlayerLeft { room_id, .. }
            | Self::RoomClosed { room_id, .. }
            | Self::GameEvent { room_id, .. }
            | Self::UsernameChanged { room_id, .. }
            | Self::PlayerReadyChanged { room_id, .. } => room_id,
        }
    }

    /// The relay channel this event publishes on.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::RoomClosed { .. } => "room_closed",
            Self::GameEvent { .. } => "game_event",
            Self::UsernameChanged { .. } => "username_changed",
            Self::PlayerReadyChanged { .. } => "player_ready_changed",
        }
    }
}

// ============================================================================
// Frames and subscriptions
// ============================================================================

/// One published message: channel name plus the serialized event.
#[derive(Debug, Clone)]
pub struct RelayFrame {
    /// Instance id of the publisher.
    pub origin: String,
    /// Channel name (the event type).
    pub channel: String,
    /// JSON-serialized [`DomainEvent`].
    pub payload: String,
}

impl RelayFrame {
    /// Decodes the payload back into a [`DomainEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Publish`] when the payload is not a valid
    /// event for this channel.
    pub fn decode(&self) -> Result<DomainEvent> {
        serde_json::from_str(&self.payload)
            .map_err(|e| RelayError::Publish(format!("malformed frame on {}: {e}", self.channel)))
    }
}

/// A live subscription over all relay channels.
pub struct RelaySubscription {
    rx: broadcast::Receiver<RelayFrame>,
}

impl RelaySubscription {
    /// Receives the next frame.
    ///
    /// Lagged gaps are logged and skipped — dropped notifications are
    /// within the relay's best-effort contract. Returns `None` once the
    /// relay shuts down.
    pub async fn recv(&mut self) -> Option<RelayFrame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "relay subscriber lagged; dropping notifications");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// Trait
// ============================================================================

/// Publish/subscribe seam for cross-instance notifications.
#[async_trait]
pub trait EventRelay: Send + Sync {
    /// Publishes one event to its channel.
    async fn publish(&self, event: &DomainEvent) -> Result<()>;

    /// Subscribes to every channel.
    fn subscribe(&self) -> RelaySubscription;

    /// This instance's origin id, stamped on published frames.
    fn origin(&self) -> &str;
}

// ============================================================================
// In-process backend
// ============================================================================

/// Relay backend over a process-local broadcast channel.
///
/// Serves a single-instance deployment and tests; a shared-bus backend
/// for multi-instance deployments plugs in behind the same trait.
pub struct InProcessRelay {
    tx: broadcast::Sender<RelayFrame>,
    origin: String,
}

impl InProcessRelay {
    /// Creates a relay with the given subscriber buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            origin: Uuid::new_v4().to_string(),
        }
    }

    /// Creates another handle on the same medium with its own origin —
    /// what a sibling instance sharing the bus would hold. Used to
    /// exercise cross-instance fan-out without a second process.
    #[must_use]
    pub fn sibling(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            origin: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for InProcessRelay {
    fn default() -> Self {
        Self::new(RELAY_CAPACITY)
    }
}

#[async_trait]
impl EventRelay for InProcessRelay {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| RelayError::Publish(e.to_string()))?;
        let frame = RelayFrame {
            origin: self.origin.clone(),
            channel: event.channel().to_string(),
            payload,
        };
        // A send error only means no subscriber is currently listening;
        // notifications are best-effort, so that is not a failure.
        let _ = self.tx.send(frame);
        crate::observability::metrics::increment_relay_published();
        Ok(())
    }

    fn subscribe(&self) -> RelaySubscription {
        RelaySubscription {
            rx: self.tx.subscribe(),
        }
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}

// ============================================================================
// Tests
// ============================================================================
