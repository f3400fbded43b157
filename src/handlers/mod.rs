//! Client-event handlers.
//!
//! Each socket event maps to one handler; [`dispatch`] routes a decoded
//! [`ClientEvent`] and turns any [`GameError`] into an `error` event on
//! the triggering connection. Handler failures never close the
//! connection and never leak across rooms.

pub mod game;
pub mod player;
pub mod room;

use serde_json::json;
use tracing::{error, warn};

use crate::error::GameError;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::relay::{DomainEvent, EventRelay};
use crate::room::model::Room;
use crate::server::{AppState, SharedState};
use crate::session::{ConnectionId, SessionRegistry};
use crate::view::RoomView;

/// Routes one client event to its handler and reports failures back to
/// the sender.
pub async fn dispatch(state: &SharedState, conn: ConnectionId, event: ClientEvent) {
    let result = match event {
        ClientEvent::JoinRoom {
            room_id,
            username,
            password,
        } => room::join_room(state, conn, &room_id, &username, password.as_deref()).await,
        ClientEvent::LeaveRoom { .. } => room::leave_room(state, conn).await,
        ClientEvent::BackToLobby { .. } => room::back_to_lobby(state, conn).await,
        ClientEvent::UpdateUsername { new_username, .. } => {
            player::update_username(state, conn, &new_username).await
        }
        ClientEvent::ToggleReady { .. } => player::toggle_ready(state, conn).await,
        ClientEvent::StartGame {
            language,
            category_ids,
            settings,
            ..
        } => game::start_game(state, conn, language.as_deref(), category_ids, settings).await,
        ClientEvent::RequestVote { .. } => game::request_vote(state, conn).await,
        ClientEvent::Vote { voted_for_id, .. } => game::vote(state, conn, &voted_for_id).await,
        ClientEvent::GameEvent {
            room_id,
            event_type,
            payload,
        } => game::game_event(state, conn, &room_id, &event_type, payload).await,
    };

    if let Err(e) = result {
        let message = match &e {
            // Collaborator failures are logged in full and surfaced
            // generically; everything else is client-facing as-is.
            GameError::Store(_) | GameError::Catalog(_) => {
                error!(%conn, error = %e, "handler failed on backend");
                "internal error".to_string()
            }
            _ => {
                warn!(%conn, error = %e, "request rejected");
                e.to_string()
            }
        };
        state.sessions.send(conn, &ServerEvent::Error { message });
    }
}

/// Sends every local member of `room` their own filtered projection.
pub fn broadcast_room_state(sessions: &SessionRegistry, room: &Room) {
    for (conn, session) in sessions.room_members(&room.id) {
        let view = RoomView::for_viewer(room, &session.player_id);
        sessions.send(conn, &ServerEvent::RoomState(view));
    }
}

/// Publishes a phase-change notification for sibling instances.
///
/// Notification-only: siblings re-read the store for state; this merely
/// tells them (and their sockets) that something moved.
pub async fn publish_phase_change(state: &AppState, room: &Room) {
    let event = DomainEvent::GameEvent {
        room_id: room.id.clone(),
        player_id: None,
        event_type: "phase_changed".to_string(),
        payload: json!({ "phase": room.phase, "round": room.round_number }),
    };
    publish(state, event).await;
}

/// Publishes a domain event, logging instead of failing — relay delivery
/// is best-effort and never blocks the mutation that triggered it.
pub async fn publish(state: &AppState, event: DomainEvent) {
    if let Err(e) = state.relay.publish(&event).await {
        warn!(channel = event.channel(), error = %e, "relay publish failed");
    }
}

/// Resolves the connection's session or rejects the request.
fn require_session(
    state: &AppState,
    conn: ConnectionId,
) -> Result<crate::session::Session, GameError> {
    state
        .sessions
        .session(conn)
        .ok_or_else(|| GameError::Validation("not in a room".to_string()))
}
