//! Room membership handlers: join, leave, back-to-lobby, disconnect.

use tracing::{info, warn};

use crate::error::GameError;
use crate::observability::metrics;
use crate::protocol::ServerEvent;
use crate::relay::{CloseReason, DomainEvent};
use crate::room::model::{Player, RoomPhase};
use crate::room::store::{RemovePlayerOutcome, RoomStore};
use crate::server::SharedState;
use crate::session::{ConnectionId, Session};

use super::{broadcast_room_state, publish, publish_phase_change, require_session};

/// Joins (or reconnects to) a room.
///
/// A username already present in the room means reconnection: the
/// existing player identity is reused and neither password nor capacity
/// is checked. New players must pass the password check (private rooms)
/// and fit under `max_players`.
pub async fn join_room(
    state: &SharedState,
    conn: ConnectionId,
    room_id: &str,
    username: &str,
    password: Option<&str>,
) -> Result<(), GameError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(GameError::Validation(
            "room_id and username required".to_string(),
        ));
    }

    let room = state
        .store
        .get(room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;

    let player_id = if let Some(existing) = room.player_by_username(username) {
        info!(room_id = %room.id, username, "player reconnecting");
        existing.id.clone()
    } else {
        if let Some(expected) = &room.settings.password {
            if password != Some(expected.as_str()) {
                return Err(GameError::InvalidPassword);
            }
        }
        if room.is_full() {
            return Err(GameError::RoomFull);
        }
        let player = Player::guest(username);
        let id = player.id.clone();
        state.store.add_player(&room.id, player).await?;
        id
    };

    // Bind before broadcasting so the joiner gets the room state too.
    state.sessions.bind(
        conn,
        Session {
            player_id: player_id.clone(),
            room_id: room.id.clone(),
            username: username.to_string(),
        },
    );

    let refreshed = state.store.get(&room.id).await?;
    broadcast_room_state(&state.sessions, &refreshed);

    publish(
        state,
        DomainEvent::PlayerJoined {
            room_id: room.id.clone(),
            player_id,
            username: username.to_string(),
        },
    )
    .await;

    info!(room_id = %room.id, username, "player joined");
    Ok(())
}

/// Explicit leave: runs the shared leave path, then clears the binding
/// and acknowledges.
pub async fn leave_room(state: &SharedState, conn: ConnectionId) -> Result<(), GameError> {
    let Some(session) = state.sessions.unbind(conn) else {
        // Leaving without a binding is a no-op, as on the wire before.
        return Ok(());
    };

    leave_room_inner(state, &session).await?;
    state.sessions.send(
        conn,
        &ServerEvent::LeftRoom {
            room_id: session.room_id.clone(),
        },
    );
    info!(room_id = %session.room_id, username = %session.username, "player left");
    Ok(())
}

/// Disconnect cleanup: the same leave path as an explicit leave.
pub async fn disconnect(state: &SharedState, conn: ConnectionId) {
    let Some(session) = state.sessions.unregister(conn) else {
        return;
    };
    info!(
        room_id = %session.room_id,
        username = %session.username,
        "disconnected; auto-leaving room"
    );
    if let Err(e) = leave_room_inner(state, &session).await {
        warn!(room_id = %session.room_id, error = %e, "disconnect cleanup failed");
    }
}

/// Shared leave path: removes the player, closes the room when it
/// empties or the host left, and notifies local sockets plus the relay.
async fn leave_room_inner(state: &SharedState, session: &Session) -> Result<(), GameError> {
    let outcome = match state
        .store
        .remove_player(&session.room_id, &session.player_id)
        .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            // Room already gone (expired or closed by another path).
            return Ok(());
        }
    };

    match outcome {
        RemovePlayerOutcome::Deleted { was_host } => {
            let reason = if was_host {
                CloseReason::HostLeft
            } else {
                CloseReason::RoomEmpty
            };
            info!(room_id = %session.room_id, ?reason, "room closed");

            let event = ServerEvent::RoomClosed {
                room_id: session.room_id.clone(),
                reason,
            };
            state.sessions.broadcast_room(&session.room_id, &event);

            publish(
                state,
                DomainEvent::RoomClosed {
                    room_id: session.room_id.clone(),
                    reason,
                },
            )
            .await;
        }
        RemovePlayerOutcome::Remaining(room) => {
            state.sessions.broadcast_room(
                &room.id,
                &ServerEvent::PlayerLeft {
                    player_id: session.player_id.clone(),
                    username: session.username.clone(),
                },
            );
            broadcast_room_state(&state.sessions, &room);

            publish(
                state,
                DomainEvent::PlayerLeft {
                    room_id: room.id.clone(),
                    player_id: session.player_id.clone(),
                    username: session.username.clone(),
                    remaining_players: room.player_count(),
                },
            )
            .await;
        }
    }
    Ok(())
}

/// Returns the room to the lobby (host only, results phase only).
pub async fn back_to_lobby(state: &SharedState, conn: ConnectionId) -> Result<(), GameError> {
    let session = require_session(state, conn)?;
    let room = state
        .store
        .get(&session.room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;

    if session.player_id != room.host_id {
        return Err(GameError::NotHost {
            action: "return to lobby",
        });
    }
    if room.phase != RoomPhase::Results {
        return Err(GameError::WrongPhase {
            expected: RoomPhase::Results,
            actual: room.phase,
        });
    }

    let room = state.engine.return_to_lobby(room).await?;
    metrics::increment_phase_transition("waiting");
    broadcast_room_state(&state.sessions, &room);
    publish_phase_change(state, &room).await;
    Ok(())
}
