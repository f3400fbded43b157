//! Player lobby handlers: rename and ready toggling.

use tracing::info;

use crate::error::GameError;
use crate::protocol::ServerEvent;
use crate::relay::DomainEvent;
use crate::room::model::{MAX_USERNAME_LEN, PlayerUpdate};
use crate::room::store::RoomStore;
use crate::server::SharedState;
use crate::session::ConnectionId;

use super::{broadcast_room_state, publish, require_session};

/// Renames the connection's player within their room.
///
/// The name is trimmed and must be non-empty, at most 20 characters, and
/// not already held by another player in the room — usernames double as
/// the reconnection key, so duplicates would make reconnection ambiguous.
pub async fn update_username(
    state: &SharedState,
    conn: ConnectionId,
    new_username: &str,
) -> Result<(), GameError> {
    let session = require_session(state, conn)?;

    let new_username = new_username.trim();
    if new_username.is_empty() {
        return Err(GameError::Validation("username cannot be empty".to_string()));
    }
    if new_username.chars().count() > MAX_USERNAME_LEN {
        return Err(GameError::Validation(
            "username too long (max 20 characters)".to_string(),
        ));
    }

    let room = state
        .store
        .get(&session.room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;
    let taken = room.players.values().any(|p| {
        p.id != session.player_id && p.username.eq_ignore_ascii_case(new_username)
    });
    if taken {
        return Err(GameError::UsernameTaken(new_username.to_string()));
    }

    let update = PlayerUpdate {
        username: Some(new_username.to_string()),
        is_ready: None,
    };
    let room = state
        .store
        .update_player(&room.id, &session.player_id, update)
        .await?;
    state.sessions.set_username(conn, new_username);

    info!(
        room_id = %room.id,
        old = %session.username,
        new = new_username,
        "username changed"
    );

    broadcast_room_state(&state.sessions, &room);
    state.sessions.broadcast_room(
        &room.id,
        &ServerEvent::UsernameChanged {
            player_id: session.player_id.clone(),
            old_username: session.username.clone(),
            new_username: new_username.to_string(),
        },
    );

    publish(
        state,
        DomainEvent::UsernameChanged {
            room_id: room.id,
            player_id: session.player_id,
            old_username: session.username,
            new_username: new_username.to_string(),
        },
    )
    .await;
    Ok(())
}

/// Toggles the connection's lobby readiness flag.
pub async fn toggle_ready(state: &SharedState, conn: ConnectionId) -> Result<(), GameError> {
    let session = require_session(state, conn)?;
    let room = state
        .store
        .get(&session.room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;

    let player = room
        .players
        .get(&session.player_id)
        .ok_or(GameError::PlayerNotFound)?;
    let is_ready = !player.is_ready;

    let update = PlayerUpdate {
        username: None,
        is_ready: Some(is_ready),
    };
    let room = state
        .store
        .update_player(&room.id, &session.player_id, update)
        .await?;

    info!(room_id = %room.id, username = %session.username, is_ready, "ready toggled");

    broadcast_room_state(&state.sessions, &room);
    state.sessions.broadcast_room(
        &room.id,
        &ServerEvent::PlayerReadyChanged {
            player_id: session.player_id.clone(),
            username: session.username.clone(),
            is_ready,
        },
    );

    publish(
        state,
        DomainEvent::PlayerReadyChanged {
            room_id: room.id,
            player_id: session.player_id,
            username: session.username,
            is_ready,
        },
    )
    .await;
    Ok(())
}
