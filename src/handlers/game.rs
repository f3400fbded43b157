//! Game flow handlers: start, vote requests, voting, event passthrough.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::GameError;
use crate::observability::metrics;
use crate::protocol::{ServerEvent, StartSettings};
use crate::relay::DomainEvent;
use crate::room::store::RoomStore;
use crate::scheduler::{
    PendingTransition, role_reveal_duration, schedule_transition, voting_duration,
};
use crate::server::SharedState;
use crate::session::ConnectionId;

use super::{broadcast_room_state, publish, publish_phase_change, require_session};

/// Starts a round (host only; ≥3 players, all ready).
///
/// Host-supplied `category_ids` and `settings` replace the room's before
/// the round starts — the last moment settings are mutable.
pub async fn start_game(
    state: &SharedState,
    conn: ConnectionId,
    language: Option<&str>,
    category_ids: Option<Vec<i64>>,
    settings: Option<StartSettings>,
) -> Result<(), GameError> {
    let session = require_session(state, conn)?;
    let mut room = state
        .store
        .get(&session.room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;

    if session.player_id != room.host_id {
        return Err(GameError::NotHost {
            action: "start the game",
        });
    }
    let have = room.player_count();
    if have < crate::room::model::MIN_PLAYERS {
        return Err(GameError::NotEnoughPlayers { have });
    }
    if !room.players.values().all(|p| p.is_ready) {
        return Err(GameError::PlayersNotReady);
    }

    if let Some(category_ids) = category_ids {
        room.settings.category_ids = category_ids;
    }
    if let Some(overrides) = settings {
        room.settings.detective_enabled = overrides.detective_enabled;
        room.settings.joker_enabled = overrides.joker_enabled;
        room.settings.voting_time = overrides.voting_time;
        room.settings.discussion_timer_enabled = overrides.discussion_timer_enabled;
        room.settings.discussion_time = overrides.discussion_time;
    }
    room.settings.validate()?;
    state.store.save(&room).await?;

    let language = language.unwrap_or(state.config.catalog.default_language.as_str());
    let room = state.engine.start_game(room, language).await?;

    metrics::increment_games_started();
    metrics::increment_phase_transition("role_reveal");
    info!(
        room_id = %room.id,
        round = room.round_number,
        detective = room.settings.detective_enabled,
        joker = room.settings.joker_enabled,
        "game started"
    );

    broadcast_room_state(&state.sessions, &room);
    publish_phase_change(state, &room).await;

    schedule_transition(
        Arc::clone(state),
        room.id.clone(),
        PendingTransition::RevealToPlaying,
        role_reveal_duration(&state.config.timings),
    );
    Ok(())
}

/// Registers a request to start voting; moves to `Voting` on majority.
pub async fn request_vote(state: &SharedState, conn: ConnectionId) -> Result<(), GameError> {
    let session = require_session(state, conn)?;
    let room = state
        .store
        .get(&session.room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;

    let (room, started) = state.engine.request_voting(room, &session.player_id).await?;

    broadcast_room_state(&state.sessions, &room);

    if started {
        metrics::increment_phase_transition("voting");
        publish_phase_change(state, &room).await;
        schedule_transition(
            Arc::clone(state),
            room.id.clone(),
            PendingTransition::VotingToResults,
            voting_duration(&room.settings),
        );
    }
    Ok(())
}

/// Records a vote; computes results immediately once everyone has voted.
pub async fn vote(
    state: &SharedState,
    conn: ConnectionId,
    voted_for_id: &str,
) -> Result<(), GameError> {
    if voted_for_id.is_empty() {
        return Err(GameError::Validation(
            "room_id and voted_for_id required".to_string(),
        ));
    }
    let session = require_session(state, conn)?;
    let room = state
        .store
        .get(&session.room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;

    let (room, all_voted) = state
        .engine
        .submit_vote(room, &session.player_id, voted_for_id)
        .await?;

    let votes_submitted = room
        .game_state
        .as_ref()
        .map_or(0, |s| s.votes_submitted);
    state.sessions.broadcast_room(
        &room.id,
        &ServerEvent::VoteUpdate {
            votes_submitted,
            total_players: room.player_count(),
        },
    );

    if all_voted {
        // The voting timer will find the phase moved on and no-op.
        let room = state.engine.calculate_results(room).await?;
        metrics::increment_phase_transition("results");
        broadcast_room_state(&state.sessions, &room);
        publish_phase_change(state, &room).await;
    }
    Ok(())
}

/// Opaque passthrough broadcast to the sender's room.
pub async fn game_event(
    state: &SharedState,
    conn: ConnectionId,
    room_id: &str,
    event_type: &str,
    payload: Value,
) -> Result<(), GameError> {
    if event_type.is_empty() {
        return Err(GameError::Validation(
            "room_id and event_type required".to_string(),
        ));
    }
    let session = require_session(state, conn)?;
    if !session.room_id.eq_ignore_ascii_case(room_id) {
        return Err(GameError::Validation("not in this room".to_string()));
    }

    let event = ServerEvent::GameEvent {
        event_type: event_type.to_string(),
        player_id: Some(session.player_id.clone()),
        payload: payload.clone(),
    };
    state.sessions.broadcast_room(&session.room_id, &event);

    publish(
        state,
        DomainEvent::GameEvent {
            room_id: session.room_id.clone(),
            player_id: Some(session.player_id.clone()),
            event_type: event_type.to_string(),
            payload,
        },
    )
    .await;

    info!(
        room_id = %session.room_id,
        event_type,
        player_id = %session.player_id,
        "game event broadcast"
    );
    Ok(())
}
