//! Phase scheduler: deferred, guarded phase transitions.
//!
//! A timer is registered after every phase-entering transition. When it
//! fires it re-reads the room and acts only if the room is still in the
//! phase it was scheduled from — the sole cancellation mechanism; there
//! is no cancel token per timer. A player-triggered transition that beats
//! the timer simply leaves it to no-op. Valid firings chain the next
//! timer so a round auto-advances with no further player input.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::config::schema::TimingsSection;
use crate::error::GameError;
use crate::handlers::{broadcast_room_state, publish_phase_change};
use crate::observability::metrics;
use crate::room::model::{Room, RoomPhase, RoomSettings};
use crate::room::store::RoomStore;
use crate::server::SharedState;

/// A transition scheduled to fire after a phase's duration elapses.
///
/// Each variant names the phase it was scheduled *from*; the target is
/// implied by the round order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTransition {
    /// `RoleReveal → Playing` once the reveal duration elapses.
    RevealToPlaying,
    /// `Playing → Voting` when discussion time runs out.
    PlayingToVoting,
    /// `Voting → Results` when voting time runs out.
    VotingToResults,
}

impl PendingTransition {
    /// The phase this timer was scheduled from; firing is valid only
    /// while the room is still in it.
    #[must_use]
    pub const fn scheduled_from(self) -> RoomPhase {
        match self {
            Self::RevealToPlaying => RoomPhase::RoleReveal,
            Self::PlayingToVoting => RoomPhase::Playing,
            Self::VotingToResults => RoomPhase::Voting,
        }
    }
}

/// Role-reveal duration for this instance.
#[must_use]
pub const fn role_reveal_duration(timings: &TimingsSection) -> Duration {
    Duration::from_secs(timings.role_reveal_secs)
}

/// Discussion duration: the room's override when its timer is enabled,
/// the instance default otherwise.
#[must_use]
pub const fn discussion_duration(settings: &RoomSettings, timings: &TimingsSection) -> Duration {
    if settings.discussion_timer_enabled {
        Duration::from_secs(settings.discussion_time)
    } else {
        Duration::from_secs(timings.discussion_secs)
    }
}

/// Voting duration for a room.
#[must_use]
pub const fn voting_duration(settings: &RoomSettings) -> Duration {
    Duration::from_secs(settings.voting_time)
}

/// Registers a deferred transition for `room_id` after `delay`.
pub fn schedule_transition(
    state: SharedState,
    room_id: String,
    transition: PendingTransition,
    delay: Duration,
) {
    debug!(room_id = %room_id, ?transition, ?delay, "transition scheduled");
    tokio::spawn(async move {
        fire_after(state, room_id, transition, delay).await;
    });
}

/// Sleeps, re-reads, guards, and fires.
async fn fire_after(
    state: SharedState,
    room_id: String,
    transition: PendingTransition,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;

    let room = match state.store.get(&room_id).await {
        Ok(room) => room,
        Err(_) => {
            debug!(room_id = %room_id, "room gone before timer fired");
            return;
        }
    };

    if room.phase != transition.scheduled_from() {
        debug!(
            room_id = %room_id,
            phase = %room.phase,
            ?transition,
            "timer stale; phase already advanced"
        );
        return;
    }

    let result = match transition {
        PendingTransition::RevealToPlaying => advance_to_playing(&state, room).await,
        PendingTransition::PlayingToVoting => advance_to_voting(&state, room).await,
        PendingTransition::VotingToResults => finish_voting(&state, room).await,
    };
    if let Err(e) = result {
        error!(room_id = %room_id, error = %e, "scheduled transition failed");
    }
}

async fn advance_to_playing(state: &SharedState, room: Room) -> Result<(), GameError> {
    let room = state.engine.transition_to_playing(room).await?;
    metrics::increment_phase_transition("playing");
    broadcast_room_state(&state.sessions, &room);
    publish_phase_change(state, &room).await;

    let delay = discussion_duration(&room.settings, &state.config.timings);
    schedule_transition(
        Arc::clone(state),
        room.id.clone(),
        PendingTransition::PlayingToVoting,
        delay,
    );
    Ok(())
}

async fn advance_to_voting(state: &SharedState, room: Room) -> Result<(), GameError> {
    let room = state.engine.transition_to_voting(room).await?;
    metrics::increment_phase_transition("voting");
    broadcast_room_state(&state.sessions, &room);
    publish_phase_change(state, &room).await;

    let delay = voting_duration(&room.settings);
    schedule_transition(
        Arc::clone(state),
        room.id.clone(),
        PendingTransition::VotingToResults,
        delay,
    );
    Ok(())
}

async fn finish_voting(state: &SharedState, room: Room) -> Result<(), GameError> {
    let room = state.engine.calculate_results(room).await?;
    metrics::increment_phase_transition("results");
    broadcast_room_state(&state.sessions, &room);
    publish_phase_change(state, &room).await;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::config::AppConfig;
    use crate::relay::InProcessRelay;
    use crate::room::model::{Player, RoomSettings};
    use crate::room::store::{MemoryRoomStore, RoomStore};
    use crate::server::AppState;

    fn settings() -> RoomSettings {
        RoomSettings {
            category_ids: vec![1],
            ..RoomSettings::default()
        }
    }

    async fn state_with_room(player_names: &[&str]) -> (SharedState, Room) {
        let store = Arc::new(MemoryRoomStore::default());
        let catalog = Arc::new(StaticCatalog::from_values(1, "es", &["gato", "perro"]));
        let relay = Arc::new(InProcessRelay::default());
        let state = AppState::new(AppConfig::default(), store.clone(), catalog, relay);

        let mut names = player_names.iter();
        let room = store
            .create(settings(), Player::host(*names.next().unwrap()))
            .await
            .unwrap();
        for name in names {
            store
                .add_player(&room.id, Player::guest(*name))
                .await
                .unwrap();
        }
        let room = store.get(&room.id).await.unwrap();
        (state, room)
    }

    #[test]
    fn transitions_know_their_source_phase() {
        assert_eq!(
            PendingTransition::RevealToPlaying.scheduled_from(),
            RoomPhase::RoleReveal
        );
        assert_eq!(
            PendingTransition::PlayingToVoting.scheduled_from(),
            RoomPhase::Playing
        );
        assert_eq!(
            PendingTransition::VotingToResults.scheduled_from(),
            RoomPhase::Voting
        );
    }

    #[test]
    fn discussion_duration_respects_room_override() {
        let timings = TimingsSection::default();
        let mut s = settings();
        assert_eq!(
            discussion_duration(&s, &timings),
            Duration::from_secs(timings.discussion_secs)
        );

        s.discussion_timer_enabled = true;
        s.discussion_time = 42;
        assert_eq!(discussion_duration(&s, &timings), Duration::from_secs(42));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_advances_reveal_to_playing_and_chains() {
        let (state, room) = state_with_room(&["ana", "bo", "cy"]).await;
        let room = state.engine.start_game(room, "es").await.unwrap();
        assert_eq!(room.phase, RoomPhase::RoleReveal);

        schedule_transition(
            Arc::clone(&state),
            room.id.clone(),
            PendingTransition::RevealToPlaying,
            role_reveal_duration(&state.config.timings),
        );

        tokio::time::sleep(Duration::from_secs(11)).await;
        let room = state.store.get(&room.id).await.unwrap();
        assert_eq!(room.phase, RoomPhase::Playing);

        // The chained discussion timer eventually forces voting.
        tokio::time::sleep(Duration::from_secs(301)).await;
        let room = state.store.get(&room.id).await.unwrap();
        assert_eq!(room.phase, RoomPhase::Voting);

        // And the chained voting timer produces results.
        tokio::time::sleep(Duration::from_secs(61)).await;
        let room = state.store.get(&room.id).await.unwrap();
        assert_eq!(room.phase, RoomPhase::Results);
        assert!(room.game_state.unwrap().result.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_performs_no_mutation() {
        let (state, room) = state_with_room(&["ana", "bo", "cy"]).await;
        let room = state.engine.start_game(room, "es").await.unwrap();

        schedule_transition(
            Arc::clone(&state),
            room.id.clone(),
            PendingTransition::RevealToPlaying,
            Duration::from_secs(10),
        );

        // A faster path (majority vote request) already moved the room on.
        let mut room = state.store.get(&room.id).await.unwrap();
        room.phase = RoomPhase::Voting;
        state.store.save(&room).await.unwrap();
        let before = state.store.get(&room.id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;
        let after = state.store.get(&room.id).await.unwrap();
        assert_eq!(after.phase, RoomPhase::Voting);
        assert_eq!(after, before);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_for_deleted_room_is_silent() {
        let (state, room) = state_with_room(&["ana", "bo", "cy"]).await;
        schedule_transition(
            Arc::clone(&state),
            room.id.clone(),
            PendingTransition::RevealToPlaying,
            Duration::from_secs(10),
        );
        state.store.delete(&room.id).await.unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(state.store.get(&room.id).await.is_err());
    }
}
