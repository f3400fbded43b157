//! Presentation filter: per-viewer room projections.
//!
//! Secret state (roles, words, the impostor's identity) is enforced here,
//! at the boundary, rather than trusted to clients. Every room payload
//! that leaves the server goes through [`RoomView::for_viewer`] (or
//! [`RoomView::public`] when there is no viewer, e.g. the REST lookup).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::room::model::{GameResult, GameState, Player, PlayerRole, Room, RoomPhase};

/// A player as one particular viewer is allowed to see them.
///
/// `role` and `word` survive only on the viewer's own entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    /// Player id.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Lobby readiness flag.
    pub is_ready: bool,
    /// Secret role; `None` unless this entry is the viewer.
    pub role: Option<PlayerRole>,
    /// Clue word; `None` unless this entry is the viewer.
    pub word: Option<String>,
    /// Whether this player has a recorded vote.
    pub has_voted: bool,
    /// Whether this player created the room.
    pub is_host: bool,
    /// Whether this player asked to start voting.
    pub wants_to_vote: bool,
}

impl PlayerView {
    fn redacted(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            username: player.username.clone(),
            is_ready: player.is_ready,
            role: None,
            word: None,
            has_voted: player.vote.is_some(),
            is_host: player.is_host,
            wants_to_vote: player.wants_to_vote,
        }
    }

    fn unredacted(player: &Player) -> Self {
        Self {
            role: player.role,
            word: player.word.clone(),
            ..Self::redacted(player)
        }
    }
}

/// Game state as a viewer is allowed to see it.
///
/// `impostor_id` and the shared `word` appear only once the phase is
/// `Results`; before that, each player's own `word` field is the only
/// sanctioned channel for the secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStateView {
    /// The secret word; revealed at results time.
    pub word: Option<String>,
    /// The impostor; revealed at results time.
    pub impostor_id: Option<String>,
    /// Detective id, when dealt.
    pub detective_id: Option<String>,
    /// Joker id, when dealt.
    pub joker_id: Option<String>,
    /// Player who opens the discussion.
    pub starting_player_id: String,
    /// When the current phase was entered.
    pub phase_start_time: DateTime<Utc>,
    /// Count of submitted votes.
    pub votes_submitted: usize,
    /// Round outcome, once decided.
    pub result: Option<GameResult>,
    /// The most-voted player, once decided.
    pub most_voted_id: Option<String>,
}

impl GameStateView {
    fn project(state: &GameState, phase: RoomPhase) -> Self {
        let reveal = phase == RoomPhase::Results;
        Self {
            word: reveal.then(|| state.word.clone()),
            impostor_id: reveal.then(|| state.impostor_id.clone()),
            detective_id: state.detective_id.clone(),
            joker_id: state.joker_id.clone(),
            starting_player_id: state.starting_player_id.clone(),
            phase_start_time: state.phase_start_time,
            votes_submitted: state.votes_submitted,
            result: state.result,
            most_voted_id: state.most_voted_id.clone(),
        }
    }
}

/// Room settings as shown to clients; the password never leaves the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsView {
    /// Room capacity.
    pub max_players: usize,
    /// Word categories in play.
    pub category_ids: Vec<i64>,
    /// Whether the room is publicly listed.
    pub is_public: bool,
    /// Whether a password is required to join.
    pub has_password: bool,
    /// Whether a detective is dealt.
    pub detective_enabled: bool,
    /// Whether a joker is dealt.
    pub joker_enabled: bool,
    /// Voting phase duration in seconds.
    pub voting_time: u64,
    /// Whether the discussion timer override is active.
    pub discussion_timer_enabled: bool,
    /// Discussion duration override in seconds.
    pub discussion_time: u64,
}

/// A room as one particular viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomView {
    /// Room id.
    pub id: String,
    /// Player id of the host.
    pub host_id: String,
    /// Redacted settings.
    pub settings: SettingsView,
    /// Current phase.
    pub phase: RoomPhase,
    /// Players, each redacted relative to the viewer.
    pub players: HashMap<String, PlayerView>,
    /// Redacted game state, when a round is active.
    pub game_state: Option<GameStateView>,
    /// Rounds started in this room.
    pub round_number: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RoomView {
    /// Projects `room` for `viewer_id`: every other player's `role` and
    /// `word` are nulled, and `game_state` hides the impostor and the
    /// word until the `Results` phase.
    #[must_use]
    pub fn for_viewer(room: &Room, viewer_id: &str) -> Self {
        Self::project(room, Some(viewer_id))
    }

    /// Projects `room` with no viewer: everything secret is nulled.
    #[must_use]
    pub fn public(room: &Room) -> Self {
        Self::project(room, None)
    }

    fn project(room: &Room, viewer_id: Option<&str>) -> Self {
        let players = room
            .players
            .iter()
            .map(|(id, player)| {
                let view = if viewer_id == Some(id.as_str()) {
                    PlayerView::unredacted(player)
                } else {
                    PlayerView::redacted(player)
                };
                (id.clone(), view)
            })
            .collect();

        Self {
            id: room.id.clone(),
            host_id: room.host_id.clone(),
            settings: SettingsView {
                max_players: room.settings.max_players,
                category_ids: room.settings.category_ids.clone(),
                is_public: room.settings.is_public,
                has_password: room.settings.password.is_some(),
                detective_enabled: room.settings.detective_enabled,
                joker_enabled: room.settings.joker_enabled,
                voting_time: room.settings.voting_time,
                discussion_timer_enabled: room.settings.discussion_timer_enabled,
                discussion_time: room.settings.discussion_time,
            },
            phase: room.phase,
            players,
            game_state: room
                .game_state
                .as_ref()
                .map(|state| GameStateView::project(state, room.phase)),
            round_number: room.round_number,
            created_at: room.created_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
