//! Room, player, and game-state domain types.
//!
//! These are the records the Room Store persists. Wire-level projections
//! live in [`crate::view`] and [`crate::protocol`]; nothing here encodes
//! per-viewer redaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;

/// Minimum players required to start a round.
pub const MIN_PLAYERS: usize = 3;

/// Maximum length of a username in characters.
pub const MAX_USERNAME_LEN: usize = 20;

/// Length of generated room identifiers.
pub const ROOM_ID_LEN: usize = 10;

// ============================================================================
// Enums
// ============================================================================

/// Game phases, in round order.
///
/// A round loops `Waiting → RoleReveal → Playing → Voting → Results →
/// Waiting`. Transitions happen only through the functions in
/// [`crate::game`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Lobby: players join, ready up, host configures settings.
    #[default]
    Waiting,
    /// Secret roles and the word have been dealt; players read them.
    RoleReveal,
    /// Open discussion.
    Playing,
    /// Players vote on who the impostor is.
    Voting,
    /// Votes tallied, winner revealed.
    Results,
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::RoleReveal => "role_reveal",
            Self::Playing => "playing",
            Self::Voting => "voting",
            Self::Results => "results",
        };
        write!(f, "{s}")
    }
}

/// Secret role dealt to a player at the start of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// Knows the word; must find the impostor.
    Civilian,
    /// Does not know the word; must blend in.
    Impostor,
    /// Optional variant role; same information access as civilian.
    Detective,
    /// Optional variant role; same information access as civilian.
    Joker,
}

/// Outcome of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    /// The most-voted player was the impostor.
    CiviliansWin,
    /// The impostor escaped the vote (or nobody voted).
    ImpostorWins,
}

// ============================================================================
// Player
// ============================================================================

/// A participant in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Opaque server-generated id.
    pub id: String,
    /// Display name; also the reconnection key within a room.
    pub username: String,
    /// Verified external user id; `None` for guests.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Lobby readiness flag.
    #[serde(default)]
    pub is_ready: bool,
    /// Secret role; `None` outside an active round.
    #[serde(default)]
    pub role: Option<PlayerRole>,
    /// The clue word; `None` for the impostor and outside rounds.
    #[serde(default)]
    pub word: Option<String>,
    /// Id of the player this player voted for.
    #[serde(default)]
    pub vote: Option<String>,
    /// Whether this player created the room.
    #[serde(default)]
    pub is_host: bool,
    /// Whether this player asked to move to the voting phase.
    #[serde(default)]
    pub wants_to_vote: bool,
}

impl Player {
    /// Creates a guest player with a fresh id.
    #[must_use]
    pub fn guest(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            user_id: None,
            is_ready: false,
            role: None,
            word: None,
            vote: None,
            is_host: false,
            wants_to_vote: false,
        }
    }

    /// Creates the host player. Hosts start ready.
    #[must_use]
    pub fn host(username: impl Into<String>) -> Self {
        Self {
            is_host: true,
            is_ready: true,
            ..Self::guest(username)
        }
    }

    /// Attaches a verified external user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Clears all per-round fields (role, word, vote, flags).
    pub fn reset_round_state(&mut self) {
        self.role = None;
        self.word = None;
        self.vote = None;
        self.is_ready = false;
        self.wants_to_vote = false;
    }
}

/// Explicit update request for the lobby-mutable player fields.
///
/// Replaces open-ended field patching: only the fields listed here can be
/// changed through [`crate::room::store::RoomStore::update_player`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerUpdate {
    /// New display name, already validated by the caller.
    pub username: Option<String>,
    /// New readiness flag.
    pub is_ready: Option<bool>,
}

impl PlayerUpdate {
    /// Applies the populated fields to `player`.
    pub fn apply(&self, player: &mut Player) {
        if let Some(username) = &self.username {
            player.username = username.clone();
        }
        if let Some(is_ready) = self.is_ready {
            player.is_ready = is_ready;
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Room configuration, set at creation and host-mutable until a round
/// starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Room capacity, 3..=12.
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Word categories rounds draw from; never empty.
    pub category_ids: Vec<i64>,
    /// Whether the room appears in the public listing.
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Join password; required iff the room is private.
    #[serde(default)]
    pub password: Option<String>,
    /// Deal a detective this round.
    #[serde(default)]
    pub detective_enabled: bool,
    /// Deal a joker this round.
    #[serde(default)]
    pub joker_enabled: bool,
    /// Voting phase duration in seconds.
    #[serde(default = "default_voting_time")]
    pub voting_time: u64,
    /// Whether `discussion_time` overrides the default discussion duration.
    #[serde(default)]
    pub discussion_timer_enabled: bool,
    /// Discussion phase duration in seconds (used when the timer is enabled).
    #[serde(default = "default_discussion_time")]
    pub discussion_time: u64,
}

const fn default_max_players() -> usize {
    8
}

const fn default_true() -> bool {
    true
}

const fn default_voting_time() -> u64 {
    60
}

const fn default_discussion_time() -> u64 {
    300
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            category_ids: Vec::new(),
            is_public: true,
            password: None,
            detective_enabled: false,
            joker_enabled: false,
            voting_time: default_voting_time(),
            discussion_timer_enabled: false,
            discussion_time: default_discussion_time(),
        }
    }
}

impl RoomSettings {
    /// Validates capacity bounds, category presence, and the
    /// public/password pairing (password required iff private).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] describing the first violation.
    pub fn validate(&self) -> Result<(), GameError> {
        if !(MIN_PLAYERS..=12).contains(&self.max_players) {
            return Err(GameError::Validation(
                "max_players must be between 3 and 12".to_string(),
            ));
        }
        if self.category_ids.is_empty() {
            return Err(GameError::Validation(
                "at least one category is required".to_string(),
            ));
        }
        match (self.is_public, &self.password) {
            (false, None) => Err(GameError::Validation(
                "private rooms must have a password".to_string(),
            )),
            (true, Some(_)) => Err(GameError::Validation(
                "public rooms cannot have a password".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Game state
// ============================================================================

/// Per-round state, created at start-of-round and discarded on
/// return-to-lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// The secret word for this round.
    pub word: String,
    /// Id of the one impostor.
    pub impostor_id: String,
    /// Id of the detective, when dealt.
    #[serde(default)]
    pub detective_id: Option<String>,
    /// Id of the joker, when dealt.
    #[serde(default)]
    pub joker_id: Option<String>,
    /// Player who opens the discussion.
    pub starting_player_id: String,
    /// When the current phase was entered.
    pub phase_start_time: DateTime<Utc>,
    /// Count of players with a recorded vote (derived, recomputable).
    #[serde(default)]
    pub votes_submitted: usize,
    /// Round outcome, set by result calculation.
    #[serde(default)]
    pub result: Option<GameResult>,
    /// The most-voted player, `None` when nobody voted.
    #[serde(default)]
    pub most_voted_id: Option<String>,
}

impl GameState {
    /// Creates the state for a freshly dealt round.
    #[must_use]
    pub fn new(
        word: String,
        impostor_id: String,
        detective_id: Option<String>,
        joker_id: Option<String>,
        starting_player_id: String,
    ) -> Self {
        Self {
            word,
            impostor_id,
            detective_id,
            joker_id,
            starting_player_id,
            phase_start_time: Utc::now(),
            votes_submitted: 0,
            result: None,
            most_voted_id: None,
        }
    }
}

// ============================================================================
// Room
// ============================================================================

/// A shared game session.
///
/// Rooms never persist empty: removing the last player (or the host)
/// deletes the record instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Opaque random id; lookup is case-insensitive.
    pub id: String,
    /// Player id of the creator.
    pub host_id: String,
    /// Room configuration.
    pub settings: RoomSettings,
    /// Current phase.
    #[serde(default)]
    pub phase: RoomPhase,
    /// All participants, keyed by player id.
    pub players: HashMap<String, Player>,
    /// Per-round state; `None` in the lobby.
    #[serde(default)]
    pub game_state: Option<GameState>,
    /// Rounds started in this room, monotonic.
    #[serde(default)]
    pub round_number: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Word of the previous round, excluded from the next draw.
    #[serde(default)]
    pub last_word: Option<String>,
    /// Starting player of the previous round, biased against repeating.
    #[serde(default)]
    pub last_starting_player_id: Option<String>,
}

impl Room {
    /// Creates a room in the lobby phase with `host` as its only player.
    #[must_use]
    pub fn new(id: String, host: Player, settings: RoomSettings) -> Self {
        let host_id = host.id.clone();
        let mut players = HashMap::new();
        players.insert(host_id.clone(), host);
        Self {
            id,
            host_id,
            settings,
            phase: RoomPhase::Waiting,
            players,
            game_state: None,
            round_number: 0,
            created_at: Utc::now(),
            last_word: None,
            last_starting_player_id: None,
        }
    }

    /// Generates a fresh room id (url-safe alphanumeric).
    #[must_use]
    pub fn generate_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ROOM_ID_LEN)
            .map(char::from)
            .collect()
    }

    /// Current player count.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Whether the room is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.settings.max_players
    }

    /// Looks up a player in the room by username (reconnection key).
    #[must_use]
    pub fn player_by_username(&self, username: &str) -> Option<&Player> {
        self.players.values().find(|p| p.username == username)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn public_settings() -> RoomSettings {
        RoomSettings {
            category_ids: vec![1],
            ..RoomSettings::default()
        }
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RoomPhase::RoleReveal).unwrap(),
            "\"role_reveal\""
        );
        assert_eq!(
            serde_json::to_string(&RoomPhase::Waiting).unwrap(),
            "\"waiting\""
        );
        let back: RoomPhase = serde_json::from_str("\"voting\"").unwrap();
        assert_eq!(back, RoomPhase::Voting);
    }

    #[test]
    fn phase_display_matches_wire_form() {
        for phase in [
            RoomPhase::Waiting,
            RoomPhase::RoleReveal,
            RoomPhase::Playing,
            RoomPhase::Voting,
            RoomPhase::Results,
        ] {
            let wire = serde_json::to_string(&phase).unwrap();
            assert_eq!(wire.trim_matches('"'), phase.to_string());
        }
    }

    #[test]
    fn host_starts_ready() {
        let host = Player::host("ana");
        assert!(host.is_host);
        assert!(host.is_ready);
        let guest = Player::guest("bo");
        assert!(!guest.is_host);
        assert!(!guest.is_ready);
    }

    #[test]
    fn reset_round_state_clears_secrets() {
        let mut p = Player::guest("ana");
        p.role = Some(PlayerRole::Impostor);
        p.word = Some("apple".to_string());
        p.vote = Some("x".to_string());
        p.is_ready = true;
        p.wants_to_vote = true;
        p.reset_round_state();
        assert_eq!(p.role, None);
        assert_eq!(p.word, None);
        assert_eq!(p.vote, None);
        assert!(!p.is_ready);
        assert!(!p.wants_to_vote);
    }

    #[test]
    fn player_update_applies_only_set_fields() {
        let mut p = Player::guest("old");
        p.is_ready = true;

        let update = PlayerUpdate {
            username: Some("new".to_string()),
            is_ready: None,
        };
        update.apply(&mut p);
        assert_eq!(p.username, "new");
        assert!(p.is_ready);
    }

    #[test]
    fn settings_validation_bounds() {
        let mut s = public_settings();
        s.max_players = 2;
        assert!(s.validate().is_err());
        s.max_players = 13;
        assert!(s.validate().is_err());
        s.max_players = 3;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn settings_validation_requires_categories() {
        let mut s = public_settings();
        s.category_ids.clear();
        assert!(s.validate().is_err());
    }

    #[test]
    fn settings_password_pairing() {
        let mut s = public_settings();
        s.is_public = false;
        assert!(s.validate().is_err(), "private without password");

        s.password = Some("hunter2".to_string());
        assert!(s.validate().is_ok(), "private with password");

        s.is_public = true;
        assert!(s.validate().is_err(), "public with password");
    }

    #[test]
    fn generated_room_ids_are_distinct() {
        let a = Room::generate_id();
        let b = Room::generate_id();
        assert_eq!(a.len(), ROOM_ID_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn new_room_contains_only_host() {
        let host = Player::host("ana");
        let host_id = host.id.clone();
        let room = Room::new(Room::generate_id(), host, public_settings());
        assert_eq!(room.phase, RoomPhase::Waiting);
        assert_eq!(room.host_id, host_id);
        assert_eq!(room.player_count(), 1);
        assert_eq!(room.round_number, 0);
        assert!(room.game_state.is_none());
    }

    #[test]
    fn room_round_trips_through_json() {
        let host = Player::host("ana");
        let room = Room::new(Room::generate_id(), host, public_settings());
        let json = serde_json::to_string(&room).unwrap();
        let back: Room = serde_json::from_str(&json).unwrap();
        assert_eq!(room, back);
    }
}
