//! Thin REST shell over the Room Store.
//!
//! Plain request/response wrappers: room creation, public listing, room
//! lookup, and pre-socket join validation. All game mutation happens over
//! the socket; these endpoints never touch the state machine.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::GameError;
use crate::observability::metrics;
use crate::room::model::{MAX_USERNAME_LEN, Player, RoomPhase, RoomSettings};
use crate::room::store::{PublicRoom, RoomStore};
use crate::server::SharedState;
use crate::view::RoomView;

// ============================================================================
// Request/response shells
// ============================================================================

/// `POST /rooms` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    /// Host display name.
    pub username: String,
    /// Word categories for the room.
    pub category_ids: Vec<i64>,
    /// Room capacity.
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Whether the room is publicly listed.
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Join password (required iff private).
    #[serde(default)]
    pub password: Option<String>,
}

const fn default_max_players() -> usize {
    8
}

const fn default_true() -> bool {
    true
}

/// `POST /rooms` response.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    /// New room id.
    pub id: String,
    /// Host player id.
    pub host_id: String,
    /// Current phase.
    pub phase: RoomPhase,
    /// Current player count.
    pub player_count: usize,
    /// Capacity.
    pub max_players: usize,
    /// Whether the room is listed.
    pub is_public: bool,
    /// Whether a password is required.
    pub has_password: bool,
}

/// `POST /rooms/{room_id}/join` body.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinCheckRequest {
    /// Prospective display name.
    pub username: String,
    /// Password attempt for private rooms.
    #[serde(default)]
    pub password: Option<String>,
}

/// Client-facing error body with the matching HTTP status.
pub struct ApiError(GameError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GameError::RoomNotFound | GameError::PlayerNotFound => StatusCode::NOT_FOUND,
            GameError::InvalidPassword | GameError::NotHost { .. } => StatusCode::FORBIDDEN,
            GameError::Store(_) | GameError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = match &self.0 {
            GameError::Store(_) | GameError::Catalog(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": body }))).into_response()
    }
}

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        Self(e)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Creates a room with the requester as its ready host.
pub async fn create_room(
    State(state): State<SharedState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomSummary>, ApiError> {
    let username = request.username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(GameError::Validation(
            "username must be 1-20 characters".to_string(),
        )
        .into());
    }

    let settings = RoomSettings {
        max_players: request.max_players,
        category_ids: request.category_ids,
        is_public: request.is_public,
        password: request.password,
        ..RoomSettings::default()
    };
    settings.validate()?;

    let host = Player::host(username);
    let room = state
        .store
        .create(settings, host)
        .await
        .map_err(GameError::from)?;

    metrics::increment_rooms_created();
    info!(room_id = %room.id, host = username, "room created");

    Ok(Json(RoomSummary {
        id: room.id.clone(),
        host_id: room.host_id.clone(),
        phase: room.phase,
        player_count: room.player_count(),
        max_players: room.settings.max_players,
        is_public: room.settings.is_public,
        has_password: room.settings.password.is_some(),
    }))
}

/// Lists public rooms still in the lobby, busiest first.
pub async fn list_public_rooms(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PublicRoom>>, ApiError> {
    let rooms = state
        .store
        .list_public_rooms()
        .await
        .map_err(GameError::from)?;
    Ok(Json(rooms))
}

/// Fetches one room as a viewerless (fully redacted) projection.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomView>, ApiError> {
    let room = state
        .store
        .get(&room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;
    Ok(Json(RoomView::public(&room)))
}

/// Validates a join before the client opens its socket: password,
/// capacity, and phase checks against the current room state.
pub async fn validate_join(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Json(request): Json<JoinCheckRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let room = state
        .store
        .get(&room_id)
        .await
        .map_err(|_| GameError::RoomNotFound)?;

    // A username already present means reconnection; those checks are
    // skipped on the socket path too.
    if room.player_by_username(request.username.trim()).is_none() {
        if let Some(expected) = &room.settings.password {
            if request.password.as_deref() != Some(expected.as_str()) {
                return Err(GameError::InvalidPassword.into());
            }
        }
        if room.is_full() {
            return Err(GameError::RoomFull.into());
        }
        if room.phase != RoomPhase::Waiting {
            return Err(GameError::WrongPhase {
                expected: RoomPhase::Waiting,
                actual: room.phase,
            }
            .into());
        }
    }

    Ok(Json(json!({
        "room_id": room.id,
        "message": "ready to join via socket",
    })))
}
