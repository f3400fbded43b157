//! Error types for `WordSpy`.
//!
//! Domain-specific error enums aggregated into a top-level error with
//! process exit-code mapping. Handler-level [`GameError`]s are non-fatal:
//! they surface to the triggering client as an `error` event and never
//! take down a connection, a room, or the process.

use std::path::PathBuf;
use thiserror::Error;

use crate::room::model::RoomPhase;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `wordspy` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, bind failure)
    pub const IO_ERROR: i32 = 3;

    /// Room store error
    pub const STORE_ERROR: i32 = 4;

    /// Event relay error
    pub const RELAY_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `WordSpy` operations.
///
/// Aggregates all domain-specific errors and provides a unified
/// interface for error handling and exit-code mapping.
#[derive(Debug, Error)]
pub enum WordSpyError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Room store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event relay error
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Game protocol error
    #[error(transparent)]
    Game(#[from] GameError),

    /// Word catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WordSpyError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Store(_) => ExitCode::STORE_ERROR,
            Self::Relay(_) => ExitCode::RELAY_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Game(_) | Self::Catalog(_) | Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    Parse {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': {message}")]
    Invalid {
        /// Name of the field with the invalid value
        field: &'static str,
        /// Description of what was expected
        message: String,
    },
}

// ============================================================================
// Room Store Errors
// ============================================================================

/// Room store errors.
///
/// `NotFound` doubles as the expiry signal: a record past its TTL deadline
/// is reported exactly like a record that never existed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record does not exist (or its TTL expired)
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend failure (I/O, serialization, shared-store connectivity)
    #[error("store backend error: {0}")]
    Backend(String),
}

// ============================================================================
// Game Errors
// ============================================================================

/// Game protocol errors surfaced to clients as `error` events.
///
/// Covers the full taxonomy: validation, not-found, authorization,
/// precondition, and collaborator failures. None of these are fatal;
/// the room state is unchanged when one is returned.
#[derive(Debug, Error)]
pub enum GameError {
    /// Missing or malformed fields in a client event
    #[error("{0}")]
    Validation(String),

    /// Unknown room id
    #[error("room not found")]
    RoomNotFound,

    /// Player id not present in the room
    #[error("player not in room")]
    PlayerNotFound,

    /// Non-host attempted a host-only action
    #[error("only the host can {action}")]
    NotHost {
        /// The attempted action, e.g. `"start the game"`
        action: &'static str,
    },

    /// Action attempted in the wrong phase
    #[error("action requires {expected} phase (room is in {actual})")]
    WrongPhase {
        /// Phase the action requires
        expected: RoomPhase,
        /// Phase the room is actually in
        actual: RoomPhase,
    },

    /// Room is at capacity
    #[error("room is full")]
    RoomFull,

    /// Fewer than the minimum players for a round
    #[error("need at least 3 players to start (have {have})")]
    NotEnoughPlayers {
        /// Current player count
        have: usize,
    },

    /// At least one player has not readied up
    #[error("all players must be ready")]
    PlayersNotReady,

    /// A player attempted to vote for themselves
    #[error("cannot vote for yourself")]
    SelfVote,

    /// Username already held by another player in the room
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    /// Wrong password for a private room
    #[error("invalid password")]
    InvalidPassword,

    /// The catalog produced no candidate words for the configured categories
    #[error("no words available for the selected categories")]
    NoWordAvailable,

    /// Room store failure while handling the action
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Word catalog failure while handling the action
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// ============================================================================
// Relay Errors
// ============================================================================

/// Event relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Publishing a domain event failed
    #[error("relay publish failed: {0}")]
    Publish(String),

    /// The subscription stream ended or was reset
    #[error("relay subscription closed: {0}")]
    Closed(String),
}

// ============================================================================
// Catalog Errors
// ============================================================================

/// Word catalog client errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog service could not be reached
    #[error("catalog request failed: {0}")]
    Request(String),

    /// The catalog response could not be decoded
    #[error("catalog response malformed: {0}")]
    Decode(String),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `WordSpy` operations.
pub type Result<T> = std::result::Result<T, WordSpyError>;

// ============================================================================
// Tests
// ============================================================================
