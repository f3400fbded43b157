//! Configuration schema.
//!
//! Every field carries a serde default so a partial (or absent) YAML file
//! yields a runnable configuration. Validation lives in
//! [`super::loader`].

use serde::{Deserialize, Serialize};

/// Top-level configuration for one `wordspy` instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Network settings.
    #[serde(default)]
    pub server: ServerSection,
    /// Room store settings.
    #[serde(default)]
    pub rooms: RoomsSection,
    /// Phase durations.
    #[serde(default)]
    pub timings: TimingsSection,
    /// Relay listener supervision.
    #[serde(default)]
    pub relay: RelaySection,
    /// Word catalog client settings.
    #[serde(default)]
    pub catalog: CatalogSection,
}

/// Network settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Address the HTTP/WebSocket server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port for the Prometheus exporter; disabled when absent.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Room store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomsSection {
    /// Record time-to-live in seconds; every successful write refreshes
    /// it.
    #[serde(default = "default_room_ttl")]
    pub ttl_secs: u64,
}

/// Phase durations, in seconds.
///
/// Discussion and voting durations can be overridden per room by its
/// settings; these are the instance-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingsSection {
    /// How long roles stay on screen before discussion opens.
    #[serde(default = "default_role_reveal")]
    pub role_reveal_secs: u64,
    /// Discussion duration when the room does not override it.
    #[serde(default = "default_discussion")]
    pub discussion_secs: u64,
}

/// Relay listener supervision settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// First restart delay after a listener failure, in milliseconds.
    #[serde(default = "default_restart_base_ms")]
    pub restart_base_ms: u64,
    /// Ceiling for the restart delay, in milliseconds.
    #[serde(default = "default_restart_cap_ms")]
    pub restart_cap_ms: u64,
}

/// Word catalog client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSection {
    /// Base URL of the word catalog service. When absent, the built-in
    /// demo catalog serves words.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Candidates drawn per word selection.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Language used when `start_game` does not name one.
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

const fn default_room_ttl() -> u64 {
    86_400
}

const fn default_role_reveal() -> u64 {
    10
}

const fn default_discussion() -> u64 {
    300
}

const fn default_restart_base_ms() -> u64 {
    1_000
}

const fn default_restart_cap_ms() -> u64 {
    30_000
}

const fn default_sample_size() -> usize {
    5
}

fn default_language() -> String {
    "es".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_port: None,
        }
    }
}

impl Default for RoomsSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_room_ttl(),
        }
    }
}

impl Default for TimingsSection {
    fn default() -> Self {
        Self {
            role_reveal_secs: default_role_reveal(),
            discussion_secs: default_discussion(),
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            restart_base_ms: default_restart_base_ms(),
            restart_cap_ms: default_restart_cap_ms(),
        }
    }
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            base_url: None,
            sample_size: default_sample_size(),
            default_language: default_language(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
