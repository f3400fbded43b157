//! Configuration loading and validation.

use std::path::Path;

use tracing::info;

use super::schema::AppConfig;
use crate::error::ConfigError;

/// Loads configuration from an optional YAML file and validates it.
///
/// With no path, the built-in defaults are used.
///
/// # Errors
///
/// Returns [`ConfigError`] on unreadable files, parse failures, or
/// invalid values.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        None => AppConfig::default(),
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let config: AppConfig =
                serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            info!(path = %path.display(), "configuration loaded");
            config
        }
    };
    validate(&config)?;
    Ok(config)
}

/// Checks value-level constraints the schema cannot express.
fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.rooms.ttl_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "rooms.ttl_secs",
            message: "must be positive".to_string(),
        });
    }
    if config.timings.role_reveal_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "timings.role_reveal_secs",
            message: "must be positive".to_string(),
        });
    }
    if config.timings.discussion_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "timings.discussion_secs",
            message: "must be positive".to_string(),
        });
    }
    if config.catalog.sample_size == 0 {
        return Err(ConfigError::Invalid {
            field: "catalog.sample_size",
            message: "must be positive".to_string(),
        });
    }
    if config.relay.restart_base_ms == 0 {
        return Err(ConfigError::Invalid {
            field: "relay.restart_base_ms",
            message: "must be positive".to_string(),
        });
    }
    if config.relay.restart_cap_ms < config.relay.restart_base_ms {
        return Err(ConfigError::Invalid {
            field: "relay.restart_cap_ms",
            message: "must be at least relay.restart_base_ms".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn loads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timings:\n  role_reveal_secs: 5").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.timings.role_reveal_secs, 5);
        assert_eq!(config.timings.discussion_secs, 300);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rooms:\n  ttl_secs: 0").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "rooms.ttl_secs",
                ..
            }
        ));
    }

    #[test]
    fn restart_cap_must_cover_base() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "relay:\n  restart_base_ms: 5000\n  restart_cap_ms: 100").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not a map").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
