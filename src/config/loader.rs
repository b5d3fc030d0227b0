//! Configuration loading from disk.

use std::path::Path;

use thiserror::Error;

use crate::config::schema::BrokerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BrokerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: BrokerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broker.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let (_dir, path) = write_config(
            r#"
            [poller]
            interval_ms = 500
            "#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.poller.interval_ms, 500);
        assert_eq!(config.reconnect.base_delay_ms, 1_000);
        assert_eq!(config.listener.bind_address, "0.0.0.0:9400");
    }

    #[test]
    fn syntactic_garbage_is_a_parse_error() {
        let (_dir, path) = write_config("this is not toml [");
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn semantic_violations_are_validation_errors() {
        let (_dir, path) = write_config(
            r#"
            [poller]
            interval_ms = 0
            "#,
        );
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }
}
