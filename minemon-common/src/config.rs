//! YAML configuration loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors. The messages carry the file path where one is
/// known, so callers can surface them without extra context.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a configuration file in YAML format.
pub fn load_yaml<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_yaml::from_str(&content).map_err(|e| {
        ConfigError::Parse(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Parse a configuration from a YAML string.
pub fn parse_yaml<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T, ConfigError> {
    serde_yaml::from_str(content)
        .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
}
