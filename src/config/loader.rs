//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    /// Malformed JSON or TOML, or a missing required key.
    Parse(Box<dyn std::error::Error + Send + Sync>),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e.as_ref()),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load and validate configuration from a file.
///
/// Files ending in `.toml` are parsed as TOML; anything else as JSON
/// (`{"listen_ip": "...", "port": ...}`).
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: RelayConfig = if is_toml(path) {
        toml::from_str(&content).map_err(|e| ConfigError::Parse(Box::new(e)))?
    } else {
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(Box::new(e)))?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
