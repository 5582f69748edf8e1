//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::TunnelConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
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
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<TunnelConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load a TOML file without validating it.
///
/// Callers layer overrides (CLI flags) on top, then call [`finalize`].
pub fn read_config(path: &Path) -> Result<TunnelConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Normalize and validate a fully assembled configuration.
pub fn finalize(mut config: TunnelConfig) -> Result<TunnelConfig, ConfigError> {
    config.normalize();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TunnelConfig, ConfigError> {
    finalize(read_config(path)?)
}
