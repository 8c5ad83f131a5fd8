//! Registry settings loading from disk.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::RegistrySettings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate settings from a TOML file.
pub fn load_config(path: &Path) -> Result<RegistrySettings, ConfigError> {
    let content = fs::read_to_string(path)?;
    let settings: RegistrySettings = toml::from_str(&content)?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<RegistrySettings, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = ?path, "No registry settings file, using defaults");
            Ok(RegistrySettings::default())
        }
        other => other,
    }
}
