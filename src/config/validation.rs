//! Registry settings validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: RegistrySettings → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::RegistrySettings;
use crate::repository::layout::parse_level;

/// One semantic problem with the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn is_plain_name(value: &str) -> bool {
    !value.contains(['/', '\\']) && value != "." && value != ".."
}

/// Check settings before they are accepted.
pub fn validate_settings(settings: &RegistrySettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| errors.push(ValidationError { field, message });

    if settings.config_name.trim().is_empty() {
        fail("config_name", "must not be empty".to_string());
    } else if !is_plain_name(&settings.config_name) {
        fail("config_name", format!("'{}' must be a bare file name", settings.config_name));
    }

    if !is_plain_name(&settings.log_name_prefix) {
        fail("log_name_prefix", format!("'{}' must not contain path separators", settings.log_name_prefix));
    }

    if settings.watch_interval_ms == 0 {
        fail("watch_interval_ms", "must be greater than 0".to_string());
    }

    if parse_level(&settings.default_root_level).is_none() {
        fail("default_root_level", format!("unknown level '{}'", settings.default_root_level));
    }

    if settings.default_sink.max_file_size == 0 {
        fail("default_sink.max_file_size", "must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
