//! TOML configuration grammar. Discovered after the markup and key-value forms.

use crate::loader::document::{DocumentError, LoggingDocument};

/// Parse a TOML logging document.
pub fn parse(text: &str) -> Result<LoggingDocument, DocumentError> {
    toml::from_str(text).map_err(|e| DocumentError::Syntax(e.to_string()))
}
