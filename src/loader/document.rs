//! Format-neutral logging configuration model.
//!
//! Every grammar parses into a [`LoggingDocument`], which is then validated
//! and turned into a [`Hierarchy`] in one step. Nothing is applied to a
//! repository unless the whole document is valid.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::repository::layout::parse_level;
use crate::repository::{ConsoleTarget, Hierarchy, SinkSpec, DEFAULT_MAX_BACKUPS, DEFAULT_MAX_FILE_SIZE, DEFAULT_ROOT_LEVEL};

/// A configuration text could not be turned into a hierarchy.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("{0}")]
    Invalid(String),
}

/// Root logger section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootSection {
    pub level: Option<String>,
    pub sinks: Vec<String>,
}

/// A declared sink.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkSection {
    RollingFile {
        path: String,
        #[serde(default)]
        max_file_size: Option<u64>,
        #[serde(default)]
        max_backups: Option<usize>,
    },
    Console {
        #[serde(default)]
        target: Option<String>,
    },
}

/// Parsed configuration, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingDocument {
    pub root: RootSection,
    /// Logger name → level.
    pub loggers: BTreeMap<String, String>,
    /// Sink name → declaration.
    pub sinks: BTreeMap<String, SinkSection>,
}

impl LoggingDocument {
    /// Validate and build. Relative sink paths resolve under `log_dir`.
    pub fn build(&self, log_dir: &Path) -> Result<Hierarchy, DocumentError> {
        let root_level = match &self.root.level {
            Some(raw) => level(raw, "root")?,
            None => DEFAULT_ROOT_LEVEL,
        };
        let mut hierarchy = Hierarchy::new(root_level);

        for (logger, raw) in &self.loggers {
            hierarchy = hierarchy.with_logger_level(logger.clone(), level(raw, logger)?);
        }

        let mut attached = HashSet::new();
        for name in &self.root.sinks {
            if !attached.insert(name.as_str()) {
                return Err(DocumentError::Invalid(format!("sink '{}' attached twice", name)));
            }
            let section = self.sinks.get(name).ok_or_else(|| {
                DocumentError::Invalid(format!("root references undeclared sink '{}'", name))
            })?;
            let spec = section.to_spec(name, log_dir)?;
            hierarchy = hierarchy.with_sink(name.clone(), spec.build());
        }

        Ok(hierarchy)
    }
}

impl SinkSection {
    fn to_spec(&self, name: &str, log_dir: &Path) -> Result<SinkSpec, DocumentError> {
        match self {
            SinkSection::RollingFile { path, max_file_size, max_backups } => {
                if path.trim().is_empty() {
                    return Err(DocumentError::Invalid(format!("sink '{}' has an empty path", name)));
                }
                let path = Path::new(path.trim());
                let max_file_size = max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE);
                if max_file_size == 0 {
                    return Err(DocumentError::Invalid(format!(
                        "sink '{}' max_file_size must be greater than 0",
                        name
                    )));
                }
                Ok(SinkSpec::RollingFile {
                    path: if path.is_absolute() { path.to_path_buf() } else { log_dir.join(path) },
                    max_file_size,
                    max_backups: max_backups.unwrap_or(DEFAULT_MAX_BACKUPS),
                })
            }
            SinkSection::Console { target } => {
                let target = match target {
                    Some(raw) => ConsoleTarget::parse(raw).ok_or_else(|| {
                        DocumentError::Invalid(format!("sink '{}' has unknown console target '{}'", name, raw))
                    })?,
                    None => ConsoleTarget::default(),
                };
                Ok(SinkSpec::Console { target })
            }
        }
    }
}

impl SinkSection {
    /// Build a sink declaration from flat `field -> value` pairs, as written
    /// in the key-value and markup grammars. `kind` selects the variant.
    pub(crate) fn from_fields(name: &str, mut fields: BTreeMap<String, String>) -> Result<Self, DocumentError> {
        let kind = fields
            .remove("kind")
            .ok_or_else(|| DocumentError::Invalid(format!("sink '{}' has no kind", name)))?;

        let section = match kind.as_str() {
            "rolling_file" => SinkSection::RollingFile {
                path: fields
                    .remove("path")
                    .ok_or_else(|| DocumentError::Invalid(format!("sink '{}' has no path", name)))?,
                max_file_size: number(name, "max_file_size", fields.remove("max_file_size"))?,
                max_backups: number(name, "max_backups", fields.remove("max_backups"))?,
            },
            "console" => SinkSection::Console { target: fields.remove("target") },
            other => {
                return Err(DocumentError::Invalid(format!("sink '{}' has unknown kind '{}'", name, other)))
            }
        };

        if let Some(field) = fields.keys().next() {
            return Err(DocumentError::Invalid(format!("sink '{}' has unknown field '{}'", name, field)));
        }
        Ok(section)
    }
}

fn number<T: std::str::FromStr>(sink: &str, field: &str, raw: Option<String>) -> Result<Option<T>, DocumentError> {
    raw.map(|raw| {
        raw.replace('_', "").parse::<T>().map_err(|_| {
            DocumentError::Invalid(format!("sink '{}' field '{}' is not a number: '{}'", sink, field, raw))
        })
    })
    .transpose()
}

fn level(raw: &str, logger: &str) -> Result<tracing::level_filters::LevelFilter, DocumentError> {
    parse_level(raw)
        .ok_or_else(|| DocumentError::Invalid(format!("unknown level '{}' for logger '{}'", raw, logger)))
}
