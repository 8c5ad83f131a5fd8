//! Applying configuration resources to repositories.
//!
//! # Data Flow
//! ```text
//! ConfigSource::Explicit
//!     → source.rs (read file / packaged body)
//!     → structured.rs | properties.rs | toml_grammar.rs (by suffix)
//!     → document.rs (validate, build Hierarchy)
//!     → LogRepository::configure (atomic swap)
//! ```
//!
//! # Design Decisions
//! - A loader is a capability; the registry only sees the trait
//! - Parse and validate fully before touching the repository

pub mod document;
pub mod properties;
pub mod source;
pub mod structured;
pub mod toml_grammar;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::repository::LogRepository;
use crate::tenant::resources::HostPaths;

pub use document::{DocumentError, LoggingDocument};
pub use source::{ConfigFormat, ConfigSource, ExplicitSource};

/// A configuration resource could not be applied.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid logging configuration in {url}: {source}")]
    Document {
        url: String,
        #[source]
        source: DocumentError,
    },

    #[error("Unsupported configuration resource {location}: {message}")]
    Unsupported { location: String, message: String },

    #[error("No configuration source to apply")]
    NoSource,
}

/// Parses a configuration source and applies it to a repository.
pub trait ConfigurationLoader: Send + Sync {
    fn apply(&self, source: &ConfigSource, target: &LogRepository) -> Result<(), LoadError>;
}

/// Loader for the built-in XML, key-value and TOML grammars.
#[derive(Debug, Clone)]
pub struct StandardLoader {
    log_dir: PathBuf,
}

impl StandardLoader {
    /// Relative sink paths resolve under `log_dir`.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self { log_dir: log_dir.into() }
    }

    /// Relative sink paths resolve under the host's `logs/` directory.
    pub fn for_host(host: &dyn HostPaths) -> Self {
        Self::new(host.log_directory())
    }

    /// Parse and validate without applying.
    pub fn parse(&self, source: &ExplicitSource) -> Result<LoggingDocument, LoadError> {
        let text = source.read()?;
        let parsed = match source.format() {
            ConfigFormat::Structured => structured::parse(&text),
            ConfigFormat::KeyValue => properties::parse(&text),
            ConfigFormat::Toml => toml_grammar::parse(&text),
        };
        parsed.map_err(|e| LoadError::Document {
            url: source.url().to_string(),
            source: e,
        })
    }
}

impl ConfigurationLoader for StandardLoader {
    fn apply(&self, source: &ConfigSource, target: &LogRepository) -> Result<(), LoadError> {
        let explicit = match source {
            ConfigSource::Explicit(explicit) => explicit,
            ConfigSource::Absent => return Err(LoadError::NoSource),
        };

        let hierarchy = self
            .parse(explicit)?
            .build(&self.log_dir)
            .map_err(|e| LoadError::Document {
                url: explicit.url().to_string(),
                source: e,
            })?;

        target.configure(hierarchy);
        tracing::info!(
            repository = %target.label(),
            source = %explicit.url(),
            format = %explicit.format(),
            "Applied logging configuration"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SinkSpec;
    use std::fs;
    use tempfile::TempDir;

    fn file_source(dir: &TempDir, name: &str, body: &str) -> ConfigSource {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        ConfigSource::Explicit(ExplicitSource::from_path(&path).unwrap())
    }

    #[test]
    fn test_apply_structured() {
        let dir = TempDir::new().unwrap();
        let loader = StandardLoader::new(dir.path().join("logs"));
        let source = file_source(
            &dir,
            "logging.xml",
            r#"<configuration>
  <sink name="f" kind="rolling_file" path="a.log" max_backups="2"/>
  <root><sink-ref name="f"/></root>
</configuration>"#,
        );

        let repo = LogRepository::new("t");
        loader.apply(&source, &repo).unwrap();
        assert_eq!(
            repo.sinks(),
            vec![SinkSpec::RollingFile {
                path: dir.path().join("logs").join("a.log"),
                max_file_size: 1_000_000,
                max_backups: 2,
            }]
        );
    }

    #[test]
    fn test_apply_toml() {
        let dir = TempDir::new().unwrap();
        let loader = StandardLoader::new(dir.path());
        let source = file_source(&dir, "logging.toml", "[root]\nlevel = \"debug\"\n");

        let repo = LogRepository::new("t");
        loader.apply(&source, &repo).unwrap();
        assert_eq!(repo.root_level(), tracing::level_filters::LevelFilter::DEBUG);
    }

    #[test]
    fn test_apply_key_value() {
        let dir = TempDir::new().unwrap();
        let loader = StandardLoader::new(dir.path());
        let source = file_source(&dir, "logging.properties", "root.level = ERROR\n");

        let repo = LogRepository::new("t");
        loader.apply(&source, &repo).unwrap();
        assert_eq!(repo.root_level(), tracing::level_filters::LevelFilter::ERROR);
    }

    #[test]
    fn test_failed_apply_leaves_repository_untouched() {
        let dir = TempDir::new().unwrap();
        let loader = StandardLoader::new(dir.path());
        let repo = LogRepository::new("t");
        loader
            .apply(&file_source(&dir, "good.properties", "root.sinks = o\nsink.o.kind = console\n"), &repo)
            .unwrap();

        let bad = file_source(&dir, "bad.properties", "root.sinks = missing\n");
        let err = loader.apply(&bad, &repo).unwrap_err();
        assert!(matches!(err, LoadError::Document { .. }));
        assert_eq!(repo.sink_names(), vec!["o"]);
    }

    #[test]
    fn test_absent_source_is_an_error() {
        let loader = StandardLoader::new("/logs");
        let repo = LogRepository::new("t");
        assert!(matches!(loader.apply(&ConfigSource::Absent, &repo), Err(LoadError::NoSource)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let source = file_source(&dir, "logging.toml", "");
        fs::remove_file(dir.path().join("logging.toml")).unwrap();

        let loader = StandardLoader::new(dir.path());
        let err = loader.apply(&source, &LogRepository::new("t")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
