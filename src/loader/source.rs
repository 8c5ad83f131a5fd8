//! Where a repository's configuration comes from.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::loader::LoadError;
use crate::tenant::resources::{self, ResourceResolver};

/// Configuration grammar, chosen by resource name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// XML document.
    Structured,
    /// `key = value` lines.
    KeyValue,
    /// TOML document.
    Toml,
}

impl ConfigFormat {
    /// Discovery order.
    pub const ALL: [ConfigFormat; 3] = [ConfigFormat::Structured, ConfigFormat::KeyValue, ConfigFormat::Toml];

    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Structured => "xml",
            ConfigFormat::KeyValue => "properties",
            ConfigFormat::Toml => "toml",
        }
    }

    /// Conventional resource name for a config base name, e.g. `logging.xml`.
    pub fn resource_name(&self, config_name: &str) -> String {
        format!("{}.{}", config_name, self.extension())
    }

    /// Format implied by a resource name or path suffix.
    pub fn from_name(name: &str) -> Option<Self> {
        ConfigFormat::ALL
            .into_iter()
            .find(|f| name.ends_with(&format!(".{}", f.extension())))
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Structured => f.write_str("structured"),
            ConfigFormat::KeyValue => f.write_str("key-value"),
            ConfigFormat::Toml => f.write_str("toml"),
        }
    }
}

#[derive(Debug, Clone)]
enum Body {
    /// Read from disk on every apply.
    File(PathBuf),
    /// Captured once at discovery.
    Packaged(Arc<str>),
}

/// A resolved configuration resource.
#[derive(Debug, Clone)]
pub struct ExplicitSource {
    url: Url,
    format: ConfigFormat,
    body: Body,
}

impl ExplicitSource {
    /// Resolve a URL handed out by `resolver`. `file:` URLs stay on disk;
    /// anything else is read once, now.
    pub fn resolve(
        url: Url,
        format: ConfigFormat,
        resolver: &dyn ResourceResolver,
    ) -> Result<Self, LoadError> {
        let body = match resources::file_path(&url) {
            Some(path) => Body::File(path),
            None => {
                let text = resolver.open_resource(&url).map_err(|source| LoadError::Io {
                    url: url.to_string(),
                    source,
                })?;
                Body::Packaged(Arc::from(text))
            }
        };
        Ok(Self { url, format, body })
    }

    /// Source for a file on disk. The format follows the file suffix.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let invalid = |message: &str| LoadError::Unsupported {
            location: path.display().to_string(),
            message: message.to_string(),
        };
        let format = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(ConfigFormat::from_name)
            .ok_or_else(|| invalid("unrecognised configuration file suffix"))?;
        let absolute = std::path::absolute(path).map_err(|source| LoadError::Io {
            url: path.display().to_string(),
            source,
        })?;
        let url = Url::from_file_path(&absolute).map_err(|_| invalid("path cannot be expressed as a file URL"))?;
        Ok(Self { url, format, body: Body::File(absolute) })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// The local file behind this source, when file-backed.
    pub fn file_path(&self) -> Option<&Path> {
        match &self.body {
            Body::File(path) => Some(path),
            Body::Packaged(_) => None,
        }
    }

    /// Current text of the resource.
    pub fn read(&self) -> Result<String, LoadError> {
        match &self.body {
            Body::File(path) => fs::read_to_string(path).map_err(|source| LoadError::Io {
                url: self.url.to_string(),
                source,
            }),
            Body::Packaged(text) => Ok(text.to_string()),
        }
    }
}

/// Outcome of discovery.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Explicit(ExplicitSource),
    /// Nothing found: use defaults.
    Absent,
}

impl ConfigSource {
    /// Only file-backed sources can be watched.
    pub fn is_file_backed(&self) -> bool {
        self.file_path().is_some()
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(source) => source.file_path(),
            ConfigSource::Absent => None,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match self {
            ConfigSource::Explicit(source) => Some(source.url()),
            ConfigSource::Absent => None,
        }
    }

    pub fn format(&self) -> Option<ConfigFormat> {
        match self {
            ConfigSource::Explicit(source) => Some(source.format()),
            ConfigSource::Absent => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(source) => write!(f, "{} ({})", source.url, source.format),
            ConfigSource::Absent => f.write_str("<absent>"),
        }
    }
}
