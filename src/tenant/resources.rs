//! Tenant resource lookup and host filesystem layout.
//!
//! # Responsibilities
//! - Locate a tenant's configuration resources inside its own namespace only
//! - Read packaged (non-file) resources
//! - Describe where the host keeps its `conf/` and `logs/` directories

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// URL scheme for resources packaged inside a tenant bundle.
pub const BUNDLE_SCHEME: &str = "bundle";

/// Resource lookup failed for a reason other than "not found".
#[derive(Debug, Error)]
#[error("Failed to look up resource '{resource}': {source}")]
pub struct DiscoveryError {
    pub resource: String,
    #[source]
    pub source: io::Error,
}

/// Lookup of resources scoped to one tenant.
///
/// Implementations must not fall back to a shared or parent namespace.
pub trait ResourceResolver: Send + Sync {
    /// Find a resource by its conventional name.
    fn find_resource(&self, name: &str) -> Result<Option<Url>, DiscoveryError>;

    /// Read the contents of a resource previously returned by `find_resource`.
    fn open_resource(&self, url: &Url) -> io::Result<String> {
        read_file_url(url)
    }
}

/// Read a `file:` URL from disk.
pub fn read_file_url(url: &Url) -> io::Result<String> {
    match file_path(url) {
        Some(path) => fs::read_to_string(path),
        None => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("Not a local file resource: {}", url),
        )),
    }
}

/// Local path behind a URL, if its scheme is `file`.
pub fn file_path(url: &Url) -> Option<PathBuf> {
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

/// Resolver over one directory on disk. Yields `file:` URLs.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceResolver for DirectoryResolver {
    fn find_resource(&self, name: &str) -> Result<Option<Url>, DiscoveryError> {
        let path = self.root.join(name);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                let absolute = if path.is_absolute() {
                    path
                } else {
                    std::env::current_dir()
                        .map_err(|source| DiscoveryError { resource: name.to_string(), source })?
                        .join(path)
                };
                Url::from_file_path(&absolute)
                    .map(Some)
                    .map_err(|_| DiscoveryError {
                        resource: name.to_string(),
                        source: io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("Cannot express {:?} as a file URL", absolute),
                        ),
                    })
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DiscoveryError { resource: name.to_string(), source }),
        }
    }
}

/// Resources packaged with a tenant and held in memory. Yields `bundle:` URLs,
/// which are never watched for changes.
#[derive(Debug, Clone, Default)]
pub struct PackagedResources {
    bundle: String,
    entries: HashMap<String, String>,
}

impl PackagedResources {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            entries: HashMap::new(),
        }
    }

    /// Add a resource body under a name.
    pub fn with_resource(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.entries.insert(name.into(), body.into());
        self
    }

    fn url_for(&self, name: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}/{}", BUNDLE_SCHEME, self.bundle, name))
    }
}

impl ResourceResolver for PackagedResources {
    fn find_resource(&self, name: &str) -> Result<Option<Url>, DiscoveryError> {
        if !self.entries.contains_key(name) {
            return Ok(None);
        }
        self.url_for(name).map(Some).map_err(|e| DiscoveryError {
            resource: name.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })
    }

    fn open_resource(&self, url: &Url) -> io::Result<String> {
        let name = url.path().trim_start_matches('/');
        if url.scheme() != BUNDLE_SCHEME || url.host_str() != Some(self.bundle.as_str()) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Resource {} does not belong to bundle '{}'", url, self.bundle),
            ));
        }
        self.entries.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("No packaged resource '{}'", name))
        })
    }
}

/// The host's filesystem layout.
pub trait HostPaths: Send + Sync {
    fn home_directory(&self) -> PathBuf;

    /// `<home>/conf`
    fn conf_directory(&self) -> PathBuf {
        self.home_directory().join("conf")
    }

    /// `<home>/logs`
    fn log_directory(&self) -> PathBuf {
        self.home_directory().join("logs")
    }
}

/// Fixed host home directory.
#[derive(Debug, Clone)]
pub struct HostHome(PathBuf);

impl HostHome {
    /// Environment variable consulted by [`HostHome::from_env`].
    pub const ENV_VAR: &'static str = "TENANT_LOGGING_HOME";

    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self(home.into())
    }

    /// Home from `TENANT_LOGGING_HOME`, else the current directory.
    pub fn from_env() -> io::Result<Self> {
        match std::env::var_os(Self::ENV_VAR) {
            Some(home) => Ok(Self(PathBuf::from(home))),
            None => std::env::current_dir().map(Self),
        }
    }
}

impl HostPaths for HostHome {
    fn home_directory(&self) -> PathBuf {
        self.0.clone()
    }
}
