//! Tenant repository registry.
//!
//! # Data Flow
//! ```text
//! get_repository()
//!     → tenant::current_identity()
//!     → cache.rs (hit: return cached repository)
//!     → discovery.rs (miss: tenant resources / <home>/conf)
//!     → loader (configure candidate) | default rolling file
//!     → cache.rs (insert-if-absent)
//!     → watcher.rs (winner only, file-backed only)
//! ```
//!
//! # Design Decisions
//! - Tenants never see each other's resources or repositories
//! - The host must be configured explicitly; tenants fall back to a default
//! - Failed construction publishes nothing, so the next lookup retries

pub mod cache;
pub mod discovery;
pub mod watcher;

use std::path::PathBuf;
use thiserror::Error;

use crate::loader::LoadError;
use crate::tenant::{DiscoveryError, TenantIdentity};

pub use cache::{RegistryStats, TenantRepositoryRegistry, DEFAULT_SINK_NAME};
pub use watcher::{ConfigWatcher, WatchError, WatcherState};

/// Errors returned by repository lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Failed to configure logging for {identity}: {source}")]
    Load {
        identity: TenantIdentity,
        #[source]
        source: LoadError,
    },

    #[error("No host logging configuration in {} (expected {expected})", .conf_dir.display())]
    HostConfigMissing { conf_dir: PathBuf, expected: String },

    #[error("Failed to start config watcher for {identity}: {source}")]
    WatcherSpawn {
        identity: TenantIdentity,
        #[source]
        source: WatchError,
    },
}
