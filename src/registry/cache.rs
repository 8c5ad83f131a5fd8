//! Per-tenant repository cache.
//!
//! # Responsibilities
//! - Map the calling thread's tenant identity to one repository
//! - Build, configure and publish a repository on first lookup
//! - Start the file watcher of the published entry only
//!
//! # Design Decisions
//! - Lookups after publication are a single shard read
//! - Candidates are built outside any lock; publication is an atomic
//!   insert-if-absent, so concurrent first lookups converge on one entry
//! - A losing candidate is dropped with its watcher never started
//! - Entries outlive tenant shutdown; only `evict` removes them

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

use crate::config::RegistrySettings;
use crate::loader::{ConfigSource, ConfigurationLoader, StandardLoader};
use crate::observability::metrics;
use crate::repository::layout::parse_level;
use crate::repository::{Hierarchy, LogRepository, SinkSpec, DEFAULT_ROOT_LEVEL};
use crate::tenant::resources::HostPaths;
use crate::tenant::{self, Tenant, TenantIdentity};

use super::discovery;
use super::watcher::{file_modified, ConfigWatcher, WatcherState};
use super::RegistryError;

/// Name of the sink attached when a tenant ships no configuration.
pub const DEFAULT_SINK_NAME: &str = "default";

struct RegistryEntry {
    repository: Arc<LogRepository>,
    watcher: Option<Arc<ConfigWatcher>>,
}

/// Counters since the registry was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Entries that won publication.
    pub published: u64,
    /// Candidates discarded because another thread published first.
    pub races_lost: u64,
    /// Watcher threads actually started.
    pub watchers_started: u64,
}

/// Tenant-isolated logging repository registry.
pub struct TenantRepositoryRegistry {
    settings: RegistrySettings,
    host: Arc<dyn HostPaths>,
    loader: Arc<dyn ConfigurationLoader>,
    default_root_level: LevelFilter,
    entries: DashMap<TenantIdentity, RegistryEntry>,
    published: AtomicU64,
    races_lost: AtomicU64,
    watchers_started: AtomicU64,
}

impl TenantRepositoryRegistry {
    /// Registry using the built-in loader, with relative sink paths under
    /// the host's `logs/` directory.
    pub fn new(settings: RegistrySettings, host: Arc<dyn HostPaths>) -> Self {
        let loader: Arc<dyn ConfigurationLoader> = Arc::new(StandardLoader::for_host(host.as_ref()));
        let default_root_level = parse_level(&settings.default_root_level).unwrap_or_else(|| {
            tracing::warn!(
                level = %settings.default_root_level,
                "Unknown default root level, using INFO"
            );
            DEFAULT_ROOT_LEVEL
        });

        Self {
            settings,
            host,
            loader,
            default_root_level,
            entries: DashMap::new(),
            published: AtomicU64::new(0),
            races_lost: AtomicU64::new(0),
            watchers_started: AtomicU64::new(0),
        }
    }

    /// Replace the configuration loader.
    pub fn with_loader(mut self, loader: Arc<dyn ConfigurationLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Repository for the tenant the calling thread runs on behalf of, or the
    /// host repository when no tenant is entered.
    pub fn get_repository(&self) -> Result<Arc<LogRepository>, RegistryError> {
        let current = tenant::current();
        self.repository_for(current.as_deref())
    }

    /// Repository for an explicit tenant; `None` means the host.
    pub fn repository_for(&self, tenant: Option<&Tenant>) -> Result<Arc<LogRepository>, RegistryError> {
        let identity = tenant.map_or(TenantIdentity::Host, Tenant::identity);

        if let Some(entry) = self.entries.get(&identity) {
            return Ok(entry.repository.clone());
        }

        let candidate = self.build_candidate(&identity, tenant)?;
        self.publish(identity, tenant, candidate)
    }

    fn build_candidate(
        &self,
        identity: &TenantIdentity,
        tenant: Option<&Tenant>,
    ) -> Result<RegistryEntry, RegistryError> {
        let repository = Arc::new(LogRepository::new(identity.to_string()));
        let config_name = &self.settings.config_name;

        let Some(tenant) = tenant else {
            // The host is configured once and never watched.
            let source = discovery::discover_host(self.host.as_ref(), config_name)?;
            self.apply(identity, &source, &repository)?;
            return Ok(RegistryEntry { repository, watcher: None });
        };

        let watcher = match discovery::discover_tenant(tenant, config_name)? {
            ConfigSource::Absent => {
                self.configure_default(tenant, &repository);
                None
            }
            ConfigSource::Explicit(explicit) => {
                // Taken before the read, so an edit racing the initial load is
                // still seen as newer by the watcher.
                let last_seen = explicit.file_path().and_then(|path| file_modified(path).ok());
                let source = ConfigSource::Explicit(explicit.clone());
                self.apply(identity, &source, &repository)?;

                let watcher = ConfigWatcher::new(
                    tenant.id().as_str(),
                    explicit,
                    repository.clone(),
                    self.loader.clone(),
                    self.settings.watch_interval(),
                )
                .map(|watcher| watcher.with_last_seen(last_seen));
                if watcher.is_none() {
                    tracing::info!(
                        tenant = %tenant.id(),
                        source = %source,
                        "Logging configuration is not a local file and will not be monitored"
                    );
                }
                watcher.map(Arc::new)
            }
        };

        Ok(RegistryEntry { repository, watcher })
    }

    fn apply(
        &self,
        identity: &TenantIdentity,
        source: &ConfigSource,
        repository: &LogRepository,
    ) -> Result<(), RegistryError> {
        self.loader.apply(source, repository).map_err(|source| RegistryError::Load {
            identity: identity.clone(),
            source,
        })
    }

    fn configure_default(&self, tenant: &Tenant, repository: &LogRepository) {
        let path = self
            .host
            .log_directory()
            .join(self.settings.tenant_log_name(tenant.id().as_str()));
        let spec = SinkSpec::RollingFile {
            path: path.clone(),
            max_file_size: self.settings.default_sink.max_file_size,
            max_backups: self.settings.default_sink.max_backups,
        };

        repository.configure(Hierarchy::new(self.default_root_level).with_sink(DEFAULT_SINK_NAME, spec.build()));
        tracing::info!(
            tenant = %tenant.id(),
            path = ?path,
            "No logging configuration found, using default rolling file"
        );
    }

    fn publish(
        &self,
        identity: TenantIdentity,
        tenant: Option<&Tenant>,
        candidate: RegistryEntry,
    ) -> Result<Arc<LogRepository>, RegistryError> {
        let (repository, watcher) = match self.entries.entry(identity.clone()) {
            Entry::Occupied(existing) => {
                self.races_lost.fetch_add(1, Ordering::Relaxed);
                metrics::record_publish_race_lost();
                tracing::debug!(identity = %identity, "Lost publish race, discarding candidate repository");
                return Ok(existing.get().repository.clone());
            }
            Entry::Vacant(slot) => {
                let repository = candidate.repository.clone();
                let watcher = candidate.watcher.clone();
                slot.insert(candidate);
                (repository, watcher)
            }
        };

        self.published.fetch_add(1, Ordering::Relaxed);
        metrics::record_repository_published(if identity.is_host() { "host" } else { "tenant" });
        tracing::info!(identity = %identity, sinks = ?repository.sink_names(), "Published logging repository");

        if let (Some(watcher), Some(tenant)) = (watcher, tenant) {
            // Subscribe first: a tenant already shut down stops the watcher
            // before it can start.
            watcher.stop_on(tenant.shutdown_signal());
            let started = watcher.start().map_err(|source| RegistryError::WatcherSpawn {
                identity: identity.clone(),
                source,
            })?;
            if started {
                self.watchers_started.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(repository)
    }

    /// Watcher state of a published entry. `None` if the entry is absent or
    /// has no watcher.
    pub fn watcher_state(&self, identity: &TenantIdentity) -> Option<WatcherState> {
        self.entries
            .get(identity)
            .and_then(|entry| entry.watcher.as_ref().map(|w| w.state()))
    }

    pub fn contains(&self, identity: &TenantIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove an entry and stop its watcher. The next lookup for the same
    /// identity builds a fresh repository.
    pub fn evict(&self, identity: &TenantIdentity) -> Option<Arc<LogRepository>> {
        let (_, entry) = self.entries.remove(identity)?;
        if let Some(watcher) = &entry.watcher {
            watcher.stop();
        }
        tracing::info!(identity = %identity, "Evicted logging repository");
        Some(entry.repository)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            published: self.published.load(Ordering::Relaxed),
            races_lost: self.races_lost.load(Ordering::Relaxed),
            watchers_started: self.watchers_started.load(Ordering::Relaxed),
        }
    }

    fn watchers(&self) -> Vec<Arc<ConfigWatcher>> {
        self.entries
            .iter()
            .filter_map(|entry| entry.watcher.clone())
            .collect()
    }

    /// Stop every watcher and wait for their threads. Entries stay cached.
    pub fn shutdown(&self) {
        let watchers = self.watchers();
        for watcher in &watchers {
            watcher.stop();
        }
        for watcher in &watchers {
            watcher.join();
        }
        for entry in self.entries.iter() {
            entry.repository.flush();
        }
        tracing::info!(watchers = watchers.len(), "Logging registry shut down");
    }
}

impl Drop for TenantRepositoryRegistry {
    fn drop(&mut self) {
        for watcher in self.watchers() {
            watcher.stop();
        }
    }
}

impl std::fmt::Debug for TenantRepositoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRepositoryRegistry")
            .field("entries", &self.entries.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::resources::{DirectoryResolver, HostHome, PackagedResources};
    use crate::tenant::TenantId;
    use std::fs;
    use tempfile::TempDir;

    fn registry(home: &TempDir) -> TenantRepositoryRegistry {
        TenantRepositoryRegistry::new(RegistrySettings::default(), Arc::new(HostHome::new(home.path())))
    }

    fn tenant_dir(home: &TempDir, name: &str) -> std::path::PathBuf {
        let dir = home.path().join("apps").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_lookup_is_cached() {
        let home = TempDir::new().unwrap();
        let registry = registry(&home);
        let tenant = Tenant::new("t1", Arc::new(DirectoryResolver::new(tenant_dir(&home, "t1"))));

        let first = registry.repository_for(Some(tenant.as_ref())).unwrap();
        let second = registry.repository_for(Some(tenant.as_ref())).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.stats().published, 1);
    }

    #[test]
    fn test_default_sink_for_unconfigured_tenant() {
        let home = TempDir::new().unwrap();
        let registry = registry(&home);
        let tenant = Tenant::new("t1", Arc::new(DirectoryResolver::new(tenant_dir(&home, "t1"))));

        let repository = registry.repository_for(Some(tenant.as_ref())).unwrap();
        assert_eq!(
            repository.sinks(),
            vec![SinkSpec::RollingFile {
                path: home.path().join("logs").join("mule-app-t1.log"),
                max_file_size: 1_000_000,
                max_backups: 100,
            }]
        );
        assert_eq!(repository.sink_names(), vec![DEFAULT_SINK_NAME.to_string()]);
        assert_eq!(registry.watcher_state(&tenant.identity()), None);
    }

    #[test]
    fn test_file_config_starts_watcher() {
        let home = TempDir::new().unwrap();
        let dir = tenant_dir(&home, "t1");
        fs::write(dir.join("logging.properties"), "root.level = WARN\n").unwrap();
        let registry = registry(&home);
        let tenant = Tenant::new("t1", Arc::new(DirectoryResolver::new(dir)));

        let repository = registry.repository_for(Some(tenant.as_ref())).unwrap();
        assert_eq!(repository.root_level(), LevelFilter::WARN);
        assert_eq!(registry.watcher_state(&tenant.identity()), Some(WatcherState::Running));
        assert_eq!(registry.stats().watchers_started, 1);

        registry.shutdown();
        assert_eq!(registry.watcher_state(&tenant.identity()), Some(WatcherState::Stopped));
    }

    #[test]
    fn test_packaged_config_is_not_watched() {
        let home = TempDir::new().unwrap();
        let registry = registry(&home);
        let resources = PackagedResources::new("t1").with_resource("logging.properties", "root.level = DEBUG\n");
        let tenant = Tenant::new("t1", Arc::new(resources));

        let repository = registry.repository_for(Some(tenant.as_ref())).unwrap();
        assert_eq!(repository.root_level(), LevelFilter::DEBUG);
        assert_eq!(registry.watcher_state(&tenant.identity()), None);
        assert_eq!(registry.stats().watchers_started, 0);
    }

    #[test]
    fn test_invalid_config_is_not_published() {
        let home = TempDir::new().unwrap();
        let dir = tenant_dir(&home, "t1");
        fs::write(dir.join("logging.properties"), "root.level = LOUD\n").unwrap();
        let registry = registry(&home);
        let tenant = Tenant::new("t1", Arc::new(DirectoryResolver::new(dir)));

        let err = registry.repository_for(Some(tenant.as_ref())).unwrap_err();
        assert!(matches!(err, RegistryError::Load { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_host_without_config_fails() {
        let home = TempDir::new().unwrap();
        let registry = registry(&home);
        assert!(matches!(
            registry.get_repository(),
            Err(RegistryError::HostConfigMissing { .. })
        ));
        assert!(!registry.contains(&TenantIdentity::Host));
    }

    #[test]
    fn test_tenant_shut_down_before_lookup_never_watches() {
        let home = TempDir::new().unwrap();
        let dir = tenant_dir(&home, "t1");
        fs::write(dir.join("logging.properties"), "root.level = WARN\n").unwrap();
        let registry = registry(&home);
        let tenant = Tenant::new("t1", Arc::new(DirectoryResolver::new(dir)));
        tenant.shutdown();

        registry.repository_for(Some(tenant.as_ref())).unwrap();
        assert_eq!(registry.watcher_state(&tenant.identity()), Some(WatcherState::Stopped));
        assert_eq!(registry.stats().watchers_started, 0);
    }

    #[test]
    fn test_evict_cycles_do_not_accumulate_subscriptions() {
        let home = TempDir::new().unwrap();
        let dir = tenant_dir(&home, "t1");
        fs::write(dir.join("logging.properties"), "root.level = WARN\n").unwrap();
        let registry = registry(&home);
        let tenant = Tenant::new("t1", Arc::new(DirectoryResolver::new(dir)));

        for _ in 0..5 {
            registry.repository_for(Some(tenant.as_ref())).unwrap();
            assert_eq!(tenant.shutdown_signal().subscriber_count(), 1);
            registry.evict(&tenant.identity()).unwrap();
        }
        assert_eq!(tenant.shutdown_signal().subscriber_count(), 0);
    }

    #[test]
    fn test_evict_stops_watcher_and_rebuilds() {
        let home = TempDir::new().unwrap();
        let dir = tenant_dir(&home, "t1");
        fs::write(dir.join("logging.properties"), "root.level = WARN\n").unwrap();
        let registry = registry(&home);
        let tenant = Tenant::new("t1", Arc::new(DirectoryResolver::new(dir)));

        let first = registry.repository_for(Some(tenant.as_ref())).unwrap();
        let evicted = registry.evict(&TenantIdentity::Tenant(TenantId::new("t1"))).unwrap();
        assert!(Arc::ptr_eq(&first, &evicted));
        assert!(registry.is_empty());

        let second = registry.repository_for(Some(tenant.as_ref())).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(registry.stats().published, 2);
        registry.shutdown();
    }
}
