//! Shared utilities for registry integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;
use url::Url;

use tenant_logging::config::RegistrySettings;
use tenant_logging::tenant::{DirectoryResolver, DiscoveryError, HostHome, ResourceResolver};
use tenant_logging::{Tenant, TenantRepositoryRegistry};

/// Poll interval used by tests.
pub const FAST_INTERVAL_MS: u64 = 25;

/// A temporary host home with `conf/`, `logs/` and `apps/<tenant>/` below it.
pub struct TestHome {
    pub dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("conf")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn app_dir(&self, tenant: &str) -> PathBuf {
        let dir = self.path().join("apps").join(tenant);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn tenant(&self, name: &str) -> Arc<Tenant> {
        Tenant::new(name, Arc::new(DirectoryResolver::new(self.app_dir(name))))
    }

    pub fn registry(&self) -> TenantRepositoryRegistry {
        let settings = RegistrySettings {
            watch_interval_ms: FAST_INTERVAL_MS,
            ..RegistrySettings::default()
        };
        TenantRepositoryRegistry::new(settings, Arc::new(HostHome::new(self.path())))
    }
}

/// Write a file and push its modification time `bump_secs` into the future,
/// so a rewrite is always seen as newer regardless of timestamp resolution.
pub fn write_config(path: &Path, body: &str, bump_secs: u64) {
    fs::write(path, body).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(bump_secs)).unwrap();
}

/// Poll `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Resolver wrapper counting lookups and optionally slowing them down.
pub struct CountingResolver {
    inner: DirectoryResolver,
    delay: Duration,
    pub lookups: AtomicUsize,
}

impl CountingResolver {
    pub fn new(root: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            inner: DirectoryResolver::new(root),
            delay,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ResourceResolver for CountingResolver {
    fn find_resource(&self, name: &str) -> Result<Option<Url>, DiscoveryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.find_resource(name)
    }
}
