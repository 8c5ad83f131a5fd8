//! Configuration file watcher for hot reload.
//!
//! # States
//! ```text
//! Idle → Running: started by the registry, winning entry only
//! Running → Stopped: tenant shutdown, or metadata access denied
//! Idle → Stopped: stop requested before start
//! ```
//!
//! # Design Decisions
//! - One dedicated OS thread per watcher, no sharing between tenants
//! - Polls modification time; the wait returns early when stopped
//! - Reload failures are logged and the previous configuration stays live
//! - Stopped is terminal: a watcher never restarts

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use thiserror::Error;

use crate::lifecycle::{ShutdownSignal, Subscription};
use crate::loader::{ConfigSource, ConfigurationLoader, ExplicitSource};
use crate::observability::metrics;
use crate::repository::LogRepository;

/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Watcher lifecycle state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

impl From<u8> for WatcherState {
    fn from(val: u8) -> Self {
        match val {
            0 => WatcherState::Idle,
            1 => WatcherState::Running,
            _ => WatcherState::Stopped,
        }
    }
}

/// Errors that end or prevent a watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// File metadata cannot be read and will not become readable.
    #[error("Access to {} denied: {source}", .path.display())]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The OS refused to start the watcher thread.
    #[error("Failed to spawn watcher thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Cooperative stop flag with a prompt wake-up.
#[derive(Default)]
struct StopFlag {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopFlag {
    fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait up to `timeout`. Returns true once stopped.
    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Reads a file's modification time.
type ModifiedFn = fn(&Path) -> io::Result<SystemTime>;

/// Modification time of a file on disk.
pub fn file_modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

struct Inner {
    name: String,
    path: PathBuf,
    source: ConfigSource,
    repository: Arc<LogRepository>,
    loader: Arc<dyn ConfigurationLoader>,
    interval: Duration,
    read_modified: ModifiedFn,
    stop: StopFlag,
    state: AtomicU8,
    reloads: AtomicU64,
}

impl Inner {
    fn state(&self) -> WatcherState {
        WatcherState::from(self.state.load(Ordering::SeqCst))
    }

    fn request_stop(&self) {
        // A watcher that never ran goes straight to Stopped.
        let _ = self.state.compare_exchange(
            WatcherState::Idle as u8,
            WatcherState::Stopped as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        self.stop.stop();
    }

    fn reconfigure(&self) {
        tracing::info!(watcher = %self.name, path = ?self.path, "Reconfiguring logging");
        self.reloads.fetch_add(1, Ordering::SeqCst);
        match self.loader.apply(&self.source, &self.repository) {
            Ok(()) => metrics::record_reload("ok"),
            Err(e) => {
                metrics::record_reload("error");
                tracing::error!(
                    watcher = %self.name,
                    error = %e,
                    "Failed to reload logging configuration. Keeping current configuration."
                );
            }
        }
    }
}

/// Per-thread polling state.
struct Poller {
    last_seen: Option<SystemTime>,
    warned_missing: bool,
}

impl Poller {
    fn check_and_configure(&mut self, inner: &Inner) -> Result<(), WatchError> {
        let modified = match (inner.read_modified)(&inner.path) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !self.warned_missing {
                    tracing::warn!(watcher = %inner.name, path = ?inner.path, "Watched logging config does not exist");
                    self.warned_missing = true;
                }
                return Ok(());
            }
            Err(e) => return transient_or_fatal(inner, e),
        };
        self.warned_missing = false;

        if self.last_seen.map_or(true, |seen| modified > seen) {
            self.last_seen = Some(modified);
            // No reconfiguration once shutdown has been signalled.
            if !inner.stop.is_stopped() {
                inner.reconfigure();
            }
        }
        Ok(())
    }
}

fn transient_or_fatal(inner: &Inner, e: io::Error) -> Result<(), WatchError> {
    if is_access_denied(&e) {
        return Err(WatchError::AccessDenied { path: inner.path.clone(), source: e });
    }
    tracing::warn!(watcher = %inner.name, path = ?inner.path, error = %e, "Failed to read logging config metadata");
    Ok(())
}

pub(crate) fn is_access_denied(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied
}

fn run(inner: Arc<Inner>, last_seen: Option<SystemTime>) {
    metrics::record_watcher_started();
    tracing::info!(
        watcher = %inner.name,
        path = ?inner.path,
        interval_ms = inner.interval.as_millis() as u64,
        "Config watcher started"
    );

    let mut poller = Poller { last_seen, warned_missing: false };
    loop {
        if inner.stop.wait(inner.interval) {
            break;
        }
        if let Err(e) = poller.check_and_configure(&inner) {
            tracing::error!(watcher = %inner.name, error = %e, "Config watcher stopping permanently");
            inner.stop.stop();
            break;
        }
    }

    inner.state.store(WatcherState::Stopped as u8, Ordering::SeqCst);
    metrics::record_watcher_stopped();
    tracing::debug!(watcher = %inner.name, "Config watcher terminated");
}

/// Polls one configuration file and reapplies it to one repository.
pub struct ConfigWatcher {
    inner: Arc<Inner>,
    initial_modified: Option<SystemTime>,
    thread: Mutex<Option<JoinHandle<()>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl ConfigWatcher {
    /// Build an idle watcher. Returns `None` for sources that are not local
    /// files. The current modification time is recorded now; callers that
    /// applied the file earlier pass the time they read it with
    /// [`ConfigWatcher::with_last_seen`].
    pub fn new(
        name: impl Into<String>,
        source: ExplicitSource,
        repository: Arc<LogRepository>,
        loader: Arc<dyn ConfigurationLoader>,
        interval: Duration,
    ) -> Option<Self> {
        let path = source.file_path()?.to_path_buf();
        let initial_modified = file_modified(&path).ok();

        Some(Self {
            inner: Arc::new(Inner {
                name: name.into(),
                path,
                source: ConfigSource::Explicit(source),
                repository,
                loader,
                interval,
                read_modified: file_modified,
                stop: StopFlag::default(),
                state: AtomicU8::new(WatcherState::Idle as u8),
                reloads: AtomicU64::new(0),
            }),
            initial_modified,
            thread: Mutex::new(None),
            subscription: Mutex::new(None),
        })
    }

    /// Treat `last_seen` as the modification time already applied. Anything
    /// newer is applied on the first poll.
    pub fn with_last_seen(mut self, last_seen: Option<SystemTime>) -> Self {
        self.initial_modified = last_seen;
        self
    }

    #[cfg(test)]
    fn with_modified_fn(mut self, read_modified: ModifiedFn) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.read_modified = read_modified;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn state(&self) -> WatcherState {
        self.inner.state()
    }

    /// The repository this watcher reconfigures.
    pub fn repository(&self) -> &Arc<LogRepository> {
        &self.inner.repository
    }

    /// Reapply attempts so far, successful or not.
    pub fn reloads(&self) -> u64 {
        self.inner.reloads.load(Ordering::SeqCst)
    }

    /// Start polling. Returns `Ok(true)` if this call started the thread;
    /// `Ok(false)` if the watcher was already started or stopped.
    pub fn start(&self) -> Result<bool, WatchError> {
        if self
            .inner
            .state
            .compare_exchange(
                WatcherState::Idle as u8,
                WatcherState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Ok(false);
        }

        let inner = self.inner.clone();
        let last_seen = self.initial_modified;
        let spawned = std::thread::Builder::new()
            .name(format!("[{}].logging.config.watchdog", self.inner.name))
            .spawn(move || run(inner, last_seen));

        match spawned {
            Ok(handle) => {
                *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.inner.state.store(WatcherState::Stopped as u8, Ordering::SeqCst);
                Err(WatchError::Spawn(e))
            }
        }
    }

    /// Signal termination. Takes effect within one poll interval; never blocks.
    /// Also releases the shutdown subscription taken by [`ConfigWatcher::stop_on`].
    pub fn stop(&self) {
        self.inner.request_stop();
        let subscription = self.subscription.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    /// Stop when `signal` fires. A signal that already fired stops the
    /// watcher now.
    pub fn stop_on(&self, signal: &ShutdownSignal) {
        let subscription = signal.subscribe(self.stop_callback());
        *self.subscription.lock().unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    /// Holds only a weak reference, so a discarded watcher is not kept alive
    /// by the signal.
    fn stop_callback(&self) -> impl FnOnce() + Send + 'static {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!(watcher = %inner.name, "Tenant shutdown, stopping config watcher");
                inner.request_stop();
            }
        }
    }

    /// Wait for the polling thread to exit. Call after [`ConfigWatcher::stop`].
    pub fn join(&self) {
        let handle = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(watcher = %self.inner.name, "Config watcher thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher")
            .field("name", &self.inner.name)
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish()
    }
}
