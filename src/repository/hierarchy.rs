//! Per-tenant logger hierarchy.
//!
//! # Responsibilities
//! - Hold the root level, per-logger levels and the attached sinks
//! - Resolve a logger's effective level by dotted-name ancestry
//! - Fan formatted lines out to every attached sink
//!
//! # Design Decisions
//! - The whole hierarchy is one immutable value behind an `ArcSwap`
//! - Reconfiguration swaps in a complete new value; a failed parse never
//!   touches the live one
//! - Logging reads are lock-free; sinks serialize their own writes

use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::Level;

use crate::repository::layout;
use crate::repository::sink::{Sink, SinkSpec};

/// Root level of a freshly created repository.
pub const DEFAULT_ROOT_LEVEL: LevelFilter = LevelFilter::INFO;

/// A sink attached to the root logger under a configuration name.
#[derive(Clone)]
pub struct AttachedSink {
    pub name: String,
    pub sink: Arc<dyn Sink>,
}

impl fmt::Debug for AttachedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedSink")
            .field("name", &self.name)
            .field("spec", &self.sink.spec())
            .finish()
    }
}

/// A complete logging configuration: levels plus sinks.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    root_level: LevelFilter,
    levels: BTreeMap<String, LevelFilter>,
    sinks: Vec<AttachedSink>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_LEVEL)
    }
}

impl Hierarchy {
    /// Empty hierarchy with the given root level.
    pub fn new(root_level: LevelFilter) -> Self {
        Self {
            root_level,
            levels: BTreeMap::new(),
            sinks: Vec::new(),
        }
    }

    pub fn with_logger_level(mut self, logger: impl Into<String>, level: LevelFilter) -> Self {
        self.levels.insert(logger.into(), level);
        self
    }

    pub fn with_sink(mut self, name: impl Into<String>, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(AttachedSink { name: name.into(), sink });
        self
    }

    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn sinks(&self) -> &[AttachedSink] {
        &self.sinks
    }

    /// Level configured for `logger` or its nearest dotted ancestor, else root.
    pub fn effective_level(&self, logger: &str) -> LevelFilter {
        let mut name = logger;
        loop {
            if let Some(level) = self.levels.get(name) {
                return *level;
            }
            match name.rsplit_once('.') {
                Some((parent, _)) => name = parent,
                None => return self.root_level,
            }
        }
    }
}

/// One isolated logging subsystem: a tenant's (or the host's) loggers and sinks.
pub struct LogRepository {
    label: String,
    state: ArcSwap<Hierarchy>,
}

impl LogRepository {
    /// New repository with no sinks and the default root level.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: ArcSwap::from_pointee(Hierarchy::default()),
        }
    }

    /// Owner label, used in diagnostics.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the whole configuration.
    pub fn configure(&self, hierarchy: Hierarchy) {
        tracing::debug!(
            repository = %self.label,
            root_level = %hierarchy.root_level,
            sinks = hierarchy.sinks.len(),
            "Repository reconfigured"
        );
        self.state.store(Arc::new(hierarchy));
    }

    /// Attach one more sink to the root logger.
    pub fn add_sink(&self, name: impl Into<String>, sink: Arc<dyn Sink>) {
        let name = name.into();
        self.state.rcu(|current| {
            Hierarchy::clone(current).with_sink(name.clone(), sink.clone())
        });
    }

    /// Back to an empty hierarchy at the default root level.
    pub fn reset(&self) {
        self.state.store(Arc::new(Hierarchy::default()));
    }

    /// Current configuration snapshot.
    pub fn snapshot(&self) -> Arc<Hierarchy> {
        self.state.load_full()
    }

    pub fn root_level(&self) -> LevelFilter {
        self.state.load().root_level
    }

    /// Descriptions of the effective sink set, in attachment order.
    pub fn sinks(&self) -> Vec<SinkSpec> {
        self.state.load().sinks.iter().map(|s| s.sink.spec()).collect()
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.state.load().sinks.iter().map(|s| s.name.clone()).collect()
    }

    pub fn effective_level(&self, logger: &str) -> LevelFilter {
        self.state.load().effective_level(logger)
    }

    /// Named logger handle.
    pub fn logger(self: &Arc<Self>, name: impl Into<String>) -> Logger {
        Logger {
            name: Arc::from(name.into()),
            repository: self.clone(),
        }
    }

    /// Emit one event through the named logger.
    pub fn log(&self, logger: &str, level: Level, message: &str) {
        let state = self.state.load();
        if !layout::enabled(level, state.effective_level(logger)) || state.sinks.is_empty() {
            return;
        }

        let line = layout::format_line(level, logger, message);
        for attached in state.sinks.iter() {
            if let Err(e) = attached.sink.append(&line) {
                tracing::warn!(
                    repository = %self.label,
                    sink = %attached.name,
                    error = %e,
                    "Failed to write log line"
                );
            }
        }
    }

    /// Flush every attached sink.
    pub fn flush(&self) {
        for attached in self.state.load().sinks.iter() {
            if let Err(e) = attached.sink.flush() {
                tracing::warn!(repository = %self.label, sink = %attached.name, error = %e, "Failed to flush sink");
            }
        }
    }
}

impl fmt::Debug for LogRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        f.debug_struct("LogRepository")
            .field("label", &self.label)
            .field("root_level", &state.root_level)
            .field("sinks", &state.sinks)
            .finish()
    }
}

/// Handle to a named logger inside one repository.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    repository: Arc<LogRepository>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        layout::enabled(level, self.repository.effective_level(&self.name))
    }

    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        self.repository.log(&self.name, level, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::ERROR, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::WARN, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::INFO, message);
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::DEBUG, message);
    }

    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(Level::TRACE, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("repository", &self.repository.label)
            .finish()
    }
}
