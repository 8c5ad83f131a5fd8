//! Isolated logging subsystems.
//!
//! # Data Flow
//! ```text
//! Logger::info("...")
//!     → LogRepository (effective level by dotted name)
//!     → layout.rs (severity, timestamp, thread, logger, message)
//!     → every attached sink (console, rolling file)
//!
//! Reconfiguration:
//!     loader builds a Hierarchy
//!     → LogRepository::configure swaps it in atomically
//! ```

pub mod hierarchy;
pub mod layout;
pub mod rolling;
pub mod sink;

pub use hierarchy::{AttachedSink, Hierarchy, LogRepository, Logger, DEFAULT_ROOT_LEVEL};
pub use rolling::RollingFileSink;
pub use sink::{ConsoleSink, ConsoleTarget, Sink, SinkSpec, DEFAULT_MAX_BACKUPS, DEFAULT_MAX_FILE_SIZE};
