//! Log sinks.
//!
//! # Responsibilities
//! - Describe a sink as data (`SinkSpec`) so configurations can be compared
//! - Build live sinks from their description
//! - Console output; file output lives in `rolling.rs`

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::repository::rolling::RollingFileSink;

/// Default rotation threshold in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_000_000;

/// Default number of rolled backups kept.
pub const DEFAULT_MAX_BACKUPS: usize = 100;

/// Console stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

impl ConsoleTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stdout" | "system.out" => Some(ConsoleTarget::Stdout),
            "stderr" | "system.err" => Some(ConsoleTarget::Stderr),
            _ => None,
        }
    }
}

/// Description of a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSpec {
    /// Size-rotated file.
    RollingFile {
        path: PathBuf,
        max_file_size: u64,
        max_backups: usize,
    },
    /// Standard output or error.
    Console { target: ConsoleTarget },
}

impl SinkSpec {
    /// Construct the live sink. Files are opened lazily on first write.
    pub fn build(&self) -> Arc<dyn Sink> {
        match self {
            SinkSpec::RollingFile { path, max_file_size, max_backups } => {
                Arc::new(RollingFileSink::new(path.clone(), *max_file_size, *max_backups))
            }
            SinkSpec::Console { target } => Arc::new(ConsoleSink::new(*target)),
        }
    }
}

/// A destination for formatted log lines.
pub trait Sink: Send + Sync {
    /// The description this sink was built from.
    fn spec(&self) -> SinkSpec;

    /// Append one line. The sink adds the line terminator.
    fn append(&self, line: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes lines to stdout or stderr.
#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget) -> Self {
        Self { target }
    }
}

impl Sink for ConsoleSink {
    fn spec(&self) -> SinkSpec {
        SinkSpec::Console { target: self.target }
    }

    fn append(&self, line: &str) -> io::Result<()> {
        match self.target {
            ConsoleTarget::Stdout => writeln!(io::stdout().lock(), "{}", line),
            ConsoleTarget::Stderr => writeln!(io::stderr().lock(), "{}", line),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.target {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
        }
    }
}
