//! Log line layout and severity parsing.
//!
//! Line format: `<severity> <timestamp> [<thread>] <logger>: <message>`, with
//! the severity left-aligned in five columns.

use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Parse a severity threshold as written in configuration files.
///
/// Accepts the usual names case-insensitively, plus `all` (= trace), `fatal`
/// (= error) and `off`/`none`.
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "all" | "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "fatal" => Some(LevelFilter::ERROR),
        "off" | "none" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Whether an event at `level` passes `threshold`.
pub fn enabled(level: Level, threshold: LevelFilter) -> bool {
    level <= threshold
}

fn severity(level: Level) -> &'static str {
    match level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARN",
        Level::ERROR => "ERROR",
    }
}

/// Render one line, without the trailing newline, stamped with the current
/// local time and thread.
pub fn format_line(level: Level, logger: &str, message: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
    let thread = std::thread::current();
    let thread_name = match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    };
    format!(
        "{:<5} {} [{}] {}: {}",
        severity(level),
        timestamp,
        thread_name,
        logger,
        message
    )
}
