//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / watchers produce:
//!     → logging.rs (structured host diagnostics via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → host stdout (fmt or JSON)
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
