//! Host diagnostics logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber for the host process
//! - Pick human-readable or JSON output
//!
//! # Design Decisions
//! - The registry's own diagnostics go through `tracing`, never through a
//!   tenant repository, so a broken tenant configuration cannot hide them
//! - `RUST_LOG` overrides the default filter

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "tenant_logging=info";

/// Install the global subscriber. Returns an error if one is already set.
pub fn init_tracing(json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}
