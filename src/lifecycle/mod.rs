//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Tenant shutdown (shutdown.rs):
//!     Tenant::shutdown → ShutdownSignal::trigger → subscribers (watcher stop)
//!
//! Host signals (signals.rs):
//!     SIGTERM/SIGINT → host shuts down tenants, then the registry
//! ```
//!
//! # Design Decisions
//! - Signalling never blocks; callers that must wait join explicitly
//! - A subscriber added after the trigger runs immediately

pub mod shutdown;
pub mod signals;

pub use shutdown::{ShutdownSignal, Subscription};
