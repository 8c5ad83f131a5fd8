//! Tenant identity and execution context.
//!
//! # Data Flow
//! ```text
//! Host deploys an application unit:
//!     → Tenant::new(id, resolver)
//!     → worker threads call tenant.enter()
//!     → registry reads context::current() to pick a repository
//!
//! Host undeploys:
//!     → tenant.shutdown() fires the ShutdownSignal
//!     → subscribed config watchers stop
//! ```
//!
//! # Design Decisions
//! - Identity is a host-supplied key compared by value, never an address
//! - Resource lookups stay inside the tenant's own namespace
//! - Context is thread-scoped and restored by a guard

pub mod context;
pub mod identity;
pub mod resources;

pub use context::{current, current_identity, Tenant, TenantGuard};
pub use identity::{TenantId, TenantIdentity};
pub use resources::{
    DirectoryResolver, DiscoveryError, HostHome, HostPaths, PackagedResources, ResourceResolver,
};
