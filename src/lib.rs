//! Tenant-isolated logging configuration registry with hot reload.

// Core subsystems
pub mod config;
pub mod loader;
pub mod registry;
pub mod repository;
pub mod tenant;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::RegistrySettings;
pub use lifecycle::ShutdownSignal;
pub use registry::{RegistryError, TenantRepositoryRegistry};
pub use repository::{LogRepository, Logger};
pub use tenant::{Tenant, TenantIdentity};
