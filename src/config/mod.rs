//! Registry settings.
//!
//! # Data Flow
//! ```text
//! <home>/conf/registry.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RegistrySettings (validated, immutable)
//!     → TenantRepositoryRegistry
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal settings files
//! - Validation separates syntactic (serde) from semantic checks
//! - Tenant logging configuration is NOT handled here; see `loader`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{DefaultSinkConfig, RegistrySettings};
