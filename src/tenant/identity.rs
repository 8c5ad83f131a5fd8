//! Tenant identity types.

use std::fmt;
use std::sync::Arc;

/// Stable key for one application unit, supplied by the host.
///
/// Two keys are the same tenant iff their strings are equal. The host must not
/// hand the same key to a second unit while the first is still alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(Arc<str>);

impl TenantId {
    /// Create a tenant ID from the host's key.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TenantId {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

/// Cache key for the repository registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantIdentity {
    /// No tenant: the host's own logging.
    Host,
    /// A deployed application unit.
    Tenant(TenantId),
}

impl TenantIdentity {
    /// Return true for the host sentinel.
    pub fn is_host(&self) -> bool {
        matches!(self, TenantIdentity::Host)
    }
}

impl fmt::Display for TenantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantIdentity::Host => f.write_str("<host>"),
            TenantIdentity::Tenant(id) => write!(f, "{}", id),
        }
    }
}

impl From<TenantId> for TenantIdentity {
    fn from(id: TenantId) -> Self {
        TenantIdentity::Tenant(id)
    }
}
