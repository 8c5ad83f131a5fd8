//! Thread-scoped tenant context.
//!
//! The host enters a tenant on every thread that runs work on the tenant's
//! behalf. The repository registry reads the innermost entered tenant to pick
//! the repository for the calling thread.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::lifecycle::ShutdownSignal;
use crate::tenant::identity::{TenantId, TenantIdentity};
use crate::tenant::resources::ResourceResolver;

thread_local! {
    static CURRENT: RefCell<Vec<Arc<Tenant>>> = const { RefCell::new(Vec::new()) };
}

/// One deployed application unit, as seen by the logging registry.
pub struct Tenant {
    id: TenantId,
    resources: Arc<dyn ResourceResolver>,
    shutdown: ShutdownSignal,
}

impl Tenant {
    /// Create a tenant with its own resource namespace and a fresh shutdown signal.
    pub fn new(id: impl Into<TenantId>, resources: Arc<dyn ResourceResolver>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            resources,
            shutdown: ShutdownSignal::new(),
        })
    }

    pub fn id(&self) -> &TenantId {
        &self.id
    }

    pub fn identity(&self) -> TenantIdentity {
        TenantIdentity::Tenant(self.id.clone())
    }

    pub fn resources(&self) -> &dyn ResourceResolver {
        self.resources.as_ref()
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Tear the tenant down. Subscribed watchers stop.
    pub fn shutdown(&self) {
        tracing::debug!(tenant = %self.id, "Tenant shutdown signalled");
        self.shutdown.trigger();
    }

    /// Mark the current thread as running on behalf of this tenant until the
    /// returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> TenantGuard {
        let depth = CURRENT.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(self.clone());
            stack.len() - 1
        });
        TenantGuard { depth, _not_send: std::marker::PhantomData }
    }
}

impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

/// Restores the previous tenant context on drop. Dropping an outer guard
/// also ends every context entered inside it.
#[must_use = "the tenant context ends when the guard is dropped"]
pub struct TenantGuard {
    /// Stack length before this guard's tenant was pushed.
    depth: usize,
    // Must be dropped on the thread that entered.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}

/// The innermost tenant entered on this thread.
pub fn current() -> Option<Arc<Tenant>> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// Identity of the calling context; the host sentinel when no tenant is entered.
pub fn current_identity() -> TenantIdentity {
    current().map_or(TenantIdentity::Host, |t| t.identity())
}
