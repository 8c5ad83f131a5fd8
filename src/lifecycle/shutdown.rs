//! Tenant shutdown coordination.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct State {
    triggered: bool,
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

/// Handle to a registered callback. Dropping it keeps the callback;
/// [`Subscription::cancel`] removes it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    state: Weak<Mutex<State>>,
}

impl Subscription {
    /// Remove the callback without running it. No-op once the signal fired.
    pub fn cancel(self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}

/// One-shot shutdown notification for a tenant.
///
/// Every subscribed callback runs exactly once, on the thread that calls
/// [`ShutdownSignal::trigger`]. Subscribing after the trigger runs the callback
/// immediately on the subscribing thread.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    state: Arc<Mutex<State>>,
}

impl ShutdownSignal {
    /// Create a new, untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for teardown.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let id = state.next_id;
        state.next_id += 1;
        if state.triggered {
            drop(state);
            callback();
        } else {
            state.callbacks.push((id, Box::new(callback)));
        }
        Subscription { id, state: Arc::downgrade(&self.state) }
    }

    /// Fire the signal. Later calls are no-ops.
    pub fn trigger(&self) {
        let callbacks = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.triggered {
                return;
            }
            state.triggered = true;
            std::mem::take(&mut state.callbacks)
        };

        // Run outside the lock so callbacks may subscribe or inspect the signal.
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Whether the signal has fired.
    pub fn is_triggered(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).triggered
    }

    /// Number of callbacks waiting for the trigger.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).callbacks.len()
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callbacks_run_once() {
        let signal = ShutdownSignal::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = count.clone();
            signal.subscribe(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(signal.subscriber_count(), 3);

        signal.trigger();
        signal.trigger();
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(signal.is_triggered());
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_late_subscriber_runs_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        signal.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_subscription_never_runs() {
        let signal = ShutdownSignal::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let cancelled = signal.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let c = count.clone();
        let _kept = signal.subscribe(move || {
            c.fetch_add(10, Ordering::SeqCst);
        });
        assert_eq!(signal.subscriber_count(), 2);

        cancelled.cancel();
        assert_eq!(signal.subscriber_count(), 1);

        signal.trigger();
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_clones_share_state() {
        let signal = ShutdownSignal::new();
        let other = signal.clone();
        other.trigger();
        assert!(signal.is_triggered());
    }
}
