// LogScope - app/observers.rs
//
// Observer registry: identity-keyed fan-out with idempotent
// subscribe/unsubscribe contracts.
//
// Observers are held as `Arc<O>` and compared by pointer identity
// (`Arc::ptr_eq`): subscribing the same Arc twice is a no-op, as is
// unsubscribing one that was never registered. Invocation is synchronous,
// in registration order, on the thread that produced the change.

use crate::core::model::LogEntry;
use std::sync::Arc;

/// A subscriber interested in incremental or full-window entry batches.
///
/// `entries` is a batch of one entry on the incremental path (a new entry
/// or the continuation-updated tail entry), the full window on a reload,
/// or empty on a clear. `size_hint` is the collaborator-supplied byte-size
/// indicator associated with the batch, passed through opaquely.
pub trait BatchObserver: Send + Sync {
    fn on_batch(&self, entries: &[LogEntry], size_hint: Option<u64>);
}

/// A subscriber interested in one counter's value changes.
pub trait CountObserver: Send + Sync {
    fn on_count(&self, value: usize);
}

/// Sink for reload failures: the engine reports, the collaborator decides
/// how to surface them (banner, alert, status line).
pub trait ReloadErrorSink: Send + Sync {
    fn on_reload_error(&self, host: &str, error: &crate::util::error::TransportError);
}

/// Registry of `Arc`-held observers keyed by pointer identity.
pub struct ObserverSet<O: ?Sized> {
    observers: Vec<Arc<O>>,
}

impl<O: ?Sized> ObserverSet<O> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Register an observer. No-op if this exact Arc is already present.
    pub fn subscribe(&mut self, observer: Arc<O>) {
        if !self.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            self.observers.push(observer);
        }
    }

    /// Deregister an observer. No-op if this exact Arc is not present.
    pub fn unsubscribe(&mut self, observer: &Arc<O>) {
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Iterate observers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<O>> {
        self.observers.iter()
    }
}

impl<O: ?Sized> Default for ObserverSet<O> {
    fn default() -> Self {
        Self::new()
    }
}
