use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use log::error;
use crate::client::PublisherState;
use crate::connection::ConnectionState;
use crate::Error;

/// One payload written to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherOutput {
    pub bytes: Vec<u8>,
    pub timestamp: u32,
}

/// A failure reported to listeners, with the error that caused it
#[derive(Debug, Clone)]
pub struct PublisherError {
    pub message: String,
    pub cause: Arc<Error>,
}

impl PublisherError {
    pub fn new(cause: Error) -> Self {
        PublisherError {
            message: cause.to_string(),
            cause: Arc::new(cause),
        }
    }
}

/// Receives publisher events. Calls are synchronous, on the session task,
/// so implementations should return quickly.
pub trait PublisherListener: Send + Sync {
    fn on_state(&self, _state: &PublisherState) {}

    fn on_connection_state(&self, _state: &ConnectionState) {}

    fn on_output(&self, _output: &PublisherOutput) {}

    fn on_error(&self, _error: &PublisherError) {}
}

/// Handle returned on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listeners in registration order
pub struct ListenerRegistry {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn PublisherListener>)>>,
    next_id: AtomicU64,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    /// Create new registry
    pub fn new() -> Self {
        ListenerRegistry {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register listener
    pub fn add(&self, listener: Arc<dyn PublisherListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Unregister listener; false if the id is unknown
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `f` on every listener. Works on a snapshot, so listeners may
    /// add or remove listeners from inside a callback. A panicking
    /// listener is logged and skipped.
    pub fn notify(&self, event: &str, f: impl Fn(&dyn PublisherListener)) {
        let snapshot: Vec<(ListenerId, Arc<dyn PublisherListener>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))).is_err() {
                error!("Listener {:?} panicked handling {}", id, event);
            }
        }
    }

    pub fn notify_state(&self, state: &PublisherState) {
        self.notify("state", |l| l.on_state(state));
    }

    pub fn notify_connection_state(&self, state: &ConnectionState) {
        self.notify("connection state", |l| l.on_connection_state(state));
    }

    pub fn notify_output(&self, output: &PublisherOutput) {
        self.notify("output", |l| l.on_output(output));
    }

    pub fn notify_error(&self, error: &PublisherError) {
        self.notify("error", |l| l.on_error(error));
    }
}
