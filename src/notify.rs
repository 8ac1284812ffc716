//! User-facing notifications.
//!
//! Mutations report their outcomes as short [`Toast`] messages; destructive
//! ones attach an action label (`"Undo"`) the UI can render as a button. The
//! engine owns a single [`ToastHub`] and UI layers subscribe to it.
//!
//! Dispatch is synchronous and holds no internal lock while a callback runs,
//! so a callback is free to subscribe or unsubscribe (itself included)
//! mid-dispatch. The listener set is captured per dispatch: a listener
//! removed that way still sees the toast already in flight, and one added
//! that way waits for the next.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle for cancelling a subscription via [`ToastHub::unsubscribe`].
pub type ListenerId = u64;

type ToastFn = dyn Fn(&Toast) + Send + Sync;

// ============================================================================
// Toast
// ============================================================================

/// A transient notification: what happened, and optionally what the user
/// can still do about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub action: Option<String>,
}

// ============================================================================
// ToastHub
// ============================================================================

/// Dispatch point for [`Toast`]s.
pub struct ToastHub {
    listeners: Mutex<Vec<(ListenerId, Arc<ToastFn>)>>,
    next_id: AtomicU64,
}

impl ToastHub {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Plain informational toast.
    pub fn info(&self, message: impl Into<String>) {
        self.dispatch(Toast {
            message: message.into(),
            action: None,
        });
    }

    /// Toast carrying an action label, e.g. `"Undo"`.
    pub fn undoable(&self, message: impl Into<String>, action: impl Into<String>) {
        self.dispatch(Toast {
            message: message.into(),
            action: Some(action.into()),
        });
    }

    pub fn subscribe(&self, callback: impl Fn(&Toast) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(callback)));
        id
    }

    /// Drop a subscription. Unknown ids are ignored, so double-unsubscribe
    /// is harmless.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    fn dispatch(&self, toast: Toast) {
        // Clone the listener handles out, then run them lock-free.
        let listeners: Vec<Arc<ToastFn>> = {
            let guard = self.listeners.lock();
            guard.iter().map(|(_, f)| Arc::clone(f)).collect()
        };
        for listener in listeners {
            listener(&toast);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for ToastHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
