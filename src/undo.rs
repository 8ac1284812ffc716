//! UndoBuffer — time-boxed staging area for recently deleted records.
//!
//! Holds at most one pending unit; staging a new one discards whatever was
//! pending (only the most recent destructive action is undoable). Each stage
//! spawns a `tokio::time::sleep` expiry task guarded by a generation
//! counter: `take()`, `clear()`, and re-staging all bump the generation, so
//! a stale timer that finally fires finds the generation moved on and does
//! nothing. No task handles to track or abort.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::types::Task;

/// Default time a deleted record stays restorable.
pub const DEFAULT_UNDO_TIMEOUT: Duration = Duration::from_millis(6000);

/// One undoable destructive action: the full snapshots it removed, in their
/// pre-delete cache order, plus the human-readable message shown in the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoUnit {
    pub snapshots: Vec<Task>,
    pub message: String,
}

#[derive(Debug, Default)]
struct UndoInner {
    unit: Option<UndoUnit>,
    generation: u64,
}

pub struct UndoBuffer {
    inner: Arc<Mutex<UndoInner>>,
    timeout: Duration,
}

impl UndoBuffer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(UndoInner::default())),
            timeout,
        }
    }

    /// Stage a new unit, discarding any pending one, and (re)start the
    /// shared expiry timer.
    ///
    /// Must be called from within a tokio runtime (the expiry task is
    /// spawned here).
    pub fn stage(&self, snapshots: Vec<Task>, message: impl Into<String>) {
        debug_assert!(!snapshots.is_empty(), "undo unit must be non-empty");

        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.unit = Some(UndoUnit {
                snapshots,
                message: message.into(),
            });
            inner.generation
        };

        let inner = Arc::clone(&self.inner);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut guard = inner.lock();
            // Anything that touched the buffer since we were scheduled
            // bumped the generation — this timer is then stale.
            if guard.generation == generation {
                guard.unit = None;
                tracing::debug!("undo window expired, snapshots discarded");
            }
        });
    }

    /// Take the pending unit, cancelling its expiry. Returns `None` when
    /// nothing is pending (already undone, expired, or never staged).
    pub fn take(&self) -> Option<UndoUnit> {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.unit.take()
    }

    /// Discard the pending unit and cancel its expiry (session reset).
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.unit = None;
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().unit.is_some()
    }

    /// The pending unit's message, for the UI's undo toast/banner.
    pub fn pending_message(&self) -> Option<String> {
        self.inner.lock().unit.as_ref().map(|u| u.message.clone())
    }
}

impl Default for UndoBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_TIMEOUT)
    }
}
