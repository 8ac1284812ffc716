//! The one optimistic-update helper every mutating path goes through.
//!
//! Call sites apply their change synchronously under the state lock, build a
//! `revert` closure that is the *literal inverse* of what they applied
//! (captured snapshots, never recomputation), then hand the remote future
//! and the revert pair here. Centralizing the rollback keeps the
//! apply∘revert = identity property uniform across operations instead of
//! re-implemented carefully at each site.

use std::future::Future;

use crate::{
    error::Result,
    store::StoreError,
};

use super::{EngineState, TaskEngine};

impl TaskEngine {
    /// Await `remote`; on failure, run `revert` against the current state
    /// and surface the error. The revert only runs if the session epoch
    /// still matches the one captured at apply time — after a session
    /// change the cache was rebuilt and there is nothing left to revert.
    ///
    /// The state lock must not be held by the caller.
    pub(crate) async fn confirm_or_rollback<F>(
        &self,
        epoch: u64,
        remote: F,
        revert: impl FnOnce(&mut EngineState),
    ) -> Result<()>
    where
        F: Future<Output = std::result::Result<(), StoreError>>,
    {
        match remote.await {
            Ok(()) => Ok(()),
            Err(e) => {
                let mut state = self.state.lock();
                if state.epoch == epoch {
                    tracing::debug!(error = %e, "remote call failed, rolling back optimistic change");
                    revert(&mut state);
                } else {
                    tracing::debug!(error = %e, "remote call failed after session change, rollback skipped");
                }
                Err(e.into())
            }
        }
    }
}
