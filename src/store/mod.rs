//! Remote row store interface.
//!
//! The engine treats the store as an external collaborator offering row-level
//! operations over one owner-scoped `tasks` collection. Per-statement
//! atomicity only — bulk operations are single filtered statements with no
//! per-row result, which is why the engine rolls bulk failures back
//! all-or-nothing locally.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{BulkPatch, NewTask, OrderEntry, Task, TaskPatch};

pub use memory::MemoryStore;

// ============================================================================
// StoreError
// ============================================================================

/// A remote call failure. The engine treats all kinds uniformly (rollback,
/// then surface); the kinds exist so callers can word their messaging.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected the operation: {0}")]
    Rejected(String),

    #[error("Not authorized for owner \"{0}\"")]
    Unauthorized(String),
}

// ============================================================================
// RemoteStore trait
// ============================================================================

/// Row-level operations over the owner-scoped `tasks` collection.
///
/// Every method is scoped to an owner id; an implementation must never read
/// or write a row whose owner does not match. All calls are fallible and the
/// engine never retries automatically.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert a new row. The store assigns the id (and `created_at` when the
    /// row does not carry one) and returns the confirmed record.
    async fn insert(&self, owner_id: &str, row: NewTask) -> Result<Task, StoreError>;

    /// Patch one row and return the confirmed record.
    async fn update(&self, id: &str, owner_id: &str, patch: TaskPatch)
        -> Result<Task, StoreError>;

    /// Delete one row.
    async fn delete_one(&self, id: &str, owner_id: &str) -> Result<(), StoreError>;

    /// Delete all rows matching the id set — a single filtered statement,
    /// all-or-nothing from the client's perspective.
    async fn delete_many(&self, ids: &[String], owner_id: &str) -> Result<(), StoreError>;

    /// Apply the same sparse patch to all rows matching the id set.
    async fn update_many(
        &self,
        ids: &[String],
        owner_id: &str,
        patch: BulkPatch,
    ) -> Result<(), StoreError>;

    /// Persist a batch of `order_index` reassignments.
    async fn upsert_order(&self, entries: &[OrderEntry]) -> Result<(), StoreError>;

    /// Initial load: every row belonging to the owner.
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Task>, StoreError>;
}
