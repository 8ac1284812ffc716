//! MemoryStore — an in-memory `RemoteStore` with failure injection.
//!
//! Backs demos and tests. Rows live in a `Vec` behind a `parking_lot::Mutex`
//! so insertion order is deterministic; ids are assigned from a counter.
//! `fail_next` arms a one-shot error that the next call of any kind returns
//! instead of touching the rows — the engine's rollback paths are exercised
//! against exactly this.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;

use async_trait::async_trait;

use crate::types::{BulkPatch, NewTask, OrderEntry, Task, TaskPatch};

use super::{RemoteStore, StoreError};

pub struct MemoryStore {
    rows: Mutex<Vec<Task>>,
    next_id: AtomicU64,
    fail_next: Mutex<Option<StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_next: Mutex::new(None),
        }
    }

    /// Arm a one-shot failure: the next store call returns `err` and leaves
    /// the rows untouched.
    pub fn fail_next(&self, err: StoreError) {
        *self.fail_next.lock() = Some(err);
    }

    /// All rows for an owner, in insertion order (test/demo inspection).
    pub fn rows_for(&self, owner_id: &str) -> Vec<Task> {
        self.rows
            .lock()
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Total row count across owners.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    fn take_failure(&self) -> Result<(), StoreError> {
        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn insert(&self, owner_id: &str, row: NewTask) -> Result<Task, StoreError> {
        self.take_failure()?;

        let id = format!("task-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let task = Task {
            id,
            owner_id: owner_id.to_string(),
            title: row.title,
            note: row.note,
            due_date: row.due_date,
            priority: row.priority,
            category: row.category,
            tags: row.tags,
            completed: row.completed,
            order_index: row.order_index,
            created_at: row.created_at.unwrap_or_else(Utc::now),
        };
        self.rows.lock().push(task.clone());
        Ok(task)
    }

    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        self.take_failure()?;

        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .ok_or_else(|| StoreError::Rejected(format!("no row {id} for owner {owner_id}")))?;
        patch.apply_to(row);
        Ok(row.clone())
    }

    async fn delete_one(&self, id: &str, owner_id: &str) -> Result<(), StoreError> {
        self.take_failure()?;

        self.rows
            .lock()
            .retain(|t| !(t.id == id && t.owner_id == owner_id));
        Ok(())
    }

    async fn delete_many(&self, ids: &[String], owner_id: &str) -> Result<(), StoreError> {
        self.take_failure()?;

        self.rows
            .lock()
            .retain(|t| !(t.owner_id == owner_id && ids.contains(&t.id)));
        Ok(())
    }

    async fn update_many(
        &self,
        ids: &[String],
        owner_id: &str,
        patch: BulkPatch,
    ) -> Result<(), StoreError> {
        self.take_failure()?;

        let mut rows = self.rows.lock();
        for row in rows
            .iter_mut()
            .filter(|t| t.owner_id == owner_id && ids.contains(&t.id))
        {
            patch.apply_to(row);
        }
        Ok(())
    }

    async fn upsert_order(&self, entries: &[OrderEntry]) -> Result<(), StoreError> {
        self.take_failure()?;

        let mut rows = self.rows.lock();
        for entry in entries {
            if let Some(row) = rows
                .iter_mut()
                .find(|t| t.id == entry.id && t.owner_id == entry.owner_id)
            {
                row.order_index = entry.order_index;
            }
        }
        Ok(())
    }

    async fn list_all(&self, owner_id: &str) -> Result<Vec<Task>, StoreError> {
        self.take_failure()?;
        Ok(self.rows_for(owner_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
