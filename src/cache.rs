//! TaskCache — the in-memory, ordered task collection for one owner.
//!
//! Mutated only by the mutation engine and the session load/reset step.
//! Readers (view projection, selection, ordering planner) take clones; the
//! cache itself never hands out mutable access beyond the engine.

use crate::types::Task;

#[derive(Debug, Default)]
pub struct TaskCache {
    tasks: Vec<Task>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Cloned snapshot of every record, in cache order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Replace the whole collection (initial load).
    pub(crate) fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub(crate) fn clear(&mut self) {
        self.tasks.clear();
    }

    pub(crate) fn push_front(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Remove a record, returning its position and the record itself so a
    /// failed remote call can reinsert it exactly where it was.
    pub(crate) fn remove(&mut self, id: &str) -> Option<(usize, Task)> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        Some((pos, self.tasks.remove(pos)))
    }

    /// Remove every record matching the id set, returning them in cache order.
    pub(crate) fn remove_many(&mut self, ids: &[String]) -> Vec<Task> {
        let mut removed = Vec::new();
        self.tasks.retain(|t| {
            if ids.contains(&t.id) {
                removed.push(t.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Reinsert at a prior position, clamped in case the cache shrank.
    pub(crate) fn insert_at(&mut self, pos: usize, task: Task) {
        let pos = pos.min(self.tasks.len());
        self.tasks.insert(pos, task);
    }

    /// `order_index` for a record inserted at the "front" of the manual
    /// order: `min(existing) - 1`, or `0` for an empty cache. Front insertion
    /// never renumbers existing records.
    pub fn front_order_index(&self) -> i64 {
        self.tasks
            .iter()
            .map(|t| t.order_index)
            .min()
            .map(|min| min - 1)
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
