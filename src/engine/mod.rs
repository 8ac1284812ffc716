//! TaskEngine — the mutation engine.
//!
//! Translates user-intent operations into (a) an immediate optimistic cache
//! update where the operation's shape is fully known client-side, (b)
//! exactly one remote call, and (c) a deterministic reconciliation step.
//! Create and update are *not* optimistic (the store owns generated fields
//! and final validation); completion toggles and all bulk operations are.
//!
//! # Threading model
//!
//! All public methods take `&self`; state lives behind a single
//! `parking_lot::Mutex` that is **never held across an `.await`**. Each
//! operation applies its optimistic change synchronously under the lock,
//! releases it, awaits the remote call, then re-locks to commit or roll
//! back. A session epoch is captured alongside the apply step: completions
//! landing after a `start_session`/`reset_session` find the epoch moved on
//! and leave the cache alone, so an in-flight call can never leak rows
//! across a sign-out/sign-in.

mod optimistic;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::{
    cache::TaskCache,
    error::{EngineError, Result, ValidationError},
    notify::{ListenerId, Toast, ToastHub},
    ordering::{manual_order, plan_move},
    selection::SelectionModel,
    store::RemoteStore,
    types::{BulkPatch, NewTask, OrderEntry, Task, TaskDraft, TaskPatch, MAX_TAGS},
    undo::{UndoBuffer, DEFAULT_UNDO_TIMEOUT},
    view::{project, ViewState},
};

// ============================================================================
// Engine state
// ============================================================================

pub(crate) struct EngineState {
    owner_id: Option<String>,
    /// Bumped on every session change; in-flight completions compare it
    /// before touching the cache.
    epoch: u64,
    pub(crate) cache: TaskCache,
    categories: Vec<String>,
    selection: SelectionModel,
}

impl EngineState {
    fn check_category(&self, name: &str) -> Result<(), ValidationError> {
        if self.categories.iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(ValidationError::UnknownCategory(name.to_string()))
        }
    }
}

// ============================================================================
// TaskEngine
// ============================================================================

pub struct TaskEngine {
    store: Arc<dyn RemoteStore>,
    pub(crate) state: Mutex<EngineState>,
    undo: UndoBuffer,
    toasts: ToastHub,
}

impl TaskEngine {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_undo_timeout(store, DEFAULT_UNDO_TIMEOUT)
    }

    pub fn with_undo_timeout(store: Arc<dyn RemoteStore>, undo_timeout: Duration) -> Self {
        Self {
            store,
            state: Mutex::new(EngineState {
                owner_id: None,
                epoch: 0,
                cache: TaskCache::new(),
                categories: Vec::new(),
                selection: SelectionModel::new(),
            }),
            undo: UndoBuffer::new(undo_timeout),
            toasts: ToastHub::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Begin a session for `owner_id`: clear all prior state, bump the
    /// epoch, and load the owner's tasks. Returns the number loaded.
    pub async fn start_session(&self, owner_id: impl Into<String>) -> Result<usize> {
        let owner = owner_id.into();
        let epoch = {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.owner_id = Some(owner.clone());
            state.cache.clear();
            state.selection.clear();
            state.epoch
        };
        self.undo.clear();

        let tasks = match self.store.list_all(&owner).await {
            Ok(tasks) => tasks,
            Err(e) => {
                // The session never activates: a populated owner with an
                // empty cache would let later adds compute order indices
                // against rows they cannot see.
                let mut state = self.state.lock();
                if state.epoch == epoch {
                    state.owner_id = None;
                }
                return Err(e.into());
            }
        };

        let mut state = self.state.lock();
        if state.epoch != epoch {
            // Another session change won the race — drop this load.
            return Ok(0);
        }
        let count = tasks.len();
        state.cache.replace_all(tasks);
        Ok(count)
    }

    /// Sign-out: clear everything and invalidate in-flight completions.
    pub fn reset_session(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.owner_id = None;
        state.cache.clear();
        state.selection.clear();
        drop(state);
        self.undo.clear();
    }

    fn epoch_current(&self, epoch: u64) -> bool {
        self.state.lock().epoch == epoch
    }

    fn session_info(&self) -> Result<(String, u64)> {
        let state = self.state.lock();
        match &state.owner_id {
            Some(owner) => Ok((owner.clone(), state.epoch)),
            None => Err(EngineError::NoSession),
        }
    }

    // -----------------------------------------------------------------------
    // Single-record operations
    // -----------------------------------------------------------------------

    /// Create a task. Not optimistic: the id is store-assigned, so the
    /// record only enters the cache once the insert is confirmed — a failed
    /// add leaves no trace locally.
    pub async fn add(&self, draft: TaskDraft) -> Result<Task> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if draft.tags.len() > MAX_TAGS {
            return Err(ValidationError::TooManyTags {
                count: draft.tags.len(),
                max: MAX_TAGS,
            }
            .into());
        }

        let (owner, epoch) = self.session_info()?;
        let (category, order_index) = {
            let state = self.state.lock();
            let category = if draft.category.trim().is_empty() {
                // Default to the owner's first category; uncategorized when
                // the owner has none.
                state.categories.first().cloned().unwrap_or_default()
            } else {
                state.check_category(&draft.category)?;
                draft.category.clone()
            };
            (category, state.cache.front_order_index())
        };

        let row = NewTask {
            title,
            note: draft.note,
            due_date: draft.due_date,
            priority: draft.priority,
            category,
            tags: draft.tags,
            completed: false,
            order_index,
            created_at: None,
        };

        match self.store.insert(&owner, row).await {
            Ok(task) => {
                let mut state = self.state.lock();
                if state.epoch == epoch {
                    state.cache.push_front(task.clone());
                }
                Ok(task)
            }
            Err(e) => {
                self.toasts.info("Could not add the task");
                Err(e.into())
            }
        }
    }

    /// Edit a task. Not optimistic: the cache only changes once the store
    /// confirms, so a rejected edit is never shown. Returns `Ok(None)` when
    /// the id is no longer cached (a concurrent deletion already removed it).
    pub async fn update(&self, id: &str, mut patch: TaskPatch) -> Result<Option<Task>> {
        if let Some(ref title) = patch.title {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyTitle.into());
            }
            patch.title = Some(trimmed.to_string());
        }
        if let Some(ref tags) = patch.tags {
            if tags.len() > MAX_TAGS {
                return Err(ValidationError::TooManyTags {
                    count: tags.len(),
                    max: MAX_TAGS,
                }
                .into());
            }
        }

        let (owner, epoch) = self.session_info()?;
        {
            let state = self.state.lock();
            if !state.cache.contains(id) {
                return Ok(None);
            }
            if let Some(ref category) = patch.category {
                if !category.trim().is_empty() {
                    state.check_category(category)?;
                }
            }
        }

        match self.store.update(id, &owner, patch).await {
            Ok(confirmed) => {
                let mut state = self.state.lock();
                if state.epoch == epoch {
                    if let Some(task) = state.cache.get_mut(id) {
                        *task = confirmed.clone();
                    }
                }
                Ok(Some(confirmed))
            }
            Err(e) => {
                self.toasts.info("Could not save the task");
                Err(e.into())
            }
        }
    }

    /// Flip `completed`. Optimistic: the cache flips immediately; on remote
    /// failure the pre-flip boolean is restored exactly (kept, not
    /// re-derived, so racing toggles cannot compound). Returns the new value,
    /// or `Ok(None)` when the id is no longer cached.
    pub async fn toggle_completed(&self, id: &str) -> Result<Option<bool>> {
        let (owner, epoch) = self.session_info()?;

        let prior = {
            let mut state = self.state.lock();
            match state.cache.get_mut(id) {
                None => return Ok(None),
                Some(task) => {
                    let prior = task.completed;
                    task.completed = !prior;
                    prior
                }
            }
        };

        let patch = TaskPatch {
            completed: Some(!prior),
            ..Default::default()
        };
        let revert_id = id.to_string();

        let outcome = self
            .confirm_or_rollback(
                epoch,
                async { self.store.update(id, &owner, patch).await.map(|_| ()) },
                move |state| {
                    if let Some(task) = state.cache.get_mut(&revert_id) {
                        task.completed = prior;
                    }
                },
            )
            .await;

        match outcome {
            Ok(()) => Ok(Some(!prior)),
            Err(e) => {
                self.toasts
                    .info("Could not update the task");
                Err(e)
            }
        }
    }

    /// Delete a task. Optimistic: the record leaves the cache immediately;
    /// on remote failure it is reinserted at its prior position. On success
    /// the snapshot is staged for undo. Returns `Ok(false)` when the id is
    /// no longer cached.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let (owner, epoch) = self.session_info()?;

        let (pos, snapshot) = {
            let mut state = self.state.lock();
            match state.cache.remove(id) {
                None => return Ok(false),
                Some(removed) => removed,
            }
        };

        let revert_snapshot = snapshot.clone();
        let outcome = self
            .confirm_or_rollback(
                epoch,
                self.store.delete_one(id, &owner),
                move |state| state.cache.insert_at(pos, revert_snapshot),
            )
            .await;

        match outcome {
            Ok(()) => {
                // A session change that raced the delete owns the undo
                // buffer now; the stale snapshot must not enter it.
                if self.epoch_current(epoch) {
                    self.undo.stage(vec![snapshot], "Task deleted");
                    self.toasts.undoable("Task deleted", "Undo");
                }
                Ok(true)
            }
            Err(e) => {
                self.toasts
                    .info("Could not delete the task");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// Set `completed` on every targeted record. One remote statement, one
    /// all-or-nothing local rollback: each record's prior flag is
    /// snapshotted and restored exactly on failure. Clears the selection on
    /// success. Returns the number of records touched (0 = no remote call).
    pub async fn bulk_complete(&self, ids: &[String], completed: bool) -> Result<usize> {
        let (owner, epoch) = self.session_info()?;

        let priors: Vec<(String, bool)> = {
            let mut state = self.state.lock();
            let mut seen: HashSet<&str> = HashSet::with_capacity(ids.len());
            let mut priors = Vec::new();
            for id in ids {
                // A repeated id would snapshot its own applied value and
                // poison the rollback; take the first occurrence only.
                if !seen.insert(id.as_str()) {
                    continue;
                }
                if let Some(task) = state.cache.get_mut(id) {
                    priors.push((id.clone(), task.completed));
                    task.completed = completed;
                }
            }
            priors
        };
        if priors.is_empty() {
            return Ok(0);
        }

        let targets: Vec<String> = priors.iter().map(|(id, _)| id.clone()).collect();
        let count = priors.len();
        let patch = BulkPatch {
            completed: Some(completed),
            ..Default::default()
        };

        let outcome = self
            .confirm_or_rollback(
                epoch,
                self.store.update_many(&targets, &owner, patch),
                move |state| {
                    for (id, was) in priors {
                        if let Some(task) = state.cache.get_mut(&id) {
                            task.completed = was;
                        }
                    }
                },
            )
            .await;

        match outcome {
            Ok(()) => {
                self.finish_bulk(epoch);
                let verb = if completed { "completed" } else { "reopened" };
                self.toasts
                    .info(format!("{count} {} {verb}", plural(count)));
                Ok(count)
            }
            Err(e) => {
                self.toasts
                    .info("Could not update the selected tasks");
                Err(e)
            }
        }
    }

    /// Apply a sparse field patch (`priority`, `category`, `due_date`) to
    /// every targeted record. Only the keys present in the patch are
    /// snapshotted, applied, and — on failure — restored.
    pub async fn bulk_set_fields(&self, ids: &[String], patch: BulkPatch) -> Result<usize> {
        if patch.is_empty() {
            return Ok(0);
        }
        let patch = BulkPatch {
            // `completed` moves through bulk_complete, which owns its own
            // rollback snapshotting.
            completed: None,
            ..patch
        };

        let (owner, epoch) = self.session_info()?;
        {
            let state = self.state.lock();
            if let Some(ref category) = patch.category {
                if !category.trim().is_empty() {
                    state.check_category(category)?;
                }
            }
        }

        let priors: Vec<FieldSnapshot> = {
            let mut state = self.state.lock();
            let mut seen: HashSet<&str> = HashSet::with_capacity(ids.len());
            let mut priors = Vec::new();
            for id in ids {
                if !seen.insert(id.as_str()) {
                    continue;
                }
                if let Some(task) = state.cache.get_mut(id) {
                    priors.push(FieldSnapshot::capture(task, &patch));
                    patch.apply_to(task);
                }
            }
            priors
        };
        if priors.is_empty() {
            return Ok(0);
        }

        let targets: Vec<String> = priors.iter().map(|s| s.id.clone()).collect();
        let count = priors.len();

        let outcome = self
            .confirm_or_rollback(
                epoch,
                self.store.update_many(&targets, &owner, patch.clone()),
                move |state| {
                    for snapshot in priors {
                        snapshot.restore(state);
                    }
                },
            )
            .await;

        match outcome {
            Ok(()) => {
                self.finish_bulk(epoch);
                self.toasts
                    .info(format!("{count} {} updated", plural(count)));
                Ok(count)
            }
            Err(e) => {
                self.toasts
                    .info("Could not update the selected tasks");
                Err(e)
            }
        }
    }

    /// Delete every targeted record. One remote statement; on failure the
    /// full snapshot set is reinserted at the front of the cache. On success
    /// the snapshots become one undo unit and the selection is cleared.
    pub async fn bulk_delete(&self, ids: &[String]) -> Result<usize> {
        let (owner, epoch) = self.session_info()?;

        let snapshots: Vec<Task> = {
            let mut state = self.state.lock();
            state.cache.remove_many(ids)
        };
        if snapshots.is_empty() {
            return Ok(0);
        }

        let targets: Vec<String> = snapshots.iter().map(|t| t.id.clone()).collect();
        let count = snapshots.len();
        let revert_snapshots = snapshots.clone();

        let outcome = self
            .confirm_or_rollback(
                epoch,
                self.store.delete_many(&targets, &owner),
                move |state| {
                    // Relative order among reinserted records is not
                    // guaranteed by contract; pushing in reverse happens to
                    // keep it anyway.
                    for task in revert_snapshots.into_iter().rev() {
                        state.cache.push_front(task);
                    }
                },
            )
            .await;

        match outcome {
            Ok(()) => {
                self.finish_bulk(epoch);
                // Same staleness rule as single remove: snapshots from a
                // superseded session never reach the undo buffer.
                if self.epoch_current(epoch) {
                    let message = format!("{count} {} deleted", plural(count));
                    self.undo.stage(snapshots, message.clone());
                    self.toasts.undoable(message, "Undo");
                }
                Ok(count)
            }
            Err(e) => {
                self.toasts
                    .info("Could not delete the selected tasks");
                Err(e)
            }
        }
    }

    /// Delete all currently-completed tasks. No-op (no remote call) when
    /// none are completed.
    pub async fn clear_completed(&self) -> Result<usize> {
        let ids: Vec<String> = {
            let state = self.state.lock();
            state
                .cache
                .iter()
                .filter(|t| t.completed)
                .map(|t| t.id.clone())
                .collect()
        };
        if ids.is_empty() {
            return Ok(0);
        }
        self.bulk_delete(&ids).await
    }

    /// Clear the selection after a successful bulk action (same-epoch only).
    fn finish_bulk(&self, epoch: u64) {
        let mut state = self.state.lock();
        if state.epoch == epoch {
            state.selection.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Reordering
    // -----------------------------------------------------------------------

    /// Move `source_id` to immediately before `target_id` in the manual
    /// order, renumbering every record and persisting the changed indices
    /// via one batched upsert. Returns `Ok(false)` without a remote call
    /// when the move is a no-op: same id, a non-manual sort mode, or an
    /// active filter/search narrowing the visible set.
    pub async fn reorder(&self, source_id: &str, target_id: &str, view: &ViewState) -> Result<bool> {
        use crate::view::SortKey;

        if view.sort != SortKey::Manual || view.is_narrowed() {
            return Ok(false);
        }

        let (owner, epoch) = self.session_info()?;

        let (entries, priors) = {
            let mut state = self.state.lock();
            let ordered = manual_order(&state.cache.snapshot());
            let plan = match plan_move(&ordered, source_id, target_id) {
                Some(plan) => plan,
                None => return Ok(false),
            };
            if plan.changes.is_empty() {
                return Ok(false);
            }

            let mut priors: Vec<(String, i64)> = Vec::with_capacity(plan.changes.len());
            for (id, _) in &plan.changes {
                if let Some(task) = state.cache.get(id) {
                    priors.push((id.clone(), task.order_index));
                }
            }
            let mut entries: Vec<OrderEntry> = Vec::with_capacity(plan.changes.len());
            for (id, order_index) in plan.changes {
                if let Some(task) = state.cache.get_mut(&id) {
                    task.order_index = order_index;
                }
                entries.push(OrderEntry {
                    id,
                    owner_id: owner.clone(),
                    order_index,
                });
            }
            (entries, priors)
        };

        let outcome = self
            .confirm_or_rollback(
                epoch,
                self.store.upsert_order(&entries),
                move |state| {
                    for (id, order_index) in priors {
                        if let Some(task) = state.cache.get_mut(&id) {
                            task.order_index = order_index;
                        }
                    }
                },
            )
            .await;

        match outcome {
            Ok(()) => Ok(true),
            Err(e) => {
                self.toasts
                    .info("Could not save the new order");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Undo
    // -----------------------------------------------------------------------

    /// Restore the pending undo unit by re-inserting its snapshots as new
    /// rows (the store may assign new ids). Best-effort: the buffer is
    /// consumed up front, so a failed restore is not retryable. Whatever was
    /// re-inserted before the failure stays. Returns the number restored;
    /// `Ok(0)` when nothing was pending (already expired or never staged).
    pub async fn undo(&self) -> Result<usize> {
        let (owner, epoch) = self.session_info()?;

        let unit = match self.undo.take() {
            Some(unit) => unit,
            None => return Ok(0),
        };

        let mut restored: Vec<Task> = Vec::with_capacity(unit.snapshots.len());
        for snapshot in &unit.snapshots {
            match self.store.insert(&owner, NewTask::from_snapshot(snapshot)).await {
                Ok(task) => restored.push(task),
                Err(e) => {
                    tracing::warn!(
                        restored = restored.len(),
                        remaining = unit.snapshots.len() - restored.len(),
                        error = %e,
                        "undo aborted mid-batch"
                    );
                    self.prepend_restored(epoch, restored);
                    self.toasts
                        .info("Could not restore the deleted tasks");
                    return Err(e.into());
                }
            }
        }

        let count = restored.len();
        self.prepend_restored(epoch, restored);
        if count > 0 {
            self.toasts
                .info(format!("{count} {} restored", plural(count)));
        }
        Ok(count)
    }

    fn prepend_restored(&self, epoch: u64, restored: Vec<Task>) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return;
        }
        for task in restored.into_iter().rev() {
            state.cache.push_front(task);
        }
    }

    /// Whether an undo unit is currently pending.
    pub fn undo_available(&self) -> bool {
        self.undo.is_pending()
    }

    /// The pending undo unit's message, if any.
    pub fn undo_message(&self) -> Option<String> {
        self.undo.pending_message()
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    /// Replace the owner's category list (session load).
    pub fn set_categories(&self, categories: Vec<String>) {
        self.state.lock().categories = categories;
    }

    pub fn categories(&self) -> Vec<String> {
        self.state.lock().categories.clone()
    }

    pub fn add_category(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyCategoryName.into());
        }
        let mut state = self.state.lock();
        if state.categories.iter().any(|c| c == name) {
            return Err(ValidationError::DuplicateCategory(name.to_string()).into());
        }
        state.categories.push(name.to_string());
        Ok(())
    }

    /// Remove a category by name. Tasks already labeled with it keep their
    /// label — categories are referenced by name, not id.
    pub fn remove_category(&self, name: &str) {
        self.state.lock().categories.retain(|c| c != name);
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// Cloned snapshot of the cache, in cache order.
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().cache.snapshot()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state.lock().cache.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().cache.is_empty()
    }

    /// The derived visible list for the given view context.
    pub fn visible(&self, view: &ViewState, today: NaiveDate) -> Vec<Task> {
        let snapshot = self.state.lock().cache.snapshot();
        project(&snapshot, view, today)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn toggle_selection(&self, id: &str, shift: bool, visible_ids: &[String]) {
        self.state.lock().selection.toggle(id, shift, visible_ids);
    }

    pub fn select_all_visible(&self, visible_ids: &[String]) {
        self.state.lock().selection.select_all_visible(visible_ids);
    }

    pub fn clear_selection(&self) {
        self.state.lock().selection.clear();
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.state.lock().selection.ids()
    }

    /// Selected ids in visible order — the shape bulk operations want.
    pub fn selected_ids_in(&self, visible_ids: &[String]) -> Vec<String> {
        self.state.lock().selection.ids_in(visible_ids)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state.lock().selection.is_selected(id)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Subscribe to toast notifications (message + optional action label).
    pub fn on_toast(&self, callback: impl Fn(&Toast) + Send + Sync + 'static) -> ListenerId {
        self.toasts.subscribe(callback)
    }

    pub fn off_toast(&self, id: ListenerId) {
        self.toasts.unsubscribe(id);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Per-record snapshot of exactly the keys a `BulkPatch` carries — rollback
/// restores these keys and nothing else.
struct FieldSnapshot {
    id: String,
    priority: Option<crate::types::Priority>,
    category: Option<String>,
    due_date: Option<Option<NaiveDate>>,
}

impl FieldSnapshot {
    fn capture(task: &Task, patch: &BulkPatch) -> Self {
        Self {
            id: task.id.clone(),
            priority: patch.priority.map(|_| task.priority),
            category: patch.category.as_ref().map(|_| task.category.clone()),
            due_date: patch.due_date.map(|_| task.due_date),
        }
    }

    fn restore(self, state: &mut EngineState) {
        if let Some(task) = state.cache.get_mut(&self.id) {
            if let Some(priority) = self.priority {
                task.priority = priority;
            }
            if let Some(category) = self.category {
                task.category = category;
            }
            if let Some(due_date) = self.due_date {
                task.due_date = due_date;
            }
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "task"
    } else {
        "tasks"
    }
}
