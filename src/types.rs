use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of tags a single task may carry.
pub const MAX_TAGS: usize = 20;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Task priority. Sorting by priority puts `High` first and `None` last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl Priority {
    /// Rank for comparison: `high < medium < low < none`.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
            Priority::None => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A task record as held in the client cache.
///
/// `id` and `created_at` are assigned by the remote store at insert time and
/// never client-generated (retrying an insert must not produce id collisions).
/// `order_index` is only meaningful relative to other records of the same
/// owner and is not unique; ties sort by `created_at` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub note: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    /// References one of the owner's category names; empty = uncategorized.
    pub category: String,
    /// Insertion order preserved for display; matching is order-insensitive.
    pub tags: Vec<String>,
    pub completed: bool,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Drafts and patches
// ---------------------------------------------------------------------------

/// Input to `add` — everything the user supplies for a new task.
///
/// An empty `category` falls back to the owner's first category (or stays
/// uncategorized when the owner has none).
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub note: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub category: String,
    pub tags: Vec<String>,
}

/// The fully shaped row handed to the store for insertion.
///
/// `created_at` is `None` for fresh tasks (the store assigns the timestamp);
/// undo re-insertion passes the original timestamp through.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub note: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub category: String,
    pub tags: Vec<String>,
    pub completed: bool,
    pub order_index: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTask {
    /// Rebuild an insertable row from a deleted task's snapshot, preserving
    /// every field except the id (the store may assign a new one).
    pub fn from_snapshot(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            note: task.note.clone(),
            due_date: task.due_date,
            priority: task.priority,
            category: task.category.clone(),
            tags: task.tags.clone(),
            completed: task.completed,
            order_index: task.order_index,
            created_at: Some(task.created_at),
        }
    }
}

/// Sparse single-record patch. Only `Some` fields are applied.
///
/// `due_date` is doubly optional: `None` leaves it untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub note: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Apply this patch to a task in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref note) = self.note {
            task.note = note.clone();
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(ref category) = self.category {
            task.category = category.clone();
        }
        if let Some(ref tags) = self.tags {
            task.tags = tags.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// Sparse patch for bulk updates — the set-membership remote statement
/// applies the same present keys to every targeted row.
#[derive(Debug, Clone, Default)]
pub struct BulkPatch {
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
}

impl BulkPatch {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
    }

    /// Apply the present keys to a task in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(ref category) = self.category {
            task.category = category.clone();
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// One `order_index` reassignment, persisted via a batched upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: String,
    pub owner_id: String,
    pub order_index: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
