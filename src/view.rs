//! View projection — a pure function of (cache, filter, search, sort).
//!
//! Recomputed in full on every input change; holds no state and never
//! mutates cache records. `today` is an input so `Overdue` stays pure and
//! testable.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::types::Task;

// ============================================================================
// View state
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
    /// Due date strictly before today AND not completed.
    Overdue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// `order_index` ascending, ties broken by `created_at` descending.
    #[default]
    Manual,
    CreatedAsc,
    CreatedDesc,
    /// Missing due dates sort last, so undated tasks never crowd out dated
    /// ones at the top.
    DueAsc,
    DueDesc,
    /// `high < medium < low < none`.
    Priority,
}

/// The active view context supplied by the UI on every render.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub filter: Filter,
    pub search: String,
    pub sort: SortKey,
}

impl ViewState {
    /// Whether the filter or search narrows the visible set. Manual
    /// reordering is disallowed while narrowed — moving a task relative to
    /// unseen records has no unambiguous meaning.
    pub fn is_narrowed(&self) -> bool {
        self.filter != Filter::All || !self.search.trim().is_empty()
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Derive the displayed sequence from the cache. Clones records; the cache
/// is never mutated.
pub fn project(tasks: &[Task], view: &ViewState, today: NaiveDate) -> Vec<Task> {
    let needle = view.search.trim().to_lowercase();

    let mut out: Vec<Task> = tasks
        .iter()
        .filter(|t| matches_filter(t, view.filter, today))
        .filter(|t| needle.is_empty() || matches_search(t, &needle))
        .cloned()
        .collect();

    sort_tasks(&mut out, view.sort);
    out
}

fn matches_filter(task: &Task, filter: Filter, today: NaiveDate) -> bool {
    match filter {
        Filter::All => true,
        Filter::Active => !task.completed,
        Filter::Completed => task.completed,
        Filter::Overdue => !task.completed && task.due_date.is_some_and(|d| d < today),
    }
}

/// Case-insensitive substring match over title, note, category and tags.
/// `needle` must already be lowercased.
fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task.note.to_lowercase().contains(needle)
        || task.category.to_lowercase().contains(needle)
        || task.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Sort in place by the selected key. Sorting is stable, so records equal
/// under the comparator keep their cache order.
pub fn sort_tasks(tasks: &mut [Task], sort: SortKey) {
    match sort {
        SortKey::Manual => tasks.sort_by(manual_cmp),
        SortKey::CreatedAsc => tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::CreatedDesc => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::DueAsc => tasks.sort_by(|a, b| cmp_due(a.due_date, b.due_date)),
        SortKey::DueDesc => tasks.sort_by(|a, b| cmp_due_desc(a.due_date, b.due_date)),
        SortKey::Priority => tasks.sort_by(|a, b| a.priority.rank().cmp(&b.priority.rank())),
    }
}

/// Manual order: `order_index` ascending, ties broken by `created_at`
/// descending (later creations sort first among equals).
pub fn manual_cmp(a: &Task, b: &Task) -> Ordering {
    a.order_index
        .cmp(&b.order_index)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn cmp_due(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    // None = latest possible: dated tasks first, ascending among them.
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_due_desc(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    // None = earliest possible: dated tasks first, descending among them.
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
