//! Ordering engine — a pure planner for manual drag-and-drop moves.
//!
//! Given the current manual order and a `(source, target)` move, produce the
//! fully renumbered list and the set of changed `order_index` assignments.
//! Full renumbering over gap insertion: simplicity over write amplification,
//! acceptable because reorders are infrequent user actions. The caller
//! persists the changes via one batched upsert.

use crate::types::Task;
use crate::view::manual_cmp;

/// The result of planning a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    /// Task ids in the new total order.
    pub order: Vec<String>,
    /// `(id, new order_index)` for every record whose index changed.
    pub changes: Vec<(String, i64)>,
}

/// Sort a snapshot into manual order (`order_index` asc, `created_at` desc
/// ties) — the order `plan_move` expects its input in.
pub fn manual_order(tasks: &[Task]) -> Vec<Task> {
    let mut ordered = tasks.to_vec();
    ordered.sort_by(manual_cmp);
    ordered
}

/// Plan moving `source_id` to immediately before `target_id`'s position.
///
/// `ordered` must be the current manual order. Returns `None` when the move
/// is a no-op: source and target are the same id, or either id is absent.
/// Every record is renumbered to its 0-based position; `changes` lists only
/// the records whose index actually differs.
pub fn plan_move(ordered: &[Task], source_id: &str, target_id: &str) -> Option<MovePlan> {
    if source_id == target_id {
        return None;
    }

    let source_pos = ordered.iter().position(|t| t.id == source_id)?;
    ordered.iter().position(|t| t.id == target_id)?;

    let mut ids: Vec<&Task> = ordered.iter().collect();
    let source = ids.remove(source_pos);
    // Find the target in the remaining list — the source lands at its slot.
    let insert_pos = ids.iter().position(|t| t.id == target_id)?;
    ids.insert(insert_pos, source);

    let order: Vec<String> = ids.iter().map(|t| t.id.clone()).collect();
    let changes: Vec<(String, i64)> = ids
        .iter()
        .enumerate()
        .filter(|(pos, t)| t.order_index != *pos as i64)
        .map(|(pos, t)| (t.id.clone(), pos as i64))
        .collect();

    Some(MovePlan { order, changes })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
