//! SelectionModel — the set of currently selected task ids.
//!
//! Selection is UI-session state: it is never persisted, and the owning
//! layer resets it whenever the visible set's ordering context changes
//! (filter/sort/search switch, session change).

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct SelectionModel {
    selected: HashSet<String>,
    last_selected: Option<String>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Selected ids in the order they appear in `visible` (unordered set
    /// internally; callers want visible order for bulk operations).
    pub fn ids_in(&self, visible: &[String]) -> Vec<String> {
        visible
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    /// All selected ids, unordered.
    pub fn ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Toggle `id`, with shift-range extension.
    ///
    /// Without shift, flips membership. With shift, if a last-selected id
    /// exists and both ids appear in `visible`, selects the inclusive range
    /// between them in visible order — additive, never removing ids outside
    /// the range. Either way, `id` becomes the new last-selected.
    pub fn toggle(&mut self, id: &str, shift: bool, visible: &[String]) {
        if shift {
            if let Some(last) = self.last_selected.clone() {
                let a = visible.iter().position(|v| v == &last);
                let b = visible.iter().position(|v| v == id);
                if let (Some(a), Some(b)) = (a, b) {
                    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                    for v in &visible[lo..=hi] {
                        self.selected.insert(v.clone());
                    }
                    self.last_selected = Some(id.to_string());
                    return;
                }
            }
        }

        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
        self.last_selected = Some(id.to_string());
    }

    /// Replace the selection with exactly the currently visible ids.
    pub fn select_all_visible(&mut self, visible: &[String]) {
        self.selected = visible.iter().cloned().collect();
    }

    /// Empty the selection and forget the range anchor.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.last_selected = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
