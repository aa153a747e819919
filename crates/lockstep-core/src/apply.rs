//! Per-difference applied state
//!
//! Toggling never changes any virtual span (span length is the max of the
//! two sides), so the layout index is untouched; only the toggled
//! difference's rows need rematerializing in each pane. The host must
//! refresh both panes synchronously before the next paint.

use crate::model::{DiffKey, DiffModel, DifferenceType};

#[derive(Debug, Default)]
pub struct ApplyTracker {
    modified: bool,
}

impl ApplyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one difference's applied state. Returns true if the state
    /// changed. Unchanged differences carry no apply state; toggling them
    /// is silently ignored by contract.
    pub fn apply(&mut self, model: &mut DiffModel, key: DiffKey, on: bool) -> bool {
        let Some(diff) = model.difference_mut(key) else {
            return false;
        };
        if diff.kind == DifferenceType::Unchanged || diff.applied == on {
            return false;
        }
        diff.applied = on;
        self.modified = true;
        true
    }

    /// Apply or unapply every difference, returning the keys that changed
    /// so the host can rematerialize exactly those subtrees.
    pub fn apply_all(&mut self, model: &mut DiffModel, on: bool) -> Vec<DiffKey> {
        let keys: Vec<DiffKey> = model.change_keys();
        keys.into_iter()
            .filter(|&key| self.apply(model, key, on))
            .collect()
    }

    /// True once any difference has been toggled since the last save/load.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }
}
