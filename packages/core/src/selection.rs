//! Selection Manager
//!
//! Ordered multi-selection. The last selected id is the primary node, the
//! target of single-node operations.

use crate::tree::TreeStore;
use indexmap::IndexSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: IndexSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last selected id
    pub fn primary(&self) -> Option<&str> {
        self.ids.last().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replace the selection with `[id]`
    pub fn select(&mut self, id: &str) {
        self.ids.clear();
        self.ids.insert(id.to_string());
    }

    /// Add if absent, remove if present. Remaining ids keep their order.
    pub fn toggle(&mut self, id: &str) {
        if !self.ids.shift_remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// Append if not already selected
    pub fn add(&mut self, id: &str) {
        if !self.ids.contains(id) {
            self.ids.insert(id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop every id for which `keep` returns false; returns whether the
    /// primary was among them.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> bool {
        let primary = self.primary().map(str::to_string);
        self.ids.retain(|id| keep(id));
        primary.is_some_and(|p| !self.ids.contains(&p))
    }

    /// Shift-click selection.
    ///
    /// With nothing selected this is [`select`](Self::select). When `target`
    /// and the primary share a parent, every sibling between them (inclusive)
    /// is added, walking from the primary toward `target`. Otherwise `target`
    /// alone is added. Either way `target` ends up as the primary, even if it
    /// was already selected.
    pub fn select_range(&mut self, target: &str, tree: &TreeStore) {
        let Some(primary) = self.primary().map(str::to_string) else {
            self.select(target);
            return;
        };

        let parent_of = |id: &str| tree.get(id).and_then(|node| node.parent_id.clone());
        let shared_parent = match (parent_of(&primary), parent_of(target)) {
            (Some(a), Some(b)) if a == b => a,
            _ => {
                self.promote(target);
                return;
            }
        };

        let siblings = tree.children_of(&shared_parent);
        let from = siblings.iter().position(|id| *id == primary);
        let to = siblings.iter().position(|id| id == target);
        let (Some(from), Some(to)) = (from, to) else {
            self.promote(target);
            return;
        };

        if from <= to {
            siblings[from..=to].iter().for_each(|id| self.add(id));
        } else {
            siblings[to..=from].iter().rev().for_each(|id| self.add(id));
        }
        self.promote(target);
    }

    /// Move `id` to the end of the selection, adding it if absent
    fn promote(&mut self, id: &str) {
        self.ids.shift_remove(id);
        self.ids.insert(id.to_string());
    }
}
