//! Undo / redo on the document
//!
//! Restoring swaps in the tree store rebuilt from the snapshot (parent links
//! and id index included), then reconciles the view-level state with the restored
//! ids and lays out immediately.

use super::{rejected, MindmapDocument};
use crate::error::Result;
use crate::events::MindmapEvent;
use crate::tree::TreeStore;
use tracing::info;

impl MindmapDocument {
    /// Step back one undo point. Returns `Ok(false)` when there is nothing to
    /// undo. A corrupt snapshot aborts the restore and leaves everything as
    /// it was.
    pub fn undo(&mut self) -> Result<bool> {
        if self.tree.is_empty() {
            return Ok(false);
        }
        let restored = self
            .history
            .undo(&self.tree)
            .map_err(|e| rejected("undo", e))?;
        match restored {
            Some(tree) => {
                self.restore(tree, true);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply the last undone change
    pub fn redo(&mut self) -> Result<bool> {
        if self.tree.is_empty() {
            return Ok(false);
        }
        let restored = self
            .history
            .redo(&self.tree)
            .map_err(|e| rejected("redo", e))?;
        match restored {
            Some(tree) => {
                self.restore(tree, false);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn restore(&mut self, tree: TreeStore, undo: bool) {
        self.tree = tree;

        let tree = &self.tree;
        self.selection.retain(|id| tree.contains(id));
        if self.selection.is_empty() {
            if let Some(root) = tree.root_id() {
                self.selection.select(root);
            }
        }
        self.prune_detached_state();

        self.dirty = true;
        self.relayout_now();
        info!(
            undo,
            nodes = self.tree.len(),
            undo_depth = self.history.undo_depth(),
            redo_depth = self.history.redo_depth(),
            "Restored history snapshot"
        );

        self.events.emit(MindmapEvent::HistoryRestored { undo });
        self.emit_selection();
    }
}
