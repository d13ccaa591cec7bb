//! View-level state: selection, pan target, pins, collapse and view root.
//! None of these are undoable.

use super::{rejected, MindmapDocument};
use crate::error::{MindmapError, Result};
use crate::events::MindmapEvent;
use crate::tree::NodeRecord;

impl MindmapDocument {
    /// Replace the selection with `id`
    pub fn select(&mut self, id: &str) -> Result<()> {
        self.require_node(id).map_err(|e| rejected("select", e))?;
        self.selection.select(id);
        self.emit_selection();
        Ok(())
    }

    /// Ctrl-click
    pub fn toggle_selection(&mut self, id: &str) -> Result<()> {
        self.require_node(id)
            .map_err(|e| rejected("toggle_selection", e))?;
        self.selection.toggle(id);
        self.emit_selection();
        Ok(())
    }

    pub fn add_to_selection(&mut self, id: &str) -> Result<()> {
        self.require_node(id)
            .map_err(|e| rejected("add_to_selection", e))?;
        self.selection.add(id);
        self.emit_selection();
        Ok(())
    }

    /// Shift-click, see [`crate::selection::Selection::select_range`]
    pub fn select_range(&mut self, target_id: &str) -> Result<()> {
        self.require_node(target_id)
            .map_err(|e| rejected("select_range", e))?;
        self.selection.select_range(target_id, &self.tree);
        self.emit_selection();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.emit_selection();
    }

    /// Select `id` and ask the presentation layer to bring it into view
    pub fn select_and_pan(&mut self, id: &str) -> Result<()> {
        self.select(id)?;
        self.pan_target = Some(id.to_string());
        Ok(())
    }

    /// Node the view should pan to, consumed once
    pub fn take_pan_target(&mut self) -> Option<String> {
        self.pan_target.take()
    }

    /// Pin or unpin `id`; returns whether it is pinned afterwards.
    ///
    /// The last remaining pin cannot be removed.
    pub fn toggle_pin(&mut self, id: &str) -> Result<bool> {
        self.require_node(id)
            .map_err(|e| rejected("toggle_pin", e))?;
        let pinned = if self.pinned.contains(id) {
            if self.pinned.len() == 1 {
                return Err(rejected(
                    "toggle_pin",
                    MindmapError::invalid_operation("Cannot unpin the last pinned node"),
                ));
            }
            self.pinned.shift_remove(id);
            false
        } else {
            self.pinned.insert(id.to_string());
            true
        };
        self.dirty = true;
        self.events.emit(MindmapEvent::NodeChanged { id: id.to_string() });
        Ok(pinned)
    }

    /// Collapse or expand `id` and lay out immediately. Returns whether it is
    /// collapsed afterwards.
    pub fn toggle_collapse(&mut self, id: &str) -> Result<bool> {
        self.require_node(id)
            .map_err(|e| rejected("toggle_collapse", e))?;
        let collapsed = if self.collapsed.remove(id) {
            false
        } else {
            self.collapsed.insert(id.to_string());
            true
        };
        self.dirty = true;
        self.relayout_now();
        self.events.emit(MindmapEvent::NodeChanged { id: id.to_string() });
        Ok(collapsed)
    }

    /// Zoom into `id`, or back out to the real root with `None`. The new view
    /// root becomes the selection.
    pub fn set_view_root(&mut self, id: Option<&str>) -> Result<()> {
        let target = match id {
            Some(id) => {
                self.require_node(id)
                    .map_err(|e| rejected("set_view_root", e))?;
                id.to_string()
            }
            None => match self.tree.root_id() {
                Some(root) => root.to_string(),
                None => return Ok(()),
            },
        };
        self.view_root = Some(target.clone());
        self.selection.select(&target);
        self.emit_selection();
        Ok(())
    }

    /// Current view root, the real root when none is set
    pub fn view_root(&self) -> Option<&str> {
        self.view_root
            .as_deref()
            .filter(|id| self.tree.contains(id))
            .or_else(|| self.tree.root_id())
    }

    /// Breadcrumb from the view root down to the primary selection. Falls back
    /// to the full root path when the primary is outside the view root.
    pub fn current_node_path(&self) -> Vec<String> {
        let Some(primary) = self.selection.primary() else {
            return Vec::new();
        };
        let path = self.tree.ancestry(primary);
        match self
            .view_root()
            .and_then(|view| path.iter().position(|id| id == view))
        {
            Some(start) => path[start..].to_vec(),
            None => path,
        }
    }

    /// Nodes to render: pre-order from the view root, collapsed subtrees
    /// folded
    pub fn visible_nodes(&self) -> Vec<&NodeRecord> {
        self.tree.visible_nodes(self.view_root(), &self.collapsed)
    }
}
