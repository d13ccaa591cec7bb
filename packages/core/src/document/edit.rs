//! Structural and content mutations: insert, delete, reparent, reorder, text,
//! images, positions and sizes.

use super::{rejected, MindmapDocument};
use crate::error::{MindmapError, Result};
use crate::events::MindmapEvent;
use crate::models::{MindmapNode, NodeSize, Position};
use crate::tree::{InsertAt, Placement};
use indexmap::IndexSet;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a freshly created node goes
#[derive(Clone, Copy)]
enum Anchor<'a> {
    Child { parent_id: &'a str, at: InsertAt },
    Sibling { node_id: &'a str, placement: Placement },
}

impl MindmapDocument {
    /// Append a child with the default text. Returns the new id, which also
    /// becomes the selection and pan target.
    pub fn add_child(&mut self, parent_id: &str) -> Result<String> {
        let text = self.config.default_child_text.clone();
        self.add_child_with_text(parent_id, &text)
    }

    pub fn add_child_with_text(&mut self, parent_id: &str, text: &str) -> Result<String> {
        let anchor = Anchor::Child {
            parent_id,
            at: InsertAt::End,
        };
        self.create_node(anchor, text, Vec::new())
            .map_err(|e| rejected("add_child", e))
    }

    /// Insert a child at `index` (clamped to the number of children)
    pub fn insert_child_at(&mut self, parent_id: &str, index: usize, text: &str) -> Result<String> {
        let anchor = Anchor::Child {
            parent_id,
            at: InsertAt::Index(index),
        };
        self.create_node(anchor, text, Vec::new())
            .map_err(|e| rejected("insert_child_at", e))
    }

    /// Insert a sibling with the default text. Rejected for the root.
    pub fn add_sibling(&mut self, node_id: &str, placement: Placement) -> Result<String> {
        let text = self.config.default_sibling_text.clone();
        self.add_sibling_with_text(node_id, &text, placement)
    }

    pub fn add_sibling_with_text(
        &mut self,
        node_id: &str,
        text: &str,
        placement: Placement,
    ) -> Result<String> {
        let anchor = Anchor::Sibling { node_id, placement };
        self.create_node(anchor, text, Vec::new())
            .map_err(|e| rejected("add_sibling", e))
    }

    /// Append a "New Image" child carrying `image_ref`
    pub fn add_child_with_image(&mut self, parent_id: &str, image_ref: &str) -> Result<String> {
        self.create_image_child(parent_id, image_ref)
            .map_err(|e| rejected("add_child_with_image", e))
    }

    pub(super) fn create_image_child(&mut self, parent_id: &str, image_ref: &str) -> Result<String> {
        let text = self.config.default_image_text.clone();
        let anchor = Anchor::Child {
            parent_id,
            at: InsertAt::End,
        };
        self.create_node(anchor, &text, vec![image_ref.to_string()])
    }

    pub fn add_sibling_with_image(
        &mut self,
        node_id: &str,
        image_ref: &str,
        placement: Placement,
    ) -> Result<String> {
        let text = self.config.default_image_text.clone();
        let anchor = Anchor::Sibling { node_id, placement };
        self.create_node(anchor, &text, vec![image_ref.to_string()])
            .map_err(|e| rejected("add_sibling_with_image", e))
    }

    fn create_node(&mut self, anchor: Anchor<'_>, text: &str, image_refs: Vec<String>) -> Result<String> {
        let parent_id = match anchor {
            Anchor::Child { parent_id, .. } => self.require_node(parent_id)?.id.clone(),
            Anchor::Sibling { node_id, .. } => self
                .require_node(node_id)?
                .parent_id
                .clone()
                .ok_or_else(|| {
                    MindmapError::invalid_operation("Cannot add a sibling to the root node")
                })?,
        };

        let snapshot = self.capture()?;
        let id = self.ids.node_id();
        let doc_ref = self.ids.document_ref();
        self.documents.set(&doc_ref, "")?;

        let node = MindmapNode::new(id.clone(), text, doc_ref.clone()).with_images(image_refs);
        let inserted = match anchor {
            Anchor::Child { parent_id, at } => self.tree.insert_child(parent_id, node, at),
            Anchor::Sibling { node_id, placement } => {
                self.tree.insert_sibling(node_id, node, placement)
            }
        };
        if let Err(e) = inserted {
            self.discard_documents(std::slice::from_ref(&doc_ref));
            return Err(e);
        }

        self.commit(snapshot);
        self.selection.select(&id);
        self.pan_target = Some(id.clone());
        debug!(id = %id, parent = %parent_id, "Created node");

        self.events.emit(MindmapEvent::NodesCreated {
            parent_id,
            ids: vec![id.clone()],
        });
        self.emit_selection();
        Ok(id)
    }

    /// Delete `id` and its subtree. Returns every removed id.
    pub fn delete_node(&mut self, id: &str) -> Result<Vec<String>> {
        self.delete_nodes(&[id.to_string()])
    }

    /// Delete several subtrees under one undo step.
    ///
    /// Ids nested under another id of the batch are covered by their ancestor.
    /// The whole batch is rejected if any id is unknown or is the root.
    ///
    /// Side effects: documents of removed nodes are deleted from the document
    /// store, their images are queued for
    /// [`release_orphaned_images`](Self::release_orphaned_images), and removed
    /// ids leave the collapsed, pinned and selected sets. A removed primary
    /// selection hands over to the parent of its removed subtree.
    pub fn delete_nodes(&mut self, ids: &[String]) -> Result<Vec<String>> {
        self.check_deletable(ids)
            .map_err(|e| rejected("delete_nodes", e))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let unique: IndexSet<&str> = ids.iter().map(String::as_str).collect();
        let tops: Vec<String> = unique
            .iter()
            .filter(|id| {
                !unique
                    .iter()
                    .any(|other| other != *id && self.tree.is_ancestor(other, id))
            })
            .map(|id| id.to_string())
            .collect();

        let fallback = self.selection.primary().and_then(|primary| {
            tops.iter()
                .find(|top| self.tree.is_ancestor(top, primary))
                .and_then(|top| self.tree.find_parent(top))
                .map(|parent| parent.id.clone())
        });

        let snapshot = self.capture()?;
        let mut removed_ids = Vec::new();
        for top in &tops {
            let removed = self.tree.remove_subtree(top)?;
            for node in removed.subtree.iter() {
                if !node.document_ref.is_empty() {
                    if let Err(e) = self.documents.delete(&node.document_ref) {
                        warn!(doc_ref = %node.document_ref, error = %e, "Failed to delete document");
                    }
                }
                self.orphaned_images.extend(node.image_refs.iter().cloned());
            }
            removed_ids.extend(removed.removed_ids);
        }

        let tree = &self.tree;
        let primary_lost = self.selection.retain(|id| tree.contains(id));
        if primary_lost || self.selection.is_empty() {
            if let Some(next) = fallback.or_else(|| tree.root_id().map(str::to_string)) {
                self.selection.select(&next);
            }
        }
        self.prune_detached_state();
        self.commit(snapshot);
        debug!(removed = removed_ids.len(), "Deleted nodes");

        self.events.emit(MindmapEvent::NodesRemoved {
            ids: removed_ids.clone(),
        });
        self.emit_selection();
        Ok(removed_ids)
    }

    fn check_deletable(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            self.require_node(id)?;
            if self.tree.is_root(id) {
                return Err(MindmapError::invalid_operation("Cannot delete the root node"));
            }
        }
        Ok(())
    }

    /// Move `id` under `new_parent_id` (appended). Self, root and cyclic
    /// moves are rejected.
    pub fn reparent(&mut self, id: &str, new_parent_id: &str) -> Result<()> {
        self.move_node(id, new_parent_id)
            .map_err(|e| rejected("reparent", e))
    }

    pub(super) fn move_node(&mut self, id: &str, new_parent_id: &str) -> Result<()> {
        let snapshot = self.capture()?;
        self.tree.reparent(id, new_parent_id)?;
        self.commit(snapshot);
        self.events.emit(MindmapEvent::NodeMoved {
            id: id.to_string(),
            new_parent_id: new_parent_id.to_string(),
        });
        Ok(())
    }

    /// Move `id` next to its sibling `target_id`. Returns `Ok(false)`, with no
    /// undo step, when the two do not share a parent.
    pub fn reorder(&mut self, id: &str, target_id: &str, placement: Placement) -> Result<bool> {
        self.require_node(id)
            .and_then(|_| self.require_node(target_id))
            .map_err(|e| rejected("reorder", e))?;

        let snapshot = self.capture()?;
        if !self.tree.reorder_sibling(id, target_id, placement) {
            debug!(id, target_id, "Reorder ignored, nodes are not siblings");
            return Ok(false);
        }
        let parent_id = self
            .tree
            .find_parent(id)
            .map(|parent| parent.id.clone())
            .unwrap_or_default();
        self.commit(snapshot);
        self.events
            .emit(MindmapEvent::SiblingsReordered { parent_id });
        Ok(true)
    }

    /// Set the display text. Returns `Ok(false)` and records nothing when the
    /// text is unchanged.
    pub fn update_node_text(&mut self, id: &str, text: &str) -> Result<bool> {
        let node = self
            .require_node(id)
            .map_err(|e| rejected("update_node_text", e))?;
        if node.text == text {
            return Ok(false);
        }
        let snapshot = self.capture()?;
        self.tree.set_text(id, text)?;
        self.commit(snapshot);
        self.events.emit(MindmapEvent::NodeChanged { id: id.to_string() });
        Ok(true)
    }

    pub fn add_image_to_node(&mut self, id: &str, image_ref: &str) -> Result<()> {
        self.require_node(id)
            .map_err(|e| rejected("add_image_to_node", e))?;
        let snapshot = self.capture()?;
        self.tree.push_image(id, image_ref)?;
        self.commit(snapshot);
        self.events.emit(MindmapEvent::NodeChanged { id: id.to_string() });
        Ok(())
    }

    /// Store a dropped position as an undo step (end of a drag)
    pub fn update_node_position(&mut self, id: &str, position: Position) -> Result<()> {
        self.require_node(id)
            .map_err(|e| rejected("update_node_position", e))?;
        let snapshot = self.capture()?;
        self.tree.set_position(id, position)?;
        if let Some(snapshot) = snapshot {
            self.history.push(snapshot);
        }
        self.dirty = true;
        self.events.emit(MindmapEvent::NodeChanged { id: id.to_string() });
        Ok(())
    }

    /// Store a position without an undo step (intermediate drag motion)
    pub fn set_node_position(&mut self, id: &str, position: Position) -> Result<()> {
        self.tree
            .set_position(id, position)
            .map_err(|e| rejected("set_node_position", e))?;
        self.dirty = true;
        Ok(())
    }

    /// Record the rendered size of a node. Schedules a relayout only when the
    /// size actually changed; returns whether it did.
    pub fn set_node_dimensions(&mut self, id: &str, size: NodeSize) -> Result<bool> {
        self.require_node(id)
            .map_err(|e| rejected("set_node_dimensions", e))?;
        let valid = size.width.is_finite()
            && size.height.is_finite()
            && size.width >= 0.0
            && size.height >= 0.0;
        if !valid {
            return Err(rejected(
                "set_node_dimensions",
                MindmapError::invalid_operation(format!(
                    "Invalid size {}x{} for node {}",
                    size.width, size.height, id
                )),
            ));
        }
        if self.sizes.get(id) == Some(&size) {
            return Ok(false);
        }
        self.sizes.insert(id.to_string(), size);
        self.schedule_layout();
        Ok(true)
    }

    /// Delete queued images that no live node references any more. Failures
    /// are logged and dropped; they never affect the tree. Returns how many
    /// images were released.
    pub async fn release_orphaned_images(&mut self) -> usize {
        let queued: IndexSet<String> = std::mem::take(&mut self.orphaned_images)
            .into_iter()
            .collect();
        if queued.is_empty() {
            return 0;
        }
        let referenced: HashSet<String> = self
            .tree
            .nodes()
            .flat_map(|node| node.image_refs.iter().cloned())
            .collect();

        let images = Arc::clone(&self.images);
        let mut released = 0;
        for image_ref in queued {
            if referenced.contains(&image_ref) {
                continue;
            }
            match images.delete(&image_ref).await {
                Ok(()) => released += 1,
                Err(e) => {
                    warn!(image = %image_ref, error = %e, "Failed to release orphaned image");
                }
            }
        }
        debug!(released, "Released orphaned images");
        released
    }
}
