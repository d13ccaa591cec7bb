//! Copy, cut and paste
//!
//! Paste resolves in order:
//!
//! 1. image data on the system clipboard becomes a new image child
//! 2. text equal to the internal slot's source text replays the internal
//!    copy (fresh ids and documents) or cut (move)
//! 3. any other text is imported as a tab-indented outline
//!
//! The target is re-checked after every await before anything is committed.

use super::{rejected, MindmapDocument};
use crate::clipboard::{build_forest, parse_outline, ClipboardContent, ClipboardMode, ClipboardSlot};
use crate::error::{MindmapError, Result};
use crate::events::MindmapEvent;
use crate::models::{MindmapNode, ROOT_NODE_TYPE};
use crate::tree::InsertAt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a paste did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    /// A new child was created for clipboard image data
    Image { node_id: String, image_ref: String },
    /// An internal copy was cloned under the target
    Copied { root_id: String },
    /// An internal cut was moved under the target
    Moved { node_id: String },
    /// Outline text became new nodes; `ids` are the top-level ones
    Text { ids: Vec<String> },
    /// The clipboard held nothing usable
    Nothing,
}

impl MindmapDocument {
    /// Copy the primary selection
    pub async fn copy(&mut self) -> Result<()> {
        let id = self.require_primary().map_err(|e| rejected("copy", e))?;
        self.copy_node(&id).await
    }

    /// Remember `id` for an internal paste and put its text on the system
    /// clipboard (best effort)
    pub async fn copy_node(&mut self, id: &str) -> Result<()> {
        let text = self
            .require_node(id)
            .map_err(|e| rejected("copy", e))?
            .text
            .clone();
        self.clipboard = Some(ClipboardSlot::copy(id));
        self.mirror_text(&text).await;
        Ok(())
    }

    /// Cut the primary selection
    pub async fn cut(&mut self) -> Result<()> {
        let id = self.require_primary().map_err(|e| rejected("cut", e))?;
        self.cut_node(&id).await
    }

    /// Like [`copy_node`](Self::copy_node), but a later paste moves the node.
    /// The root cannot be cut.
    pub async fn cut_node(&mut self, id: &str) -> Result<()> {
        let node = self.require_node(id).map_err(|e| rejected("cut", e))?;
        if node.is_root() {
            return Err(rejected(
                "cut",
                MindmapError::invalid_operation("Cannot cut the root node"),
            ));
        }
        let text = node.text.clone();
        self.clipboard = Some(ClipboardSlot::cut(id));
        self.mirror_text(&text).await;
        Ok(())
    }

    /// Paste onto the primary selection
    pub async fn paste(&mut self) -> Result<PasteOutcome> {
        let id = self.require_primary().map_err(|e| rejected("paste", e))?;
        self.paste_into(&id).await
    }

    pub async fn paste_into(&mut self, target_id: &str) -> Result<PasteOutcome> {
        self.require_node(target_id)
            .map_err(|e| rejected("paste", e))?;

        let clipboard = Arc::clone(&self.system_clipboard);
        let content = ClipboardContent::read(clipboard.as_ref())
            .await
            .map_err(|e| rejected("paste", e))?;

        let outcome = match content {
            ClipboardContent::Image(data) => self.paste_image(target_id, &data).await,
            ClipboardContent::Text(text) => self.paste_text_content(target_id, &text),
            ClipboardContent::Empty => {
                debug!("Clipboard is empty, nothing to paste");
                Ok(PasteOutcome::Nothing)
            }
        };
        outcome.map_err(|e| rejected("paste", e))
    }

    fn paste_text_content(&mut self, target_id: &str, text: &str) -> Result<PasteOutcome> {
        self.require_node(target_id)?;
        match self.matching_slot(text) {
            Some(slot) if slot.mode == ClipboardMode::Copy => {
                self.paste_copy(&slot.source_id, target_id)
            }
            Some(slot) => self.paste_cut(&slot.source_id, target_id),
            None => self.paste_text(target_id, text),
        }
    }

    async fn paste_image(&mut self, target_id: &str, data: &[u8]) -> Result<PasteOutcome> {
        let images = Arc::clone(&self.images);
        let image_ref = images.save(data).await?;

        if !self.tree.contains(target_id) {
            self.orphaned_images.push(image_ref);
            return Err(MindmapError::not_found(target_id));
        }
        match self.create_image_child(target_id, &image_ref) {
            Ok(node_id) => Ok(PasteOutcome::Image { node_id, image_ref }),
            Err(e) => {
                self.orphaned_images.push(image_ref);
                Err(e)
            }
        }
    }

    /// The internal slot, if its source still exists and its text is what the
    /// system clipboard holds now
    fn matching_slot(&self, clipboard_text: &str) -> Option<ClipboardSlot> {
        let slot = self.clipboard.clone()?;
        let source = self.tree.get(&slot.source_id)?;
        (source.text == clipboard_text).then_some(slot)
    }

    fn paste_copy(&mut self, source_id: &str, target_id: &str) -> Result<PasteOutcome> {
        let mut copy = self
            .tree
            .subtree(source_id)
            .ok_or_else(|| MindmapError::not_found(source_id))?;

        let snapshot = self.capture()?;
        let written = self.assign_fresh_ids(&mut copy);
        let root_id = copy.id.clone();
        let ids: Vec<String> = copy.iter().map(|node| node.id.clone()).collect();
        if let Err(e) = self.tree.insert_child(target_id, copy, InsertAt::End) {
            self.discard_documents(&written);
            return Err(e);
        }

        self.commit(snapshot);
        self.selection.select(&root_id);
        self.pan_target = Some(root_id.clone());
        debug!(source = %source_id, copy = %root_id, nodes = ids.len(), "Pasted copy");

        self.events.emit(MindmapEvent::NodesCreated {
            parent_id: target_id.to_string(),
            ids,
        });
        self.emit_selection();
        Ok(PasteOutcome::Copied { root_id })
    }

    /// Give every node of `copy` a new id and a new document holding a copy
    /// of the source content. Returns the document refs written.
    fn assign_fresh_ids(&mut self, copy: &mut MindmapNode) -> Vec<String> {
        let mut written = Vec::new();
        let mut stack = vec![copy];
        while let Some(node) = stack.pop() {
            let doc_ref = self.ids.document_ref();
            let content = if node.document_ref.is_empty() {
                String::new()
            } else {
                match self.documents.get(&node.document_ref) {
                    Ok(content) => content.unwrap_or_default(),
                    Err(e) => {
                        warn!(doc_ref = %node.document_ref, error = %e, "Failed to read document for copy");
                        String::new()
                    }
                }
            };
            match self.documents.set(&doc_ref, &content) {
                Ok(()) => written.push(doc_ref.clone()),
                Err(e) => {
                    warn!(doc_ref = %doc_ref, error = %e, "Failed to write copied document")
                }
            }

            node.id = self.ids.node_id();
            node.document_ref = doc_ref;
            node.position = None;
            if node.node_type.as_deref() == Some(ROOT_NODE_TYPE) {
                node.node_type = None;
            }
            stack.extend(node.children.iter_mut().rev());
        }
        written
    }

    fn paste_cut(&mut self, source_id: &str, target_id: &str) -> Result<PasteOutcome> {
        if self.tree.is_ancestor(source_id, target_id) {
            return Err(MindmapError::invalid_operation(format!(
                "Cannot paste node {} into its own subtree",
                source_id
            )));
        }
        self.move_node(source_id, target_id)?;
        self.clipboard = None;
        Ok(PasteOutcome::Moved {
            node_id: source_id.to_string(),
        })
    }

    fn paste_text(&mut self, target_id: &str, text: &str) -> Result<PasteOutcome> {
        let lines = parse_outline(text);
        if lines.is_empty() {
            return Ok(PasteOutcome::Nothing);
        }

        let snapshot = self.capture()?;
        let ids = Arc::clone(&self.ids);
        let forest = build_forest(&lines, |line| MindmapNode::new(ids.node_id(), line, ""));
        let created: Vec<String> = forest
            .iter()
            .flat_map(|root| root.iter().map(|node| node.id.clone()))
            .collect();
        let top_level: Vec<String> = forest.iter().map(|root| root.id.clone()).collect();

        self.tree.append_children(target_id, forest)?;

        self.commit(snapshot);
        debug!(lines = lines.len(), target = %target_id, "Pasted outline text");
        self.events.emit(MindmapEvent::NodesCreated {
            parent_id: target_id.to_string(),
            ids: created,
        });
        Ok(PasteOutcome::Text { ids: top_level })
    }

    async fn mirror_text(&self, text: &str) {
        let clipboard = Arc::clone(&self.system_clipboard);
        if let Err(e) = clipboard.write_text(text).await {
            warn!(error = %e, "Could not mirror node text to the system clipboard");
        }
    }
}
