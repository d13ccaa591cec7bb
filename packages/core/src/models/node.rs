//! Node Data Structures
//!
//! This module defines `MindmapNode`, the nested, serializable form of a node
//! tree. It is the shape written to `map.json`, the shape of every undo
//! snapshot, and the shape the clipboard clones. The live, indexed form lives
//! in [`crate::tree::TreeStore`].
//!
//! # Examples
//!
//! ```rust
//! use mindnote_core::models::MindmapNode;
//!
//! let mut root = MindmapNode::new("root-id", "New Mindmap", "root-doc.md");
//! root.children.push(MindmapNode::new("child-id", "Child", "child-doc.md"));
//!
//! assert_eq!(root.count(), 2);
//! assert!(root.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Type tag written on the root node
pub const ROOT_NODE_TYPE: &str = "root";

/// Key some older files carry on every node; parent links are rebuilt from
/// `children`, so it is never trusted.
pub(crate) const LEGACY_PARENT_KEY: &str = "parentNodeId";

/// Validation errors for persisted trees
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Invalid node ID format: {0}")]
    InvalidId(String),
}

/// Last computed layout coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when either axis moved by more than `epsilon`
    pub fn differs_from(&self, other: &Position, epsilon: f64) -> bool {
        (self.x - other.x).abs() > epsilon || (self.y - other.y).abs() > epsilon
    }
}

/// Measured size of a rendered node, reported by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

impl NodeSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Nested mindmap node as persisted in `map.json`.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID), immutable after creation
/// - `text`: Display text
/// - `children`: Ordered children; order drives sibling position and layout
/// - `document_ref`: Key of the rich-text document in the document store
///   (serialized as `markdown` for compatibility with existing files)
/// - `image_refs`: Image identifiers in the image store (serialized as `images`)
/// - `position`: Last computed layout position
/// - `node_type`: Optional type tag (`"root"` on the root)
/// - `extra`: Presentation fields this engine does not interpret (`style`,
///   `draggable`, ...), carried through unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapNode {
    pub id: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub children: Vec<MindmapNode>,

    #[serde(default, rename = "markdown")]
    pub document_ref: String,

    #[serde(default, rename = "images")]
    pub image_refs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MindmapNode {
    /// Create a childless node with no images and no position
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        document_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            children: Vec::new(),
            document_ref: document_ref.into(),
            image_refs: Vec::new(),
            position: None,
            node_type: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Builder-style helper to attach image refs
    pub fn with_images(mut self, image_refs: Vec<String>) -> Self {
        self.image_refs = image_refs;
        self
    }

    /// Builder-style helper to append a child
    pub fn with_child(mut self, child: MindmapNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including `self`
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order iterator over this subtree
    pub fn iter(&self) -> impl Iterator<Item = &MindmapNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Locate a node by id in this subtree (linear; use the tree store index
    /// for anything on a hot path)
    pub fn find(&self, id: &str) -> Option<&MindmapNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Validate ids: non-empty and unique across the subtree
    ///
    /// # Errors
    ///
    /// - `MissingField("id")` if any node has an empty id
    /// - `DuplicateId` if an id appears twice
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for node in self.iter() {
            if node.id.trim().is_empty() {
                return Err(ValidationError::MissingField("id".to_string()));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(ValidationError::DuplicateId(node.id.clone()));
            }
        }
        Ok(())
    }

    /// Structural equality: ids, text, child order, document refs and image
    /// refs. Positions and presentation extras are ignored.
    pub fn same_structure(&self, other: &MindmapNode) -> bool {
        // equal child counts at every step keep the two pre-orders aligned
        let mut left = self.iter();
        let mut right = other.iter();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    if a.id != b.id
                        || a.text != b.text
                        || a.document_ref != b.document_ref
                        || a.image_refs != b.image_refs
                        || a.children.len() != b.children.len()
                    {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}
