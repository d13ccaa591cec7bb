//! Tree Store
//!
//! Owns the live node tree. Nodes are kept in a single id-keyed map that is at
//! once the owner and the lookup index, so `find_node` and `find_parent` are
//! O(1). Each record stores its ordered child ids and an explicit `parent_id`.
//!
//! # Invariants
//!
//! After every public method returns (successfully or not):
//!
//! - exactly one root (no `parent_id`), every other node reachable from it
//! - ids are unique
//! - `parent_id` of a node equals the id of the record whose `children` lists it
//! - no cycles
//!
//! Failing operations validate before touching anything, so an `Err` always
//! means the tree is unchanged.

mod projection;

use crate::error::{MindmapError, Result};
use crate::models::{MindmapNode, Position, ValidationError, LEGACY_PARENT_KEY};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where to put a node relative to a sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    After,
}

/// Where to put a new child within its parent's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    End,
    /// Clamped to the current number of children
    Index(usize),
}

/// A node as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub text: String,
    /// Ordered child ids
    pub children: Vec<String>,
    pub document_ref: String,
    pub image_refs: Vec<String>,
    pub position: Option<Position>,
    pub node_type: Option<String>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A subtree detached by [`TreeStore::remove_subtree`]
#[derive(Debug, Clone)]
pub struct RemovedSubtree {
    /// The detached subtree in nested form
    pub subtree: MindmapNode,
    /// Every removed id, pre-order, starting with the subtree root
    pub removed_ids: Vec<String>,
    /// Former parent
    pub parent_id: String,
    /// Former index among the parent's children
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeStore {
    root_id: Option<String>,
    index: HashMap<String, NodeRecord>,
}

impl TreeStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a nested tree, rebuilding every parent link from
    /// `children`.
    ///
    /// # Errors
    ///
    /// `MindmapError::Validation` for empty or duplicate ids.
    pub fn from_tree(root: MindmapNode) -> Result<Self> {
        root.validate()?;
        let mut store = Self {
            root_id: Some(root.id.clone()),
            index: HashMap::with_capacity(root.count()),
        };
        store.index_subtree(root, None);
        Ok(store)
    }

    /// Build a store from flat records, such as those returned by
    /// [`records`](Self::records). Child order comes from each record's
    /// `children`, and every `parent_id` must agree with it.
    ///
    /// # Errors
    ///
    /// - `Validation` for empty or duplicate ids
    /// - `InvalidOperation` if the records do not form a single tree
    pub fn from_records(records: Vec<NodeRecord>) -> Result<Self> {
        let mut store = Self {
            root_id: None,
            index: HashMap::with_capacity(records.len()),
        };
        for record in records {
            if record.id.trim().is_empty() {
                return Err(ValidationError::MissingField("id".to_string()).into());
            }
            if store.index.contains_key(&record.id) {
                return Err(ValidationError::DuplicateId(record.id).into());
            }
            if record.is_root() {
                if let Some(root) = &store.root_id {
                    return Err(MindmapError::invalid_operation(format!(
                        "Both {} and {} have no parent",
                        root, record.id
                    )));
                }
                store.root_id = Some(record.id.clone());
            }
            store.index.insert(record.id.clone(), record);
        }
        store.verify().map_err(MindmapError::invalid_operation)?;
        Ok(store)
    }

    /// Replace the whole tree. `None` empties the store.
    pub fn load(&mut self, root: Option<MindmapNode>) -> Result<()> {
        *self = match root {
            Some(root) => Self::from_tree(root)?,
            None => Self::new(),
        };
        Ok(())
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    pub fn root(&self) -> Option<&NodeRecord> {
        self.root_id.as_deref().and_then(|id| self.index.get(id))
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_root(&self, id: &str) -> bool {
        self.root_id.as_deref() == Some(id)
    }

    /// O(1) lookup
    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.index.get(id)
    }

    /// Every node, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.index.values()
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut NodeRecord> {
        self.index.get_mut(id)
    }

    /// O(1) parent lookup through the stored `parent_id`
    pub fn find_parent(&self, id: &str) -> Option<&NodeRecord> {
        let parent_id = self.index.get(id)?.parent_id.as_deref()?;
        self.index.get(parent_id)
    }

    /// Ordered child ids of `id` (empty for unknown ids)
    pub fn children_of(&self, id: &str) -> &[String] {
        self.index
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Index of `id` among its parent's children
    pub fn index_in_parent(&self, id: &str) -> Option<usize> {
        let parent = self.find_parent(id)?;
        parent.children.iter().position(|child| child == id)
    }

    /// True if `descendant` is in the subtree rooted at `ancestor`
    /// (a node counts as being in its own subtree).
    ///
    /// Walks parent links upward, so the cost is the depth of `descendant`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        if !self.contains(ancestor) || !self.contains(descendant) {
            return false;
        }
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.index.get(id).and_then(|node| node.parent_id.as_deref());
        }
        false
    }

    /// All descendants of `id` in pre-order, excluding `id` itself
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self
            .children_of(id)
            .iter()
            .rev()
            .map(String::as_str)
            .collect();
        while let Some(current) = stack.pop() {
            out.push(current.to_string());
            stack.extend(self.children_of(current).iter().rev().map(String::as_str));
        }
        out
    }

    /// Ids from the root down to `id`, inclusive. Empty for unknown ids.
    pub fn ancestry(&self, id: &str) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.index.get(id);
        while let Some(node) = current {
            path.push(node.id.clone());
            current = node.parent_id.as_deref().and_then(|p| self.index.get(p));
        }
        path.reverse();
        path
    }

    /// Export the subtree rooted at `id` in nested form
    pub fn subtree(&self, id: &str) -> Option<MindmapNode> {
        // children follow their parent in pre-order, so walking it backwards
        // always finds them already built
        let mut built: HashMap<&str, MindmapNode> = HashMap::new();
        for record in self.preorder(id).into_iter().rev() {
            let children = record
                .children
                .iter()
                .filter_map(|child| built.remove(child.as_str()))
                .collect();
            built.insert(
                record.id.as_str(),
                MindmapNode {
                    id: record.id.clone(),
                    text: record.text.clone(),
                    children,
                    document_ref: record.document_ref.clone(),
                    image_refs: record.image_refs.clone(),
                    position: record.position,
                    node_type: record.node_type.clone(),
                    extra: record.extra.clone(),
                },
            );
        }
        built.remove(id)
    }

    /// Export the whole tree in nested form
    pub fn to_tree(&self) -> Option<MindmapNode> {
        self.root_id.as_deref().and_then(|root| self.subtree(root))
    }

    /// Every record in pre-order from the root. Together with
    /// [`from_records`](Self::from_records) this is a flat, depth-independent
    /// copy of the tree.
    pub fn records(&self) -> Vec<&NodeRecord> {
        self.root_id
            .as_deref()
            .map(|root| self.preorder(root))
            .unwrap_or_default()
    }

    /// Insert `node` (and any children it carries) under `parent_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the parent is absent
    /// - `Validation` if the subtree has empty or duplicate ids
    /// - `InvalidOperation` if any id of the subtree already exists
    pub fn insert_child(&mut self, parent_id: &str, node: MindmapNode, at: InsertAt) -> Result<()> {
        let child_count = self
            .index
            .get(parent_id)
            .ok_or_else(|| MindmapError::not_found(parent_id))?
            .children
            .len();
        self.check_insertable(&node)?;

        let slot = match at {
            InsertAt::End => child_count,
            InsertAt::Index(i) => i.min(child_count),
        };
        let node_id = node.id.clone();
        self.index_subtree(node, Some(parent_id.to_string()));
        if let Some(parent) = self.index.get_mut(parent_id) {
            parent.children.insert(slot, node_id);
        }
        Ok(())
    }

    /// Append several subtrees under `parent_id`, in order. Every subtree is
    /// checked before any is inserted, so either all of them land or none.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the parent is absent
    /// - `Validation` for empty ids or an id repeated anywhere in `nodes`
    /// - `InvalidOperation` if any id already exists in the tree
    pub fn append_children(&mut self, parent_id: &str, nodes: Vec<MindmapNode>) -> Result<()> {
        if !self.contains(parent_id) {
            return Err(MindmapError::not_found(parent_id));
        }
        {
            let mut seen = HashSet::new();
            for node in &nodes {
                self.check_insertable(node)?;
                if let Some(repeated) = node.iter().find(|n| !seen.insert(n.id.as_str())) {
                    return Err(ValidationError::DuplicateId(repeated.id.clone()).into());
                }
            }
        }

        for node in nodes {
            let node_id = node.id.clone();
            self.index_subtree(node, Some(parent_id.to_string()));
            if let Some(parent) = self.index.get_mut(parent_id) {
                parent.children.push(node_id);
            }
        }
        Ok(())
    }

    /// Insert `node` next to `node_id`, under the same parent.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `node_id` is absent
    /// - `InvalidOperation` if `node_id` is the root
    /// - anything [`insert_child`](Self::insert_child) rejects
    pub fn insert_sibling(
        &mut self,
        node_id: &str,
        node: MindmapNode,
        placement: Placement,
    ) -> Result<()> {
        let record = self
            .index
            .get(node_id)
            .ok_or_else(|| MindmapError::not_found(node_id))?;
        let parent_id = record.parent_id.clone().ok_or_else(|| {
            MindmapError::invalid_operation("Cannot add a sibling to the root node")
        })?;
        let index = self.index_in_parent(node_id).ok_or_else(|| {
            MindmapError::invalid_operation(format!(
                "Node {} is not listed under its parent {}",
                node_id, parent_id
            ))
        })?;
        let slot = match placement {
            Placement::Before => index,
            Placement::After => index + 1,
        };
        self.insert_child(&parent_id, node, InsertAt::Index(slot))
    }

    /// Detach the subtree rooted at `id` and drop all of its ids from the index.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `id` is absent
    /// - `InvalidOperation` if `id` is the root
    pub fn remove_subtree(&mut self, id: &str) -> Result<RemovedSubtree> {
        let record = self.index.get(id).ok_or_else(|| MindmapError::not_found(id))?;
        let parent_id = record
            .parent_id
            .clone()
            .ok_or_else(|| MindmapError::invalid_operation("Cannot delete the root node"))?;
        let subtree = self
            .subtree(id)
            .ok_or_else(|| MindmapError::not_found(id))?;
        let index = self.index_in_parent(id).unwrap_or(0);

        let mut removed_ids = vec![id.to_string()];
        removed_ids.extend(self.descendants(id));

        if let Some(parent) = self.index.get_mut(&parent_id) {
            parent.children.retain(|child| child != id);
        }
        for removed in &removed_ids {
            self.index.remove(removed);
        }

        Ok(RemovedSubtree {
            subtree,
            removed_ids,
            parent_id,
            index,
        })
    }

    /// Move `id` (with its subtree) to the end of `new_parent_id`'s children.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` for self-reparent, moving the root, or moving a node
    ///   under its own descendant
    /// - `NotFound` if either id is absent
    pub fn reparent(&mut self, id: &str, new_parent_id: &str) -> Result<()> {
        if id == new_parent_id {
            return Err(MindmapError::invalid_operation(
                "Cannot reparent a node to itself",
            ));
        }
        let record = self.index.get(id).ok_or_else(|| MindmapError::not_found(id))?;
        if !self.contains(new_parent_id) {
            return Err(MindmapError::not_found(new_parent_id));
        }
        let old_parent_id = record
            .parent_id
            .clone()
            .ok_or_else(|| MindmapError::invalid_operation("Cannot reparent the root node"))?;
        if self.is_ancestor(id, new_parent_id) {
            return Err(MindmapError::invalid_operation(format!(
                "Cannot move node {} under its descendant {}",
                id, new_parent_id
            )));
        }

        if let Some(old_parent) = self.index.get_mut(&old_parent_id) {
            old_parent.children.retain(|child| child != id);
        }
        if let Some(new_parent) = self.index.get_mut(new_parent_id) {
            new_parent.children.push(id.to_string());
        }
        if let Some(moved) = self.index.get_mut(id) {
            moved.parent_id = Some(new_parent_id.to_string());
        }
        Ok(())
    }

    /// Move `id` directly before or after `target_id`.
    ///
    /// Returns `false` without changing anything when the two are the same
    /// node or do not share a parent.
    pub fn reorder_sibling(&mut self, id: &str, target_id: &str, placement: Placement) -> bool {
        if id == target_id {
            return false;
        }
        let parent_id = match (
            self.index.get(id).and_then(|n| n.parent_id.clone()),
            self.index.get(target_id).and_then(|n| n.parent_id.as_deref()),
        ) {
            (Some(a), Some(b)) if a == b => a,
            _ => return false,
        };
        let Some(parent) = self.index.get_mut(&parent_id) else {
            return false;
        };
        let siblings = &mut parent.children;
        let (Some(old_index), Some(mut target_index)) = (
            siblings.iter().position(|s| s == id),
            siblings.iter().position(|s| s == target_id),
        ) else {
            return false;
        };

        let moved = siblings.remove(old_index);
        if old_index < target_index {
            target_index -= 1;
        }
        let slot = match placement {
            Placement::Before => target_index,
            Placement::After => target_index + 1,
        };
        siblings.insert(slot, moved);
        true
    }

    /// Set the display text; returns whether it changed
    pub fn set_text(&mut self, id: &str, text: &str) -> Result<bool> {
        let node = self.get_mut(id).ok_or_else(|| MindmapError::not_found(id))?;
        if node.text == text {
            return Ok(false);
        }
        node.text = text.to_string();
        Ok(true)
    }

    pub fn set_position(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self.get_mut(id).ok_or_else(|| MindmapError::not_found(id))?;
        node.position = Some(position);
        Ok(())
    }

    pub fn push_image(&mut self, id: &str, image_ref: impl Into<String>) -> Result<()> {
        let node = self.get_mut(id).ok_or_else(|| MindmapError::not_found(id))?;
        node.image_refs.push(image_ref.into());
        Ok(())
    }

    /// Check every structural invariant. Intended for tests and debug
    /// assertions; returns a description of the first violation.
    pub fn verify(&self) -> std::result::Result<(), String> {
        let Some(root_id) = self.root_id.as_deref() else {
            return if self.index.is_empty() {
                Ok(())
            } else {
                Err("index holds nodes but there is no root".to_string())
            };
        };
        let root = self
            .index
            .get(root_id)
            .ok_or_else(|| format!("root {} is not indexed", root_id))?;
        if root.parent_id.is_some() {
            return Err(format!("root {} has a parent", root_id));
        }

        let mut visited = 0usize;
        let mut stack = vec![root_id];
        while let Some(id) = stack.pop() {
            visited += 1;
            if visited > self.index.len() {
                return Err("cycle or duplicate child reference detected".to_string());
            }
            let node = self
                .index
                .get(id)
                .ok_or_else(|| format!("child {} is not indexed", id))?;
            for child in &node.children {
                let child_node = self
                    .index
                    .get(child)
                    .ok_or_else(|| format!("child {} of {} is not indexed", child, id))?;
                if child_node.parent_id.as_deref() != Some(id) {
                    return Err(format!(
                        "parent link of {} is {:?}, expected {}",
                        child, child_node.parent_id, id
                    ));
                }
                stack.push(child);
            }
        }
        if visited != self.index.len() {
            return Err(format!(
                "{} nodes indexed but {} reachable from the root",
                self.index.len(),
                visited
            ));
        }
        Ok(())
    }

    fn preorder(&self, id: &str) -> Vec<&NodeRecord> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeRecord> = self.index.get(id).into_iter().collect();
        while let Some(record) = stack.pop() {
            out.push(record);
            stack.extend(
                record
                    .children
                    .iter()
                    .rev()
                    .filter_map(|child| self.index.get(child)),
            );
        }
        out
    }

    fn check_insertable(&self, node: &MindmapNode) -> Result<()> {
        node.validate()?;
        if let Some(existing) = node.iter().find(|n| self.index.contains_key(&n.id)) {
            return Err(MindmapError::invalid_operation(format!(
                "Node id {} already exists in the tree",
                existing.id
            )));
        }
        Ok(())
    }

    fn index_subtree(&mut self, node: MindmapNode, parent_id: Option<String>) {
        let mut stack = vec![(node, parent_id)];
        while let Some((mut node, parent_id)) = stack.pop() {
            let children = std::mem::take(&mut node.children);
            let child_ids = children.iter().map(|child| child.id.clone()).collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(node.id.clone())));
            }
            node.extra.remove(LEGACY_PARENT_KEY);
            self.index.insert(
                node.id.clone(),
                NodeRecord {
                    id: node.id,
                    parent_id,
                    text: node.text,
                    children: child_ids,
                    document_ref: node.document_ref,
                    image_refs: node.image_refs,
                    position: node.position,
                    node_type: node.node_type,
                    extra: node.extra,
                },
            );
        }
    }
}
