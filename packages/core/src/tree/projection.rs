//! Visible-node projection
//!
//! The flattened list the presentation layer renders: a pre-order walk from
//! the view root that does not descend into collapsed nodes.

use super::{NodeRecord, TreeStore};
use std::collections::HashSet;

impl TreeStore {
    /// Pre-order traversal from `view_root` (or the real root when `None` or
    /// unknown), skipping the children of every collapsed node. The collapsed
    /// node itself is still listed.
    pub fn visible_nodes(
        &self,
        view_root: Option<&str>,
        collapsed: &HashSet<String>,
    ) -> Vec<&NodeRecord> {
        let start = view_root
            .filter(|id| self.contains(id))
            .or_else(|| self.root_id());
        let Some(start) = start else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            out.push(node);
            if !collapsed.contains(id) {
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    /// Ids of [`visible_nodes`](Self::visible_nodes)
    pub fn visible_ids(&self, view_root: Option<&str>, collapsed: &HashSet<String>) -> Vec<String> {
        self.visible_nodes(view_root, collapsed)
            .into_iter()
            .map(|node| node.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::models::MindmapNode;
    use crate::tree::TreeStore;
    use std::collections::HashSet;

    fn tree() -> TreeStore {
        let n = |id: &str| MindmapNode::new(id, id, "");
        TreeStore::from_tree(
            n("r")
                .with_child(n("a").with_child(n("a1")).with_child(n("a2")))
                .with_child(n("b").with_child(n("b1"))),
        )
        .unwrap()
    }

    #[test]
    fn test_full_preorder() {
        let tree = tree();
        assert_eq!(
            tree.visible_ids(None, &HashSet::new()),
            vec!["r", "a", "a1", "a2", "b", "b1"]
        );
    }

    #[test]
    fn test_collapsed_nodes_hide_children() {
        let tree = tree();
        let collapsed: HashSet<String> = ["a".to_string()].into();
        assert_eq!(
            tree.visible_ids(None, &collapsed),
            vec!["r", "a", "b", "b1"]
        );

        let collapsed: HashSet<String> = ["r".to_string()].into();
        assert_eq!(tree.visible_ids(None, &collapsed), vec!["r"]);
    }

    #[test]
    fn test_view_root() {
        let tree = tree();
        assert_eq!(tree.visible_ids(Some("b"), &HashSet::new()), vec!["b", "b1"]);
        assert_eq!(tree.visible_ids(Some("gone"), &HashSet::new()).len(), 6);
    }

    #[test]
    fn test_empty_tree() {
        assert!(TreeStore::new().visible_nodes(None, &HashSet::new()).is_empty());
    }
}
