//! Layout Engine
//!
//! Pure, deterministic placement of every laid-out node. Always runs from the
//! true root, whatever the current view root is.
//!
//! Two passes over the tree:
//!
//! 1. **Height pass**, bottom-up and memoized per id: a collapsed or childless
//!    node reserves `height + verticalGap`; anything else reserves the larger of
//!    that and the sum of its children's bands.
//! 2. **Position pass**, top-down: `x = parentX + parentWidth + horizontalGap`
//!    (the root's virtual parent sits at `-horizontalGap` with width 0), the
//!    node is centered vertically in its band and the children block is
//!    centered against it. Collapsed nodes keep their children out of the pass.
//!
//! Finally every `y` is shifted so the root sits at `y = 0`.
//!
//! Both passes are iterative, so deep trees cannot overflow the stack.

mod config;

pub use config::LayoutConfig;

use crate::models::{NodeSize, Position};
use crate::tree::TreeStore;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Compute positions for every node reachable from the root without passing
/// through a collapsed node. Hidden descendants are absent from the result.
pub fn compute_layout(
    tree: &TreeStore,
    sizes: &HashMap<String, NodeSize>,
    collapsed: &HashSet<String>,
    config: &LayoutConfig,
) -> HashMap<String, Position> {
    let Some(root_id) = tree.root_id() else {
        return HashMap::new();
    };
    let default_size = config.default_size();
    let size_of = |id: &str| sizes.get(id).copied().unwrap_or(default_size);

    let heights = subtree_heights(tree, root_id, collapsed, config.vertical_gap, &size_of);

    let mut positions = HashMap::with_capacity(heights.len());
    // (id, band start, parent x, parent width)
    let mut stack = vec![(root_id, 0.0_f64, -config.horizontal_gap, 0.0_f64)];
    while let Some((id, start_y, parent_x, parent_width)) = stack.pop() {
        let size = size_of(id);
        let band = heights.get(id).copied().unwrap_or(size.height + config.vertical_gap);
        let x = parent_x + parent_width + config.horizontal_gap;
        let y = start_y + band / 2.0 - size.height / 2.0;
        positions.insert(id.to_string(), Position::new(x, y));

        if collapsed.contains(id) {
            continue;
        }
        let children = tree.children_of(id);
        let children_band: f64 = children
            .iter()
            .map(|child| heights.get(child.as_str()).copied().unwrap_or(0.0))
            .sum();
        let mut cursor = start_y + (band - children_band) / 2.0;
        for child in children {
            stack.push((child.as_str(), cursor, x, size.width));
            cursor += heights.get(child.as_str()).copied().unwrap_or(0.0);
        }
    }

    if let Some(root_y) = positions.get(root_id).map(|p| p.y) {
        for position in positions.values_mut() {
            position.y -= root_y;
        }
    }

    debug!(nodes = positions.len(), "Computed layout");
    positions
}

/// Write computed positions onto the tree. A stored position is only replaced
/// when it is missing or differs by more than `epsilon` on either axis.
///
/// Returns the ids whose position changed, sorted.
pub fn apply_positions(
    tree: &mut TreeStore,
    positions: &HashMap<String, Position>,
    epsilon: f64,
) -> Vec<String> {
    let mut changed = Vec::new();
    for (id, position) in positions {
        let Some(node) = tree.get_mut(id) else {
            continue;
        };
        let stale = node
            .position
            .map_or(true, |current| current.differs_from(position, epsilon));
        if stale {
            node.position = Some(*position);
            changed.push(id.clone());
        }
    }
    changed.sort();
    changed
}

fn subtree_heights<'a>(
    tree: &'a TreeStore,
    root_id: &'a str,
    collapsed: &HashSet<String>,
    vertical_gap: f64,
    size_of: &dyn Fn(&str) -> NodeSize,
) -> HashMap<&'a str, f64> {
    let mut heights: HashMap<&str, f64> = HashMap::with_capacity(tree.len());
    let mut stack = vec![(root_id, false)];
    while let Some((id, children_done)) = stack.pop() {
        let own = size_of(id).height + vertical_gap;
        let children = tree.children_of(id);
        if collapsed.contains(id) || children.is_empty() {
            heights.insert(id, own);
        } else if children_done {
            let sum: f64 = children
                .iter()
                .map(|child| heights.get(child.as_str()).copied().unwrap_or(0.0))
                .sum();
            heights.insert(id, own.max(sum));
        } else {
            stack.push((id, true));
            stack.extend(children.iter().map(|child| (child.as_str(), false)));
        }
    }
    heights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MindmapNode;

    fn node(id: &str) -> MindmapNode {
        MindmapNode::new(id, id, "")
    }

    fn layout(
        tree: &TreeStore,
        sizes: &HashMap<String, NodeSize>,
        collapsed: &[&str],
    ) -> HashMap<String, Position> {
        let collapsed = collapsed.iter().map(|s| s.to_string()).collect();
        compute_layout(tree, sizes, &collapsed, &LayoutConfig::default())
    }

    #[test]
    fn test_two_children_are_symmetric_about_root() {
        let tree = TreeStore::from_tree(node("r").with_child(node("a")).with_child(node("b"))).unwrap();
        let positions = layout(&tree, &HashMap::new(), &[]);

        assert_eq!(positions["r"], Position::new(0.0, 0.0));
        assert_eq!(positions["a"], Position::new(250.0, -30.0));
        assert_eq!(positions["b"], Position::new(250.0, 30.0));
    }

    #[test]
    fn test_x_uses_measured_parent_width() {
        let tree = TreeStore::from_tree(
            node("r").with_child(node("a").with_child(node("a1"))),
        )
        .unwrap();
        let sizes = HashMap::from([
            ("r".to_string(), NodeSize::new(80.0, 40.0)),
            ("a".to_string(), NodeSize::new(300.0, 40.0)),
        ]);
        let positions = layout(&tree, &sizes, &[]);
        assert_eq!(positions["a"].x, 180.0);
        assert_eq!(positions["a1"].x, 580.0);
    }

    #[test]
    fn test_children_block_centered_against_tall_parent() {
        let tree = TreeStore::from_tree(node("r").with_child(node("a"))).unwrap();
        let sizes = HashMap::from([("r".to_string(), NodeSize::new(150.0, 200.0))]);
        let positions = layout(&tree, &sizes, &[]);

        let root_center = positions["r"].y + 100.0;
        let child_center = positions["a"].y + 20.0;
        assert_eq!(positions["r"].y, 0.0);
        assert_eq!(root_center, child_center);
    }

    #[test]
    fn test_collapsed_subtree_is_not_positioned() {
        let tree = TreeStore::from_tree(
            node("r")
                .with_child(node("a").with_child(node("a1")).with_child(node("a2")))
                .with_child(node("b")),
        )
        .unwrap();

        let expanded = layout(&tree, &HashMap::new(), &[]);
        let folded = layout(&tree, &HashMap::new(), &["a"]);

        assert_eq!(expanded.len(), 5);
        assert_eq!(folded.len(), 3);
        assert!(!folded.contains_key("a1"));
        // a's band shrinks from 120 to 60, so a and b sit closer together
        assert!(folded["b"].y - folded["a"].y < expanded["b"].y - expanded["a"].y);
    }

    #[test]
    fn test_layout_is_idempotent() {
        let tree = TreeStore::from_tree(
            node("r")
                .with_child(node("a").with_child(node("a1")))
                .with_child(node("b").with_child(node("b1")).with_child(node("b2"))),
        )
        .unwrap();
        let first = layout(&tree, &HashMap::new(), &[]);
        let second = layout(&tree, &HashMap::new(), &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_apply_positions_respects_epsilon() {
        let mut tree = TreeStore::from_tree(node("r").with_child(node("a"))).unwrap();
        let positions = layout(&tree, &HashMap::new(), &[]);

        let changed = apply_positions(&mut tree, &positions, 0.1);
        assert_eq!(changed, vec!["a", "r"]);

        let mut nudged = positions.clone();
        nudged.get_mut("a").unwrap().y += 0.05;
        assert!(apply_positions(&mut tree, &nudged, 0.1).is_empty());

        nudged.get_mut("a").unwrap().y += 1.0;
        assert_eq!(apply_positions(&mut tree, &nudged, 0.1), vec!["a"]);
    }

    #[test]
    fn test_empty_tree() {
        assert!(layout(&TreeStore::new(), &HashMap::new(), &[]).is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut chain = node("n-2000");
        for i in (0..2000).rev() {
            chain = node(&format!("n-{}", i)).with_child(chain);
        }
        let tree = TreeStore::from_tree(chain).unwrap();
        let positions = layout(&tree, &HashMap::new(), &[]);
        assert_eq!(positions.len(), 2001);
        assert_eq!(positions["n-2000"].x, 2000.0 * 250.0);
    }
}
