//! Tab-indented outline import
//!
//! Each non-blank line becomes a node; its depth is the number of leading tab
//! characters. A line's parent is the nearest preceding line with a strictly
//! smaller depth, resolved with an indent stack.

use crate::models::MindmapNode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineLine {
    pub depth: usize,
    pub text: String,
}

/// Split clipboard text into outline lines. Blank lines are dropped and
/// trailing whitespace (including `\r`) is trimmed.
pub fn parse_outline(text: &str) -> Vec<OutlineLine> {
    text.lines()
        .filter_map(|raw| {
            let line = raw.trim_end();
            let body = line.trim_start_matches('\t');
            let text = body.trim();
            if text.is_empty() {
                return None;
            }
            Some(OutlineLine {
                depth: line.len() - body.len(),
                text: text.to_string(),
            })
        })
        .collect()
}

/// Build nested nodes from outline lines. `make_node` supplies each node
/// (fresh id, refs) given its text; the returned forest is in line order.
pub fn build_forest(
    lines: &[OutlineLine],
    mut make_node: impl FnMut(&str) -> MindmapNode,
) -> Vec<MindmapNode> {
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(lines.len());
    // (line index, depth)
    let mut indent_stack: Vec<(usize, usize)> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        while indent_stack
            .last()
            .is_some_and(|&(_, depth)| depth >= line.depth)
        {
            indent_stack.pop();
        }
        parents.push(indent_stack.last().map(|&(index, _)| index));
        indent_stack.push((i, line.depth));
    }

    // A parent always precedes its children, so walking backwards moves every
    // finished subtree into a slot that is still occupied.
    let mut slots: Vec<Option<MindmapNode>> =
        lines.iter().map(|line| Some(make_node(&line.text))).collect();
    let mut roots = Vec::new();
    for i in (0..lines.len()).rev() {
        let Some(mut node) = slots[i].take() else {
            continue;
        };
        node.children.reverse();
        match parents[i].and_then(|p| slots[p].as_mut()) {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
    roots.reverse();
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(nodes: &[MindmapNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.text.as_str()).collect()
    }

    fn forest(text: &str) -> Vec<MindmapNode> {
        let mut n = 0;
        build_forest(&parse_outline(text), |t| {
            n += 1;
            MindmapNode::new(format!("p-{}", n), t, "")
        })
    }

    #[test]
    fn test_parse_depths() {
        let lines = parse_outline("A\r\n\tB  \n\n   \n\t\tC\n");
        assert_eq!(
            lines,
            vec![
                OutlineLine { depth: 0, text: "A".into() },
                OutlineLine { depth: 1, text: "B".into() },
                OutlineLine { depth: 2, text: "C".into() },
            ]
        );
    }

    #[test]
    fn test_nested_outline() {
        let roots = forest("A\n\tB\n\tC\n\t\tD\nE");
        assert_eq!(texts(&roots), vec!["A", "E"]);
        assert_eq!(texts(&roots[0].children), vec!["B", "C"]);
        assert_eq!(texts(&roots[0].children[1].children), vec!["D"]);
        assert!(roots[1].children.is_empty());
    }

    #[test]
    fn test_depth_jumps_attach_to_nearest_shallower_line() {
        let roots = forest("A\n\t\t\tB\n\tC");
        assert_eq!(texts(&roots), vec!["A"]);
        assert_eq!(texts(&roots[0].children), vec!["B", "C"]);
    }

    #[test]
    fn test_leading_indent_without_parent() {
        let roots = forest("\t\tX\nY");
        assert_eq!(texts(&roots), vec!["X", "Y"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(forest("\n\n\t\n").is_empty());
    }
}
