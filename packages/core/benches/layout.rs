//! Performance benchmarks for the tree engine hot paths
//!
//! Run with: `cargo bench -p mindnote-core`
//!
//! - Full layout pass over a 1000-node tree
//! - Snapshot capture + undo on the same tree
//! - Outline paste of 1000 lines

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mindnote_core::layout::{apply_positions, compute_layout};
use mindnote_core::{DocumentConfig, LayoutConfig, MindmapDocument, MindmapNode, TreeStore};
use std::collections::{HashMap, HashSet};

/// 10 branches of 10 sub-branches of 9 leaves, 1011 nodes in all
fn generate_tree() -> MindmapNode {
    let mut root = MindmapNode::new("root", "Root", "root.md");
    for i in 0..10 {
        let mut branch = MindmapNode::new(format!("b{}", i), format!("Branch {}", i), "");
        for j in 0..10 {
            let mut sub = MindmapNode::new(format!("b{}-{}", i, j), "Sub", "");
            for k in 0..9 {
                sub.children
                    .push(MindmapNode::new(format!("b{}-{}-{}", i, j, k), "Leaf", ""));
            }
            branch.children.push(sub);
        }
        root.children.push(branch);
    }
    root
}

fn generate_outline(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("{}Line {}", "\t".repeat(i % 4), i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_layout(c: &mut Criterion) {
    let tree = TreeStore::from_tree(generate_tree()).unwrap();
    let sizes = HashMap::new();
    let collapsed = HashSet::new();
    let config = LayoutConfig::default();

    c.bench_function("compute_layout_1000_nodes", |b| {
        b.iter(|| compute_layout(black_box(&tree), &sizes, &collapsed, &config))
    });

    c.bench_function("compute_and_apply_layout_1000_nodes", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                let positions = compute_layout(&tree, &sizes, &collapsed, &config);
                apply_positions(&mut tree, &positions, config.position_epsilon)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");
    group.sample_size(20); // each iteration serializes the whole tree twice

    group.bench_function("edit_then_undo_1000_nodes", |b| {
        let mut doc = MindmapDocument::new(DocumentConfig::default()).unwrap();
        doc.load(Some(generate_tree())).unwrap();
        b.iter(|| {
            doc.update_node_text("b5-5", "edited").unwrap();
            doc.undo().unwrap()
        })
    });

    group.finish();
}

fn bench_outline_paste(c: &mut Criterion) {
    let text = generate_outline(1000);

    c.bench_function("parse_and_build_1000_line_outline", |b| {
        b.iter(|| {
            let lines = mindnote_core::clipboard::parse_outline(black_box(&text));
            let mut n = 0;
            mindnote_core::clipboard::build_forest(&lines, |line| {
                n += 1;
                MindmapNode::new(format!("p{}", n), line, "")
            })
        })
    });
}

criterion_group!(benches, bench_layout, bench_history, bench_outline_paste);
criterion_main!(benches);
