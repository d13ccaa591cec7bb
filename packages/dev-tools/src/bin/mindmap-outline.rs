//! Mindmap Outline Inspector
//!
//! Loads a `map.json`, runs the layout engine over it and prints the visible
//! tree as an indented outline with computed positions. Handy for checking
//! files written by the editor and for eyeballing layout changes.
//!
//! # Usage
//!
//! ```bash
//! # Print the outline of an existing map
//! cargo run --bin mindmap-outline -- path/to/map.json
//!
//! # Print the laid-out map as JSON instead
//! cargo run --bin mindmap-outline -- path/to/map.json --json
//!
//! # Write a fresh "New Mindmap" file
//! cargo run --bin mindmap-outline -- path/to/map.json --new
//! ```
//!
//! # Environment Variables
//!
//! - `MINDMAP_HGAP` / `MINDMAP_VGAP`: Layout gaps (default: 100 / 20)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::path::PathBuf;

use mindnote_core::persistence::{read_map_file, write_map_file};
use mindnote_core::{DocumentConfig, LayoutConfig, MindmapDocument};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("usage: mindmap-outline <map.json> [--json | --new]"))?;
    let flag = args.next();

    let config = DocumentConfig {
        layout: layout_from_env(),
        ..DocumentConfig::default()
    };
    let mut doc = MindmapDocument::new(config)?;

    if flag.as_deref() == Some("--new") {
        doc.create_new()?;
        let map = doc
            .to_map()
            .ok_or_else(|| anyhow::anyhow!("new document has no root"))?;
        write_map_file(&path, &map).await?;
        tracing::info!("Wrote new mindmap to {}", path.display());
        return Ok(());
    }

    let map = read_map_file(&path).await?;
    doc.load_map(map)?;
    tracing::info!(
        "Loaded {} nodes from {}",
        doc.tree().len(),
        path.display()
    );

    if flag.as_deref() == Some("--json") {
        let map = doc
            .to_map()
            .ok_or_else(|| anyhow::anyhow!("map is empty"))?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    for node in doc.visible_nodes() {
        let depth = doc.tree().ancestry(&node.id).len().saturating_sub(1);
        let mut markers = String::new();
        if doc.is_pinned(&node.id) {
            markers.push('*');
        }
        if doc.is_collapsed(&node.id) && !node.children.is_empty() {
            markers.push_str(&format!(" [+{}]", doc.descendants(&node.id).len()));
        }
        let position = node
            .position
            .map(|p| format!("({:.0}, {:.0})", p.x, p.y))
            .unwrap_or_else(|| "(-, -)".to_string());
        println!(
            "{}{}{} {}",
            "  ".repeat(depth),
            node.text,
            markers,
            position
        );
    }

    Ok(())
}

fn layout_from_env() -> LayoutConfig {
    let gap = |name: &str, default: f64| {
        env::var(name)
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(default)
    };
    let defaults = LayoutConfig::default();
    LayoutConfig::with_gaps(
        gap("MINDMAP_HGAP", defaults.horizontal_gap),
        gap("MINDMAP_VGAP", defaults.vertical_gap),
    )
}
