//! Data Models
//!
//! This module contains the core data structures shared by every component:
//!
//! - `MindmapNode` - Nested, serializable node tree (persistence, snapshots, clipboard)
//! - `Position` / `NodeSize` - Layout coordinates and measured sizes

mod node;

pub(crate) use node::LEGACY_PARENT_KEY;
pub use node::{MindmapNode, NodeSize, Position, ValidationError, ROOT_NODE_TYPE};
