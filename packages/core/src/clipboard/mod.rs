//! Clipboard / Paste Engine building blocks
//!
//! The internal clipboard is a single slot naming a source node and whether
//! it was copied or cut. Paste itself is an operation on
//! [`crate::document::MindmapDocument`], which combines this slot with the
//! system clipboard contents.

mod outline;
mod payload;

pub use outline::{build_forest, parse_outline, OutlineLine};
pub use payload::{decode_image_payload, ClipboardContent};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardMode {
    Copy,
    Cut,
}

/// Internal clipboard slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSlot {
    pub source_id: String,
    pub mode: ClipboardMode,
}

impl ClipboardSlot {
    pub fn copy(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            mode: ClipboardMode::Copy,
        }
    }

    pub fn cut(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            mode: ClipboardMode::Cut,
        }
    }
}
