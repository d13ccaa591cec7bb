//! Clipboard payloads
//!
//! Resolves what the system clipboard currently offers, image first, and
//! decodes base64 image payloads as they arrive over IPC.

use crate::collaborators::SystemClipboard;
use crate::error::{MindmapError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// What a paste should work from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardContent {
    Image(Vec<u8>),
    Text(String),
    Empty,
}

impl ClipboardContent {
    /// Read the system clipboard. An image wins over text; empty image data
    /// and empty text count as absent.
    pub async fn read(clipboard: &dyn SystemClipboard) -> Result<Self> {
        if let Some(image) = clipboard.read_image().await? {
            if !image.is_empty() {
                return Ok(Self::Image(image));
            }
        }
        match clipboard.read_text().await? {
            Some(text) if !text.is_empty() => Ok(Self::Text(text)),
            _ => Ok(Self::Empty),
        }
    }
}

/// Decode an image sent as bare base64 or as a `data:image/...;base64,` URL
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>> {
    let payload = payload.trim();
    let encoded = match payload.strip_prefix("data:") {
        Some(url) => {
            let (header, data) = url.split_once(',').ok_or_else(|| {
                MindmapError::external_io("data URL has no payload separator")
            })?;
            if !header.ends_with(";base64") {
                return Err(MindmapError::external_io(format!(
                    "unsupported data URL encoding: {}",
                    header
                )));
            }
            data
        }
        None => payload,
    };

    let data = STANDARD
        .decode(encoded)
        .map_err(|e| MindmapError::external_io(format!("invalid base64 image data: {}", e)))?;
    if data.is_empty() {
        return Err(MindmapError::external_io("image payload is empty"));
    }
    Ok(data)
}
