//! External collaborators
//!
//! The engine never touches disk or the OS clipboard directly. It talks to
//! three narrow interfaces instead:
//!
//! - [`DocumentStore`]: rich-text document content keyed by document ref
//! - [`ImageStore`]: image bytes keyed by image ref
//! - [`SystemClipboard`]: the OS clipboard (image and text flavours)
//!
//! Like the storage traits elsewhere in this workspace, fallible methods
//! return `anyhow::Result`; the engine maps failures to
//! `MindmapError::ExternalIo` at its boundary.
//!
//! In-memory implementations are provided for tests and headless use.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Rich-text document content, one entry per node.
///
/// Synchronous: the editor keeps documents in memory and only the archive
/// layer (out of scope here) touches disk.
pub trait DocumentStore: Send + Sync {
    /// Content for `doc_ref`, `None` if it was never written
    fn get(&self, doc_ref: &str) -> Result<Option<String>>;

    /// Create or overwrite
    fn set(&mut self, doc_ref: &str, content: &str) -> Result<()>;

    /// Remove; deleting a missing ref is not an error
    fn delete(&mut self, doc_ref: &str) -> Result<()>;
}

/// Image bytes storage
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist raw image data and return an opaque ref for it
    async fn save(&self, data: &[u8]) -> Result<String>;

    /// Release an image no node references any more
    async fn delete(&self, image_ref: &str) -> Result<()>;
}

/// The operating system clipboard
#[async_trait]
pub trait SystemClipboard: Send + Sync {
    /// Image data currently on the clipboard, if any
    async fn read_image(&self) -> Result<Option<Vec<u8>>>;

    /// Text currently on the clipboard, if any
    async fn read_text(&self) -> Result<Option<String>>;

    async fn write_text(&self, text: &str) -> Result<()>;
}

/// `HashMap`-backed [`DocumentStore`]
#[derive(Debug, Default, Clone)]
pub struct MemoryDocumentStore {
    documents: HashMap<String, String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, doc_ref: &str) -> bool {
        self.documents.contains_key(doc_ref)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, doc_ref: &str) -> Result<Option<String>> {
        Ok(self.documents.get(doc_ref).cloned())
    }

    fn set(&mut self, doc_ref: &str, content: &str) -> Result<()> {
        if doc_ref.is_empty() {
            return Err(anyhow!("document ref cannot be empty"));
        }
        self.documents.insert(doc_ref.to_string(), content.to_string());
        Ok(())
    }

    fn delete(&mut self, doc_ref: &str) -> Result<()> {
        self.documents.remove(doc_ref);
        Ok(())
    }
}

/// In-memory [`ImageStore`]. Deletes can be made to fail to exercise the
/// engine's log-and-continue cleanup path.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, Vec<u8>>>,
    fail_deletes: AtomicBool,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, image_ref: &str) -> Option<Vec<u8>> {
        self.images.read().await.get(image_ref).cloned()
    }

    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save(&self, data: &[u8]) -> Result<String> {
        let image_ref = format!("{}.png", Uuid::new_v4());
        self.images
            .write()
            .await
            .insert(image_ref.clone(), data.to_vec());
        Ok(image_ref)
    }

    async fn delete(&self, image_ref: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(anyhow!("failed to delete image {}", image_ref));
        }
        self.images.write().await.remove(image_ref);
        Ok(())
    }
}

/// In-memory [`SystemClipboard`]. Writing text clears any image, the way a
/// real clipboard replaces its contents.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    image: RwLock<Option<Vec<u8>>>,
    text: RwLock<Option<String>>,
    unavailable: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_image(&self, data: Vec<u8>) {
        *self.image.write().await = Some(data);
        *self.text.write().await = None;
    }

    /// Put an image on the clipboard from base64 or a `data:` URL
    pub async fn set_image_payload(&self, payload: &str) -> crate::Result<()> {
        let data = crate::clipboard::decode_image_payload(payload)?;
        self.set_image(data).await;
        Ok(())
    }

    pub async fn set_text(&self, text: impl Into<String>) {
        *self.image.write().await = None;
        *self.text.write().await = Some(text.into());
    }

    pub async fn text(&self) -> Option<String> {
        self.text.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.image.write().await = None;
        *self.text.write().await = None;
    }

    /// Make every call fail, as when no clipboard service is reachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow!("system clipboard unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SystemClipboard for MemoryClipboard {
    async fn read_image(&self) -> Result<Option<Vec<u8>>> {
        self.check_available()?;
        Ok(self.image.read().await.clone())
    }

    async fn read_text(&self) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.text.read().await.clone())
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        self.check_available()?;
        self.set_text(text).await;
        Ok(())
    }
}
