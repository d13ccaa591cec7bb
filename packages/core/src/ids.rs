//! Identifier generation
//!
//! Node ids and document refs are opaque strings. Production code uses random
//! UUIDs; tests can swap in [`SequentialIds`] for readable, deterministic ids.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Extension used for rich-text document refs
pub const DOCUMENT_EXTENSION: &str = "md";

/// Source of globally unique identifiers
pub trait IdGenerator: Send + Sync {
    /// Fresh node id
    fn node_id(&self) -> String;

    /// Fresh document ref (file-name style key into the document store)
    fn document_ref(&self) -> String {
        format!("{}.{}", self.node_id(), DOCUMENT_EXTENSION)
    }
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn node_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic `prefix-N` ids
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn node_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids = UuidGenerator;
        let generated: HashSet<String> = (0..500).map(|_| ids.node_id()).collect();
        assert_eq!(generated.len(), 500);
    }

    #[test]
    fn test_document_ref_shape() {
        let doc_ref = UuidGenerator.document_ref();
        assert!(doc_ref.ends_with(".md"));
        assert!(Uuid::parse_str(doc_ref.trim_end_matches(".md")).is_ok());
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new("n");
        assert_eq!(ids.node_id(), "n-1");
        assert_eq!(ids.node_id(), "n-2");
        assert_eq!(ids.document_ref(), "n-3.md");
    }
}
