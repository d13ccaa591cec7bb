//! Mindmap Error Types
//!
//! Error taxonomy for the tree engine. Every failing operation leaves the tree
//! unchanged; callers decide whether to surface the error or log it.

use crate::models::ValidationError;
use thiserror::Error;

/// Errors produced by tree, history, clipboard and layout operations
#[derive(Error, Debug)]
pub enum MindmapError {
    /// The operation referenced an id that is not in the tree
    #[error("Node not found: {id}")]
    NotFound { id: String },

    /// A structural rule would be violated (root deletion, cyclic reparent, ...)
    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    /// A collaborator (document store, image store, system clipboard) failed
    #[error("External I/O failure: {context}")]
    ExternalIo { context: String },

    /// An undo/redo snapshot could not be restored
    #[error("Corrupt history snapshot: {0}")]
    CorruptSnapshot(String),

    /// Persisted tree failed structural validation
    #[error("Tree validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// JSON encode/decode error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid settings
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl MindmapError {
    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Create an external I/O error
    pub fn external_io(context: impl Into<String>) -> Self {
        Self::ExternalIo {
            context: context.into(),
        }
    }

    /// Create a corrupt snapshot error
    pub fn corrupt_snapshot(msg: impl Into<String>) -> Self {
        Self::CorruptSnapshot(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the errors that leave the tree untouched and only warrant a warning
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidOperation { .. })
    }
}

impl From<anyhow::Error> for MindmapError {
    fn from(err: anyhow::Error) -> Self {
        MindmapError::ExternalIo {
            context: format!("{:#}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, MindmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MindmapError::not_found("node-123");
        assert_eq!(err.to_string(), "Node not found: node-123");

        let err = MindmapError::invalid_operation("Cannot delete the root node");
        assert_eq!(
            err.to_string(),
            "Invalid operation: Cannot delete the root node"
        );

        let err = MindmapError::external_io("clipboard unavailable");
        assert_eq!(err.to_string(), "External I/O failure: clipboard unavailable");
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: MindmapError = anyhow::anyhow!("disk full").into();
        match err {
            MindmapError::ExternalIo { context } => assert_eq!(context, "disk full"),
            other => panic!("Expected ExternalIo, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("Should fail to parse");
        let err: MindmapError = json_error.into();
        assert!(matches!(err, MindmapError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_is_rejection() {
        assert!(MindmapError::not_found("x").is_rejection());
        assert!(MindmapError::invalid_operation("x").is_rejection());
        assert!(!MindmapError::corrupt_snapshot("x").is_rejection());
        assert!(!MindmapError::external_io("x").is_rejection());
    }
}
