//! MindNote Core Tree Engine
//!
//! This crate provides the in-memory model behind the MindNote mindmap editor:
//! the node tree with its id index, the layout engine, multi-selection,
//! snapshot undo/redo and the clipboard/paste engine.
//!
//! # Architecture
//!
//! - **One aggregate**: [`MindmapDocument`] owns the tree, view state, history
//!   and clipboard slot; every UI action is a method on it
//! - **Arena tree**: [`TreeStore`] keeps nodes in an id-keyed map with explicit
//!   parent links, so lookups and parent queries are O(1)
//! - **Snapshot history**: each undoable mutation stores a flat serialized copy
//!   of the whole tree; restoring rebuilds the index and parent links
//! - **Explicit invalidation**: mutations arm a debounced layout and publish
//!   [`MindmapEvent`]s; the host decides when to render
//! - **Collaborator traits**: documents, images and the OS clipboard sit
//!   behind traits with in-memory implementations for tests and tools
//!
//! # Modules
//!
//! - [`models`] - Nested node form used on disk, in snapshots and on the clipboard
//! - [`tree`] - Indexed tree store and visible-node projection
//! - [`layout`] - Horizontal tree layout
//! - [`selection`] - Ordered multi-selection
//! - [`history`] - Undo/redo snapshot stacks
//! - [`clipboard`] - Clipboard slot, outline parsing and image payloads
//! - [`document`] - The editing aggregate
//! - [`persistence`] - `map.json` encoding
//! - [`scheduler`] - Debounce primitives
//! - [`events`] - Change notifications

pub mod clipboard;
pub mod collaborators;
pub mod document;
pub mod error;
pub mod events;
pub mod history;
pub mod ids;
pub mod layout;
pub mod models;
pub mod persistence;
pub mod scheduler;
pub mod selection;
pub mod tree;

// Re-export commonly used types
pub use clipboard::{ClipboardMode, ClipboardSlot};
pub use collaborators::{
    DocumentStore, ImageStore, MemoryClipboard, MemoryDocumentStore, MemoryImageStore,
    SystemClipboard,
};
pub use document::{Collaborators, DocumentConfig, MindmapDocument, PasteOutcome};
pub use error::{MindmapError, Result};
pub use events::{EventBus, MindmapEvent};
pub use history::{History, HistoryConfig};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use layout::{compute_layout, LayoutConfig};
pub use models::{MindmapNode, NodeSize, Position, ValidationError};
pub use persistence::MapFile;
pub use tree::{InsertAt, NodeRecord, Placement, TreeStore};
