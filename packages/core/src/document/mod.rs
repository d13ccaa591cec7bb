//! Mindmap Document
//!
//! `MindmapDocument` is the editing aggregate: one owned value holding the
//! tree store, the view-level sets (collapsed, pinned, selection, view root),
//! node sizes, undo history, the internal clipboard slot and the debounced
//! layout state. Every UI action is a method on it.
//!
//! # Operation shape
//!
//! Undoable mutations follow one sequence:
//!
//! 1. validate ids and structural rules (nothing is touched yet)
//! 2. capture a snapshot of the current tree
//! 3. mutate the tree store
//! 4. push the snapshot, schedule a debounced layout, mark dirty
//! 5. publish a [`MindmapEvent`]
//!
//! Any `Err` leaves the tree, the history and the auxiliary sets exactly as
//! they were. Rejections are also logged at `warn`.
//!
//! # Layout
//!
//! The document never spawns timers. Mutations arm an internal
//! [`Debouncer`]; the host calls [`MindmapDocument::poll_layout`] when the
//! deadline passes (see [`crate::scheduler::DebounceTimer`]) or
//! [`MindmapDocument::flush_layout`] to run it right away. Collapse toggles
//! and undo/redo lay out immediately. Nothing is laid out while a drag is in
//! progress; the pending pass runs when the drag ends.

mod edit;
mod paste;
mod undo;
mod view;

pub use paste::PasteOutcome;

use crate::clipboard::ClipboardSlot;
use crate::collaborators::{
    DocumentStore, ImageStore, MemoryClipboard, MemoryDocumentStore, MemoryImageStore,
    SystemClipboard,
};
use crate::error::{MindmapError, Result};
use crate::events::{EventBus, MindmapEvent};
use crate::history::{History, HistoryConfig, Snapshot};
use crate::ids::{IdGenerator, UuidGenerator};
use crate::layout::{self, LayoutConfig};
use crate::models::{MindmapNode, NodeSize};
use crate::persistence::{self, MapFile};
use crate::scheduler::Debouncer;
use crate::selection::Selection;
use crate::tree::{NodeRecord, TreeStore};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_CHILD_TEXT: &str = "New Child";
const DEFAULT_SIBLING_TEXT: &str = "New Sibling";
const DEFAULT_IMAGE_TEXT: &str = "New Image";

/// Document settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentConfig {
    pub layout: LayoutConfig,
    pub history: HistoryConfig,
    pub default_child_text: String,
    pub default_sibling_text: String,
    pub default_image_text: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            history: HistoryConfig::default(),
            default_child_text: DEFAULT_CHILD_TEXT.to_string(),
            default_sibling_text: DEFAULT_SIBLING_TEXT.to_string(),
            default_image_text: DEFAULT_IMAGE_TEXT.to_string(),
        }
    }
}

impl DocumentConfig {
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.history.validate()?;
        Ok(())
    }
}

/// External services a document talks to
pub struct Collaborators {
    pub ids: Arc<dyn IdGenerator>,
    pub documents: Box<dyn DocumentStore>,
    pub images: Arc<dyn ImageStore>,
    pub clipboard: Arc<dyn SystemClipboard>,
}

impl Default for Collaborators {
    /// Random ids and in-memory stores
    fn default() -> Self {
        Self {
            ids: Arc::new(UuidGenerator),
            documents: Box::new(MemoryDocumentStore::new()),
            images: Arc::new(MemoryImageStore::new()),
            clipboard: Arc::new(MemoryClipboard::new()),
        }
    }
}

pub struct MindmapDocument {
    tree: TreeStore,
    sizes: HashMap<String, NodeSize>,
    collapsed: HashSet<String>,
    pinned: IndexSet<String>,
    selection: Selection,
    view_root: Option<String>,
    pan_target: Option<String>,
    history: History,
    clipboard: Option<ClipboardSlot>,
    config: DocumentConfig,
    layout_debounce: Debouncer,
    dragging: bool,
    dirty: bool,
    orphaned_images: Vec<String>,
    ids: Arc<dyn IdGenerator>,
    documents: Box<dyn DocumentStore>,
    images: Arc<dyn ImageStore>,
    system_clipboard: Arc<dyn SystemClipboard>,
    events: EventBus,
}

impl MindmapDocument {
    /// Empty document with in-memory collaborators
    pub fn new(config: DocumentConfig) -> Result<Self> {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: DocumentConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tree: TreeStore::new(),
            sizes: HashMap::new(),
            collapsed: HashSet::new(),
            pinned: IndexSet::new(),
            selection: Selection::new(),
            view_root: None,
            pan_target: None,
            history: History::new(config.history),
            clipboard: None,
            layout_debounce: Debouncer::new(config.layout.debounce_window()),
            config,
            dragging: false,
            dirty: false,
            orphaned_images: Vec::new(),
            ids: collaborators.ids,
            documents: collaborators.documents,
            images: collaborators.images,
            system_clipboard: collaborators.clipboard,
            events: EventBus::default(),
        })
    }

    /// Replace the whole tree; `None` clears the document.
    ///
    /// Clears history, rebuilds the index, selects the root and resets the
    /// view root. Collapse and pin state survive for ids that still exist;
    /// the root is pinned when nothing else is.
    pub fn load(&mut self, root: Option<MindmapNode>) -> Result<()> {
        let collapsed = self.collapsed.clone();
        let pinned = self.pinned.clone();
        self.replace_tree(root, collapsed, pinned)
    }

    /// Load a decoded `map.json`, including its collapse and pin state
    pub fn load_map(&mut self, map: MapFile) -> Result<()> {
        self.replace_tree(
            Some(map.root_node),
            map.collapsed_node_ids.into_iter().collect(),
            map.pinned_node_ids.into_iter().collect(),
        )
    }

    /// Start a fresh "New Mindmap" document and seed its root document
    pub fn create_new(&mut self) -> Result<()> {
        let fresh = persistence::default_document(self.ids.as_ref());
        for (doc_ref, content) in &fresh.documents {
            self.documents.set(doc_ref, content)?;
        }
        self.load_map(fresh.map)
    }

    /// Current state in `map.json` form; `None` for an empty document
    pub fn to_map(&self) -> Option<MapFile> {
        let root_node = self.tree.to_tree()?;
        let mut collapsed_node_ids: Vec<String> = self.collapsed.iter().cloned().collect();
        collapsed_node_ids.sort();
        Some(MapFile {
            root_node,
            collapsed_node_ids,
            pinned_node_ids: self.pinned.iter().cloned().collect(),
        })
    }

    fn replace_tree(
        &mut self,
        root: Option<MindmapNode>,
        collapsed: HashSet<String>,
        pinned: IndexSet<String>,
    ) -> Result<()> {
        let tree = match root {
            Some(root) => TreeStore::from_tree(root)?,
            None => TreeStore::new(),
        };

        self.tree = tree;
        self.history.clear();
        self.layout_debounce.cancel();
        self.orphaned_images.clear();
        self.clipboard = None;
        self.pan_target = None;
        self.view_root = None;
        self.dirty = false;
        self.selection.clear();

        match self.tree.root_id().map(str::to_string) {
            Some(root_id) => {
                let tree = &self.tree;
                self.collapsed = collapsed.into_iter().filter(|id| tree.contains(id)).collect();
                self.pinned = pinned.into_iter().filter(|id| tree.contains(id)).collect();
                self.sizes.retain(|id, _| tree.contains(id));
                if self.pinned.is_empty() {
                    self.pinned.insert(root_id.clone());
                }
                self.selection.select(&root_id);
                self.view_root = Some(root_id.clone());
                info!(root = %root_id, nodes = self.tree.len(), "Loaded mindmap");
                self.relayout_now();
            }
            None => {
                self.collapsed.clear();
                self.pinned.clear();
                self.sizes.clear();
                info!("Cleared mindmap");
            }
        }

        self.events.emit(MindmapEvent::TreeLoaded {
            root_id: self.tree.root_id().map(str::to_string),
        });
        self.emit_selection();
        Ok(())
    }

    // Accessors

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn root_id(&self) -> Option<&str> {
        self.tree.root_id()
    }

    /// O(1) lookup
    pub fn find_node(&self, id: &str) -> Option<&NodeRecord> {
        self.tree.get(id)
    }

    /// O(1) parent lookup
    pub fn find_parent(&self, id: &str) -> Option<&NodeRecord> {
        self.tree.find_parent(id)
    }

    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.tree.is_ancestor(ancestor, descendant)
    }

    /// Pre-order descendants of `id`, excluding `id`
    pub fn descendants(&self, id: &str) -> Vec<String> {
        self.tree.descendants(id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn primary_id(&self) -> Option<&str> {
        self.selection.primary()
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selection.to_vec()
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    pub fn collapsed_ids(&self) -> &HashSet<String> {
        &self.collapsed
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.pinned.contains(id)
    }

    pub fn pinned_ids(&self) -> Vec<String> {
        self.pinned.iter().cloned().collect()
    }

    pub fn node_size(&self, id: &str) -> NodeSize {
        self.sizes
            .get(id)
            .copied()
            .unwrap_or_else(|| self.config.layout.default_size())
    }

    pub fn clipboard_slot(&self) -> Option<&ClipboardSlot> {
        self.clipboard.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }

    /// Image refs waiting for [`release_orphaned_images`](Self::release_orphaned_images)
    pub fn orphaned_images(&self) -> &[String] {
        &self.orphaned_images
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the host after the archive was written
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MindmapEvent> {
        self.events.subscribe()
    }

    // Layout scheduling

    /// Run the debounced layout if its window has elapsed at `now`.
    /// Returns whether a layout pass ran.
    pub fn poll_layout(&mut self, now: Instant) -> bool {
        if self.dragging || !self.layout_debounce.fire_if_due(now) {
            return false;
        }
        self.run_layout();
        true
    }

    /// Run a pending debounced layout immediately. Returns whether one ran;
    /// during a drag nothing runs and the layout stays pending.
    pub fn flush_layout(&mut self) -> bool {
        if self.dragging || !self.layout_debounce.cancel() {
            return false;
        }
        self.run_layout();
        true
    }

    pub fn layout_pending(&self) -> bool {
        self.layout_debounce.is_pending()
    }

    pub fn layout_deadline(&self) -> Option<Instant> {
        self.layout_debounce.deadline()
    }

    /// Drop a pending layout, e.g. when the document is being torn down
    pub fn cancel_pending_layout(&mut self) -> bool {
        self.layout_debounce.cancel()
    }

    /// Apply new spacing settings and schedule a relayout
    pub fn set_layout_config(&mut self, layout: LayoutConfig) -> Result<()> {
        layout.validate().map_err(|e| rejected("set_layout_config", e))?;
        self.config.layout = layout;
        self.layout_debounce.set_window(layout.debounce_window());
        self.schedule_layout();
        Ok(())
    }

    /// Start an interactive drag; layout is suppressed until it ends
    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// End the drag and lay out once. Returns the ids whose position changed.
    pub fn end_drag(&mut self) -> Vec<String> {
        self.dragging = false;
        self.layout_debounce.cancel();
        self.run_layout()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    // Internal helpers shared by the operation modules

    fn schedule_layout(&mut self) {
        self.layout_debounce.trigger(Instant::now());
    }

    /// Immediate layout, unless a drag is active
    fn relayout_now(&mut self) {
        if self.dragging {
            self.schedule_layout();
            return;
        }
        self.layout_debounce.cancel();
        self.run_layout();
    }

    fn run_layout(&mut self) -> Vec<String> {
        let positions =
            layout::compute_layout(&self.tree, &self.sizes, &self.collapsed, &self.config.layout);
        let changed =
            layout::apply_positions(&mut self.tree, &positions, self.config.layout.position_epsilon);
        debug!(
            laid_out = positions.len(),
            changed = changed.len(),
            "Applied layout"
        );
        if !changed.is_empty() {
            self.events.emit(MindmapEvent::LayoutApplied {
                changed: changed.clone(),
            });
        }
        changed
    }

    fn require_node(&self, id: &str) -> Result<&NodeRecord> {
        self.tree.get(id).ok_or_else(|| MindmapError::not_found(id))
    }

    fn require_primary(&self) -> Result<String> {
        self.selection
            .primary()
            .map(str::to_string)
            .ok_or_else(|| MindmapError::invalid_operation("No node is selected"))
    }

    /// Snapshot of the tree as it is now, to be pushed once the mutation that
    /// follows has succeeded
    fn capture(&self) -> Result<Option<Snapshot>> {
        if self.tree.is_empty() {
            return Ok(None);
        }
        Snapshot::capture(&self.tree).map(Some)
    }

    /// Finish a successful undoable mutation
    fn commit(&mut self, snapshot: Option<Snapshot>) {
        if let Some(snapshot) = snapshot {
            self.history.push(snapshot);
        }
        self.schedule_layout();
        self.dirty = true;
    }

    /// Remove documents written for nodes that never made it into the tree
    fn discard_documents(&mut self, doc_refs: &[String]) {
        for doc_ref in doc_refs {
            if let Err(e) = self.documents.delete(doc_ref) {
                warn!(doc_ref = %doc_ref, error = %e, "Failed to remove unused document");
            }
        }
    }

        /// Drop auxiliary state that refers to ids no longer in the tree
    fn prune_detached_state(&mut self) {
        let tree = &self.tree;
        self.collapsed.retain(|id| tree.contains(id));
        self.pinned.retain(|id| tree.contains(id));
        self.sizes.retain(|id, _| tree.contains(id));
        if self.pinned.is_empty() {
            if let Some(root) = tree.root_id() {
                self.pinned.insert(root.to_string());
            }
        }
        if self
            .view_root
            .as_deref()
            .is_some_and(|id| !tree.contains(id))
        {
            self.view_root = tree.root_id().map(str::to_string);
        }
        if self
            .pan_target
            .as_deref()
            .is_some_and(|id| !tree.contains(id))
        {
            self.pan_target = None;
        }
        if self
            .clipboard
            .as_ref()
            .is_some_and(|slot| !tree.contains(&slot.source_id))
        {
            self.clipboard = None;
        }
    }

    fn emit_selection(&self) {
        self.events.emit(MindmapEvent::SelectionChanged {
            selected: self.selection.to_vec(),
        });
    }
}

/// Log a failed operation and pass the error through
fn rejected(operation: &'static str, err: MindmapError) -> MindmapError {
    if err.is_rejection() {
        warn!(operation, error = %err, "Operation rejected");
    } else {
        warn!(operation, error = %err, "Operation failed");
    }
    err
}
