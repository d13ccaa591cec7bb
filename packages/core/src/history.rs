//! History Manager
//!
//! Snapshot-based undo/redo. Each snapshot is the whole tree serialized to
//! JSON as a flat pre-order list of node records, so it shares nothing with
//! the live tree and its nesting does not grow with tree depth. Restoring
//! parses the list and rebuilds the store, parent links and index included.

use crate::error::{MindmapError, Result};
use crate::tree::{NodeRecord, TreeStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

const DEFAULT_MAX_SNAPSHOTS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Oldest snapshots are dropped beyond this many undo steps
    pub max_snapshots: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_snapshots == 0 {
            return Err(MindmapError::config(
                "maxSnapshots must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Whole-tree serialization taken at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    json: String,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn capture(tree: &TreeStore) -> Result<Self> {
        Ok(Self {
            json: serde_json::to_string(&tree.records())?,
            taken_at: Utc::now(),
        })
    }

    /// Parse the snapshot back into a tree store.
    ///
    /// # Errors
    ///
    /// `CorruptSnapshot` if the JSON does not parse or the records it holds
    /// do not form a single valid tree.
    pub fn restore(&self) -> Result<TreeStore> {
        let records: Vec<NodeRecord> = serde_json::from_str(&self.json)
            .map_err(|e| MindmapError::corrupt_snapshot(e.to_string()))?;
        TreeStore::from_records(records)
            .map_err(|e| MindmapError::corrupt_snapshot(e.to_string()))
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn size_bytes(&self) -> usize {
        self.json.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
    config: HistoryConfig,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            config,
        }
    }

    /// Record `current` as an undo point and drop the redo stack
    pub fn record(&mut self, current: &TreeStore) -> Result<()> {
        self.push(Snapshot::capture(current)?);
        Ok(())
    }

    /// Push a snapshot captured earlier, typically just before a mutation
    /// that has since succeeded. Drops the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.push_past(snapshot);
        self.future.clear();
    }

    /// Step back. Returns the tree to restore, or `None` when there is
    /// nothing to undo. On `Err` both stacks are untouched.
    pub fn undo(&mut self, current: &TreeStore) -> Result<Option<TreeStore>> {
        let Some(target) = self.past.back() else {
            return Ok(None);
        };
        let restored = target.restore()?;
        let current = Snapshot::capture(current)?;
        self.past.pop_back();
        self.future.push(current);
        debug!(past = self.past.len(), future = self.future.len(), "Undo");
        Ok(Some(restored))
    }

    /// Step forward; mirror of [`undo`](Self::undo)
    pub fn redo(&mut self, current: &TreeStore) -> Result<Option<TreeStore>> {
        let Some(target) = self.future.last() else {
            return Ok(None);
        };
        let restored = target.restore()?;
        let current = Snapshot::capture(current)?;
        self.future.pop();
        self.push_past(current);
        debug!(past = self.past.len(), future = self.future.len(), "Redo");
        Ok(Some(restored))
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    fn push_past(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
        while self.past.len() > self.config.max_snapshots {
            self.past.pop_front();
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt_latest(&mut self) {
        if let Some(latest) = self.past.back_mut() {
            latest.json = "[{\"id\": ".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MindmapNode;

    fn tree(text: &str) -> TreeStore {
        TreeStore::from_tree(MindmapNode::new("r", text, "r.md")).unwrap()
    }

    fn root_text(tree: &TreeStore) -> String {
        tree.root().map(|r| r.text.clone()).unwrap_or_default()
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = History::default();
        history.record(&tree("v1")).unwrap();

        let restored = history.undo(&tree("v2")).unwrap().unwrap();
        assert_eq!(root_text(&restored), "v1");
        assert!(history.can_redo());

        let restored = history.redo(&tree("v1")).unwrap().unwrap();
        assert_eq!(root_text(&restored), "v2");
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = History::default();
        assert!(history.undo(&tree("x")).unwrap().is_none());
        assert!(history.redo(&tree("x")).unwrap().is_none());
    }

    #[test]
    fn test_record_clears_future() {
        let mut history = History::default();
        history.record(&tree("v1")).unwrap();
        history.undo(&tree("v2")).unwrap();
        assert_eq!(history.redo_depth(), 1);

        history.record(&tree("v1")).unwrap();
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut history = History::default();
        let mut live = tree("before");
        history.record(&live).unwrap();
        live.set_text("r", "after").unwrap();

        let restored = history.undo(&live).unwrap().unwrap();
        assert_eq!(root_text(&restored), "before");
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut history = History::new(HistoryConfig { max_snapshots: 3 });
        for i in 0..5 {
            history.record(&tree(&format!("v{}", i))).unwrap();
        }
        assert_eq!(history.undo_depth(), 3);

        let mut current = tree("v5");
        let mut seen = Vec::new();
        while let Some(restored) = history.undo(&current).unwrap() {
            seen.push(root_text(&restored));
            current = restored;
        }
        assert_eq!(seen, vec!["v4", "v3", "v2"]);
    }

    #[test]
    fn test_corrupt_snapshot_leaves_stacks_intact() {
        let mut history = History::default();
        history.record(&tree("v1")).unwrap();
        history.corrupt_latest();

        let err = history.undo(&tree("v2")).unwrap_err();
        assert!(matches!(err, MindmapError::CorruptSnapshot(_)));
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_deep_chain_restores() {
        let depth = 400;
        let mut chain = MindmapNode::new(format!("n{}", depth), "leaf", "");
        for i in (0..depth).rev() {
            chain = MindmapNode::new(format!("n{}", i), "link", "").with_child(chain);
        }
        let deep = TreeStore::from_tree(chain).unwrap();

        let mut history = History::default();
        history.record(&deep).unwrap();
        let restored = history.undo(&tree("shallow")).unwrap().unwrap();

        assert_eq!(restored.len(), depth + 1);
        assert_eq!(restored.ancestry(&format!("n{}", depth)).len(), depth + 1);
        assert_eq!(restored.records(), deep.records());
        restored.verify().unwrap();
    }

    #[test]
    fn test_records_that_are_not_one_tree_are_corrupt() {
        let mut records: Vec<NodeRecord> =
            tree("v1").records().into_iter().cloned().collect();
        let mut stray = records[0].clone();
        stray.id = "stray".to_string();
        records.push(stray);

        let snapshot = Snapshot {
            json: serde_json::to_string(&records).unwrap(),
            taken_at: Utc::now(),
        };
        assert!(matches!(
            snapshot.restore(),
            Err(MindmapError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(HistoryConfig::default().validate().is_ok());
        assert!(HistoryConfig { max_snapshots: 0 }.validate().is_err());
    }
}
