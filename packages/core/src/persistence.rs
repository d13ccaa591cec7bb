//! Persistence boundary
//!
//! Encoding and decoding of `map.json`, the tree file inside a mindmap
//! archive. Packing the archive itself is handled elsewhere; this module only
//! deals with the JSON and, for tools, reading/writing it on disk.
//!
//! Two layouts are accepted on read:
//!
//! ```json
//! {"rootNode": {...}, "collapsedNodeIds": [...], "pinnedNodeIds": [...]}
//! ```
//!
//! and the older one where the file is the root node itself. Writes always use
//! the first. Parent links are never persisted; they are rebuilt from
//! `children` when the tree is loaded.

use crate::error::{MindmapError, Result};
use crate::ids::IdGenerator;
use crate::models::{MindmapNode, Position, LEGACY_PARENT_KEY, ROOT_NODE_TYPE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAP_FILE_NAME: &str = "map.json";
pub const DEFAULT_ROOT_TEXT: &str = "New Mindmap";

/// Contents of `map.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFile {
    pub root_node: MindmapNode,
    #[serde(default)]
    pub collapsed_node_ids: Vec<String>,
    #[serde(default)]
    pub pinned_node_ids: Vec<String>,
}

impl MapFile {
    pub fn new(root_node: MindmapNode) -> Self {
        Self {
            root_node,
            collapsed_node_ids: Vec::new(),
            pinned_node_ids: Vec::new(),
        }
    }
}

/// A fresh mindmap: the map plus the documents it references
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub map: MapFile,
    /// `(document ref, content)` pairs to seed the document store with
    pub documents: Vec<(String, String)>,
}

/// A single "New Mindmap" root with its own heading document
pub fn default_document(ids: &dyn IdGenerator) -> NewDocument {
    let doc_ref = ids.document_ref();
    let mut root = MindmapNode::new(ids.node_id(), DEFAULT_ROOT_TEXT, doc_ref.clone());
    root.node_type = Some(ROOT_NODE_TYPE.to_string());
    root.position = Some(Position::default());

    NewDocument {
        map: MapFile::new(root),
        documents: vec![(doc_ref, format!("# {}", DEFAULT_ROOT_TEXT))],
    }
}

/// Parse `map.json` in either layout and validate the tree.
///
/// Nesting depth is not limited: deep trees parse on a stack that grows on
/// demand instead of hitting serde_json's recursion limit.
///
/// # Errors
///
/// - `Serialization` for malformed JSON or a missing `id`
/// - `Validation` for empty or duplicate ids
pub fn decode_map(json: &str) -> Result<MapFile> {
    let value = parse_unbounded(json)?;
    let mut map = if value.get("rootNode").is_some() {
        MapFile::deserialize(serde_stacker::Deserializer::new(value))?
    } else {
        MapFile::new(MindmapNode::deserialize(serde_stacker::Deserializer::new(
            value,
        ))?)
    };
    map.root_node.validate()?;
    strip_parent_links(&mut map.root_node);
    Ok(map)
}

fn parse_unbounded(json: &str) -> Result<serde_json::Value> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value = serde_json::Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Pretty-printed `map.json`
pub fn encode_map(map: &MapFile) -> Result<String> {
    Ok(serde_json::to_string_pretty(map)?)
}

/// Read and decode a map file
pub async fn read_map_file(path: &Path) -> Result<MapFile> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        MindmapError::external_io(format!("failed to read {}: {}", path.display(), e))
    })?;
    decode_map(&json)
}

/// Encode and write a map file. The data goes to a sibling temp file first and
/// is renamed over `path`, so a crash never leaves a half-written map.
pub async fn write_map_file(path: &Path, map: &MapFile) -> Result<()> {
    let json = encode_map(map)?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, json).await.map_err(|e| {
        MindmapError::external_io(format!("failed to write {}: {}", tmp.display(), e))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        MindmapError::external_io(format!(
            "failed to move {} to {}: {}",
            tmp.display(),
            path.display(),
            e
        ))
    })?;
    tracing::debug!(path = %path.display(), "Wrote map file");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| MAP_FILE_NAME.into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn strip_parent_links(root: &mut MindmapNode) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        node.extra.remove(LEGACY_PARENT_KEY);
        stack.extend(node.children.iter_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use serde_json::json;

    #[test]
    fn test_decode_current_layout() {
        let raw = json!({
            "rootNode": {
                "id": "r", "text": "Root", "markdown": "r.md", "images": [],
                "type": "root",
                "children": [
                    {"id": "a", "text": "A", "markdown": "a.md", "images": ["x.png"],
                     "children": [], "parentNodeId": "r"}
                ]
            },
            "collapsedNodeIds": ["a"],
            "pinnedNodeIds": ["r"]
        });
        let map = decode_map(&raw.to_string()).unwrap();
        assert_eq!(map.root_node.children[0].image_refs, vec!["x.png"]);
        assert_eq!(map.collapsed_node_ids, vec!["a"]);
        assert_eq!(map.pinned_node_ids, vec!["r"]);
        assert!(map.root_node.children[0].extra.get("parentNodeId").is_none());
    }

    #[test]
    fn test_decode_old_layout() {
        let raw = json!({"id": "r", "text": "Root", "markdown": "r.md", "children": []});
        let map = decode_map(&raw.to_string()).unwrap();
        assert_eq!(map.root_node.id, "r");
        assert!(map.collapsed_node_ids.is_empty());
        assert!(map.pinned_node_ids.is_empty());
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let raw = json!({"rootNode": {"id": "r", "children": [
            {"id": "a", "children": []}, {"id": "a", "children": []}
        ]}});
        assert!(matches!(
            decode_map(&raw.to_string()),
            Err(MindmapError::Validation(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_map("{\"rootNode\": 5}"),
            Err(MindmapError::Serialization(_))
        ));
        assert!(decode_map("not json").is_err());
    }

    #[test]
    fn test_decode_tree_deeper_than_json_recursion_limit() {
        let depth = 300;
        let mut chain = MindmapNode::new(format!("n{}", depth), "leaf", "");
        for i in (0..depth).rev() {
            chain = MindmapNode::new(format!("n{}", i), "link", "").with_child(chain);
        }
        let map = MapFile::new(chain);

        let decoded = decode_map(&encode_map(&map).unwrap()).unwrap();
        assert_eq!(decoded.root_node.count(), depth + 1);
        assert!(decoded.root_node.same_structure(&map.root_node));
    }

    #[test]
    fn test_decode_rejects_trailing_data() {
        assert!(matches!(
            decode_map("{\"id\": \"r\"} {}"),
            Err(MindmapError::Serialization(_))
        ));
    }

    #[test]
    fn test_encode_shape() {
        let map = MapFile::new(MindmapNode::new("r", "Root", "r.md"));
        let value: serde_json::Value = serde_json::from_str(&encode_map(&map).unwrap()).unwrap();
        assert_eq!(value["rootNode"]["markdown"], "r.md");
        assert_eq!(value["collapsedNodeIds"], json!([]));
        assert!(value["rootNode"].get("parentNodeId").is_none());
    }

    #[test]
    fn test_default_document() {
        let doc = default_document(&SequentialIds::new("n"));
        let root = &doc.map.root_node;
        assert_eq!(root.text, "New Mindmap");
        assert_eq!(root.node_type.as_deref(), Some("root"));
        assert_eq!(root.position, Some(Position::new(0.0, 0.0)));
        assert_eq!(
            doc.documents,
            vec![(root.document_ref.clone(), "# New Mindmap".to_string())]
        );
        assert_ne!(root.id, root.document_ref.trim_end_matches(".md"));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MAP_FILE_NAME);
        let map = default_document(&SequentialIds::new("n")).map;

        write_map_file(&path, &map).await.unwrap();
        assert_eq!(read_map_file(&path).await.unwrap(), map);
        assert!(!dir.path().join("map.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_map_file(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, MindmapError::ExternalIo { .. }));
    }
}
