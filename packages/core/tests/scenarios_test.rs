//! End-to-end editing scenarios
//!
//! Drives `MindmapDocument` through the public API only, the way the editor
//! shell does: create a document, mutate it, read back the visible projection.

#[cfg(test)]
mod scenario_tests {
    use anyhow::Result;
    use mindnote_core::{
        Collaborators, DocumentConfig, MemoryClipboard, MemoryDocumentStore, MemoryImageStore,
        MindmapDocument, PasteOutcome, Placement, UuidGenerator,
    };
    use std::sync::Arc;

    /// Helper to create a fresh document plus a handle on its clipboard
    fn new_document() -> Result<(MindmapDocument, Arc<MemoryClipboard>)> {
        let clipboard = Arc::new(MemoryClipboard::new());
        let collaborators = Collaborators {
            ids: Arc::new(UuidGenerator),
            documents: Box::new(MemoryDocumentStore::new()),
            images: Arc::new(MemoryImageStore::new()),
            clipboard: clipboard.clone(),
        };
        let mut doc = MindmapDocument::with_collaborators(DocumentConfig::default(), collaborators)?;
        doc.create_new()?;
        Ok((doc, clipboard))
    }

    fn root_id(doc: &MindmapDocument) -> String {
        doc.root_id().expect("document has a root").to_string()
    }

    fn visible_texts(doc: &MindmapDocument) -> Vec<String> {
        doc.visible_nodes().iter().map(|n| n.text.clone()).collect()
    }

    #[test]
    fn test_children_listed_in_insertion_order() -> Result<()> {
        let (mut doc, _) = new_document()?;
        let root = root_id(&doc);

        doc.add_child_with_text(&root, "Child1")?;
        doc.add_child_with_text(&root, "Child2")?;

        assert_eq!(visible_texts(&doc), vec!["New Mindmap", "Child1", "Child2"]);
        Ok(())
    }

    #[test]
    fn test_collapsing_root_leaves_only_root_visible() -> Result<()> {
        let (mut doc, _) = new_document()?;
        let root = root_id(&doc);
        doc.add_child_with_text(&root, "Child1")?;
        doc.add_child_with_text(&root, "Child2")?;

        doc.toggle_collapse(&root)?;

        assert_eq!(visible_texts(&doc), vec!["New Mindmap"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tab_indented_paste_builds_nested_children() -> Result<()> {
        let (mut doc, clipboard) = new_document()?;
        let root = root_id(&doc);
        clipboard.set_text("A\n\tB\n\tC\n\t\tD\nE").await;

        let outcome = doc.paste_into(&root).await?;
        assert!(matches!(outcome, PasteOutcome::Text { ref ids } if ids.len() == 2));

        assert_eq!(
            visible_texts(&doc),
            vec!["New Mindmap", "A", "B", "C", "D", "E"]
        );
        let top = doc.tree().children_of(&root).to_vec();
        let a_children = doc.tree().children_of(&top[0]).to_vec();
        assert_eq!(a_children.len(), 2);
        assert_eq!(doc.tree().children_of(&a_children[1]).len(), 1);
        assert!(doc.tree().children_of(&top[1]).is_empty());
        Ok(())
    }

    #[test]
    fn test_undo_then_redo_of_add_child() -> Result<()> {
        let (mut doc, _) = new_document()?;
        let root = root_id(&doc);

        let child = doc.add_child(&root)?;
        assert!(doc.undo()?);
        assert!(doc.tree().children_of(&root).is_empty());

        assert!(doc.redo()?);
        assert_eq!(doc.tree().children_of(&root), &[child]);
        Ok(())
    }

    #[test]
    fn test_reorder_after_next_sibling() -> Result<()> {
        let (mut doc, _) = new_document()?;
        let root = root_id(&doc);
        let parent = doc.add_child(&root)?;
        let c1 = doc.add_child(&parent)?;
        let c2 = doc.add_child(&parent)?;

        assert!(doc.reorder(&c1, &c2, Placement::After)?);

        assert_eq!(doc.tree().children_of(&parent), &[c2, c1.clone()]);
        assert_eq!(doc.tree().index_in_parent(&c1), Some(1));
        Ok(())
    }
}
