//! Document Events
//!
//! Mutations on a [`crate::document::MindmapDocument`] publish a
//! `MindmapEvent` on a tokio broadcast channel. Observers (the presentation
//! layer, autosave) subscribe without the document knowing about them, and
//! decide for themselves when to re-render.
//!
//! Publishing with no subscribers is not an error; the event is dropped.

use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity for the document event broadcast channel.
///
/// Lagging receivers lose the oldest events and get `RecvError::Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MindmapEvent {
    /// A new tree replaced the old one (or the tree was cleared)
    #[serde(rename_all = "camelCase")]
    TreeLoaded { root_id: Option<String> },

    /// Nodes were inserted under `parent_id`
    #[serde(rename_all = "camelCase")]
    NodesCreated { parent_id: String, ids: Vec<String> },

    /// Subtrees were removed; `ids` lists every removed node
    NodesRemoved { ids: Vec<String> },

    #[serde(rename_all = "camelCase")]
    NodeMoved { id: String, new_parent_id: String },

    /// Text, images or stored position of a node changed
    NodeChanged { id: String },

    #[serde(rename_all = "camelCase")]
    SiblingsReordered { parent_id: String },

    /// A layout pass wrote new positions for `changed`
    LayoutApplied { changed: Vec<String> },

    /// Selection, view root or collapse/pin state changed
    SelectionChanged { selected: Vec<String> },

    /// Undo or redo restored a snapshot
    HistoryRestored { undo: bool },
}

impl MindmapEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MindmapEvent::TreeLoaded { .. } => "tree:loaded",
            MindmapEvent::NodesCreated { .. } => "nodes:created",
            MindmapEvent::NodesRemoved { .. } => "nodes:removed",
            MindmapEvent::NodeMoved { .. } => "node:moved",
            MindmapEvent::NodeChanged { .. } => "node:changed",
            MindmapEvent::SiblingsReordered { .. } => "siblings:reordered",
            MindmapEvent::LayoutApplied { .. } => "layout:applied",
            MindmapEvent::SelectionChanged { .. } => "selection:changed",
            MindmapEvent::HistoryRestored { .. } => "history:restored",
        }
    }
}

/// Broadcast sender wrapper owned by the document
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MindmapEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    pub fn subscribe(&self) -> broadcast::Receiver<MindmapEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: MindmapEvent) {
        tracing::trace!(event = event.event_type(), "Emitting document event");
        // Ignore send errors - no subscribers is OK
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = MindmapEvent::NodesCreated {
            parent_id: "p".to_string(),
            ids: vec!["a".to_string()],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "nodesCreated");
        assert_eq!(value["parentId"], "p");
        assert_eq!(value["ids"][0], "a");
        assert_eq!(event.event_type(), "nodes:created");
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::default();
        bus.emit(MindmapEvent::NodeChanged { id: "x".into() });

        let mut rx = bus.subscribe();
        bus.emit(MindmapEvent::NodeChanged { id: "y".into() });
        assert_eq!(
            rx.recv().await.unwrap(),
            MindmapEvent::NodeChanged { id: "y".into() }
        );
        assert_eq!(bus.subscriber_count(), 1);
    }
}
