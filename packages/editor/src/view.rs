//! External view renderer seam
//!
//! State-backed blocks delegate their visual content to a renderer. The
//! renderer mounts a view inside the block's root node, patches it when
//! state changes and reports user interaction back as [`ViewEvent`]s.

use crate::errors::{EditorError, EditorResult};
use serde_json::Value;
use std::collections::HashMap;
use trellis_document::{Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewHandle(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The view took focus and wants its block selected
    FocusRequested,

    /// The user edited state inside the view
    StateUpdated(Value),
}

pub trait ViewRenderer {
    fn mount(&mut self, doc: &mut Document, target: NodeId, kind: &str, state: &Value) -> EditorResult<ViewHandle>;

    fn update(&mut self, doc: &mut Document, handle: ViewHandle, state: &Value) -> EditorResult<()>;

    fn unmount(&mut self, doc: &mut Document, handle: ViewHandle);

    /// Events emitted since the last call
    fn drain_events(&mut self) -> Vec<(ViewHandle, ViewEvent)>;
}

/// Renders a plain-text summary of the state
#[derive(Debug, Default)]
pub struct StaticRenderer {
    next_handle: u64,
    views: HashMap<ViewHandle, NodeId>,
    events: Vec<(ViewHandle, ViewEvent)>,
}

pub const VIEW_CLASS: &str = "trellis-view";

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_node(&self, handle: ViewHandle) -> Option<NodeId> {
        self.views.get(&handle).copied()
    }

    pub fn mounted(&self) -> usize {
        self.views.len()
    }

    /// Simulate user interaction inside a view
    pub fn emit(&mut self, handle: ViewHandle, event: ViewEvent) {
        self.events.push((handle, event));
    }
}

fn summary(kind: &str, state: &Value) -> String {
    let label = ["label", "name", "title"]
        .iter()
        .find_map(|key| state.get(*key).and_then(Value::as_str));
    match (label, state.get("items").and_then(Value::as_array)) {
        (Some(label), _) => format!("{}: {}", kind, label),
        (None, Some(items)) => format!("{}: {} items", kind, items.len()),
        (None, None) => kind.to_string(),
    }
}

impl ViewRenderer for StaticRenderer {
    fn mount(&mut self, doc: &mut Document, target: NodeId, kind: &str, state: &Value) -> EditorResult<ViewHandle> {
        let node = doc.create_element_with_classes("div", &[VIEW_CLASS]);
        doc.set_attribute(node, "data-view-kind", kind)?;
        doc.set_attribute(node, "contenteditable", "false")?;
        doc.set_text_content(node, &summary(kind, state))?;
        doc.append_child(target, node)?;

        self.next_handle += 1;
        let handle = ViewHandle(self.next_handle);
        self.views.insert(handle, node);
        Ok(handle)
    }

    fn update(&mut self, doc: &mut Document, handle: ViewHandle, state: &Value) -> EditorResult<()> {
        let node = self
            .views
            .get(&handle)
            .copied()
            .ok_or_else(|| EditorError::missing_context(format!("view {:?} is not mounted", handle)))?;
        let kind = doc.attribute(node, "data-view-kind").unwrap_or_default().to_string();
        doc.set_text_content(node, &summary(&kind, state))?;
        Ok(())
    }

    fn unmount(&mut self, doc: &mut Document, handle: ViewHandle) {
        if let Some(node) = self.views.remove(&handle) {
            doc.detach(node);
        }
    }

    fn drain_events(&mut self) -> Vec<(ViewHandle, ViewEvent)> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mount_update_unmount() {
        let mut doc = Document::new();
        let root = doc.root();
        let mut renderer = StaticRenderer::new();

        let handle = renderer.mount(&mut doc, root, "button", &json!({ "label": "Go" })).unwrap();
        let node = renderer.view_node(handle).unwrap();
        assert_eq!(doc.text_content(node), "button: Go");

        renderer.update(&mut doc, handle, &json!({ "label": "Stop" })).unwrap();
        assert_eq!(doc.text_content(node), "button: Stop");

        renderer.unmount(&mut doc, handle);
        assert!(!doc.is_connected(node));
        assert!(renderer.update(&mut doc, handle, &json!({})).is_err());
    }

    #[test]
    fn test_summary_of_items() {
        assert_eq!(summary("navigation", &json!({ "items": [1, 2] })), "navigation: 2 items");
        assert_eq!(summary("icon", &json!({})), "icon");
    }
}
