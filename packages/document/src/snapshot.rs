//! Node snapshots and changeset diffing
//!
//! A [`NodeSnapshot`] records what an observer last saw of a node: whether
//! it was connected, its parent, its attributes, its child list and its
//! own text: the content of a text node, or the direct text children of an
//! element. [`diff_snapshots`] compares two snapshots and
//! produces a [`Changeset`] describing what happened in between.

use crate::document::Document;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub node: NodeId,
    pub connected: bool,
    pub parent: Option<NodeId>,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<NodeId>,
    pub text: Option<String>,
}

impl NodeSnapshot {
    pub fn capture(doc: &Document, node: NodeId) -> Self {
        Self {
            node,
            connected: doc.is_connected(node),
            parent: doc.parent(node),
            attributes: doc.attributes(node).cloned().unwrap_or_default(),
            children: doc.children(node).to_vec(),
            text: shallow_text(doc, node),
        }
    }

    /// Diff the live node against this snapshot
    pub fn changes(&self, doc: &Document) -> Changeset {
        diff_snapshots(self, &NodeSnapshot::capture(doc, self.node))
    }
}

fn shallow_text(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(text) = doc.text(node) {
        return Some(text.to_string());
    }
    let texts: Vec<&str> = doc.children(node).iter().filter_map(|c| doc.text(*c)).collect();
    (!texts.is_empty()).then(|| texts.concat())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Differences between two snapshots of the same node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub attributes: Vec<AttributeChange>,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    /// Same children, different order
    pub reordered: bool,
    pub text_changed: bool,
    /// `Some(false)` when the node was detached, `Some(true)` when it came back
    pub connection: Option<bool>,
    /// Parent changed while staying connected
    pub moved: bool,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && !self.has_child_changes()
            && !self.text_changed
            && self.connection.is_none()
            && !self.moved
    }

    pub fn has_child_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || self.reordered
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeChange> {
        self.attributes.iter().find(|c| c.name == name)
    }

    pub fn detached(&self) -> bool {
        self.connection == Some(false)
    }
}

pub fn diff_snapshots(old: &NodeSnapshot, new: &NodeSnapshot) -> Changeset {
    let mut changes = Changeset::default();

    // Attributes
    let names: BTreeSet<&String> = old.attributes.keys().chain(new.attributes.keys()).collect();
    for name in names {
        let before = old.attributes.get(name);
        let after = new.attributes.get(name);
        if before != after {
            changes.attributes.push(AttributeChange {
                name: name.clone(),
                old: before.cloned(),
                new: after.cloned(),
            });
        }
    }

    // Children
    let before: BTreeSet<NodeId> = old.children.iter().copied().collect();
    let after: BTreeSet<NodeId> = new.children.iter().copied().collect();
    changes.added = new.children.iter().copied().filter(|c| !before.contains(c)).collect();
    changes.removed = old.children.iter().copied().filter(|c| !after.contains(c)).collect();
    if changes.added.is_empty() && changes.removed.is_empty() && old.children != new.children {
        changes.reordered = true;
    }

    changes.text_changed = old.text != new.text;

    if old.connected != new.connected {
        changes.connection = Some(new.connected);
    } else if new.connected && old.parent != new.parent {
        changes.moved = true;
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, NodeId) {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div).unwrap();
        (doc, div)
    }

    #[test]
    fn test_no_changes() {
        let (doc, div) = setup();
        let snapshot = NodeSnapshot::capture(&doc, div);
        assert!(snapshot.changes(&doc).is_empty());
    }

    #[test]
    fn test_attribute_changes() {
        let (mut doc, div) = setup();
        doc.set_attribute(div, "class", "a").unwrap();
        let snapshot = NodeSnapshot::capture(&doc, div);

        doc.set_attribute(div, "class", "b").unwrap();
        doc.set_attribute(div, "title", "t").unwrap();
        let changes = snapshot.changes(&doc);

        assert_eq!(
            changes.attribute("class"),
            Some(&AttributeChange {
                name: "class".to_string(),
                old: Some("a".to_string()),
                new: Some("b".to_string()),
            })
        );
        assert_eq!(changes.attribute("title").and_then(|c| c.old.clone()), None);
        assert!(!changes.has_child_changes());
    }

    #[test]
    fn test_child_changes() {
        let (mut doc, div) = setup();
        let a = doc.create_element("p");
        let b = doc.create_element("p");
        doc.append_child(div, a).unwrap();
        doc.append_child(div, b).unwrap();
        let snapshot = NodeSnapshot::capture(&doc, div);

        doc.insert_before(a, b).unwrap();
        let changes = snapshot.changes(&doc);
        assert!(changes.reordered);
        assert!(changes.added.is_empty());

        let c = doc.create_text("x");
        doc.append_child(div, c).unwrap();
        doc.detach(a);
        let changes = snapshot.changes(&doc);
        assert_eq!(changes.added, vec![c]);
        assert_eq!(changes.removed, vec![a]);
        assert!(!changes.reordered);
    }

    #[test]
    fn test_direct_text_edit() {
        let (mut doc, div) = setup();
        doc.set_text_content(div, "{}").unwrap();
        let snapshot = NodeSnapshot::capture(&doc, div);

        doc.set_text_content(div, "{\"a\":1}").unwrap();
        let changes = snapshot.changes(&doc);
        assert!(changes.text_changed);
        assert!(!changes.has_child_changes());
    }

    #[test]
    fn test_detach_and_move() {
        let (mut doc, div) = setup();
        let other = doc.create_element("section");
        doc.append_child(doc.root(), other).unwrap();
        let snapshot = NodeSnapshot::capture(&doc, div);

        doc.append_child(other, div).unwrap();
        let changes = snapshot.changes(&doc);
        assert!(changes.moved);
        assert_eq!(changes.connection, None);

        doc.detach(div);
        assert!(snapshot.changes(&doc).detached());
    }
}
