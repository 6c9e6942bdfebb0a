//! # Document Tree
//!
//! Arena-backed document tree shared by the host editor and the block engine.
//!
//! The tree mirrors the subset of DOM operations the block engine relies on:
//! element/text creation, insertion, detachment, attributes, class lists and
//! inline style declarations. Every write that changes the tree bumps
//! [`Document::version`]; writes that would leave the tree unchanged are
//! no-ops and leave the version alone.
//!
//! ```text
//! body (root)
//!  ├─ div.trellis-grid
//!  │   └─ div.trellis-row
//!  │       └─ div.trellis-col
//!  └─ p
//! ```

use crate::error::{DocumentError, DocumentResult};
use crate::node::{is_replaced_element, Node, NodeData, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Editable document tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    version: u64,
}

impl Document {
    /// Create an empty document with a `body` root element
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::element("body"))],
            root: NodeId(0),
            version: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of effective writes applied so far
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> DocumentResult<&Node> {
        self.nodes.get(id.index()).ok_or(DocumentError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DocumentResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DocumentError::NodeNotFound(id))
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::element(tag))
    }

    /// Create a detached element with the given classes
    pub fn create_element_with_classes(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        let id = self.create_element(tag);
        if !classes.is_empty() {
            if let Some(NodeData::Element { attributes, .. }) = self.nodes.get_mut(id.index()).map(|n| &mut n.data) {
                attributes.insert("class".to_string(), classes.join(" "));
            }
        }
        id
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(NodeData::text(content))
    }

    /// Append a freshly created node during parsing
    pub(crate) fn push_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.push(data);
        if let Some(node) = self.nodes.get_mut(parent.index()) {
            node.children.push(id);
            self.nodes[id.index()].parent = Some(parent);
            self.touch();
        }
        id
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    // ---------------------------------------------------------------------
    // Node data
    // ---------------------------------------------------------------------

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.index()).map(|n| &n.data) {
            Some(NodeData::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.index()).map(|n| &n.data), Some(NodeData::Text { .. }))
    }

    /// Content of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.index()).map(|n| &n.data) {
            Some(NodeData::Text { content }) => Some(content.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) -> DocumentResult<bool> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text { content } => {
                if content == value {
                    return Ok(false);
                }
                *content = value.to_string();
            }
            NodeData::Element { .. } => return Err(DocumentError::NotText(id)),
        }
        self.touch();
        Ok(true)
    }

    /// Concatenated text of a node and all of its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.index()) else {
            return;
        };
        match &node.data {
            NodeData::Text { content } => out.push_str(content),
            NodeData::Element { .. } => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Replace all children of an element with a single text node
    ///
    /// Reuses an existing lone text child so repeated writes of the same
    /// content do not churn node identities.
    pub fn set_text_content(&mut self, id: NodeId, value: &str) -> DocumentResult<bool> {
        if !self.is_element(id) {
            return Err(DocumentError::NotAnElement(id));
        }
        let children = self.children(id).to_vec();
        if let [only] = children.as_slice() {
            if self.is_text(*only) {
                return self.set_text(*only, value);
            }
        }
        for child in children {
            self.detach(child);
        }
        let text = self.create_text(value);
        self.append_child(id, text)?;
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id).and_then(|attrs| attrs.get(name)).map(String::as_str)
    }

    pub fn attributes(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        match self.nodes.get(id.index()).map(|n| &n.data) {
            Some(NodeData::Element { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DocumentResult<bool> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => {
                if attributes.get(name).map(String::as_str) == Some(value) {
                    return Ok(false);
                }
                attributes.insert(name.to_string(), value.to_string());
            }
            NodeData::Text { .. } => return Err(DocumentError::NotAnElement(id)),
        }
        self.touch();
        Ok(true)
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DocumentResult<bool> {
        let removed = match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => attributes.remove(name).is_some(),
            NodeData::Text { .. } => return Err(DocumentError::NotAnElement(id)),
        };
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Set or remove an attribute depending on `value`
    pub fn write_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) -> DocumentResult<bool> {
        match value {
            Some(value) => self.set_attribute(id, name, value),
            None => self.remove_attribute(id, name),
        }
    }

    // ---------------------------------------------------------------------
    // Class list
    // ---------------------------------------------------------------------

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> DocumentResult<bool> {
        if self.has_class(id, class) {
            return Ok(false);
        }
        let mut classes: Vec<String> = self.classes(id).into_iter().map(str::to_string).collect();
        classes.push(class.to_string());
        self.set_attribute(id, "class", &classes.join(" "))
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> DocumentResult<bool> {
        if !self.has_class(id, class) {
            return Ok(false);
        }
        let classes: Vec<&str> = self.classes(id).into_iter().filter(|c| *c != class).collect();
        let value = classes.join(" ");
        self.set_attribute(id, "class", &value)
    }

    // ---------------------------------------------------------------------
    // Inline style
    // ---------------------------------------------------------------------

    /// Parsed inline style declarations
    pub fn style(&self, id: NodeId) -> BTreeMap<String, String> {
        self.attribute(id, "style").map(parse_style).unwrap_or_default()
    }

    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: Option<&str>) -> DocumentResult<bool> {
        let mut style = self.style(id);
        match value {
            Some(value) => {
                if style.get(property).map(String::as_str) == Some(value) {
                    return Ok(false);
                }
                style.insert(property.to_string(), value.to_string());
            }
            None => {
                if style.remove(property).is_none() {
                    return Ok(false);
                }
            }
        }
        if style.is_empty() {
            self.remove_attribute(id, "style")
        } else {
            self.set_attribute(id, "style", &format_style(&style))
        }
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.index()).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).iter().copied().filter(|c| self.is_element(*c)).collect()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Whether `node` is `ancestor` or lies inside it
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node can be reached from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains_node(id) && self.is_inclusive_ancestor(self.root, id)
    }

    /// Depth below the root (root is 0); `None` when disconnected
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        if !self.is_connected(id) {
            return None;
        }
        Some(self.ancestors(id).count())
    }

    /// Descendants in document (pre-)order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Position of every connected node in document order
    pub fn document_order(&self) -> HashMap<NodeId, usize> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect()
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DocumentResult<()> {
        let len = self.node(parent)?.children.len();
        let index = if self.parent(child) == Some(parent) { len - 1 } else { len };
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` in `parent`'s child list, detaching it first
    ///
    /// The index is interpreted after the child has been detached, and is
    /// clamped to the child list length.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> DocumentResult<()> {
        if !self.is_element(parent) {
            return Err(DocumentError::NotAnElement(parent));
        }
        self.node(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DocumentError::HierarchyRequest { parent, child });
        }
        if self.parent(child) == Some(parent) && self.index_in_parent(child) == Some(index) {
            return Ok(());
        }
        self.unlink(child);
        let node = self.node_mut(parent)?;
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.touch();
        Ok(())
    }

    /// Insert `child` immediately before `reference`
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> DocumentResult<()> {
        if reference == child {
            return Ok(());
        }
        let parent = self.parent(reference).ok_or(DocumentError::Orphan(reference))?;
        if self.next_sibling(child) == Some(reference) {
            return Ok(());
        }
        self.unlink_for_move(child, parent)?;
        let index = self.index_in_parent(reference).ok_or(DocumentError::Orphan(reference))?;
        self.insert_child(parent, index, child)
    }

    /// Insert `child` immediately after `reference`
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> DocumentResult<()> {
        if reference == child {
            return Ok(());
        }
        let parent = self.parent(reference).ok_or(DocumentError::Orphan(reference))?;
        if self.previous_sibling(child) == Some(reference) {
            return Ok(());
        }
        self.unlink_for_move(child, parent)?;
        let index = self.index_in_parent(reference).ok_or(DocumentError::Orphan(reference))?;
        self.insert_child(parent, index + 1, child)
    }

    fn unlink_for_move(&mut self, child: NodeId, parent: NodeId) -> DocumentResult<()> {
        self.node(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DocumentError::HierarchyRequest { parent, child });
        }
        if self.unlink(child) {
            self.touch();
        }
        Ok(())
    }

    /// Remove a node from its parent. Returns whether anything changed.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let changed = self.unlink(id);
        if changed {
            self.touch();
        }
        changed
    }

    fn unlink(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(node) = self.nodes.get_mut(parent.index()) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.parent = None;
        }
        true
    }

    /// Move all children of `from` to the end of `to`
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> DocumentResult<()> {
        for child in self.children(from).to_vec() {
            self.append_child(to, child)?;
        }
        Ok(())
    }

    /// True when the subtree has no visible content: no non-whitespace text
    /// and no replaced elements such as images or embeds
    pub fn is_blank(&self, id: NodeId) -> bool {
        std::iter::once(id).chain(self.descendants(id)).all(|n| match self.nodes.get(n.index()).map(|n| &n.data) {
            Some(NodeData::Text { content }) => is_blank_text(content),
            Some(NodeData::Element { tag, .. }) => !is_replaced_element(tag),
            None => true,
        })
    }

    /// True for whitespace-only text nodes
    pub fn is_whitespace_text(&self, id: NodeId) -> bool {
        self.text(id).map(is_blank_text).unwrap_or(false)
    }

    /// Deep-copy a subtree into a new detached node
    pub fn clone_subtree(&mut self, id: NodeId) -> DocumentResult<NodeId> {
        let data = self.node(id)?.data.clone();
        let copy = self.push(data);
        for child in self.children(id).to_vec() {
            let child_copy = self.clone_subtree(child)?;
            let node = self.node_mut(copy)?;
            node.children.push(child_copy);
            self.node_mut(child_copy)?.parent = Some(copy);
        }
        Ok(copy)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a node's ancestors
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

fn is_blank_text(content: &str) -> bool {
    content.chars().all(|c| c.is_whitespace() || c == '\u{feff}')
}

/// Parse `a: b; c: d` into a declaration map
pub fn parse_style(source: &str) -> BTreeMap<String, String> {
    source
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

pub fn format_style(style: &BTreeMap<String, String>) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_children(n: usize) -> (Document, NodeId, Vec<NodeId>) {
        let mut doc = Document::new();
        let parent = doc.create_element("div");
        doc.append_child(doc.root(), parent).unwrap();
        let children = (0..n)
            .map(|_| {
                let child = doc.create_element("p");
                doc.append_child(parent, child).unwrap();
                child
            })
            .collect();
        (doc, parent, children)
    }

    #[test]
    fn test_append_and_detach() {
        let (mut doc, parent, children) = doc_with_children(2);
        assert_eq!(doc.children(parent), children.as_slice());
        assert!(doc.is_connected(children[0]));

        assert!(doc.detach(children[0]));
        assert!(!doc.is_connected(children[0]));
        assert_eq!(doc.children(parent), &[children[1]]);

        // Detaching twice is a no-op
        let version = doc.version();
        assert!(!doc.detach(children[0]));
        assert_eq!(doc.version(), version);
    }

    #[test]
    fn test_insert_before_and_after() {
        let (mut doc, parent, children) = doc_with_children(3);
        doc.insert_before(children[0], children[2]).unwrap();
        assert_eq!(doc.children(parent), &[children[2], children[0], children[1]]);

        doc.insert_after(children[1], children[2]).unwrap();
        assert_eq!(doc.children(parent), &[children[0], children[1], children[2]]);
    }

    #[test]
    fn test_noop_writes_do_not_bump_version() {
        let (mut doc, parent, children) = doc_with_children(2);
        doc.set_attribute(parent, "data-x", "1").unwrap();
        let version = doc.version();

        assert!(!doc.set_attribute(parent, "data-x", "1").unwrap());
        doc.insert_after(children[0], children[1]).unwrap();
        doc.append_child(parent, children[1]).unwrap();
        assert_eq!(doc.version(), version);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let (mut doc, parent, children) = doc_with_children(1);
        let err = doc.append_child(children[0], parent).unwrap_err();
        assert_eq!(
            err,
            DocumentError::HierarchyRequest {
                parent: children[0],
                child: parent
            }
        );
    }

    #[test]
    fn test_class_list_helpers() {
        let (mut doc, parent, _) = doc_with_children(0);
        doc.add_class(parent, "a").unwrap();
        doc.add_class(parent, "b").unwrap();
        assert!(!doc.add_class(parent, "a").unwrap());
        assert_eq!(doc.classes(parent), vec!["a", "b"]);

        doc.remove_class(parent, "a").unwrap();
        assert_eq!(doc.attribute(parent, "class"), Some("b"));
    }

    #[test]
    fn test_style_declarations() {
        let (mut doc, parent, _) = doc_with_children(0);
        doc.set_style_property(parent, "color", Some("red")).unwrap();
        doc.set_style_property(parent, "margin", Some("0")).unwrap();
        assert_eq!(doc.attribute(parent, "style"), Some("color: red; margin: 0;"));

        doc.set_style_property(parent, "color", None).unwrap();
        doc.set_style_property(parent, "margin", None).unwrap();
        assert!(!doc.has_attribute(parent, "style"));
    }

    #[test]
    fn test_blank_detection() {
        let (mut doc, parent, children) = doc_with_children(1);
        let br = doc.create_element("br");
        doc.append_child(children[0], br).unwrap();
        assert!(doc.is_blank(parent));

        let img = doc.create_element("img");
        doc.append_child(children[0], img).unwrap();
        assert!(!doc.is_blank(parent));

        doc.detach(img);
        let text = doc.create_text("  \n ");
        doc.append_child(children[0], text).unwrap();
        assert!(doc.is_blank(parent));

        doc.set_text(text, "hi").unwrap();
        assert!(!doc.is_blank(parent));
    }

    #[test]
    fn test_set_text_content_reuses_text_node() {
        let (mut doc, parent, _) = doc_with_children(0);
        doc.set_text_content(parent, "one").unwrap();
        let text = doc.children(parent)[0];

        doc.set_text_content(parent, "two").unwrap();
        assert_eq!(doc.children(parent), &[text]);
        assert_eq!(doc.text_content(parent), "two");
    }

    #[test]
    fn test_document_order() {
        let (doc, parent, children) = doc_with_children(2);
        let order = doc.document_order();
        assert!(order[&parent] < order[&children[0]]);
        assert!(order[&children[0]] < order[&children[1]]);
    }
}
