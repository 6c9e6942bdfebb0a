use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a node in a [`crate::Document`] arena.
///
/// Handles stay valid for the lifetime of the document: detaching a node
/// unlinks it from its parent but never frees it, so an element that still
/// holds the handle can put the node back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeData {
    /// Element with a tag name and attributes (`class` and `style` included)
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },

    /// Text node
    Text { content: String },
}

impl NodeData {
    pub fn element(tag: impl Into<String>) -> Self {
        NodeData::Element {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        NodeData::Text {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Elements that never have children in markup
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

/// Elements that count as content even without any text
pub fn is_replaced_element(tag: &str) -> bool {
    matches!(
        tag,
        "img" | "iframe" | "video" | "audio" | "embed" | "object" | "svg" | "canvas" | "hr" | "input" | "table"
    )
}
