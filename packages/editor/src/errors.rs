//! Error types for the editor

use thiserror::Error;
use trellis_document::{DocumentError, MarkupError, NodeId};

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Missing document context: {0}")]
    MissingContext(String),

    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    #[error("Block type already registered: {0}")]
    DuplicateBlockType(String),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Node {node} is not a {expected} block")]
    UnrecognizedNode { node: NodeId, expected: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MarkupError> for EditorError {
    fn from(err: MarkupError) -> Self {
        EditorError::Document(DocumentError::Markup(err))
    }
}

impl EditorError {
    pub fn missing_context(message: impl Into<String>) -> Self {
        EditorError::MissingContext(message.into())
    }
}
