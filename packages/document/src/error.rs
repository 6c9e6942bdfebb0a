//! Error types for the document tree

use crate::node::NodeId;
use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

pub type MarkupResult<T> = Result<T, MarkupError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Node {0} has no parent")]
    Orphan(NodeId),

    #[error("Cannot insert {child} into {parent}: would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),
}

/// Markup parse error with a byte offset into the source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}: unclosed <{tag}>")]
    UnexpectedEof { pos: usize, tag: String },

    #[error("Mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl MarkupError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn pos(&self) -> usize {
        match self {
            MarkupError::UnexpectedToken { pos, .. }
            | MarkupError::UnexpectedEof { pos, .. }
            | MarkupError::MismatchedTag { pos, .. }
            | MarkupError::LexerError { pos } => *pos,
        }
    }
}

/// Pretty-print a markup error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_markup_error(source: &str, filename: &str, error: &MarkupError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let start = error.pos().min(source.len().saturating_sub(1));
    let end = (start + 1).min(source.len()).max(start);

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(match error {
                    MarkupError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
                    MarkupError::UnexpectedEof { tag, .. } => format!("<{}> is never closed", tag),
                    MarkupError::MismatchedTag { expected, .. } => format!("expected </{}>", expected),
                    MarkupError::LexerError { .. } => "unrecognized input".to_string(),
                }),
        )
        .finish();

    if report.write((filename, Source::from(source)), &mut output).is_err() {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}
