//! # Trellis Document
//!
//! In-memory document tree shared between a host rich-text editor and the
//! Trellis block engine.
//!
//! ## Modules
//!
//! - `document` - arena tree with DOM-like editing operations
//! - `markup` - logos-based markup lexer/parser and serializer
//! - `selector` - compound selector matching and queries
//! - `snapshot` - node snapshots and changeset diffing
//!
//! ## Example
//!
//! ```
//! use trellis_document::{parse_markup, NodeSnapshot};
//!
//! let mut doc = parse_markup("<div class=\"box\"><p>hi</p></div>").unwrap();
//! let div = doc.children(doc.root())[0];
//! let before = NodeSnapshot::capture(&doc, div);
//!
//! doc.set_attribute(div, "title", "greeting").unwrap();
//! assert_eq!(before.changes(&doc).attributes.len(), 1);
//! ```

pub mod document;
pub mod error;
pub mod markup;
pub mod node;
pub mod selector;
pub mod snapshot;

pub use document::{format_style, parse_style, Document};
#[cfg(feature = "pretty-errors")]
pub use error::format_markup_error;
pub use error::{DocumentError, DocumentResult, MarkupError, MarkupResult};
pub use markup::{inner_markup, parse_fragment_into, parse_markup, to_markup};
pub use node::{Node, NodeData, NodeId};
pub use selector::Selector;
pub use snapshot::{diff_snapshots, AttributeChange, Changeset, NodeSnapshot};
