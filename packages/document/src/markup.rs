//! # Markup
//!
//! Lexer, parser and serializer for the HTML subset stored in host documents.
//!
//! Lexing runs in two modes. [`ContentToken`] splits the source into tag
//! openings, closing tags, comments and text; after a tag opening the lexer
//! is morphed into [`TagToken`] to read attributes up to `>` or `/>`, then
//! morphed back.
//!
//! The parser is strict about nesting (mismatched or unclosed tags are
//! errors) and lenient about everything else: comments are skipped,
//! formatting whitespace between tags is dropped and `<html>`/`<body>`
//! wrappers are unwrapped.

use crate::document::Document;
use crate::error::{MarkupError, MarkupResult};
use crate::node::{is_void_element, NodeData, NodeId};
use logos::{Lexer, Logos};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum ContentToken {
    #[regex(r"<[a-zA-Z][a-zA-Z0-9-]*")]
    OpenTag,

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>")]
    CloseTag,

    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    #[regex(r"[^<]+")]
    Text,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TagToken {
    #[regex(r"[a-zA-Z0-9_:.@%#-]+")]
    Name,

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#)]
    DoubleQuoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,

    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,
}

struct OpenElement {
    node: NodeId,
    tag: String,
    pos: usize,
}

/// Parse a markup document. The returned document's root is the `body`.
pub fn parse_markup(source: &str) -> MarkupResult<Document> {
    let mut doc = Document::new();
    let root = doc.root();
    parse_fragment_into(&mut doc, root, source)?;
    unwrap_document_wrappers(&mut doc);
    debug!(nodes = doc.descendants(doc.root()).len(), "parsed markup");
    Ok(doc)
}

/// Parse a fragment and append its top-level nodes to `parent`.
///
/// Returns the appended top-level nodes in order.
pub fn parse_fragment_into(doc: &mut Document, parent: NodeId, source: &str) -> MarkupResult<Vec<NodeId>> {
    let first_new = doc.children(parent).len();
    let mut stack = vec![OpenElement {
        node: parent,
        tag: String::new(),
        pos: 0,
    }];
    let mut lex = ContentToken::lexer(source);

    loop {
        let Some(token) = lex.next() else {
            break;
        };
        let span = lex.span();
        let current = stack.last().map(|e| e.node).unwrap_or(parent);

        match token {
            Ok(ContentToken::Text) => {
                let raw = lex.slice();
                if raw.trim().is_empty() && raw.contains('\n') {
                    continue;
                }
                doc.push_child(current, NodeData::text(decode_entities(raw)));
            }
            Ok(ContentToken::Comment) => {}
            Ok(ContentToken::OpenTag) => {
                let tag = lex.slice()[1..].to_ascii_lowercase();
                let (attributes, self_closing, back) = parse_attributes(lex.morph())?;
                lex = back;

                let node = doc.push_child(current, NodeData::Element {
                    tag: tag.clone(),
                    attributes,
                });
                if !self_closing && !is_void_element(&tag) {
                    stack.push(OpenElement {
                        node,
                        tag,
                        pos: span.start,
                    });
                }
            }
            Ok(ContentToken::CloseTag) => {
                let name = lex.slice()[2..]
                    .trim_end_matches('>')
                    .trim()
                    .to_ascii_lowercase();
                if is_void_element(&name) {
                    continue;
                }
                match stack.last() {
                    Some(open) if stack.len() > 1 && open.tag == name => {
                        stack.pop();
                    }
                    Some(open) if stack.len() > 1 => {
                        return Err(MarkupError::MismatchedTag {
                            pos: span.start,
                            expected: open.tag.clone(),
                            found: name,
                        });
                    }
                    _ => {
                        return Err(MarkupError::unexpected_token(span.start, "content", format!("</{}>", name)));
                    }
                }
            }
            Err(()) => return Err(MarkupError::LexerError { pos: span.start }),
        }
    }

    if stack.len() > 1 {
        if let Some(open) = stack.pop() {
            return Err(MarkupError::UnexpectedEof {
                pos: open.pos,
                tag: open.tag,
            });
        }
    }

    Ok(doc.children(parent)[first_new..].to_vec())
}

fn parse_attributes<'s>(
    mut lex: Lexer<'s, TagToken>,
) -> MarkupResult<(BTreeMap<String, String>, bool, Lexer<'s, ContentToken>)> {
    let mut attributes = BTreeMap::new();
    let mut pending: Option<String> = None;
    let mut awaiting_value = false;

    loop {
        let pos = lex.span().end;
        let Some(token) = lex.next() else {
            return Err(MarkupError::unexpected_token(pos, "'>'", "end of input"));
        };
        let slice = lex.slice();
        let start = lex.span().start;

        match token {
            Ok(TagToken::Name) if awaiting_value => {
                if let Some(name) = pending.take() {
                    attributes.insert(name, decode_entities(slice));
                }
                awaiting_value = false;
            }
            Ok(TagToken::Name) => {
                if let Some(name) = pending.replace(slice.to_ascii_lowercase()) {
                    attributes.insert(name, String::new());
                }
            }
            Ok(TagToken::Eq) if pending.is_some() && !awaiting_value => awaiting_value = true,
            Ok(TagToken::DoubleQuoted | TagToken::SingleQuoted) if awaiting_value => {
                if let Some(name) = pending.take() {
                    attributes.insert(name, decode_entities(&slice[1..slice.len() - 1]));
                }
                awaiting_value = false;
            }
            Ok(end @ (TagToken::End | TagToken::SelfClose)) if !awaiting_value => {
                if let Some(name) = pending.take() {
                    attributes.insert(name, String::new());
                }
                return Ok((attributes, end == TagToken::SelfClose, lex.morph()));
            }
            Ok(_) => {
                let expected = if awaiting_value { "attribute value" } else { "attribute name or '>'" };
                return Err(MarkupError::unexpected_token(start, expected, slice));
            }
            Err(()) => return Err(MarkupError::LexerError { pos: start }),
        }
    }
}

/// Replace a parsed `<html><body>…</body></html>` shell by its body content
fn unwrap_document_wrappers(doc: &mut Document) {
    let root = doc.root();
    loop {
        let elements = doc.child_elements(root);
        let [only] = elements.as_slice() else {
            return;
        };
        let wrapper = *only;
        match doc.tag(wrapper) {
            Some("html") => {
                // <head> carries no content the engine tracks
                for child in doc.child_elements(wrapper) {
                    if doc.tag(child) == Some("head") {
                        doc.detach(child);
                    }
                }
            }
            Some("body") => {}
            _ => return,
        }
        for child in doc.children(wrapper).to_vec() {
            if doc.insert_before(wrapper, child).is_err() {
                return;
            }
        }
        doc.detach(wrapper);
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(ch),
        }
    }
}

/// Serialize a node (and its subtree) to markup
pub fn to_markup(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

/// Serialize the children of a node
pub fn inner_markup(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(node) {
        write_node(doc, *child, &mut out);
    }
    out
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    let Ok(data) = doc.node(node).map(|n| n.data()) else {
        return;
    };
    match data {
        NodeData::Text { content } => escape_text(content, out),
        NodeData::Element { tag, attributes } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(tag) {
                return;
            }
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

impl Document {
    /// Parse a fragment and append it to `parent`
    pub fn append_markup(&mut self, parent: NodeId, source: &str) -> MarkupResult<Vec<NodeId>> {
        parse_fragment_into(self, parent, source)
    }

    /// Markup of the whole document body (children of the root)
    pub fn to_markup(&self) -> String {
        inner_markup(self, self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse_markup(r#"<div class="a b" data-x="1"><p>Hello <b>world</b></p></div>"#).unwrap();
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.tag(div), Some("div"));
        assert_eq!(doc.classes(div), vec!["a", "b"]);
        assert_eq!(doc.attribute(div, "data-x"), Some("1"));
        assert_eq!(doc.text_content(div), "Hello world");
    }

    #[test]
    fn test_void_and_self_closing_elements() {
        let doc = parse_markup("<p><br><img src='a.png'/>text</p>").unwrap();
        let p = doc.children(doc.root())[0];
        let children = doc.children(p);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.tag(children[0]), Some("br"));
        assert_eq!(doc.attribute(children[1], "src"), Some("a.png"));
        assert_eq!(doc.text(children[2]), Some("text"));
    }

    #[test]
    fn test_boolean_and_unquoted_attributes() {
        let doc = parse_markup("<div hidden data-block-version=3></div>").unwrap();
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.attribute(div, "hidden"), Some(""));
        assert_eq!(doc.attribute(div, "data-block-version"), Some("3"));
    }

    #[test]
    fn test_entities_round_trip() {
        let source = r#"<div title="a &quot;b&quot;">1 &lt; 2 &amp;&nbsp;3</div>"#;
        let doc = parse_markup(source).unwrap();
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.attribute(div, "title"), Some("a \"b\""));
        assert_eq!(doc.text_content(div), "1 < 2 &\u{a0}3");
        assert_eq!(doc.to_markup(), source);
    }

    #[test]
    fn test_formatting_whitespace_dropped() {
        let doc = parse_markup("<div>\n  <p>a</p>\n  <!-- note -->\n</div>").unwrap();
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.children(div).len(), 1);
        assert_eq!(doc.to_markup(), "<div><p>a</p></div>");
    }

    #[test]
    fn test_body_wrapper_unwrapped() {
        let doc = parse_markup("<html><head><title>x</title></head><body><p>a</p></body></html>").unwrap();
        assert_eq!(doc.to_markup(), "<p>a</p>");
    }

    #[test]
    fn test_mismatched_tag() {
        let err = parse_markup("<div><p></div>").unwrap_err();
        assert_eq!(
            err,
            MarkupError::MismatchedTag {
                pos: 8,
                expected: "p".to_string(),
                found: "div".to_string()
            }
        );
    }

    #[test]
    fn test_unclosed_tag() {
        let err = parse_markup("<div><p>text</p>").unwrap_err();
        assert_eq!(
            err,
            MarkupError::UnexpectedEof {
                pos: 0,
                tag: "div".to_string()
            }
        );
    }

    #[test]
    fn test_stray_less_than_is_lexer_error() {
        let err = parse_markup("<p>a < b</p>").unwrap_err();
        assert!(matches!(err, MarkupError::LexerError { .. }));
    }

    #[test]
    fn test_append_markup_returns_top_level_nodes() {
        let mut doc = Document::new();
        let root = doc.root();
        let nodes = doc.append_markup(root, "<p>a</p><p>b</p>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(doc.children(root), nodes.as_slice());
    }
}
