//! Compound selectors
//!
//! Supports the single compound form block discovery needs:
//! an optional tag, any number of `.class` parts and any number of
//! `[attr]` / `[attr="value"]` parts, e.g. `div.trellis-grid[data-block-id]`.
//! Comma-separated lists match when any entry matches.

use crate::document::Document;
use crate::error::DocumentError;
use crate::node::NodeId;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if expected != tag {
                return false;
            }
        }
        let classes = doc.classes(node);
        if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
        self.attributes.iter().all(|attr| match (doc.attribute(node, &attr.name), &attr.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(doc, node))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Selector {
    type Err = DocumentError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let alternatives = source
            .split(',')
            .map(|part| parse_compound(source, part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }
}

fn invalid(selector: &str, message: impl Into<String>) -> DocumentError {
    DocumentError::InvalidSelector {
        selector: selector.to_string(),
        message: message.into(),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(rest: &str) -> (&str, &str) {
    let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
    rest.split_at(end)
}

fn parse_compound(selector: &str, part: &str) -> Result<Compound, DocumentError> {
    if part.is_empty() {
        return Err(invalid(selector, "empty selector"));
    }

    let mut compound = Compound::default();
    let (tag, mut rest) = take_ident(part);
    if !tag.is_empty() {
        compound.tag = Some(tag.to_ascii_lowercase());
    } else if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    }

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let (class, tail) = take_ident(after);
            if class.is_empty() {
                return Err(invalid(selector, "expected class name after '.'"));
            }
            compound.classes.push(class.to_string());
            rest = tail;
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(|| invalid(selector, "unterminated '['"))?;
            let body = &after[..close];
            let attr = match body.split_once('=') {
                Some((name, value)) => AttributeMatch {
                    name: name.trim().to_string(),
                    value: Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                },
                None => AttributeMatch {
                    name: body.trim().to_string(),
                    value: None,
                },
            };
            if attr.name.is_empty() || !attr.name.chars().all(is_ident_char) {
                return Err(invalid(selector, format!("invalid attribute name '{}'", attr.name)));
            }
            compound.attributes.push(attr);
            rest = &after[close + 1..];
        } else {
            return Err(invalid(selector, format!("unsupported syntax at '{}'", rest)));
        }
    }

    Ok(compound)
}

impl Document {
    /// Connected nodes matching `selector`, in document order
    pub fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.query_all_within(self.root(), selector)
    }

    /// Descendants of `scope` matching `selector`, in document order
    pub fn query_all_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|candidate| selector.matches(self, *candidate))
    }

    /// Whether `node` or one of its ancestors matches any of `selectors`
    pub fn within_any(&self, node: NodeId, selectors: &[Selector]) -> bool {
        selectors.iter().any(|s| self.closest(node, s).is_some())
    }
}
