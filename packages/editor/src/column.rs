//! Grid column
//!
//! ```text
//! div.trellis-col.col-N.col-sm-N.col-md-N.col-lg-N[data-block-id]
//!  └ div.trellis-col-content
//!     └ …user content, or <p><br></p> when empty
//! ```

use crate::binder::Binder;
use crate::block::{restore_root, Block, Deletion, Health, Placement};
use crate::context::Context;
use crate::errors::EditorResult;
use crate::host::{ConfirmRequest, DestructiveAction};
use crate::layout::ColumnWidths;
use crate::selection::SelectionId;
use std::any::Any;
use tracing::debug;
use trellis_document::{Document, NodeId};

pub const COLUMN_CLASS: &str = "trellis-col";
pub const CONTENT_CLASS: &str = "trellis-col-content";
/// Legacy class name replaced by [`COLUMN_CLASS`]
pub const LEGACY_COLUMN_CLASS: &str = "column";

const CONTENT: &str = "content";

#[derive(Debug)]
pub struct Column {
    binder: Binder,
    widths: ColumnWidths,
}

impl Column {
    /// Create a column with an empty placeholder and append it to `container`
    pub fn create(
        ctx: &mut Context<'_>,
        container: NodeId,
        widths: ColumnWidths,
        parent: Option<SelectionId>,
    ) -> EditorResult<Self> {
        let root = ctx.doc.create_element("div");
        let content = ctx.doc.create_element_with_classes("div", &[CONTENT_CLASS]);
        ctx.doc.append_child(root, content)?;
        append_placeholder(ctx.doc, content)?;
        ctx.doc.append_child(container, root)?;
        Self::bind(ctx, root, widths, parent)
    }

    /// Adopt an existing column node
    pub fn import(ctx: &mut Context<'_>, root: NodeId, parent: Option<SelectionId>) -> EditorResult<Self> {
        let widths = ColumnWidths::from_classes(ctx.doc.classes(root));
        let mut column = Self::bind(ctx, root, widths, parent)?;
        if let Err(e) = column.check_children(ctx) {
            column.teardown(ctx);
            return Err(e);
        }
        Ok(column)
    }

    fn bind(
        ctx: &mut Context<'_>,
        root: NodeId,
        widths: ColumnWidths,
        parent: Option<SelectionId>,
    ) -> EditorResult<Self> {
        let classes: Vec<String> = std::iter::once(COLUMN_CLASS.to_string()).chain(widths.classes()).collect();
        let class_refs: Vec<&str> = classes.iter().map(String::as_str).collect();
        let mut binder = Binder::new(ctx, root, parent).with_classes(&class_refs);
        if let Some(content) = find_content(ctx.doc, root) {
            binder.watch(ctx.doc, CONTENT, content);
        }
        if let Err(e) = binder.setup_observer(ctx) {
            binder.teardown(ctx);
            return Err(e);
        }
        Ok(Self { binder, widths })
    }

    pub fn widths(&self) -> ColumnWidths {
        self.widths
    }

    /// The content node, if it has been located
    pub fn content(&self) -> Option<NodeId> {
        self.binder.watched_node(CONTENT)
    }

    pub fn set_widths(&mut self, ctx: &mut Context<'_>, widths: ColumnWidths) -> EditorResult<()> {
        if widths == self.widths {
            return Ok(());
        }
        self.widths = widths;
        self.binder
            .replace_classes(ctx.doc, ColumnWidths::is_width_class, &widths.classes())
    }

    /// Whether the column holds anything besides whitespace and placeholders
    pub fn has_content(&self, doc: &Document) -> bool {
        !doc.is_blank(self.root())
    }

    fn repair(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let root = self.root();

        // Content node: keep ours if it is still a direct child, else find or
        // create one
        let content = match self.content().filter(|c| ctx.doc.parent(*c) == Some(root)) {
            Some(content) => content,
            None => {
                let content = match find_content(ctx.doc, root) {
                    Some(found) => found,
                    None => {
                        let created = ctx.doc.create_element_with_classes("div", &[CONTENT_CLASS]);
                        ctx.doc.append_child(root, created)?;
                        created
                    }
                };
                debug!(block_id = %self.id(), node = %content, "relocated column content");
                self.binder.rebind(ctx.doc, CONTENT, content);
                content
            }
        };

        // Foreign children belong inside the content node
        let children = ctx.doc.children(root).to_vec();
        let split = children.iter().position(|c| *c == content).unwrap_or(0);
        let mut prepend_at = 0;
        for (index, child) in children.into_iter().enumerate() {
            if child == content || ctx.is_scaffolding(child) {
                continue;
            }
            if ctx.doc.is_blank(child) {
                ctx.doc.detach(child);
            } else if index < split {
                ctx.doc.insert_child(content, prepend_at, child)?;
                prepend_at += 1;
            } else {
                ctx.doc.append_child(content, child)?;
            }
        }

        // Placeholder when empty
        let meaningful = ctx
            .doc
            .children(content)
            .iter()
            .any(|c| !ctx.doc.is_whitespace_text(*c));
        if !meaningful {
            for child in ctx.doc.children(content).to_vec() {
                ctx.doc.detach(child);
            }
            let paragraph = append_placeholder(ctx.doc, content)?;
            let cursor_inside = ctx
                .host
                .cursor()
                .map(|cursor| ctx.doc.is_inclusive_ancestor(root, cursor) || !ctx.doc.is_connected(cursor))
                .unwrap_or(false);
            if cursor_inside {
                ctx.host.set_cursor(Some(paragraph));
            }
        }
        Ok(())
    }
}

fn find_content(doc: &Document, root: NodeId) -> Option<NodeId> {
    doc.child_elements(root)
        .into_iter()
        .find(|c| doc.has_class(*c, CONTENT_CLASS))
}

/// Move foreign content into a column's content node. A column-shaped
/// node contributes only its content and its shell is dropped.
pub(crate) fn absorb(doc: &mut Document, target: NodeId, node: NodeId) -> EditorResult<()> {
    if doc.is_blank(target) {
        for placeholder in doc.children(target).to_vec() {
            doc.detach(placeholder);
        }
    }
    if doc.has_class(node, COLUMN_CLASS) {
        let source = find_content(doc, node).unwrap_or(node);
        doc.move_children(source, target)?;
        doc.detach(node);
    } else {
        doc.append_child(target, node)?;
    }
    Ok(())
}

fn append_placeholder(doc: &mut Document, parent: NodeId) -> EditorResult<NodeId> {
    let paragraph = doc.create_element("p");
    let br = doc.create_element("br");
    doc.append_child(paragraph, br)?;
    doc.append_child(parent, paragraph)?;
    Ok(paragraph)
}

impl Block for Column {
    fn kind(&self) -> &'static str {
        "column"
    }

    fn binder(&self) -> &Binder {
        &self.binder
    }

    fn binder_mut(&mut self) -> &mut Binder {
        &mut self.binder
    }

    fn check_self(&mut self, ctx: &mut Context<'_>, placement: Placement<'_>) -> EditorResult<Health> {
        restore_root(&mut self.binder, ctx, placement)
    }

    fn check_children(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        self.binder.stop_observing();
        let result = self.repair(ctx);
        self.binder.start_observing(ctx.doc);
        result
    }

    fn delete(&mut self, ctx: &mut Context<'_>, force: bool) -> EditorResult<Deletion> {
        if !force && self.has_content(ctx.doc) {
            let request = ConfirmRequest::new(DestructiveAction::DeleteColumns { count: 1 });
            if !ctx.host.confirm(&request) {
                return Ok(Deletion::Declined);
            }
        }
        self.binder.delete(ctx);
        Ok(Deletion::Deleted)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
