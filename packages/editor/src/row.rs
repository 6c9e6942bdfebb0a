//! Grid row
//!
//! A row owns its columns and the [`Layout`] sizing them. The number of
//! columns always equals the number of layout entries.

use crate::binder::Binder;
use crate::block::{restore_root, Block, Deletion, Health, Placement};
use crate::column::{absorb, Column, COLUMN_CLASS};
use crate::context::Context;
use crate::errors::EditorResult;
use crate::host::{ConfirmRequest, DestructiveAction};
use crate::layout::Layout;
use crate::selection::{SelectionId, SelectionTree};
use std::any::Any;
use tracing::{debug, info};
use trellis_document::{Document, NodeId};

pub const ROW_CLASS: &str = "trellis-row";
/// Legacy class name replaced by [`ROW_CLASS`]
pub const LEGACY_ROW_CLASS: &str = "row";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutChange {
    Applied,
    /// The user declined deleting columns with content
    Declined,
}

#[derive(Debug)]
pub struct Row {
    binder: Binder,
    layout: Layout,
    columns: Vec<Column>,
}

impl Row {
    /// Create a row with one empty column per layout entry and append it to
    /// `container`
    pub fn create(
        ctx: &mut Context<'_>,
        container: NodeId,
        layout: Layout,
        parent: Option<SelectionId>,
    ) -> EditorResult<Self> {
        let root = ctx.doc.create_element("div");
        ctx.doc.append_child(container, root)?;
        let mut binder = Binder::new(ctx, root, parent).with_classes(&[ROW_CLASS]);
        binder.setup_observer(ctx)?;

        let mut row = Self {
            binder,
            layout: layout.clone(),
            columns: Vec::new(),
        };
        row.binder.stop_observing();
        let result = row.grow(ctx, &layout);
        row.binder.start_observing(ctx.doc);
        result?;
        Ok(row)
    }

    /// Adopt an existing row node and its columns
    pub fn import(ctx: &mut Context<'_>, root: NodeId, parent: Option<SelectionId>) -> EditorResult<Self> {
        let mut binder = Binder::new(ctx, root, parent).with_classes(&[ROW_CLASS]);
        if let Err(e) = binder.setup_observer(ctx) {
            binder.teardown(ctx);
            return Err(e);
        }
        let selection = binder.selection();

        binder.stop_observing();
        let mut columns = Vec::new();
        let mut result = Ok(());
        for child in ctx.doc.child_elements(root) {
            if ctx.doc.has_class(child, COLUMN_CLASS) {
                match Column::import(ctx, child, Some(selection)) {
                    Ok(column) => columns.push(column),
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
        }
        binder.start_observing(ctx.doc);

        let layout = result.and_then(|_| {
            if columns.is_empty() {
                Layout::equal(1)
            } else {
                Layout::new(columns.iter().map(Column::widths).collect())
            }
        });
        let layout = match layout {
            Ok(layout) => layout,
            Err(e) => {
                for column in &mut columns {
                    column.teardown(ctx);
                }
                binder.teardown(ctx);
                return Err(e);
            }
        };

        let mut row = Self { binder, layout, columns };
        if let Err(e) = row.check_children(ctx) {
            row.teardown(ctx);
            return Err(e);
        }
        Ok(row)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    pub fn has_content(&self, doc: &Document) -> bool {
        self.columns.iter().any(|c| c.has_content(doc))
    }

    fn column_roots(&self) -> Vec<NodeId> {
        self.columns.iter().map(Column::root).collect()
    }

    /// Grow or shrink to `layout`. Dropping columns with content asks first.
    pub fn set_layout(&mut self, ctx: &mut Context<'_>, layout: Layout) -> EditorResult<LayoutChange> {
        let surplus = self.columns.get(layout.len()..).unwrap_or(&[]);
        let with_content = surplus.iter().filter(|c| c.has_content(ctx.doc)).count();
        if with_content > 0 {
            let request = ConfirmRequest::new(DestructiveAction::DeleteColumns { count: with_content });
            if !ctx.host.confirm(&request) {
                info!(block_id = %self.id(), columns = with_content, "layout change declined");
                return Ok(LayoutChange::Declined);
            }
        }

        self.binder.stop_observing();
        let result = self.apply_layout(ctx, layout);
        self.binder.start_observing(ctx.doc);
        result.map(|_| LayoutChange::Applied)
    }

    fn apply_layout(&mut self, ctx: &mut Context<'_>, layout: Layout) -> EditorResult<()> {
        debug!(block_id = %self.id(), from = self.columns.len(), to = layout.len(), "applying layout");
        let surplus = self.columns.split_off(layout.len().min(self.columns.len()));
        for mut column in surplus {
            column.delete(ctx, true)?;
        }
        self.layout = layout.clone();
        self.grow(ctx, &layout)?;
        self.apply_widths(ctx)
    }

    /// Create columns until the row matches `layout`
    fn grow(&mut self, ctx: &mut Context<'_>, layout: &Layout) -> EditorResult<()> {
        let root = self.root();
        let selection = self.selection();
        for widths in layout.columns().iter().skip(self.columns.len()) {
            self.columns.push(Column::create(ctx, root, *widths, Some(selection))?);
        }
        sync_selection(ctx.selection, selection, self.columns.iter().map(Column::selection));
        Ok(())
    }

    fn apply_widths(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        for (column, widths) in self.columns.iter_mut().zip(self.layout.columns()) {
            column.set_widths(ctx, *widths)?;
        }
        Ok(())
    }

    fn repair(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let root = self.root();

        // Columns: put detached ones back, drop the unrecoverable
        let ordered = self.column_roots();
        let placement = Placement::Within { container: root, ordered: &ordered };
        let mut index = 0;
        while index < self.columns.len() {
            match self.columns[index].reconcile(ctx, placement)? {
                Health::Deleted => {
                    let mut column = self.columns.remove(index);
                    debug!(block_id = %column.id(), "dropping unrecoverable column");
                    column.teardown(ctx);
                }
                _ => index += 1,
            }
        }

        // Adopt the document's column order
        self.columns
            .sort_by_key(|c| ctx.doc.index_in_parent(c.root()).unwrap_or(usize::MAX));

        // Keep one column per layout entry
        let layout = self.layout.clone();
        self.grow(ctx, &layout)?;

        self.merge_foreign(ctx)?;
        self.apply_widths(ctx)
    }

    /// Move foreign content into the last column, drop what is blank
    fn merge_foreign(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let root = self.root();
        let known = self.column_roots();
        let Some(target) = self.columns.last().and_then(Column::content) else {
            return Ok(());
        };

        for child in ctx.doc.children(root).to_vec() {
            if known.contains(&child) || ctx.is_scaffolding(child) {
                continue;
            }
            if ctx.doc.is_blank(child) {
                ctx.doc.detach(child);
                continue;
            }
            absorb(ctx.doc, target, child)?;
            debug!(block_id = %self.id(), node = %child, "merged foreign row child");
        }
        Ok(())
    }
}

pub(crate) fn sync_selection(tree: &mut SelectionTree, parent: SelectionId, children: impl Iterator<Item = SelectionId>) {
    let children: Vec<SelectionId> = children.collect();
    tree.set_children(parent, &children);
}

impl Block for Row {
    fn kind(&self) -> &'static str {
        "row"
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
            let request = ConfirmRequest::new(DestructiveAction::DeleteRow);
            if !ctx.host.confirm(&request) {
                return Ok(Deletion::Declined);
            }
        }
        for column in &mut self.columns {
            column.teardown(ctx);
        }
        self.binder.delete(ctx);
        Ok(Deletion::Deleted)
    }

    fn locate(&self, doc: &Document, node: NodeId) -> Option<(SelectionId, NodeId)> {
        if !doc.is_inclusive_ancestor(self.root(), node) {
            return None;
        }
        self.columns
            .iter()
            .find_map(|c| c.locate(doc, node))
            .or(Some((self.selection(), self.root())))
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) {
        for column in &mut self.columns {
            column.teardown(ctx);
        }
        self.binder.teardown(ctx);
    }

    fn tick_children(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let ordered = self.column_roots();
        let placement = Placement::Within {
            container: self.root(),
            ordered: &ordered,
        };
        let mut changed = false;
        let mut index = 0;
        while index < self.columns.len() {
            match self.columns[index].tick(ctx, placement)? {
                Health::Deleted => {
                    let mut column = self.columns.remove(index);
                    column.teardown(ctx);
                    changed = true;
                }
                Health::Reinserted => {
                    changed = true;
                    index += 1;
                }
                Health::Live => index += 1,
            }
        }
        if changed {
            self.check_children(ctx)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostEditor;
    use crate::testing::Harness;
    use trellis_document::inner_markup;

    fn three_columns(harness: &mut Harness) -> Row {
        let root = harness.append(
            r#"<div class="trellis-row"><div class="trellis-col col-4"></div><div class="trellis-col col-4"></div><div class="trellis-col col-4"><div class="trellis-col-content"><p>third</p></div></div></div>"#,
        );
        let mut ctx = harness.context();
        Row::import(&mut ctx, root, None).unwrap()
    }

    #[test]
    fn test_create_matches_layout() {
        let mut harness = Harness::new();
        let container = harness.doc.root();
        let mut ctx = harness.context();
        let row = Row::create(&mut ctx, container, Layout::equal(3).unwrap(), None).unwrap();

        assert_eq!(row.columns().len(), 3);
        assert_eq!(harness.doc.child_elements(row.root()).len(), 3);
        assert_eq!(harness.selection.children(row.selection()).len(), 3);
    }

    #[test]
    fn test_import_recovers_layout() {
        let mut harness = Harness::new();
        let row = three_columns(&mut harness);
        assert_eq!(row.layout(), &Layout::equal(3).unwrap());
        assert_eq!(row.columns().len(), 3);
    }

    #[test]
    fn test_shrink_with_content_declined() {
        let mut harness = Harness::new();
        let mut row = three_columns(&mut harness);

        let mut ctx = harness.context();
        let change = row.set_layout(&mut ctx, Layout::equal(2).unwrap()).unwrap();
        assert_eq!(change, LayoutChange::Declined);
        assert_eq!(row.columns().len(), 3);
        assert_eq!(harness.host.prompts().len(), 1);
        assert_eq!(
            harness.host.prompts()[0].action,
            DestructiveAction::DeleteColumns { count: 1 }
        );
    }

    #[test]
    fn test_shrink_with_content_accepted() {
        let mut harness = Harness::new();
        let mut row = three_columns(&mut harness);
        let third = row.columns()[2].root();
        harness.host.answer_next(true);

        let mut ctx = harness.context();
        let change = row.set_layout(&mut ctx, Layout::equal(2).unwrap()).unwrap();
        assert_eq!(change, LayoutChange::Applied);
        assert_eq!(row.columns().len(), 2);
        assert!(!harness.doc.is_connected(third));
        assert!(harness.doc.has_class(row.columns()[0].root(), "col-6"));
    }

    #[test]
    fn test_shrink_empty_columns_without_prompt() {
        let mut harness = Harness::new();
        let container = harness.doc.root();
        let mut ctx = harness.context();
        let mut row = Row::create(&mut ctx, container, Layout::equal(4).unwrap(), None).unwrap();
        row.set_layout(&mut ctx, Layout::equal(1).unwrap()).unwrap();

        assert_eq!(row.columns().len(), 1);
        assert!(harness.host.prompts().is_empty());
    }

    #[test]
    fn test_grow_layout() {
        let mut harness = Harness::new();
        let mut row = three_columns(&mut harness);
        let mut ctx = harness.context();
        row.set_layout(&mut ctx, Layout::from_spans(&[3, 3, 3, 3]).unwrap()).unwrap();

        assert_eq!(row.columns().len(), 4);
        assert_eq!(harness.doc.child_elements(row.root()).len(), 4);
    }

    #[test]
    fn test_detached_column_is_reinserted_in_place() {
        let mut harness = Harness::new();
        let mut row = three_columns(&mut harness);
        let roots: Vec<NodeId> = row.columns().iter().map(|c| c.root()).collect();
        harness.doc.detach(roots[1]);

        let mut ctx = harness.context();
        row.tick(&mut ctx, Placement::Anywhere).unwrap();
        assert_eq!(harness.doc.child_elements(row.root()), roots);
        assert_eq!(row.columns().len(), 3);
    }

    #[test]
    fn test_foreign_content_merged_into_last_column() {
        let mut harness = Harness::new();
        let mut row = three_columns(&mut harness);
        let root = row.root();
        harness.doc.append_markup(root, "<p>pasted</p><span></span>").unwrap();

        let mut ctx = harness.context();
        row.tick(&mut ctx, Placement::Anywhere).unwrap();

        let content = row.columns()[2].content().unwrap();
        assert_eq!(inner_markup(&harness.doc, content), "<p>third</p><p>pasted</p>");
        assert_eq!(harness.doc.child_elements(root).len(), 3);
    }

    #[test]
    fn test_reordered_columns_adopt_document_order() {
        let mut harness = Harness::new();
        let mut row = three_columns(&mut harness);
        let first = row.columns()[0].root();
        let last = row.columns()[2].root();
        harness.doc.insert_after(last, first).unwrap();

        let mut ctx = harness.context();
        row.tick(&mut ctx, Placement::Anywhere).unwrap();
        assert_eq!(row.columns()[2].root(), first);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut harness = Harness::new();
        let mut row = three_columns(&mut harness);
        let mut ctx = harness.context();
        row.reconcile(&mut ctx, Placement::Anywhere).unwrap();
        let version = ctx.doc.version();
        row.reconcile(&mut ctx, Placement::Anywhere).unwrap();
        assert_eq!(ctx.doc.version(), version);
    }

    #[test]
    fn test_cursor_untouched_when_edit_elsewhere() {
        let mut harness = Harness::new();
        let outside = harness.append("<p>elsewhere</p>");
        harness.host.set_cursor(Some(outside));
        let container = harness.doc.root();
        let mut ctx = harness.context();
        Row::create(&mut ctx, container, Layout::equal(2).unwrap(), None).unwrap();
        assert_eq!(harness.host.cursor(), Some(outside));
    }
}
