//! # Grid
//!
//! Top-level structural block. A grid owns an ordered list of [`Row`]s and
//! is never empty: losing the last row regrows a single-column one.
//!
//! ```text
//! div.trellis-grid[data-block-id][data-block-version=3]
//!  └ div.trellis-row
//!     └ div.trellis-col
//!        └ div.trellis-col-content
//! ```
//!
//! Imported markup older than [`CURRENT_VERSION`] is migrated before the
//! rows are bound.

use crate::binder::{Binder, Lifecycle};
use crate::block::{Block, Deletion, Health, Insertion, Placement};
use crate::column::{absorb, Column};
use crate::context::Context;
use crate::errors::{EditorError, EditorResult};
use crate::host::{ConfirmRequest, DestructiveAction};
use crate::layout::Layout;
use crate::migrations::{migrate, recorded_version, CURRENT_VERSION};
use crate::row::{sync_selection, LayoutChange, Row, ROW_CLASS};
use crate::selection::SelectionId;
use std::any::Any;
use tracing::{debug, info};
use trellis_document::{Document, NodeId};

pub const GRID_CLASS: &str = "trellis-grid";
pub const GRID_SELECTOR: &str = ".trellis-grid";

#[derive(Debug)]
pub struct Grid {
    binder: Binder,
    version_attribute: String,
    rows: Vec<Row>,
}

impl Grid {
    /// Create a grid with one row sized by `layout`
    pub fn create(ctx: &mut Context<'_>, insertion: Insertion, layout: Layout) -> EditorResult<Self> {
        let root = ctx.doc.create_element("div");
        insertion.insert(ctx, root)?;
        let mut grid = Self::bind(ctx, root)?;

        grid.binder.stop_observing();
        let result = grid.write_version(ctx).and_then(|_| grid.push_row(ctx, layout));
        grid.binder.start_observing(ctx.doc);
        result?;

        info!(block_id = %grid.id(), "created grid");
        Ok(grid)
    }

    /// Adopt an existing grid node, migrating old markup first
    pub fn import(ctx: &mut Context<'_>, root: NodeId) -> EditorResult<Self> {
        let version = recorded_version(ctx.doc, root, &ctx.config.version_attribute);
        let mut grid = Self::bind(ctx, root)?;

        grid.binder.stop_observing();
        let result = grid.adopt(ctx, version);
        grid.binder.start_observing(ctx.doc);

        // Release every id claimed so far so a retry recovers the same ids
        if let Err(e) = result.and_then(|_| grid.check_children(ctx)) {
            grid.teardown(ctx);
            return Err(e);
        }
        Ok(grid)
    }

    fn bind(ctx: &mut Context<'_>, root: NodeId) -> EditorResult<Self> {
        let version_attribute = ctx.config.version_attribute.clone();
        let mut binder = Binder::new(ctx, root, None)
            .with_classes(&[GRID_CLASS])
            .with_binding(&version_attribute);
        if let Err(e) = binder.setup_observer(ctx) {
            binder.teardown(ctx);
            return Err(e);
        }
        Ok(Self {
            binder,
            version_attribute,
            rows: Vec::new(),
        })
    }

    fn adopt(&mut self, ctx: &mut Context<'_>, version: u32) -> EditorResult<()> {
        let root = self.root();
        if version < CURRENT_VERSION {
            self.binder.set_lifecycle(Lifecycle::Migrating);
            let migrated = migrate(ctx.doc, root, version);
            self.binder.set_lifecycle(Lifecycle::Live);
            migrated?;
        }
        self.write_version(ctx)?;

        let selection = self.selection();
        for child in ctx.doc.child_elements(root) {
            if ctx.doc.has_class(child, ROW_CLASS) {
                self.rows.push(Row::import(ctx, child, Some(selection))?);
            }
        }
        Ok(())
    }

    fn write_version(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let version = CURRENT_VERSION.to_string();
        if self.binder.get(&self.version_attribute) != Some(version.as_str()) {
            let attribute = self.version_attribute.clone();
            self.binder.set(ctx.doc, &attribute, Some(&version))?;
        }
        Ok(())
    }

    fn push_row(&mut self, ctx: &mut Context<'_>, layout: Layout) -> EditorResult<usize> {
        let row = Row::create(ctx, self.root(), layout, Some(self.selection()))?;
        self.rows.push(row);
        Ok(self.rows.len() - 1)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    pub fn has_content(&self, doc: &Document) -> bool {
        self.rows.iter().any(|r| r.has_content(doc))
    }

    fn row_roots(&self) -> Vec<NodeId> {
        self.rows.iter().map(Row::root).collect()
    }

    /// Append a row sized by `layout`. Returns its index.
    pub fn add_row(&mut self, ctx: &mut Context<'_>, layout: Layout) -> EditorResult<usize> {
        self.binder.stop_observing();
        let result = self.push_row(ctx, layout);
        self.binder.start_observing(ctx.doc);
        let index = result?;
        debug!(block_id = %self.id(), index, "added row");
        Ok(index)
    }

    /// Remove the row at `index`. A row with content asks first unless
    /// `force` is set.
    pub fn remove_row(&mut self, ctx: &mut Context<'_>, index: usize, force: bool) -> EditorResult<Deletion> {
        let Some(row) = self.rows.get_mut(index) else {
            return Err(EditorError::missing_context(format!("grid {} has no row {}", self.binder.id(), index)));
        };

        self.binder.stop_observing();
        let result = row.delete(ctx, force);
        if let Ok(Deletion::Deleted) = result {
            self.rows.remove(index);
        }
        let regrown = self.ensure_row(ctx);
        self.binder.start_observing(ctx.doc);
        regrown?;
        result
    }

    /// Change the layout of the row at `index`
    pub fn set_row_layout(&mut self, ctx: &mut Context<'_>, index: usize, layout: Layout) -> EditorResult<LayoutChange> {
        let id = self.binder.id().clone();
        let row = self
            .rows
            .get_mut(index)
            .ok_or_else(|| EditorError::missing_context(format!("grid {} has no row {}", id, index)))?;
        row.set_layout(ctx, layout)
    }

    fn ensure_row(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        if self.rows.is_empty() {
            debug!(block_id = %self.id(), "regrowing empty grid");
            self.push_row(ctx, Layout::equal(1)?)?;
        }
        sync_selection(ctx.selection, self.selection(), self.rows.iter().map(Row::selection));
        Ok(())
    }

    fn repair(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let root = self.root();
        let selection = self.selection();

        let ordered = self.row_roots();
        let placement = Placement::Within { container: root, ordered: &ordered };
        let mut index = 0;
        while index < self.rows.len() {
            match self.rows[index].reconcile(ctx, placement)? {
                Health::Deleted => {
                    let mut row = self.rows.remove(index);
                    debug!(block_id = %row.id(), "dropping unrecoverable row");
                    row.teardown(ctx);
                }
                _ => index += 1,
            }
        }

        // Rows pasted or dragged in from elsewhere become ours
        for child in ctx.doc.child_elements(root) {
            if ordered.contains(&child) || !ctx.doc.has_class(child, ROW_CLASS) || ctx.is_scaffolding(child) {
                continue;
            }
            let row = Row::import(ctx, child, Some(selection))?;
            debug!(block_id = %row.id(), "adopted foreign row");
            self.rows.push(row);
        }

        self.rows
            .sort_by_key(|r| ctx.doc.index_in_parent(r.root()).unwrap_or(usize::MAX));
        self.ensure_row(ctx)?;
        self.merge_foreign(ctx)
    }

    /// Move stray content into the last column of the last row
    fn merge_foreign(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let root = self.root();
        let known = self.row_roots();
        let Some(target) = self
            .rows
            .last()
            .and_then(|r| r.columns().last())
            .and_then(Column::content)
        else {
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
            debug!(block_id = %self.id(), node = %child, "merged foreign grid child");
        }
        Ok(())
    }
}

impl Block for Grid {
    fn kind(&self) -> &'static str {
        "grid"
    }

    fn binder(&self) -> &Binder {
        &self.binder
    }

    fn binder_mut(&mut self) -> &mut Binder {
        &mut self.binder
    }

    fn check_self(&mut self, ctx: &mut Context<'_>, placement: Placement<'_>) -> EditorResult<Health> {
        // Grids are top-level roots: the manager passes Anywhere, never its
        // block order. A grid the host detached was deleted and is torn down,
        // the same outcome check_elements gives.
        let health = placement.restore(ctx.doc, self.root())?;
        if health == Health::Live {
            // Someone may have rewritten the version attribute
            self.binder.stop_observing();
            let result = self.write_version(ctx);
            self.binder.start_observing(ctx.doc);
            result?;
        }
        Ok(health)
    }

    fn check_children(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        self.binder.stop_observing();
        let result = self.repair(ctx);
        self.binder.start_observing(ctx.doc);
        result
    }

    fn delete(&mut self, ctx: &mut Context<'_>, force: bool) -> EditorResult<Deletion> {
        if !force && self.has_content(ctx.doc) {
            let request = ConfirmRequest::new(DestructiveAction::DeleteGrid);
            if !ctx.host.confirm(&request) {
                info!(block_id = %self.id(), "grid deletion declined");
                return Ok(Deletion::Declined);
            }
        }
        for row in &mut self.rows {
            row.teardown(ctx);
        }
        self.binder.delete(ctx);
        Ok(Deletion::Deleted)
    }

    fn locate(&self, doc: &Document, node: NodeId) -> Option<(SelectionId, NodeId)> {
        if !doc.is_inclusive_ancestor(self.root(), node) {
            return None;
        }
        self.rows
            .iter()
            .find_map(|r| r.locate(doc, node))
            .or(Some((self.selection(), self.root())))
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) {
        for row in &mut self.rows {
            row.teardown(ctx);
        }
        self.binder.teardown(ctx);
    }

    fn tick_children(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let ordered = self.row_roots();
        let placement = Placement::Within {
            container: self.root(),
            ordered: &ordered,
        };
        let mut changed = false;
        let mut index = 0;
        while index < self.rows.len() {
            match self.rows[index].tick(ctx, placement)? {
                Health::Deleted => {
                    let mut row = self.rows.remove(index);
                    row.teardown(ctx);
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
