//! # Block capability
//!
//! Every tracked object implements [`Block`] and composes a [`Binder`]
//! instead of inheriting from a base element. The trait supplies the
//! shared reconciliation loop; implementors only say what "valid" means for
//! their node.
//!
//! Reconciliation is one pass per element: [`Block::reconcile`] runs
//! `check_self` (is the root where it belongs?) followed by
//! `check_children` (is the inside well-formed?). [`Block::tick`] observes
//! first and reconciles only when something external changed.

use crate::binder::Binder;
use crate::context::Context;
use crate::errors::EditorResult;
use crate::identity::ElementId;
use crate::popover::Popover;
use crate::selection::SelectionId;
use crate::view::{ViewEvent, ViewHandle};
use std::any::Any;
use tracing::debug;
use trellis_document::{Document, NodeId};

/// Result of checking a block's root placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Live,
    /// The root was detached and has been put back
    Reinserted,
    /// The root is gone for good; the owner tears the block down
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    /// The user declined the confirmation prompt
    Declined,
}

/// Where a block's root is expected to live
#[derive(Debug, Clone, Copy)]
pub enum Placement<'a> {
    /// Top-level block: anywhere in the document, and a detached root is final
    Anywhere,

    /// Child of a structural owner, with the owner's last known child order
    Within { container: NodeId, ordered: &'a [NodeId] },
}

impl Placement<'_> {
    /// Put a detached root back next to its last known sibling
    pub fn restore(&self, doc: &mut Document, node: NodeId) -> EditorResult<Health> {
        let (container, ordered) = match *self {
            Placement::Anywhere => {
                return Ok(if doc.is_connected(node) { Health::Live } else { Health::Deleted });
            }
            Placement::Within { container, ordered } => (container, ordered),
        };

        if doc.parent(node) == Some(container) {
            return Ok(if doc.is_connected(node) { Health::Live } else { Health::Deleted });
        }
        let Some(index) = ordered.iter().position(|n| *n == node) else {
            return Ok(Health::Deleted);
        };
        if !doc.is_connected(container) {
            return Ok(Health::Deleted);
        }

        let previous = ordered[..index]
            .iter()
            .rev()
            .find(|n| doc.parent(**n) == Some(container))
            .copied();
        let next = ordered[index + 1..]
            .iter()
            .find(|n| doc.parent(**n) == Some(container))
            .copied();

        match (previous, next) {
            (Some(previous), _) => doc.insert_after(previous, node)?,
            (None, Some(next)) => doc.insert_before(next, node)?,
            (None, None) => doc.append_child(container, node)?,
        }
        Ok(Health::Reinserted)
    }
}

/// Restore the binder's root with observation suspended
pub(crate) fn restore_root(binder: &mut Binder, ctx: &mut Context<'_>, placement: Placement<'_>) -> EditorResult<Health> {
    binder.stop_observing();
    let result = placement.restore(ctx.doc, binder.root());
    binder.start_observing(ctx.doc);
    if let Ok(Health::Reinserted) = result {
        debug!(block_id = %binder.id(), "reinserted detached block");
    }
    result
}

/// Where a newly created block goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// After the top-level node containing the cursor, else at the end
    AtCursor,
    AtRoot,
    After(NodeId),
    Into(NodeId),
}

impl Insertion {
    pub fn insert(self, ctx: &mut Context<'_>, node: NodeId) -> EditorResult<()> {
        let root = ctx.doc.root();
        match self {
            Insertion::AtCursor => {
                let anchor = ctx
                    .host
                    .cursor()
                    .filter(|cursor| ctx.doc.is_connected(*cursor) && *cursor != root)
                    .and_then(|cursor| {
                        std::iter::once(cursor)
                            .chain(ctx.doc.ancestors(cursor))
                            .find(|n| ctx.doc.parent(*n) == Some(root))
                    });
                match anchor {
                    Some(anchor) => ctx.doc.insert_after(anchor, node)?,
                    None => ctx.doc.append_child(root, node)?,
                }
            }
            Insertion::AtRoot => ctx.doc.append_child(root, node)?,
            Insertion::After(reference) => ctx.doc.insert_after(reference, node)?,
            Insertion::Into(parent) => ctx.doc.append_child(parent, node)?,
        }
        Ok(())
    }
}

pub trait Block: Any {
    /// Registered block type name
    fn kind(&self) -> &'static str;

    fn binder(&self) -> &Binder;

    fn binder_mut(&mut self) -> &mut Binder;

    /// Verify the root is where it belongs, repairing it if possible
    fn check_self(&mut self, ctx: &mut Context<'_>, placement: Placement<'_>) -> EditorResult<Health>;

    /// Verify and repair the block's inner structure
    fn check_children(&mut self, ctx: &mut Context<'_>) -> EditorResult<()>;

    /// Remove the block and its node. Content may require confirmation
    /// unless `force` is set.
    fn delete(&mut self, ctx: &mut Context<'_>, force: bool) -> EditorResult<Deletion>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn id(&self) -> &ElementId {
        self.binder().id()
    }

    fn root(&self) -> NodeId {
        self.binder().root()
    }

    fn selection(&self) -> SelectionId {
        self.binder().selection()
    }

    fn popover_mut(&mut self) -> Option<&mut Popover> {
        None
    }

    fn view(&self) -> Option<ViewHandle> {
        None
    }

    fn handle_view_event(&mut self, _ctx: &mut Context<'_>, _event: ViewEvent) -> EditorResult<()> {
        Ok(())
    }

    /// Deepest tracked element inside this block containing `node`
    fn locate(&self, doc: &Document, node: NodeId) -> Option<(SelectionId, NodeId)> {
        doc.is_inclusive_ancestor(self.root(), node)
            .then(|| (self.selection(), self.root()))
    }

    /// Stop tracking without touching the document
    fn teardown(&mut self, ctx: &mut Context<'_>) {
        if let Some(popover) = self.popover_mut() {
            popover.teardown(ctx);
        }
        self.binder_mut().teardown(ctx);
    }

    /// Observe child blocks owned by this one
    fn tick_children(&mut self, _ctx: &mut Context<'_>) -> EditorResult<()> {
        Ok(())
    }

    fn reconcile(&mut self, ctx: &mut Context<'_>, placement: Placement<'_>) -> EditorResult<Health> {
        let health = self.check_self(ctx, placement)?;
        if health != Health::Deleted {
            self.check_children(ctx)?;
        }
        Ok(health)
    }

    /// Observe external changes and reconcile if there were any
    fn tick(&mut self, ctx: &mut Context<'_>, placement: Placement<'_>) -> EditorResult<Health> {
        let observed = self.binder_mut().observe(ctx)?;
        let mut health = Health::Live;
        if observed.any() {
            health = self.reconcile(ctx, placement)?;
            if health == Health::Deleted {
                return Ok(health);
            }
        }
        self.tick_children(ctx)?;
        Ok(health)
    }
}
