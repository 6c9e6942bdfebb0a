//! # Block Manager
//!
//! One manager per registered block type. A manager discovers nodes
//! matching the type's selector, imports them into tracked blocks and keeps
//! the tracked set in step with the document.
//!
//! Import failures are contained here: the error is logged and the node is
//! skipped, so one broken block never stops the others from loading. A
//! node that failed is not retried until the document changes again.

use crate::block::{Block, Deletion, Health, Insertion, Placement};
use crate::context::Context;
use crate::errors::EditorResult;
use crate::identity::ElementId;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::AddAssign;
use tracing::{debug, error, instrument};
use trellis_document::{Document, NodeId, Selector};

pub type ConstructFn = fn(&mut Context<'_>, Insertion) -> EditorResult<Box<dyn Block>>;
pub type ImportFn = fn(&mut Context<'_>, NodeId) -> EditorResult<Box<dyn Block>>;

/// A block type: how to find, construct and import it
#[derive(Clone)]
pub struct BlockType {
    pub name: &'static str,
    pub selector: Selector,
    pub construct: ConstructFn,
    pub import: ImportFn,
}

impl BlockType {
    pub fn new(name: &'static str, selector: &str, construct: ConstructFn, import: ImportFn) -> EditorResult<Self> {
        Ok(Self {
            name,
            selector: selector.parse()?,
            construct,
            import,
        })
    }
}

impl fmt::Debug for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockType")
            .field("name", &self.name)
            .field("selector", &self.selector.as_str())
            .finish()
    }
}

/// A node matching a block type's selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    pub node: NodeId,
    /// Carries an identifier already used by another block
    pub duplicate: bool,
}

/// What a reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub imported: usize,
    pub torn_down: usize,
    pub repaired: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for ReconcileReport {
    fn add_assign(&mut self, other: Self) {
        self.imported += other.imported;
        self.torn_down += other.torn_down;
        self.repaired += other.repaired;
        self.failed += other.failed;
    }
}

pub struct Manager {
    kind: BlockType,
    blocks: Vec<Box<dyn Block>>,
    /// Nodes whose import failed, with the document version after the failure
    failed: HashMap<NodeId, u64>,
}

impl Manager {
    pub fn new(kind: BlockType) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            failed: HashMap::new(),
        }
    }

    pub fn kind(&self) -> &BlockType {
        &self.kind
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &dyn Block> {
        self.blocks.iter().map(|b| b.as_ref())
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Block>> {
        self.blocks.iter_mut()
    }

    pub fn get(&self, id: &str) -> Option<&dyn Block> {
        self.blocks.iter().find(|b| b.id().as_str() == id).map(|b| b.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Box<dyn Block>> {
        self.blocks.iter_mut().find(|b| b.id().as_str() == id)
    }

    fn is_tracked(&self, node: NodeId) -> bool {
        self.blocks.iter().any(|b| b.root() == node)
    }

    /// Nodes matching the selector, host scaffolding excluded. Unless
    /// `return_all` is set, tracked nodes are left out.
    pub fn find_all(&self, ctx: &Context<'_>, return_all: bool) -> Vec<Found> {
        let nodes = ctx
            .doc
            .query_all(&self.kind.selector)
            .into_iter()
            .filter(|n| !ctx.is_scaffolding(*n));
        if return_all {
            return nodes.map(|node| Found { node, duplicate: false }).collect();
        }

        let id_attribute = &ctx.config.id_attribute;
        let mut seen: HashSet<String> = self.blocks.iter().map(|b| b.id().as_str().to_string()).collect();
        let mut found = Vec::new();
        for node in nodes {
            if self.is_tracked(node) {
                continue;
            }
            let duplicate = match ctx.doc.attribute(node, id_attribute) {
                Some(id) if !id.is_empty() => !seen.insert(id.to_string()) || ctx.ids.is_claimed(id),
                _ => false,
            };
            found.push(Found { node, duplicate });
        }
        found
    }

    /// Import every untracked node. Duplicated identifiers are replaced.
    #[instrument(skip(self, ctx), fields(kind = self.kind.name))]
    pub fn import_all(&mut self, ctx: &mut Context<'_>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let version = ctx.doc.version();
        self.failed.retain(|_, failed_at| *failed_at == version);

        for found in self.find_all(ctx, false) {
            if self.failed.contains_key(&found.node) {
                continue;
            }
            if found.duplicate {
                debug!(node = %found.node, "duplicate block identifier, assigning a fresh one");
            }
            match (self.kind.import)(ctx, found.node) {
                Ok(block) => {
                    debug!(block_id = %block.id(), node = %found.node, "imported block");
                    self.blocks.push(block);
                    report.imported += 1;
                }
                Err(e) => {
                    error!(node = %found.node, error = %e, "failed to import block");
                    self.failed.insert(found.node, version);
                    report.failed += 1;
                }
            }
        }
        // Later failures may have touched the document; skip until it changes
        let version = ctx.doc.version();
        for failed_at in self.failed.values_mut() {
            *failed_at = version;
        }
        self.sort(ctx.doc);
        report
    }

    /// Nodes skipped after a failed import
    pub fn failed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.failed.keys().copied()
    }

    /// Full reconciliation after the document was rearranged wholesale
    /// (undo, redo, before an undo snapshot)
    #[instrument(skip(self, ctx), fields(kind = self.kind.name))]
    pub fn check_elements(&mut self, ctx: &mut Context<'_>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // Vanished: the node no longer matches the selector or left the document
        let present: HashSet<NodeId> = self.find_all(ctx, true).into_iter().map(|f| f.node).collect();
        let mut index = 0;
        while index < self.blocks.len() {
            let root = self.blocks[index].root();
            if present.contains(&root) && ctx.doc.is_connected(root) {
                index += 1;
                continue;
            }
            let mut block = self.blocks.remove(index);
            debug!(block_id = %block.id(), "tearing down vanished block");
            block.teardown(ctx);
            report.torn_down += 1;
        }

        report += self.import_all(ctx);

        for block in &mut self.blocks {
            match block.check_children(ctx) {
                Ok(()) => report.repaired += 1,
                Err(e) => {
                    error!(block_id = %block.id(), error = %e, "failed to repair block");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Observation pass: reconcile blocks that changed, drop deleted ones and
    /// pick up new nodes
    #[instrument(skip(self, ctx), fields(kind = self.kind.name))]
    pub fn tick(&mut self, ctx: &mut Context<'_>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut index = 0;
        while index < self.blocks.len() {
            match self.blocks[index].tick(ctx, Placement::Anywhere) {
                Ok(Health::Deleted) => {
                    let mut block = self.blocks.remove(index);
                    debug!(block_id = %block.id(), "block root left the document");
                    block.teardown(ctx);
                    report.torn_down += 1;
                }
                Ok(_) => index += 1,
                Err(e) => {
                    error!(block_id = %self.blocks[index].id(), error = %e, "failed to reconcile block");
                    report.failed += 1;
                    index += 1;
                }
            }
        }
        report += self.import_all(ctx);
        report
    }

    pub fn create(&mut self, ctx: &mut Context<'_>, insertion: Insertion) -> EditorResult<ElementId> {
        let block = (self.kind.construct)(ctx, insertion)?;
        let id = block.id().clone();
        self.blocks.push(block);
        self.sort(ctx.doc);
        Ok(id)
    }

    /// Delete a block and its node. Returns `None` for unknown identifiers.
    pub fn delete(&mut self, ctx: &mut Context<'_>, id: &str, force: bool) -> Option<EditorResult<Deletion>> {
        let index = self.blocks.iter().position(|b| b.id().as_str() == id)?;
        let result = self.blocks[index].delete(ctx, force);
        if let Ok(Deletion::Deleted) = result {
            self.blocks.remove(index);
        }
        Some(result)
    }

    pub fn teardown_all(&mut self, ctx: &mut Context<'_>) {
        for mut block in self.blocks.drain(..) {
            block.teardown(ctx);
        }
    }

    fn sort(&mut self, doc: &Document) {
        let order = doc.document_order();
        self.blocks
            .sort_by_key(|b| order.get(&b.root()).copied().unwrap_or(usize::MAX));
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("kind", &self.kind.name)
            .field("blocks", &self.blocks.len())
            .field("failed", &self.failed.len())
            .finish()
    }
}
