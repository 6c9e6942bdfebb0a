//! # Block Registry
//!
//! Block types are registered explicitly, one [`Manager`] each. The
//! registry fans host events out to the managers and routes focus, clicks
//! and view events to the block that owns the target node.

use crate::block::{Block, Deletion, Insertion};
use crate::context::Context;
use crate::errors::{EditorError, EditorResult};
use crate::host::HostEvent;
use crate::identity::ElementId;
use crate::manager::{BlockType, Manager, ReconcileReport};
use crate::selection::SelectionId;
use crate::view::{ViewEvent, ViewHandle};
use tracing::{debug, instrument, warn};
use trellis_document::{Document, NodeId};

#[derive(Debug, Default)]
pub struct Registry {
    managers: Vec<Manager>,
    focused: Option<SelectionId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: BlockType) -> EditorResult<()> {
        if self.managers.iter().any(|m| m.kind().name == kind.name) {
            return Err(EditorError::DuplicateBlockType(kind.name.to_string()));
        }
        debug!(kind = kind.name, selector = kind.selector.as_str(), "registered block type");
        self.managers.push(Manager::new(kind));
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.managers.iter().map(|m| m.kind().name)
    }

    pub fn manager(&self, name: &str) -> Option<&Manager> {
        self.managers.iter().find(|m| m.kind().name == name)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &dyn Block> {
        self.managers.iter().flat_map(|m| m.blocks())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Block> {
        self.managers.iter().find_map(|m| m.get(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Box<dyn Block>> {
        self.managers.iter_mut().find_map(|m| m.get_mut(id))
    }

    pub fn focused(&self) -> Option<SelectionId> {
        self.focused
    }

    #[instrument(skip_all)]
    pub fn import_all(&mut self, ctx: &mut Context<'_>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for manager in &mut self.managers {
            report += manager.import_all(ctx);
        }
        report
    }

    #[instrument(skip_all)]
    pub fn check_elements(&mut self, ctx: &mut Context<'_>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for manager in &mut self.managers {
            report += manager.check_elements(ctx);
        }
        report
    }

    pub fn tick(&mut self, ctx: &mut Context<'_>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for manager in &mut self.managers {
            report += manager.tick(ctx);
        }
        report
    }

    pub fn create(&mut self, ctx: &mut Context<'_>, kind: &str, insertion: Insertion) -> EditorResult<ElementId> {
        let manager = self
            .managers
            .iter_mut()
            .find(|m| m.kind().name == kind)
            .ok_or_else(|| EditorError::UnknownBlockType(kind.to_string()))?;
        manager.create(ctx, insertion)
    }

    pub fn delete(&mut self, ctx: &mut Context<'_>, id: &str, force: bool) -> EditorResult<Deletion> {
        self.managers
            .iter_mut()
            .find_map(|m| m.delete(ctx, id, force))
            .unwrap_or_else(|| Err(EditorError::missing_context(format!("no block with id {}", id))))
    }

    /// Deepest tracked element containing `node`
    pub fn locate(&self, doc: &Document, node: NodeId) -> Option<(SelectionId, NodeId)> {
        self.blocks()
            .filter_map(|b| b.locate(doc, node))
            .max_by_key(|(_, root)| doc.depth(*root).unwrap_or(0))
    }

    /// Dispatch a host event
    pub fn handle_event(&mut self, ctx: &mut Context<'_>, event: HostEvent) -> ReconcileReport {
        match event {
            HostEvent::Undo | HostEvent::Redo | HostEvent::BeforeAddUndo => {
                let report = self.check_elements(ctx);
                self.sync_popovers(ctx);
                report
            }
            HostEvent::NodeChange => self.tick(ctx),
            HostEvent::FocusIn(node) => {
                self.focus(ctx, node);
                self.sync_popovers(ctx);
                ReconcileReport::default()
            }
            HostEvent::Click(node) => {
                self.click(ctx, node);
                ReconcileReport::default()
            }
        }
    }

    fn focus(&mut self, ctx: &mut Context<'_>, node: NodeId) {
        for block in self.managers.iter_mut().flat_map(|m| m.blocks_mut()) {
            if let Some(popover) = block.popover_mut() {
                if popover.on_focus_in(ctx, node) {
                    return;
                }
            }
        }

        let target = self.locate(ctx.doc, node).map(|(selection, _)| selection);
        if let Some(previous) = self.focused.filter(|p| Some(*p) != target) {
            ctx.deselect(previous);
        }
        if let Some(target) = target {
            ctx.select(target);
        }
        self.focused = target;
    }

    fn click(&mut self, ctx: &mut Context<'_>, node: NodeId) {
        for block in self.managers.iter_mut().flat_map(|m| m.blocks_mut()) {
            let root = block.root();
            if let Some(popover) = block.popover_mut() {
                popover.on_click(ctx, node, root);
            }
        }
    }

    /// A popover's click-outside registration delay elapsed
    pub fn arm_popover(&mut self, popover: SelectionId) {
        for block in self.managers.iter_mut().flat_map(|m| m.blocks_mut()) {
            if let Some(p) = block.popover_mut().filter(|p| p.selection() == popover) {
                p.arm();
                return;
            }
        }
    }

    /// Show or hide popovers to match their owners' selection
    pub fn sync_popovers(&mut self, ctx: &mut Context<'_>) {
        for block in self.managers.iter_mut().flat_map(|m| m.blocks_mut()) {
            let root = block.root();
            let id = block.id().clone();
            if let Some(popover) = block.popover_mut() {
                if let Err(e) = popover.sync(ctx, root) {
                    warn!(block_id = %id, error = %e, "failed to sync popover");
                }
            }
        }
    }

    pub fn route_view_events(&mut self, ctx: &mut Context<'_>, events: Vec<(ViewHandle, ViewEvent)>) {
        for (handle, event) in events {
            let Some(block) = self
                .managers
                .iter_mut()
                .flat_map(|m| m.blocks_mut())
                .find(|b| b.view() == Some(handle))
            else {
                debug!(view = ?handle, "event for unknown view");
                continue;
            };
            if let Err(e) = block.handle_view_event(ctx, event) {
                warn!(block_id = %block.id(), error = %e, "failed to handle view event");
            }
        }
    }

    pub fn teardown_all(&mut self, ctx: &mut Context<'_>) {
        for manager in &mut self.managers {
            manager.teardown_all(ctx);
        }
        self.focused = None;
    }
}
