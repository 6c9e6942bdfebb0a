use crate::config::EditorConfig;
use crate::host::HostEditor;
use crate::identity::IdGenerator;
use crate::scheduler::Scheduler;
use crate::selection::{SelectionId, SelectionTree};
use crate::view::ViewRenderer;
use trellis_document::{Document, NodeId, Selector};

/// Everything a block needs to reconcile itself, borrowed from the session
pub struct Context<'a> {
    pub doc: &'a mut Document,
    pub host: &'a mut dyn HostEditor,
    pub renderer: &'a mut dyn ViewRenderer,
    pub selection: &'a mut SelectionTree,
    pub scheduler: &'a mut Scheduler,
    pub ids: &'a mut IdGenerator,
    pub config: &'a EditorConfig,
    pub scaffolding: &'a [Selector],
}

impl Context<'_> {
    pub fn select(&mut self, id: SelectionId) {
        self.selection.select(id, self.scheduler);
    }

    pub fn deselect(&mut self, id: SelectionId) {
        let delay = self.config.deselect_delay();
        self.selection.deselect(id, self.scheduler, delay);
    }

    /// Host-editor scaffolding, or inside it
    pub fn is_scaffolding(&self, node: NodeId) -> bool {
        self.doc.within_any(node, self.scaffolding)
    }

    /// Whitespace text and scaffolding never count as content changes
    pub fn is_trivial(&self, node: NodeId) -> bool {
        self.doc.is_whitespace_text(node) || self.is_scaffolding(node)
    }
}
