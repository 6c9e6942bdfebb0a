//! Shared fixtures for unit tests

use crate::config::{ConfirmPolicy, EditorConfig};
use crate::context::Context;
use crate::host::HeadlessHost;
use crate::identity::IdGenerator;
use crate::scheduler::Scheduler;
use crate::selection::SelectionTree;
use crate::view::StaticRenderer;
use trellis_document::{Document, NodeId, Selector};

pub struct Harness {
    pub doc: Document,
    pub host: HeadlessHost,
    pub renderer: StaticRenderer,
    pub selection: SelectionTree,
    pub scheduler: Scheduler,
    pub ids: IdGenerator,
    pub config: EditorConfig,
    pub scaffolding: Vec<Selector>,
}

impl Harness {
    pub fn new() -> Self {
        let config = EditorConfig::default();
        let scaffolding = config.scaffolding.iter().map(|s| s.parse().unwrap()).collect();
        Self {
            doc: Document::new(),
            host: HeadlessHost::new(ConfirmPolicy::Decline),
            renderer: StaticRenderer::new(),
            selection: SelectionTree::new(),
            scheduler: Scheduler::new(),
            ids: IdGenerator::from_seed("test"),
            config,
            scaffolding,
        }
    }

    /// Append markup to the body and return its first top-level node
    pub fn append(&mut self, markup: &str) -> NodeId {
        let root = self.doc.root();
        self.doc.append_markup(root, markup).unwrap()[0]
    }

    pub fn context(&mut self) -> Context<'_> {
        Context {
            doc: &mut self.doc,
            host: &mut self.host,
            renderer: &mut self.renderer,
            selection: &mut self.selection,
            scheduler: &mut self.scheduler,
            ids: &mut self.ids,
            config: &self.config,
            scaffolding: &self.scaffolding,
        }
    }

    pub fn markup(&self) -> String {
        self.doc.to_markup()
    }
}
