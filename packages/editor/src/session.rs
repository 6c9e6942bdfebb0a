//! # Editing Session
//!
//! A [`Session`] owns a document together with everything the engine keeps
//! alongside it: the selection tree, the virtual clock, the identifier
//! generator and the block registry. Host editors drive it with
//! [`Session::dispatch`] for lifecycle events and [`Session::advance`] for
//! the passage of time.
//!
//! ```
//! use trellis_editor::{HostEvent, Insertion, Session};
//!
//! let mut session = Session::load("<p>intro</p>", Default::default()).unwrap();
//! let id = session.create("grid", Insertion::AtRoot).unwrap();
//!
//! let root = session.block(id.as_str()).unwrap().root();
//! session.document_mut().detach(root);
//! session.dispatch(HostEvent::NodeChange).unwrap();
//! assert!(session.block(id.as_str()).is_none());
//! ```

use crate::block::{Block, Deletion, Insertion};
use crate::blocks::register_builtin;
use crate::config::EditorConfig;
use crate::context::Context;
use crate::errors::{EditorError, EditorResult};
use crate::host::{HeadlessHost, HostEditor, HostEvent};
use crate::identity::{ElementId, IdGenerator};
use crate::manager::{BlockType, ReconcileReport};
use crate::registry::Registry;
use crate::scheduler::{Scheduler, Task};
use crate::selection::SelectionTree;
use crate::view::{StaticRenderer, ViewRenderer};
use std::time::Duration;
use tracing::{debug, info, instrument};
use trellis_document::{parse_markup, Document, Selector};

pub struct Session<H: HostEditor = HeadlessHost, R: ViewRenderer = StaticRenderer> {
    doc: Document,
    host: H,
    renderer: R,
    selection: SelectionTree,
    scheduler: Scheduler,
    ids: IdGenerator,
    config: EditorConfig,
    scaffolding: Vec<Selector>,
    registry: Registry,
}

impl Session {
    /// Parse markup into a headless session and import every block
    pub fn load(markup: &str, config: EditorConfig) -> EditorResult<Self> {
        let doc = parse_markup(markup)?;
        let host = HeadlessHost::new(config.confirm_deletes);
        let mut session = Session::new(doc, config, host, StaticRenderer::new())?;
        session.import_all();
        Ok(session)
    }
}

impl<H: HostEditor, R: ViewRenderer> Session<H, R> {
    /// Session with the built-in block types registered. Nothing is imported
    /// yet.
    pub fn new(doc: Document, config: EditorConfig, host: H, renderer: R) -> EditorResult<Self> {
        let scaffolding = config
            .scaffolding
            .iter()
            .map(|s| s.parse::<Selector>())
            .collect::<Result<Vec<_>, _>>()?;
        let mut registry = Registry::new();
        register_builtin(&mut registry)?;
        Ok(Self {
            doc,
            host,
            renderer,
            selection: SelectionTree::new(),
            scheduler: Scheduler::new(),
            ids: IdGenerator::new(),
            config,
            scaffolding,
            registry,
        })
    }

    /// Use a fixed identifier seed. Only affects identifiers generated
    /// afterwards.
    pub fn with_id_seed(mut self, seed: &str) -> Self {
        self.ids = IdGenerator::from_seed(seed);
        self
    }

    pub fn register(&mut self, kind: BlockType) -> EditorResult<()> {
        self.registry.register(kind)
    }

    fn split(&mut self) -> (Context<'_>, &mut Registry) {
        let ctx = Context {
            doc: &mut self.doc,
            host: &mut self.host,
            renderer: &mut self.renderer,
            selection: &mut self.selection,
            scheduler: &mut self.scheduler,
            ids: &mut self.ids,
            config: &self.config,
            scaffolding: &self.scaffolding,
        };
        (ctx, &mut self.registry)
    }

    #[instrument(skip(self))]
    pub fn import_all(&mut self) -> ReconcileReport {
        let (mut ctx, registry) = self.split();
        let report = registry.import_all(&mut ctx);
        info!(imported = report.imported, failed = report.failed, "imported blocks");
        report
    }

    /// Full reconciliation of every tracked block
    pub fn check_elements(&mut self) -> ReconcileReport {
        let (mut ctx, registry) = self.split();
        registry.check_elements(&mut ctx)
    }

    /// Feed a host editor event into the engine
    #[instrument(skip(self))]
    pub fn dispatch(&mut self, event: HostEvent) -> EditorResult<ReconcileReport> {
        let (mut ctx, registry) = self.split();
        let report = registry.handle_event(&mut ctx, event);
        if !report.is_empty() {
            debug!(?report, "reconciled");
        }
        self.drain_view_events();
        Ok(report)
    }

    /// Move the clock forward, firing due timers, then bring popovers and
    /// views up to date
    pub fn advance(&mut self, by: Duration) {
        let until = self.scheduler.now() + by;
        while let Some((_, task)) = self.scheduler.pop_due(until) {
            match task {
                Task::ResolveDeselect { node, token } => {
                    self.selection.resolve_deselect(node, token);
                }
                Task::ArmClickOutside { popover } => self.registry.arm_popover(popover),
            }
        }
        self.scheduler.set_now(until);

        let (mut ctx, registry) = self.split();
        registry.sync_popovers(&mut ctx);
        self.drain_view_events();
    }

    fn drain_view_events(&mut self) {
        let events = self.renderer.drain_events();
        if events.is_empty() {
            return;
        }
        let (mut ctx, registry) = self.split();
        registry.route_view_events(&mut ctx, events);
        registry.sync_popovers(&mut ctx);
    }

    pub fn create(&mut self, kind: &str, insertion: Insertion) -> EditorResult<ElementId> {
        let (mut ctx, registry) = self.split();
        registry.create(&mut ctx, kind, insertion)
    }

    pub fn delete(&mut self, id: &str, force: bool) -> EditorResult<Deletion> {
        let (mut ctx, registry) = self.split();
        registry.delete(&mut ctx, id, force)
    }

    pub fn block(&self, id: &str) -> Option<&dyn Block> {
        self.registry.get(id)
    }

    /// Concrete view of a block
    pub fn block_as<B: Block>(&self, id: &str) -> Option<&B> {
        self.registry.get(id).and_then(|b| b.as_any().downcast_ref())
    }

    /// Run `f` against a block of concrete type `B`
    pub fn with_block_mut<B: Block, T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut B, &mut Context<'_>) -> EditorResult<T>,
    ) -> EditorResult<T> {
        let (mut ctx, registry) = self.split();
        let block = registry
            .get_mut(id)
            .and_then(|b| b.as_any_mut().downcast_mut::<B>())
            .ok_or_else(|| EditorError::missing_context(format!("no block with id {}", id)))?;
        f(block, &mut ctx)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &dyn Block> {
        self.registry.blocks()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Direct access for edits made behind the engine's back
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn selection(&self) -> &SelectionTree {
        &self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn markup(&self) -> String {
        self.doc.to_markup()
    }

    /// Stop tracking every block
    pub fn close(&mut self) {
        let (mut ctx, registry) = self.split();
        registry.teardown_all(&mut ctx);
    }
}
