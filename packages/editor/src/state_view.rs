//! # State-backed blocks
//!
//! A [`StateView`] keeps a JSON-serializable state value. The state is
//! persisted in a hidden payload node, which is always the first child of
//! the block root, and its visual content is delegated to the external
//! [`ViewRenderer`](crate::view::ViewRenderer).
//!
//! ```text
//! div.trellis-block.trellis-<kind>[data-block-id][data-block-type=<kind>]
//!  ├ div.trellis-state[hidden]   {"label":"Go",…}
//!  └ …view output
//! ```
//!
//! Every state change is re-serialized into the payload and patched into
//! the view. The view is only destroyed and re-mounted when it has been
//! clobbered, i.e. when nothing but the payload is left in the root.

use crate::binder::Binder;
use crate::block::{Block, Deletion, Health, Insertion, Placement};
use crate::context::Context;
use crate::errors::EditorResult;
use crate::popover::Popover;
use crate::view::{ViewEvent, ViewHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use tracing::{debug, info, warn};
use trellis_document::{Document, NodeId};

pub const BLOCK_CLASS: &str = "trellis-block";
pub const STATE_CLASS: &str = "trellis-state";
pub const BLOCK_TYPE_ATTRIBUTE: &str = "data-block-type";

const PAYLOAD: &str = "payload";

/// State of a state-backed block. Runtime-only fields are `#[serde(skip)]`.
pub trait BlockState: Serialize + DeserializeOwned + Default + Clone + PartialEq + fmt::Debug + 'static {
    /// Registered block type name
    const KIND: &'static str;
}

/// Selector matching roots of blocks of kind `S`
pub fn selector_for<S: BlockState>() -> String {
    format!(".{}[{}=\"{}\"]", BLOCK_CLASS, BLOCK_TYPE_ATTRIBUTE, S::KIND)
}

/// Read the state stored under `root`, falling back to defaults
pub fn read_payload<S: BlockState>(doc: &Document, root: NodeId) -> S {
    let Some(payload) = doc
        .descendants(root)
        .into_iter()
        .find(|n| doc.has_class(*n, STATE_CLASS))
    else {
        debug!(node = %root, kind = S::KIND, "no payload, using defaults");
        return S::default();
    };
    let text = doc.text_content(payload);
    match serde_json::from_str(&text) {
        Ok(state) => state,
        Err(e) => {
            warn!(node = %root, kind = S::KIND, error = %e, "malformed block payload, using defaults");
            S::default()
        }
    }
}

#[derive(Debug)]
pub struct StateView<S: BlockState> {
    binder: Binder,
    state: S,
    view: Option<ViewHandle>,
    popover: Popover,
}

impl<S: BlockState> StateView<S> {
    /// Create a block with default state
    pub fn create(ctx: &mut Context<'_>, insertion: Insertion) -> EditorResult<Self> {
        let root = ctx.doc.create_element("div");
        insertion.insert(ctx, root)?;
        let mut block = Self::bind(ctx, root, S::default())?;
        if let Err(e) = block.check_children(ctx) {
            block.teardown(ctx);
            return Err(e);
        }
        info!(block_id = %block.id(), kind = S::KIND, "created block");
        Ok(block)
    }

    /// Adopt an existing block node, recovering its state from the payload
    pub fn import(ctx: &mut Context<'_>, root: NodeId) -> EditorResult<Self> {
        let state = read_payload::<S>(ctx.doc, root);
        let mut block = Self::bind(ctx, root, state)?;
        if let Err(e) = block.check_children(ctx) {
            block.teardown(ctx);
            return Err(e);
        }
        Ok(block)
    }

    fn bind(ctx: &mut Context<'_>, root: NodeId, state: S) -> EditorResult<Self> {
        let kind_class = format!("trellis-{}", S::KIND);
        let mut binder = Binder::new(ctx, root, None)
            .with_classes(&[BLOCK_CLASS, &kind_class])
            .with_binding(BLOCK_TYPE_ATTRIBUTE);
        if let Err(e) = binder
            .setup_observer(ctx)
            .and_then(|_| binder.set(ctx.doc, BLOCK_TYPE_ATTRIBUTE, Some(S::KIND)).map(|_| ()))
        {
            binder.teardown(ctx);
            return Err(e);
        }
        let popover = Popover::new(ctx, binder.selection());
        Ok(Self {
            binder,
            state,
            view: None,
            popover,
        })
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn payload(&self) -> Option<NodeId> {
        self.binder.watched_node(PAYLOAD)
    }

    pub fn popover(&self) -> &Popover {
        &self.popover
    }

    /// Replace the state, persisting and re-rendering on change
    pub fn set_state(&mut self, ctx: &mut Context<'_>, state: S) -> EditorResult<bool> {
        if state == self.state {
            return Ok(false);
        }
        self.state = state;

        self.binder.stop_observing();
        let result = self.persist(ctx).and_then(|_| self.render(ctx, false));
        self.binder.start_observing(ctx.doc);
        result?;
        debug!(block_id = %self.id(), kind = S::KIND, "state updated");
        Ok(true)
    }

    pub fn update(&mut self, ctx: &mut Context<'_>, f: impl FnOnce(&mut S)) -> EditorResult<bool> {
        let mut state = self.state.clone();
        f(&mut state);
        self.set_state(ctx, state)
    }

    /// Write the serialized state into the payload node
    fn persist(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let payload = self.ensure_payload(ctx)?;
        let json = serde_json::to_string(&self.state)?;
        ctx.doc.set_text_content(payload, &json)?;
        Ok(())
    }

    /// Put exactly one payload node at the front of the root
    fn ensure_payload(&mut self, ctx: &mut Context<'_>) -> EditorResult<NodeId> {
        let root = self.root();
        let candidates: Vec<NodeId> = ctx
            .doc
            .descendants(root)
            .into_iter()
            .filter(|n| ctx.doc.has_class(*n, STATE_CLASS))
            .collect();
        let known = self.payload();
        let found = known
            .filter(|n| candidates.contains(n))
            .or_else(|| candidates.first().copied())
            .or(known);

        let payload = match found {
            Some(payload) => payload,
            None => {
                debug!(block_id = %self.id(), "recreating missing payload");
                ctx.doc.create_element_with_classes("div", &[STATE_CLASS])
            }
        };
        for duplicate in candidates.into_iter().filter(|n| *n != payload) {
            debug!(block_id = %self.id(), node = %duplicate, "removing duplicate payload");
            ctx.doc.detach(duplicate);
        }
        if ctx.doc.parent(payload) != Some(root) || ctx.doc.index_in_parent(payload) != Some(0) {
            ctx.doc.insert_child(root, 0, payload)?;
        }
        ctx.doc.set_attribute(payload, "hidden", "")?;
        self.binder.rebind(ctx.doc, PAYLOAD, payload);
        Ok(payload)
    }

    /// Only the payload is left: the view output was wiped out
    fn is_clobbered(&self, ctx: &Context<'_>) -> bool {
        let payload = self.payload();
        ctx.doc
            .children(self.root())
            .iter()
            .all(|c| Some(*c) == payload || ctx.doc.is_whitespace_text(*c) || ctx.is_scaffolding(*c))
    }

    /// Patch the view, or mount a fresh one when `remount` is set or the
    /// patch fails
    fn render(&mut self, ctx: &mut Context<'_>, remount: bool) -> EditorResult<()> {
        let value = serde_json::to_value(&self.state)?;
        if !remount {
            if let Some(handle) = self.view {
                match ctx.renderer.update(ctx.doc, handle, &value) {
                    Ok(()) => return Ok(()),
                    Err(e) => debug!(block_id = %self.id(), error = %e, "view update failed, remounting"),
                }
            }
        }

        if let Some(handle) = self.view.take() {
            ctx.renderer.unmount(ctx.doc, handle);
        }
        let root = self.root();
        let payload = self.payload();
        for child in ctx.doc.children(root).to_vec() {
            if Some(child) != payload && !ctx.is_scaffolding(child) {
                ctx.doc.detach(child);
            }
        }
        self.view = Some(ctx.renderer.mount(ctx.doc, root, S::KIND, &value)?);
        debug!(block_id = %self.id(), kind = S::KIND, "mounted view");
        Ok(())
    }

    fn repair(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        let payload = self.ensure_payload(ctx)?;

        // Payload text edited from outside (undo, paste): adopt it when it
        // parses, otherwise write our state back
        let json = serde_json::to_string(&self.state)?;
        let text = ctx.doc.text_content(payload);
        let mut adopted = false;
        if text != json {
            match serde_json::from_str::<S>(&text) {
                Ok(state) => {
                    adopted = state != self.state;
                    self.state = state;
                }
                Err(e) => debug!(block_id = %self.id(), error = %e, "rewriting unreadable payload"),
            }
            ctx.doc.set_text_content(payload, &serde_json::to_string(&self.state)?)?;
        }

        if self.view.is_none() || self.is_clobbered(ctx) {
            self.render(ctx, true)
        } else if adopted {
            self.render(ctx, false)
        } else {
            Ok(())
        }
    }
}

impl<S: BlockState> Block for StateView<S> {
    fn kind(&self) -> &'static str {
        S::KIND
    }

    fn binder(&self) -> &Binder {
        &self.binder
    }

    fn binder_mut(&mut self) -> &mut Binder {
        &mut self.binder
    }

    fn check_self(&mut self, ctx: &mut Context<'_>, _placement: Placement<'_>) -> EditorResult<Health> {
        Ok(if ctx.doc.is_connected(self.root()) {
            Health::Live
        } else {
            Health::Deleted
        })
    }

    fn check_children(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        self.binder.stop_observing();
        let result = self.repair(ctx);
        self.binder.start_observing(ctx.doc);
        result
    }

    fn delete(&mut self, ctx: &mut Context<'_>, _force: bool) -> EditorResult<Deletion> {
        self.teardown(ctx);
        ctx.doc.detach(self.root());
        Ok(Deletion::Deleted)
    }

    fn popover_mut(&mut self) -> Option<&mut Popover> {
        Some(&mut self.popover)
    }

    fn view(&self) -> Option<ViewHandle> {
        self.view
    }

    fn handle_view_event(&mut self, ctx: &mut Context<'_>, event: ViewEvent) -> EditorResult<()> {
        match event {
            ViewEvent::FocusRequested => {
                ctx.select(self.selection());
                Ok(())
            }
            ViewEvent::StateUpdated(value) => match serde_json::from_value::<S>(value) {
                Ok(state) => self.set_state(ctx, state).map(|_| ()),
                Err(e) => {
                    warn!(block_id = %self.id(), kind = S::KIND, error = %e, "ignoring malformed view state");
                    Ok(())
                }
            },
        }
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) {
        self.popover.teardown(ctx);
        if let Some(handle) = self.view.take() {
            ctx.renderer.unmount(ctx.doc, handle);
        }
        self.binder.teardown(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
