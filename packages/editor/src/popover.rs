//! # Popover
//!
//! A floating settings surface owned by exactly one block. The popover is
//! visible while its owner is selected and participates in selection as a
//! child of the owner, so focusing the popover keeps the owner selected.
//!
//! Showing installs a focus-in listener. The first focus inside the surface
//! selects the popover and schedules the one-shot click-outside listener,
//! which is armed after a short registration delay. A click outside both
//! the surface and the owner then deselects the owner and the popover and
//! removes the listener.

use crate::context::Context;
use crate::errors::{EditorError, EditorResult};
use crate::scheduler::{Task, TimerId};
use crate::selection::SelectionId;
use tracing::{debug, trace};
use trellis_document::NodeId;

pub const POPOVER_CLASS: &str = "trellis-popover";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickOutside {
    Idle,
    Pending(TimerId),
    Armed,
}

#[derive(Debug)]
pub struct Popover {
    selection: SelectionId,
    owner: SelectionId,
    surface: Option<NodeId>,
    focus_listener: bool,
    click_outside: ClickOutside,
}

impl Popover {
    pub fn new(ctx: &mut Context<'_>, owner: SelectionId) -> Self {
        Self {
            selection: ctx.selection.create(Some(owner)),
            owner,
            surface: None,
            focus_listener: false,
            click_outside: ClickOutside::Idle,
        }
    }

    pub fn selection(&self) -> SelectionId {
        self.selection
    }

    pub fn surface(&self) -> Option<NodeId> {
        self.surface
    }

    pub fn is_visible(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.click_outside == ClickOutside::Armed
    }

    /// Show the surface for an owner rooted at `anchor`. Idempotent.
    pub fn show(&mut self, ctx: &mut Context<'_>, anchor: NodeId) -> EditorResult<()> {
        if !ctx.doc.is_connected(anchor) {
            return Err(EditorError::missing_context(format!(
                "popover anchor {} is not in the document",
                anchor
            )));
        }
        if self.surface.is_some() {
            return Ok(());
        }

        let surface = ctx.doc.create_element_with_classes("div", &[POPOVER_CLASS]);
        ctx.doc.set_attribute(surface, "data-mce-bogus", "all")?;
        ctx.doc.set_attribute(surface, "contenteditable", "false")?;
        let root = ctx.doc.root();
        ctx.doc.append_child(root, surface)?;

        self.surface = Some(surface);
        self.focus_listener = true;
        debug!(popover = ?self.selection, node = %surface, "popover shown");
        Ok(())
    }

    /// Remove the surface and every listener. Idempotent.
    pub fn hide(&mut self, ctx: &mut Context<'_>) {
        if let ClickOutside::Pending(timer) = self.click_outside {
            ctx.scheduler.cancel(timer);
        }
        self.click_outside = ClickOutside::Idle;
        self.focus_listener = false;
        if let Some(surface) = self.surface.take() {
            ctx.doc.detach(surface);
            debug!(popover = ?self.selection, "popover hidden");
        }
    }

    /// Focus moved to `node`. Returns whether the popover took it.
    pub fn on_focus_in(&mut self, ctx: &mut Context<'_>, node: NodeId) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };
        if !self.focus_listener || !ctx.doc.is_inclusive_ancestor(surface, node) {
            return false;
        }

        ctx.select(self.selection);
        if self.click_outside == ClickOutside::Idle {
            let delay = ctx.config.click_outside_delay();
            let timer = ctx.scheduler.schedule(delay, Task::ArmClickOutside { popover: self.selection });
            self.click_outside = ClickOutside::Pending(timer);
        }
        true
    }

    /// The registration delay elapsed
    pub fn arm(&mut self) -> bool {
        if let ClickOutside::Pending(_) = self.click_outside {
            trace!(popover = ?self.selection, "click-outside listener armed");
            self.click_outside = ClickOutside::Armed;
            return true;
        }
        false
    }

    /// A click landed on `node`. Returns whether it dismissed the popover.
    pub fn on_click(&mut self, ctx: &mut Context<'_>, node: NodeId, owner_root: NodeId) -> bool {
        if self.click_outside != ClickOutside::Armed {
            return false;
        }
        let inside = self.surface.map(|s| ctx.doc.is_inclusive_ancestor(s, node)).unwrap_or(false)
            || ctx.doc.is_inclusive_ancestor(owner_root, node);
        if inside {
            return false;
        }

        self.click_outside = ClickOutside::Idle;
        ctx.deselect(self.owner);
        ctx.deselect(self.selection);
        debug!(popover = ?self.selection, node = %node, "clicked outside popover");
        true
    }

    /// Follow the owner's selection
    pub fn sync(&mut self, ctx: &mut Context<'_>, owner_root: NodeId) -> EditorResult<()> {
        let wanted = ctx.selection.is_selected(self.owner);
        match (wanted, self.is_visible()) {
            (true, false) => self.show(ctx, owner_root),
            (false, true) => {
                self.hide(ctx);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn teardown(&mut self, ctx: &mut Context<'_>) {
        self.hide(ctx);
        ctx.selection.remove(self.selection, ctx.scheduler);
    }
}
