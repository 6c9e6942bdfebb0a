//! # Trellis Editor
//!
//! Live synchronization and self-healing engine for content blocks embedded
//! in a host rich-text editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host editor: edits, undo/redo, focus, clicks│
//! └─────────────────────────────────────────────┘
//!                     ↓ HostEvent
//! ┌─────────────────────────────────────────────┐
//! │ session → registry → one manager per type   │
//! │  - discover and import blocks               │
//! │  - reconcile after undo / node changes      │
//! │  - route focus, clicks and view events      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ blocks: binder + check_self / check_children│
//! │  - grid → row → column                      │
//! │  - state-backed views with popovers         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ trellis-document: tree, markup, snapshots   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The document is the source of truth**: blocks re-derive everything
//!    they need from markup and repair drift instead of failing
//! 2. **Observation is a diff**: binders compare snapshots on each tick and
//!    never see their own writes
//! 3. **Destructive changes ask first**: deleting content goes through the
//!    host's confirmation prompt
//! 4. **Time is virtual**: debounces run on a scheduler the host advances
//!
//! ## Usage
//!
//! ```
//! use trellis_editor::{EditorConfig, Grid, HostEvent, Session};
//!
//! let markup = r#"<div class="trellis-grid"><div class="row"><div class="column span-6">a</div></div></div>"#;
//! let mut session = Session::load(markup, EditorConfig::default()).unwrap();
//!
//! let grid = session.blocks().next().unwrap().id().clone();
//! let columns = session.block_as::<Grid>(grid.as_str()).unwrap().rows()[0].columns().len();
//! assert_eq!(columns, 1);
//!
//! session.dispatch(HostEvent::Undo).unwrap();
//! ```

mod binder;
mod block;
mod blocks;
mod column;
mod config;
mod context;
mod errors;
mod grid;
mod host;
mod identity;
mod layout;
mod manager;
mod migrations;
mod popover;
mod registry;
mod row;
mod scheduler;
mod selection;
mod session;
mod state_view;
mod view;

#[cfg(test)]
mod testing;

pub use binder::{Binder, Lifecycle, Observed};
pub use block::{Block, Deletion, Health, Insertion, Placement};
pub use blocks::{
    grid_type, register_builtin, state_view_type, Button, ButtonState, ButtonStyle, Icon, IconState, NavItem,
    Navigation, NavigationState, Orientation,
};
pub use column::{Column, COLUMN_CLASS, CONTENT_CLASS};
pub use config::{ConfirmPolicy, EditorConfig, DEFAULT_CONFIG_NAME};
pub use context::Context;
pub use errors::{EditorError, EditorResult};
pub use grid::{Grid, GRID_CLASS};
pub use host::{ConfirmRequest, DestructiveAction, HeadlessHost, HostEditor, HostEvent};
pub use identity::{ElementId, IdGenerator};
pub use layout::{Breakpoint, ColumnWidths, Layout, GRID_UNITS};
pub use manager::{BlockType, Found, Manager, ReconcileReport};
pub use migrations::{migrate, CURRENT_VERSION};
pub use popover::{Popover, POPOVER_CLASS};
pub use registry::Registry;
pub use row::{LayoutChange, Row, ROW_CLASS};
pub use scheduler::{Scheduler, Task, TimerId};
pub use selection::{DeselectToken, SelectionId, SelectionTree};
pub use session::Session;
pub use state_view::{read_payload, selector_for, BlockState, StateView, BLOCK_CLASS, STATE_CLASS};
pub use view::{StaticRenderer, ViewEvent, ViewHandle, ViewRenderer, VIEW_CLASS};

// Re-export the document crate for hosts that only depend on the editor
pub use trellis_document as document;
