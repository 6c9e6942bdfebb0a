//! Built-in block types

use crate::block::{Block, Insertion};
use crate::context::Context;
use crate::errors::EditorResult;
use crate::grid::{Grid, GRID_SELECTOR};
use crate::layout::Layout;
use crate::manager::BlockType;
use crate::registry::Registry;
use crate::state_view::{selector_for, BlockState, StateView};
use serde::{Deserialize, Serialize};
use trellis_document::NodeId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonState {
    pub label: String,
    pub href: String,
    pub style: ButtonStyle,
    pub new_tab: bool,
    #[serde(skip)]
    pub hovered: bool,
}

impl Default for ButtonState {
    fn default() -> Self {
        Self {
            label: "Button".to_string(),
            href: String::new(),
            style: ButtonStyle::Primary,
            new_tab: false,
            hovered: false,
        }
    }
}

impl BlockState for ButtonState {
    const KIND: &'static str = "button";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationState {
    pub items: Vec<NavItem>,
    pub orientation: Orientation,
    /// Index of the item whose settings are open
    #[serde(skip)]
    pub expanded: Option<usize>,
}

impl BlockState for NavigationState {
    const KIND: &'static str = "navigation";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconState {
    pub name: String,
    pub size: u32,
    pub color: Option<String>,
    /// Icon shown while browsing the picker
    #[serde(skip)]
    pub preview: Option<String>,
}

impl Default for IconState {
    fn default() -> Self {
        Self {
            name: "star".to_string(),
            size: 24,
            color: None,
            preview: None,
        }
    }
}

impl BlockState for IconState {
    const KIND: &'static str = "icon";
}

pub type Button = StateView<ButtonState>;
pub type Navigation = StateView<NavigationState>;
pub type Icon = StateView<IconState>;

fn construct_grid(ctx: &mut Context<'_>, insertion: Insertion) -> EditorResult<Box<dyn Block>> {
    Ok(Box::new(Grid::create(ctx, insertion, Layout::equal(2)?)?))
}

fn import_grid(ctx: &mut Context<'_>, node: NodeId) -> EditorResult<Box<dyn Block>> {
    Ok(Box::new(Grid::import(ctx, node)?))
}

fn construct_view<S: BlockState>(ctx: &mut Context<'_>, insertion: Insertion) -> EditorResult<Box<dyn Block>> {
    Ok(Box::new(StateView::<S>::create(ctx, insertion)?))
}

fn import_view<S: BlockState>(ctx: &mut Context<'_>, node: NodeId) -> EditorResult<Box<dyn Block>> {
    Ok(Box::new(StateView::<S>::import(ctx, node)?))
}

pub fn grid_type() -> EditorResult<BlockType> {
    BlockType::new("grid", GRID_SELECTOR, construct_grid, import_grid)
}

pub fn state_view_type<S: BlockState>() -> EditorResult<BlockType> {
    BlockType::new(S::KIND, &selector_for::<S>(), construct_view::<S>, import_view::<S>)
}

/// Register the grid and every state-backed block
pub fn register_builtin(registry: &mut Registry) -> EditorResult<()> {
    registry.register(grid_type()?)?;
    registry.register(state_view_type::<ButtonState>()?)?;
    registry.register(state_view_type::<NavigationState>()?)?;
    registry.register(state_view_type::<IconState>()?)?;
    Ok(())
}
