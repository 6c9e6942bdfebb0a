//! # Hierarchical Selection
//!
//! Every tracked element and every popover owns a node in the
//! [`SelectionTree`]. Selecting a node points it and all of its ancestors at
//! the node. Deselecting is debounced: it issues a [`DeselectToken`] and
//! schedules a resolution task. When the task fires the node (and every
//! ancestor still pointing at it) is cleared, unless a later `select()` on
//! the node replaced the token in the meantime.
//!
//! ```text
//! grid ──selected──▶ column
//!  └ row ─selected─▶ column
//!     └ column ─selected─▶ column
//! ```
//!
//! None of the operations fail; unknown or removed nodes are ignored.
//! Slots of removed nodes are reused, and a generation counter keeps stale
//! ids from reaching the node that took their slot.

use crate::scheduler::{Scheduler, Task, TimerId};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectionId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeselectToken(u64);

#[derive(Debug, Default)]
struct SelectionNode {
    selected: Option<SelectionId>,
    parent: Option<SelectionId>,
    children: Vec<SelectionId>,
    pending: Option<(DeselectToken, TimerId)>,
    alive: bool,
    generation: u32,
}

#[derive(Debug, Default)]
pub struct SelectionTree {
    nodes: Vec<SelectionNode>,
    free: Vec<u32>,
    next_token: u64,
}

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, id: SelectionId) -> Option<&SelectionNode> {
        self.nodes
            .get(id.index as usize)
            .filter(|n| n.alive && n.generation == id.generation)
    }

    fn get_mut(&mut self, id: SelectionId) -> Option<&mut SelectionNode> {
        self.nodes
            .get_mut(id.index as usize)
            .filter(|n| n.alive && n.generation == id.generation)
    }

    pub fn create(&mut self, parent: Option<SelectionId>) -> SelectionId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.nodes[index as usize];
                let generation = slot.generation.wrapping_add(1);
                *slot = SelectionNode {
                    alive: true,
                    generation,
                    ..Default::default()
                };
                SelectionId { index, generation }
            }
            None => {
                let index = self.nodes.len() as u32;
                self.nodes.push(SelectionNode {
                    alive: true,
                    ..Default::default()
                });
                SelectionId { index, generation: 0 }
            }
        };
        if let Some(parent) = parent {
            self.add_child(parent, id);
        }
        id
    }

    /// Forget a node. Ancestors pointing at it are cleared and its pending
    /// deselect is cancelled. Children lose their parent pointer.
    pub fn remove(&mut self, id: SelectionId, scheduler: &mut Scheduler) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        node.alive = false;
        node.selected = None;
        let pending = node.pending.take();
        let parent = node.parent.take();
        let children = std::mem::take(&mut node.children);

        if let Some((_, timer)) = pending {
            scheduler.cancel(timer);
        }
        for child in children {
            if let Some(child) = self.get_mut(child) {
                child.parent = None;
            }
        }
        if let Some(parent) = parent {
            if let Some(parent) = self.get_mut(parent) {
                parent.children.retain(|c| *c != id);
            }
        }
        self.clear_chain(parent, id);
        self.free.push(id.index);
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: SelectionId) -> Option<SelectionId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: SelectionId) -> &[SelectionId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Add `child` under `parent`, taking it away from any previous parent
    pub fn add_child(&mut self, parent: SelectionId, child: SelectionId) {
        if self.get(parent).is_none() || self.get(child).is_none() || parent == child {
            return;
        }
        if let Some(previous) = self.parent(child) {
            if previous == parent {
                return;
            }
            if let Some(previous) = self.get_mut(previous) {
                previous.children.retain(|c| *c != child);
            }
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Replace a node's child list
    ///
    /// Added children are re-parented; removed children keep existing but
    /// lose their parent pointer.
    pub fn set_children(&mut self, id: SelectionId, children: &[SelectionId]) {
        if self.get(id).is_none() {
            return;
        }
        let removed: Vec<SelectionId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|c| !children.contains(c))
            .collect();
        for child in removed {
            if let Some(node) = self.get_mut(child) {
                node.parent = None;
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.children.clear();
        }
        for child in children {
            self.add_child(id, *child);
        }
        let alive: Vec<SelectionId> = children.iter().copied().filter(|c| self.get(*c).is_some()).collect();
        if let Some(node) = self.get_mut(id) {
            node.children = alive;
        }
    }

    /// Mark `id` and all of its ancestors as pointing at `id`
    pub fn select(&mut self, id: SelectionId, scheduler: &mut Scheduler) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if let Some((_, timer)) = node.pending.take() {
            scheduler.cancel(timer);
        }
        node.selected = Some(id);

        let mut next = node.parent;
        while let Some(ancestor) = next.and_then(|p| self.get_mut(p)) {
            ancestor.selected = Some(id);
            next = ancestor.parent;
        }
    }

    /// Schedule clearing `id` after `delay`
    pub fn deselect(&mut self, id: SelectionId, scheduler: &mut Scheduler, delay: Duration) -> Option<DeselectToken> {
        self.next_token += 1;
        let token = DeselectToken(self.next_token);
        let node = self.get_mut(id)?;
        if let Some((_, timer)) = node.pending.take() {
            scheduler.cancel(timer);
        }
        let timer = scheduler.schedule(delay, Task::ResolveDeselect { node: id, token });
        if let Some(node) = self.get_mut(id) {
            node.pending = Some((token, timer));
        }
        Some(token)
    }

    /// Apply a deselect whose timer fired. Stale tokens are ignored.
    pub fn resolve_deselect(&mut self, id: SelectionId, token: DeselectToken) -> bool {
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        if node.pending.map(|(current, _)| current) != Some(token) {
            return false;
        }
        node.pending = None;
        if node.selected == Some(id) {
            node.selected = None;
        }
        let parent = node.parent;
        self.clear_chain(parent, id);
        true
    }

    fn clear_chain(&mut self, mut next: Option<SelectionId>, target: SelectionId) {
        while let Some(ancestor) = next.and_then(|p| self.get_mut(p)) {
            if ancestor.selected != Some(target) {
                break;
            }
            ancestor.selected = None;
            next = ancestor.parent;
        }
    }

    /// The node this one points at (itself or a descendant)
    pub fn selected(&self, id: SelectionId) -> Option<SelectionId> {
        self.get(id).and_then(|n| n.selected)
    }

    pub fn is_selected(&self, id: SelectionId) -> bool {
        self.selected(id).is_some()
    }

    pub fn has_pending_deselect(&self, id: SelectionId) -> bool {
        self.get(id).map(|n| n.pending.is_some()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    fn chain() -> (SelectionTree, Scheduler, [SelectionId; 3]) {
        let mut tree = SelectionTree::new();
        let grid = tree.create(None);
        let row = tree.create(Some(grid));
        let column = tree.create(Some(row));
        (tree, Scheduler::new(), [grid, row, column])
    }

    fn run(tree: &mut SelectionTree, scheduler: &mut Scheduler, until: Duration) {
        while let Some((_, task)) = scheduler.pop_due(until) {
            if let Task::ResolveDeselect { node, token } = task {
                tree.resolve_deselect(node, token);
            }
        }
    }

    #[test]
    fn test_select_marks_ancestors() {
        let (mut tree, mut scheduler, [grid, row, column]) = chain();
        tree.select(column, &mut scheduler);
        assert_eq!(tree.selected(grid), Some(column));
        assert_eq!(tree.selected(row), Some(column));
        assert_eq!(tree.selected(column), Some(column));

        // Idempotent
        tree.select(column, &mut scheduler);
        assert_eq!(tree.selected(grid), Some(column));
    }

    #[test]
    fn test_deselect_clears_chain_after_delay() {
        let (mut tree, mut scheduler, [grid, row, column]) = chain();
        tree.select(column, &mut scheduler);
        tree.deselect(column, &mut scheduler, DELAY);

        run(&mut tree, &mut scheduler, Duration::from_millis(99));
        assert!(tree.is_selected(column));

        run(&mut tree, &mut scheduler, DELAY);
        assert!(!tree.is_selected(grid));
        assert!(!tree.is_selected(row));
        assert!(!tree.is_selected(column));
    }

    #[test]
    fn test_select_during_delay_cancels_deselect() {
        let (mut tree, mut scheduler, [grid, _, column]) = chain();
        tree.select(column, &mut scheduler);
        tree.deselect(column, &mut scheduler, DELAY);
        tree.select(column, &mut scheduler);

        run(&mut tree, &mut scheduler, DELAY * 2);
        assert!(tree.is_selected(column));
        assert!(tree.is_selected(grid));
    }

    #[test]
    fn test_focus_hop_to_sibling_keeps_parent() {
        let (mut tree, mut scheduler, [grid, row, column]) = chain();
        let sibling = tree.create(Some(row));
        tree.select(column, &mut scheduler);
        tree.deselect(column, &mut scheduler, DELAY);
        tree.select(sibling, &mut scheduler);

        run(&mut tree, &mut scheduler, DELAY);
        assert!(!tree.is_selected(column));
        assert_eq!(tree.selected(row), Some(sibling));
        assert_eq!(tree.selected(grid), Some(sibling));
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let (mut tree, mut scheduler, [_, _, column]) = chain();
        tree.select(column, &mut scheduler);
        let first = tree.deselect(column, &mut scheduler, DELAY).unwrap();
        let second = tree.deselect(column, &mut scheduler, DELAY).unwrap();

        assert!(!tree.resolve_deselect(column, first));
        assert!(tree.is_selected(column));
        assert!(tree.resolve_deselect(column, second));
        assert!(!tree.is_selected(column));
    }

    #[test]
    fn test_set_children_reparents() {
        let (mut tree, _, [grid, row, column]) = chain();
        let other = tree.create(None);
        tree.set_children(row, &[other]);

        assert_eq!(tree.parent(column), None);
        assert_eq!(tree.parent(other), Some(row));
        assert_eq!(tree.children(row), &[other]);
        assert_eq!(tree.children(grid), &[row]);
    }

    #[test]
    fn test_remove_clears_ancestors() {
        let (mut tree, mut scheduler, [grid, row, column]) = chain();
        tree.select(column, &mut scheduler);
        tree.deselect(column, &mut scheduler, DELAY);
        tree.remove(column, &mut scheduler);

        assert!(!tree.is_selected(row));
        assert!(!tree.is_selected(grid));
        assert!(tree.children(row).is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let (mut tree, mut scheduler, [grid, row, column]) = chain();
        tree.remove(column, &mut scheduler);
        assert_eq!(tree.len(), 2);

        let replacement = tree.create(Some(row));
        assert_ne!(replacement, column);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.len(), 3);

        // The stale id does not reach the node that took its slot
        tree.select(column, &mut scheduler);
        assert!(!tree.is_selected(replacement));
        assert!(!tree.is_selected(grid));
        tree.remove(column, &mut scheduler);
        assert_eq!(tree.children(row), &[replacement]);

        tree.select(replacement, &mut scheduler);
        assert_eq!(tree.selected(grid), Some(replacement));
    }
}
