//! # Element Binder
//!
//! Binds a block object to one root node in the document.
//!
//! ## Bindings
//!
//! Attribute bindings are value cells keyed by logical name. A plain name
//! (`title`) binds an attribute on the root; `<sub>/<attr>` binds an
//! attribute on a watched sub-node registered under `<sub>`. The identifier
//! attribute, `class` and `style` are always bound.
//!
//! ## Observation
//!
//! The binder keeps the last snapshot of the root and of every watched
//! sub-node. [`Binder::observe`] diffs the live nodes against those
//! snapshots and reports what the owning block has to re-check. Writes made
//! by the binder or its block are bracketed by [`Binder::stop_observing`] /
//! [`Binder::start_observing`]; snapshots are re-taken when the suspension
//! counter returns to zero, so the binder never observes its own writes.

use crate::context::Context;
use crate::errors::EditorResult;
use crate::identity::ElementId;
use crate::selection::SelectionId;
use std::collections::BTreeMap;
use tracing::{debug, trace};
use trellis_document::{Changeset, Document, NodeId, NodeSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unattached,
    Live,
    Migrating,
    Deleted,
}

#[derive(Debug)]
struct WatchedNode {
    node: NodeId,
    snapshot: Option<NodeSnapshot>,
}

/// What an observation pass found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observed {
    pub check_self: bool,
    pub check_children: bool,
    /// Bindings whose value changed externally
    pub changed: Vec<String>,
}

impl Observed {
    pub fn any(&self) -> bool {
        self.check_self || self.check_children
    }
}

#[derive(Debug)]
pub struct Binder {
    id: ElementId,
    id_attribute: String,
    root: NodeId,
    selection: SelectionId,
    root_snapshot: Option<NodeSnapshot>,
    watched: BTreeMap<String, WatchedNode>,
    bindings: BTreeMap<String, Option<String>>,
    default_classes: Vec<String>,
    default_style: BTreeMap<String, String>,
    suspended: u32,
    lifecycle: Lifecycle,
}

impl Binder {
    /// Bind `root`, recovering the identifier from its attribute when it is
    /// not already held by another block. Observation is not started.
    pub fn new(ctx: &mut Context<'_>, root: NodeId, parent: Option<SelectionId>) -> Self {
        let id_attribute = ctx.config.id_attribute.clone();
        let claim = ctx.ids.claim(ctx.doc.attribute(root, &id_attribute));
        if claim.fresh {
            debug!(block_id = %claim.id, node = %root, "assigned fresh block id");
        }

        let bindings = [id_attribute.clone(), "class".to_string(), "style".to_string()]
            .into_iter()
            .map(|key| (key, None))
            .collect();

        Self {
            id: claim.id,
            id_attribute,
            root,
            selection: ctx.selection.create(parent),
            root_snapshot: None,
            watched: BTreeMap::new(),
            bindings,
            default_classes: Vec::new(),
            default_style: BTreeMap::new(),
            suspended: 0,
            lifecycle: Lifecycle::Unattached,
        }
    }

    pub fn with_classes(mut self, classes: &[&str]) -> Self {
        self.default_classes.extend(classes.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_style(mut self, property: &str, value: &str) -> Self {
        self.default_style.insert(property.to_string(), value.to_string());
        self
    }

    pub fn with_binding(mut self, key: &str) -> Self {
        self.bindings.entry(key.to_string()).or_insert(None);
        self
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn selection(&self) -> SelectionId {
        self.selection
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        if self.lifecycle != Lifecycle::Deleted {
            self.lifecycle = lifecycle;
        }
    }

    pub fn is_observing(&self) -> bool {
        self.suspended == 0 && self.lifecycle == Lifecycle::Live
    }

    pub fn default_classes(&self) -> &[String] {
        &self.default_classes
    }

    // ---------------------------------------------------------------------
    // Watched sub-nodes
    // ---------------------------------------------------------------------

    /// Watch `node` under a logical name, replacing any previous node
    pub fn watch(&mut self, doc: &Document, name: &str, node: NodeId) {
        let snapshot = (self.suspended == 0).then(|| NodeSnapshot::capture(doc, node));
        self.watched.insert(name.to_string(), WatchedNode { node, snapshot });
        let prefix = format!("{}/", name);
        let keys: Vec<String> = self.bindings.keys().filter(|k| k.starts_with(&prefix)).cloned().collect();
        for key in keys {
            let value = doc.attribute(node, &key[prefix.len()..]).map(str::to_string);
            self.bindings.insert(key, value);
        }
    }

    /// Relocate a watched sub-node whose identity changed
    pub fn rebind(&mut self, doc: &Document, name: &str, node: NodeId) {
        if self.watched_node(name) != Some(node) {
            trace!(block_id = %self.id, name, node = %node, "rebinding watched node");
            self.watch(doc, name, node);
        }
    }

    pub fn watched_node(&self, name: &str) -> Option<NodeId> {
        self.watched.get(name).map(|w| w.node)
    }

    // ---------------------------------------------------------------------
    // Bindings
    // ---------------------------------------------------------------------

    fn resolve<'k>(&self, key: &'k str) -> Option<(NodeId, &'k str)> {
        match key.split_once('/') {
            Some((sub, attr)) => self.watched_node(sub).map(|node| (node, attr)),
            None => Some((self.root, key)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.bindings.get(key).and_then(|v| v.as_deref())
    }

    /// Write a bound value through to the document
    pub fn set(&mut self, doc: &mut Document, key: &str, value: Option<&str>) -> EditorResult<bool> {
        self.bindings.insert(key.to_string(), value.map(str::to_string));
        let Some((node, attr)) = self.resolve(key) else {
            return Ok(false);
        };
        self.stop_observing();
        let result = doc.write_attribute(node, attr, value);
        self.start_observing(doc);
        Ok(result?)
    }

    fn pull(&mut self, doc: &Document) {
        let keys: Vec<String> = self.bindings.keys().cloned().collect();
        for key in keys {
            let value = self
                .resolve(&key)
                .and_then(|(node, attr)| doc.attribute(node, attr))
                .map(str::to_string);
            self.bindings.insert(key, value);
        }
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Write the identifier and defaults, take snapshots and go live
    pub fn setup_observer(&mut self, ctx: &mut Context<'_>) -> EditorResult<()> {
        self.stop_observing();
        let result = self.apply_defaults(ctx.doc);
        if self.lifecycle != Lifecycle::Deleted {
            self.lifecycle = Lifecycle::Live;
        }
        self.start_observing(ctx.doc);
        result
    }

    fn apply_defaults(&mut self, doc: &mut Document) -> EditorResult<()> {
        doc.set_attribute(self.root, &self.id_attribute, self.id.as_str())?;
        for class in &self.default_classes {
            doc.add_class(self.root, class)?;
        }
        for (property, value) in &self.default_style {
            if !doc.style(self.root).contains_key(property) {
                doc.set_style_property(self.root, property, Some(value))?;
            }
        }
        self.pull(doc);
        Ok(())
    }

    /// Swap a family of default classes, e.g. width classes
    pub fn replace_classes(
        &mut self,
        doc: &mut Document,
        family: impl Fn(&str) -> bool,
        classes: &[String],
    ) -> EditorResult<()> {
        self.default_classes.retain(|c| !family(c));
        self.default_classes.extend(classes.iter().cloned());

        self.stop_observing();
        let stale: Vec<String> = doc
            .classes(self.root)
            .into_iter()
            .filter(|c| family(c) && !classes.iter().any(|n| n == c))
            .map(str::to_string)
            .collect();
        let result = stale
            .iter()
            .try_for_each(|c| doc.remove_class(self.root, c).map(|_| ()))
            .and_then(|_| classes.iter().try_for_each(|c| doc.add_class(self.root, c).map(|_| ())));
        self.pull(doc);
        self.start_observing(doc);
        Ok(result?)
    }

    pub fn stop_observing(&mut self) {
        self.suspended += 1;
    }

    pub fn start_observing(&mut self, doc: &Document) {
        self.suspended = self.suspended.saturating_sub(1);
        if self.suspended == 0 && self.lifecycle != Lifecycle::Deleted {
            self.rebaseline(doc);
        }
    }

    fn rebaseline(&mut self, doc: &Document) {
        self.root_snapshot = Some(NodeSnapshot::capture(doc, self.root));
        for watched in self.watched.values_mut() {
            watched.snapshot = Some(NodeSnapshot::capture(doc, watched.node));
        }
    }

    /// Diff the bound nodes against their snapshots
    pub fn observe(&mut self, ctx: &mut Context<'_>) -> EditorResult<Observed> {
        let mut observed = Observed::default();
        if !self.is_observing() {
            return Ok(observed);
        }

        let mut changesets: Vec<(Option<String>, Changeset)> = Vec::new();
        if let Some(snapshot) = &self.root_snapshot {
            changesets.push((None, snapshot.changes(ctx.doc)));
        }
        for (name, watched) in &self.watched {
            if let Some(snapshot) = &watched.snapshot {
                changesets.push((Some(name.clone()), snapshot.changes(ctx.doc)));
            }
        }

        let mut restyle = false;
        for (scope, changes) in changesets.iter().filter(|(_, c)| !c.is_empty()) {
            restyle |= self.consume(&*ctx, scope.as_deref(), changes, &mut observed);
        }

        if restyle {
            // Identifier, class and style are resynced wholesale
            self.stop_observing();
            let result = self.apply_defaults(ctx.doc);
            self.start_observing(ctx.doc);
            result?;
        } else {
            self.rebaseline(ctx.doc);
        }

        if observed.any() {
            debug!(
                block_id = %self.id,
                check_self = observed.check_self,
                check_children = observed.check_children,
                changed = ?observed.changed,
                "observed external changes"
            );
        }
        Ok(observed)
    }

    /// Fold one changeset into `observed`. Returns whether the identifier,
    /// class or style changed on the root.
    fn consume(&mut self, ctx: &Context<'_>, scope: Option<&str>, changes: &Changeset, observed: &mut Observed) -> bool {
        let mut restyle = false;

        if changes.connection.is_some() || changes.moved {
            match scope {
                None => observed.check_self = true,
                Some(_) => observed.check_children = true,
            }
        }

        for change in &changes.attributes {
            let key = match scope {
                Some(sub) => format!("{}/{}", sub, change.name),
                None => change.name.clone(),
            };
            if scope.is_none() && (change.name == "class" || change.name == "style" || change.name == self.id_attribute) {
                restyle = true;
            }
            if let Some(cell) = self.bindings.get_mut(&key) {
                *cell = change.new.clone();
                observed.changed.push(key);
            }
            observed.check_self = true;
        }

        if changes.has_child_changes() || changes.text_changed {
            observed.check_children = true;
            let non_trivial = changes.reordered
                || changes
                    .added
                    .iter()
                    .chain(changes.removed.iter())
                    .any(|node| !ctx.is_trivial(*node));
            if non_trivial {
                observed.check_self = true;
            }
        }

        restyle
    }

    /// Stop tracking without touching the document
    pub fn teardown(&mut self, ctx: &mut Context<'_>) {
        if self.lifecycle == Lifecycle::Deleted {
            return;
        }
        debug!(block_id = %self.id, "tearing down block");
        self.lifecycle = Lifecycle::Deleted;
        self.suspended += 1;
        ctx.selection.remove(self.selection, ctx.scheduler);
        ctx.ids.release(&self.id);
    }

    /// Stop tracking and remove the root node
    pub fn delete(&mut self, ctx: &mut Context<'_>) {
        self.teardown(ctx);
        ctx.doc.detach(self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    fn bound(harness: &mut Harness, markup: &str) -> Binder {
        let root = harness.append(markup);
        let mut ctx = harness.context();
        let mut binder = Binder::new(&mut ctx, root, None)
            .with_classes(&["widget"])
            .with_style("display", "block")
            .with_binding("title");
        binder.setup_observer(&mut ctx).unwrap();
        binder
    }

    #[test]
    fn test_setup_writes_id_and_defaults() {
        let mut harness = Harness::new();
        let binder = bound(&mut harness, r#"<div title="t"></div>"#);
        let doc = &harness.doc;

        assert_eq!(doc.attribute(binder.root(), "data-block-id"), Some("test-1"));
        assert_eq!(doc.classes(binder.root()), vec!["widget"]);
        assert_eq!(doc.attribute(binder.root(), "style"), Some("display: block;"));
        assert_eq!(binder.get("title"), Some("t"));
        assert_eq!(binder.lifecycle(), Lifecycle::Live);
    }

    #[test]
    fn test_recovers_existing_id() {
        let mut harness = Harness::new();
        let binder = bound(&mut harness, r#"<div data-block-id="saved"></div>"#);
        assert_eq!(binder.id().as_str(), "saved");
    }

    #[test]
    fn test_own_writes_are_not_observed() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, "<div></div>");
        binder.set(&mut harness.doc, "title", Some("mine")).unwrap();

        let mut ctx = harness.context();
        assert_eq!(binder.observe(&mut ctx).unwrap(), Observed::default());
    }

    #[test]
    fn test_external_attribute_updates_cell() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, "<div></div>");
        harness.doc.set_attribute(binder.root(), "title", "theirs").unwrap();

        let mut ctx = harness.context();
        let observed = binder.observe(&mut ctx).unwrap();
        assert!(observed.check_self);
        assert_eq!(observed.changed, vec!["title".to_string()]);
        assert_eq!(binder.get("title"), Some("theirs"));
    }

    #[test]
    fn test_class_change_restores_defaults() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, "<div></div>");
        harness.doc.set_attribute(binder.root(), "class", "other").unwrap();

        let mut ctx = harness.context();
        binder.observe(&mut ctx).unwrap();
        assert_eq!(harness.doc.classes(binder.root()), vec!["other", "widget"]);
        assert_eq!(binder.get("class"), Some("other widget"));

        // The resync itself is not observed
        let mut ctx = harness.context();
        assert!(!binder.observe(&mut ctx).unwrap().any());
    }

    #[test]
    fn test_id_attribute_is_restored() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, r#"<div data-block-id="btn"></div>"#);
        let root = binder.root();

        harness.doc.remove_attribute(root, "data-block-id").unwrap();
        let mut ctx = harness.context();
        assert!(binder.observe(&mut ctx).unwrap().check_self);
        assert_eq!(harness.doc.attribute(root, "data-block-id"), Some("btn"));
        assert_eq!(binder.get("data-block-id"), Some("btn"));

        harness.doc.set_attribute(root, "data-block-id", "other").unwrap();
        let mut ctx = harness.context();
        binder.observe(&mut ctx).unwrap();
        assert_eq!(harness.doc.attribute(root, "data-block-id"), Some("btn"));
        assert_eq!(binder.id().as_str(), "btn");

        let mut ctx = harness.context();
        assert!(!binder.observe(&mut ctx).unwrap().any());
    }

    #[test]
    fn test_trivial_children_only_check_children() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, "<div></div>");
        let space = harness.doc.create_text("  ");
        harness.doc.append_child(binder.root(), space).unwrap();

        let mut ctx = harness.context();
        let observed = binder.observe(&mut ctx).unwrap();
        assert!(observed.check_children);
        assert!(!observed.check_self);
    }

    #[test]
    fn test_detach_triggers_check_self() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, "<div></div>");
        harness.doc.detach(binder.root());

        let mut ctx = harness.context();
        assert!(binder.observe(&mut ctx).unwrap().check_self);
    }

    #[test]
    fn test_nested_suspension() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, "<div></div>");
        binder.stop_observing();
        binder.stop_observing();
        binder.start_observing(&harness.doc);
        assert!(!binder.is_observing());
        binder.start_observing(&harness.doc);
        assert!(binder.is_observing());
    }

    #[test]
    fn test_sub_node_bindings() {
        let mut harness = Harness::new();
        let root = harness.append(r#"<div><a href="/a"></a></div>"#);
        let link = harness.doc.children(root)[0];
        let mut ctx = harness.context();
        let mut binder = Binder::new(&mut ctx, root, None).with_binding("link/href");
        binder.watch(ctx.doc, "link", link);
        binder.setup_observer(&mut ctx).unwrap();
        assert_eq!(binder.get("link/href"), Some("/a"));

        harness.doc.set_attribute(link, "href", "/b").unwrap();
        let mut ctx = harness.context();
        let observed = binder.observe(&mut ctx).unwrap();
        assert_eq!(observed.changed, vec!["link/href".to_string()]);

        binder.set(&mut harness.doc, "link/href", Some("/c")).unwrap();
        assert_eq!(harness.doc.attribute(link, "href"), Some("/c"));
    }

    #[test]
    fn test_delete_removes_root_and_stops() {
        let mut harness = Harness::new();
        let mut binder = bound(&mut harness, "<div></div>");
        let mut ctx = harness.context();
        binder.delete(&mut ctx);

        assert!(!harness.doc.is_connected(binder.root()));
        assert_eq!(binder.lifecycle(), Lifecycle::Deleted);
        assert!(!harness.ids.is_claimed("test-1"));
    }
}
