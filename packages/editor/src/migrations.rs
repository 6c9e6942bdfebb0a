//! Grid markup migrations
//!
//! Each migration upgrades a grid's markup by one version. Migrations are
//! ordered, check their version precondition and are idempotent, so running
//! them on markup that is already partly upgraded is harmless.

use crate::column::{COLUMN_CLASS, CONTENT_CLASS, LEGACY_COLUMN_CLASS};
use crate::errors::EditorResult;
use crate::row::{LEGACY_ROW_CLASS, ROW_CLASS};
use tracing::info;
use trellis_document::{Document, NodeId};

pub const CURRENT_VERSION: u32 = 3;

pub struct Migration {
    pub from: u32,
    pub name: &'static str,
    apply: fn(&mut Document, NodeId) -> EditorResult<()>,
}

impl Migration {
    pub fn to(&self) -> u32 {
        self.from + 1
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        name: "rename legacy classes and wrap column content",
        apply: rename_legacy_classes,
    },
    Migration {
        from: 2,
        name: "rewrite span classes as column widths",
        apply: rewrite_span_classes,
    },
];

/// Version recorded on a grid root. Unversioned grids are version 1.
pub fn recorded_version(doc: &Document, root: NodeId, attribute: &str) -> u32 {
    doc.attribute(root, attribute)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1)
}

/// Run every migration newer than `version`. Returns the resulting version.
pub fn migrate(doc: &mut Document, root: NodeId, version: u32) -> EditorResult<u32> {
    let mut version = version;
    for migration in MIGRATIONS {
        if version > migration.from {
            continue;
        }
        info!(node = %root, from = migration.from, to = migration.to(), migration = migration.name, "migrating grid markup");
        (migration.apply)(doc, root)?;
        version = migration.to();
    }
    Ok(version)
}

fn rows(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.child_elements(root)
        .into_iter()
        .filter(|n| doc.has_class(*n, ROW_CLASS) || doc.has_class(*n, LEGACY_ROW_CLASS))
        .collect()
}

fn columns(doc: &Document, row: NodeId) -> Vec<NodeId> {
    doc.child_elements(row)
        .into_iter()
        .filter(|n| doc.has_class(*n, COLUMN_CLASS) || doc.has_class(*n, LEGACY_COLUMN_CLASS))
        .collect()
}

/// v1 → v2: `row`/`column` become `trellis-row`/`trellis-col`, and column
/// children are wrapped in a content node
fn rename_legacy_classes(doc: &mut Document, root: NodeId) -> EditorResult<()> {
    for row in rows(doc, root) {
        if doc.remove_class(row, LEGACY_ROW_CLASS)? {
            doc.add_class(row, ROW_CLASS)?;
        }
        for column in columns(doc, row) {
            if doc.remove_class(column, LEGACY_COLUMN_CLASS)? {
                doc.add_class(column, COLUMN_CLASS)?;
            }
            let wrapped = doc
                .child_elements(column)
                .into_iter()
                .any(|c| doc.has_class(c, CONTENT_CLASS));
            if !wrapped {
                let content = doc.create_element_with_classes("div", &[CONTENT_CLASS]);
                doc.move_children(column, content)?;
                doc.append_child(column, content)?;
            }
        }
    }
    Ok(())
}

/// v2 → v3: `span-N` / `span-<bp>-N` become `col-N` / `col-<bp>-N`
fn rewrite_span_classes(doc: &mut Document, root: NodeId) -> EditorResult<()> {
    for row in rows(doc, root) {
        for column in columns(doc, row) {
            let legacy: Vec<String> = doc
                .classes(column)
                .into_iter()
                .filter(|c| c.starts_with("span-"))
                .map(str::to_string)
                .collect();
            for class in legacy {
                doc.remove_class(column, &class)?;
                doc.add_class(column, &format!("col-{}", &class["span-".len()..]))?;
            }
        }
    }
    Ok(())
}
