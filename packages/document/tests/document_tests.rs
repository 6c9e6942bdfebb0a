//! Parse, edit and serialize documents through the public API

use trellis_document::{parse_markup, Document, DocumentError, NodeSnapshot, Selector};

const GRID: &str = r#"<div class="trellis-grid" data-block-id="g1" data-block-version="3"><div class="trellis-row" data-block-id="r1"><div class="trellis-col col-6" data-block-id="c1"><div class="trellis-col-content"><p>Left</p></div></div><div class="trellis-col col-6" data-block-id="c2"><div class="trellis-col-content"><p><br></p></div></div></div></div>"#;

#[test]
fn test_markup_round_trip_is_stable() {
    let doc = parse_markup(GRID).unwrap();
    assert_eq!(doc.to_markup(), GRID);

    let reparsed = parse_markup(&doc.to_markup()).unwrap();
    assert_eq!(reparsed.to_markup(), GRID);
}

#[test]
fn test_query_columns_in_document_order() {
    let doc = parse_markup(GRID).unwrap();
    let columns: Selector = ".trellis-col[data-block-id]".parse().unwrap();
    let found = doc.query_all(&columns);

    let ids: Vec<_> = found
        .iter()
        .map(|n| doc.attribute(*n, "data-block-id").unwrap())
        .collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}

#[test]
fn test_column_blankness() {
    let doc = parse_markup(GRID).unwrap();
    let columns: Selector = ".trellis-col".parse().unwrap();
    let found = doc.query_all(&columns);
    assert!(!doc.is_blank(found[0]));
    assert!(doc.is_blank(found[1]));
}

#[test]
fn test_moving_a_column_shows_up_in_both_snapshots() {
    let mut doc = parse_markup(GRID).unwrap();
    let rows: Selector = ".trellis-row".parse().unwrap();
    let row = doc.query_all(&rows)[0];
    let columns = doc.child_elements(row);
    let row_snapshot = NodeSnapshot::capture(&doc, row);
    let column_snapshot = NodeSnapshot::capture(&doc, columns[0]);

    // Drag the first column out to the body
    let root = doc.root();
    doc.append_child(root, columns[0]).unwrap();

    let row_changes = row_snapshot.changes(&doc);
    assert_eq!(row_changes.removed, vec![columns[0]]);
    assert!(column_snapshot.changes(&doc).moved);
}

#[test]
fn test_operations_on_text_nodes_fail() {
    let mut doc = Document::new();
    let text = doc.create_text("x");
    let child = doc.create_element("p");

    assert_eq!(doc.set_attribute(text, "a", "b"), Err(DocumentError::NotAnElement(text)));
    assert_eq!(doc.append_child(text, child), Err(DocumentError::NotAnElement(text)));
    assert_eq!(doc.insert_after(child, text), Err(DocumentError::Orphan(child)));
}

#[test]
fn test_clone_subtree_is_detached_copy() {
    let mut doc = parse_markup(GRID).unwrap();
    let grid = doc.children(doc.root())[0];
    let copy = doc.clone_subtree(grid).unwrap();

    assert!(!doc.is_connected(copy));
    assert_eq!(trellis_document::to_markup(&doc, copy), GRID);
}

#[test]
fn test_document_serializes_to_json() {
    let doc = parse_markup(GRID).unwrap();
    let json = serde_json::to_string(&doc).unwrap();
    let restored: Document = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.to_markup(), GRID);
    assert_eq!(restored.version(), doc.version());
}
