use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use trellis_editor::{EditorConfig, HostEvent, Session};

fn page_markup(grids: usize) -> String {
    let mut out = String::new();
    for g in 0..grids {
        out.push_str(&format!(r#"<div class="trellis-grid" data-block-id="g{}" data-block-version="3">"#, g));
        for r in 0..4 {
            out.push_str(r#"<div class="trellis-row">"#);
            for c in 0..3 {
                out.push_str(&format!(
                    r#"<div class="trellis-col col-4"><div class="trellis-col-content"><p>Cell {}.{}.{}</p></div></div>"#,
                    g, r, c
                ));
            }
            out.push_str("</div>");
        }
        out.push_str("</div>");
        out.push_str(&format!(
            r#"<div class="trellis-block" data-block-type="button"><div class="trellis-state" hidden>{{"label":"Go {}"}}</div></div>"#,
            g
        ));
    }
    out
}

fn load_page(c: &mut Criterion) {
    let markup = page_markup(20);
    c.bench_function("load_page", |b| {
        b.iter(|| Session::load(black_box(&markup), EditorConfig::default()))
    });
}

fn check_elements_clean(c: &mut Criterion) {
    let mut session = Session::load(&page_markup(20), EditorConfig::default()).unwrap();
    c.bench_function("check_elements_clean", |b| b.iter(|| session.check_elements()));
}

fn tick_after_move(c: &mut Criterion) {
    let markup = page_markup(20);
    c.bench_function("tick_after_move", |b| {
        b.iter_batched(
            || {
                let mut session = Session::load(&markup, EditorConfig::default()).unwrap();
                let doc = session.document_mut();
                let body = doc.root();
                let grid = doc.children(body)[0];
                let row = doc.children(grid)[0];
                let column = doc.children(row)[1];
                doc.append_child(body, column).unwrap();
                session
            },
            |mut session| session.dispatch(HostEvent::NodeChange),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, load_page, check_elements_clean, tick_after_move);
criterion_main!(benches);
