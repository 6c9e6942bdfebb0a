use super::{display_name, load_session, read_source};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use trellis_editor::{Block, EditorConfig, Grid, Session};

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Markup file to inspect
    pub file: PathBuf,

    /// Print a JSON listing instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BlockSummary {
    pub kind: &'static str,
    pub id: String,
    pub depth: usize,
    /// Column widths per row, e.g. `["6/6/6/6", "6/6/6/6"]`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<String>>,
}

pub(crate) fn summarize(session: &Session) -> Vec<BlockSummary> {
    let doc = session.document();
    session
        .blocks()
        .map(|block| {
            let rows = session
                .block_as::<Grid>(block.id().as_str())
                .map(|grid| {
                    grid.rows()
                        .iter()
                        .map(|row| row.layout().columns().iter().map(|w| w.to_string()).collect())
                        .collect()
                })
                .unwrap_or_default();
            BlockSummary {
                kind: block.kind(),
                id: block.id().to_string(),
                depth: doc.depth(block.root()).unwrap_or(0),
                rows,
            }
        })
        .collect()
}

pub fn inspect(args: InspectArgs, config: EditorConfig) -> Result<()> {
    let source = read_source(&args.file)?;
    let filename = display_name(&args.file);
    let (session, report) = load_session(&source, &filename, config)?;
    let blocks = summarize(&session);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    println!("{} {}", "🔍 Inspecting".bright_blue().bold(), filename);
    if blocks.is_empty() {
        println!("{}", "⚠️  No blocks found".yellow());
        return Ok(());
    }

    for block in &blocks {
        let indent = "  ".repeat(block.depth.max(1));
        println!("{}{} {}", indent, block.kind.green(), block.id.dimmed());
        for (index, row) in block.rows.iter().enumerate() {
            println!("{}  row {}: {}", indent, index, row.join(" | "));
        }
    }

    println!();
    println!("Found {} blocks", blocks.len());
    if report.failed > 0 {
        println!("{} {} blocks failed to import", "⚠️".yellow(), report.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_lists_grid_rows() {
        let source = concat!(
            r#"<div class="trellis-grid" data-block-id="g" data-block-version="3"><div class="trellis-row">"#,
            r#"<div class="trellis-col col-6"><div class="trellis-col-content"></div></div>"#,
            r#"<div class="trellis-col col-6"><div class="trellis-col-content"></div></div>"#,
            r#"</div></div>"#,
            r#"<div class="trellis-block" data-block-type="icon" data-block-id="i"></div>"#
        );
        let (session, report) = load_session(source, "page.html", EditorConfig::default()).unwrap();
        assert_eq!(report.imported, 2);

        let blocks = summarize(&session);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, "grid");
        assert_eq!(blocks[0].rows, vec![vec!["6/6/6/6".to_string(), "6/6/6/6".to_string()]]);
        assert_eq!(blocks[1].kind, "icon");
        assert_eq!(blocks[1].id, "i");
        assert!(blocks[1].rows.is_empty());
    }

    #[test]
    fn test_invalid_markup_is_rejected() {
        let result = load_session("<div><p>open</div>", "broken.html", EditorConfig::default());
        assert!(result.is_err());
    }
}
