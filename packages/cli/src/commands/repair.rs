use super::{display_name, load_session, read_source};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use trellis_editor::{EditorConfig, ReconcileReport};

#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Markup file to repair
    pub file: PathBuf,

    /// Write the repaired markup here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a JSON summary instead of the markup
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepairSummary {
    pub blocks: usize,
    pub changed: bool,
    pub report: ReconcileReport,
}

/// Import and fully reconcile `source`, returning the repaired markup
pub(crate) fn repair_source(source: &str, filename: &str, config: EditorConfig) -> Result<(String, RepairSummary)> {
    let (mut session, mut report) = load_session(source, filename, config)?;
    let before = session.markup();
    report += session.check_elements();
    let markup = session.markup();
    let summary = RepairSummary {
        blocks: session.blocks().count(),
        changed: markup != source,
        report,
    };
    tracing::debug!(changed_by_reconcile = markup != before, "repair finished");
    session.close();
    Ok((markup, summary))
}

pub fn repair(args: RepairArgs, config: EditorConfig) -> Result<()> {
    let source = read_source(&args.file)?;
    let filename = display_name(&args.file);
    let (markup, summary) = repair_source(&source, &filename, config)?;

    if let Some(output) = &args.output {
        fs::write(output, &markup)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if args.output.is_none() {
        println!("{}", markup);
    }

    if args.output.is_some() && !args.json {
        let status = if summary.changed { "Repaired" } else { "Unchanged" };
        println!(
            "{} {} {} ({} blocks)",
            "✓".green(),
            status.bold(),
            filename,
            summary.blocks
        );
        if summary.report.failed > 0 {
            println!("{} {} blocks could not be repaired", "⚠️".yellow(), summary.report.failed);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_legacy_grid() {
        let source = r#"<div class="trellis-grid"><div class="row"><div class="column span-12">text</div></div></div>"#;
        let (markup, summary) = repair_source(source, "legacy.html", EditorConfig::default()).unwrap();

        assert!(summary.changed);
        assert_eq!(summary.blocks, 1);
        assert_eq!(summary.report.imported, 1);
        assert!(markup.contains(r#"data-block-version="3""#));
        assert!(markup.contains("trellis-col-content"));
        assert!(!markup.contains("span-12"));
    }

    #[test]
    fn test_repair_is_stable() {
        let source = r#"<div class="trellis-block" data-block-type="button"></div>"#;
        let (first, _) = repair_source(source, "a.html", EditorConfig::default()).unwrap();
        let (second, summary) = repair_source(&first, "a.html", EditorConfig::default()).unwrap();

        assert_eq!(first, second);
        assert!(!summary.changed);
    }
}
