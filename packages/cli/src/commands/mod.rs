pub mod init;
pub mod inspect;
pub mod repair;

pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use repair::{repair, RepairArgs};

use anyhow::{anyhow, Result};
use std::path::Path;
use trellis_document::{format_markup_error, parse_markup};
use trellis_editor::{EditorConfig, HeadlessHost, ReconcileReport, Session, StaticRenderer};

/// Parse a markup source into a headless session and import its blocks
pub(crate) fn load_session(source: &str, filename: &str, config: EditorConfig) -> Result<(Session, ReconcileReport)> {
    let doc = parse_markup(source).map_err(|e| anyhow!("{}", format_markup_error(source, filename, &e)))?;
    let host = HeadlessHost::new(config.confirm_deletes);
    let mut session = Session::new(doc, config, host, StaticRenderer::new())?;
    let report = session.import_all();
    Ok((session, report))
}

pub(crate) fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
