pub mod json;
pub mod model;
pub mod text;

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::analysis::Analysis;
use crate::graph::node::is_private;

use model::{ExportFormat, ExportParams, ExportResult};

/// Render the whole analysis of a module as a report.
///
/// Steps:
/// 1. Collect the listed symbols (public only unless `include_private`).
/// 2. Take the full edge list in export order, dropping edges that touch hidden symbols.
/// 3. Record a warning when source was unavailable.
/// 4. Dispatch to the renderer for the requested format.
pub fn export_module(analysis: &Analysis, params: &ExportParams) -> anyhow::Result<ExportResult> {
    let symbols = analysis.symbols(None, params.include_private);
    let edges: Vec<_> = analysis
        .full_export()
        .into_iter()
        .filter(|e| params.include_private || !(is_private(&e.from) || is_private(&e.to)))
        .collect();

    let mut warnings = Vec::new();
    if let Some(err) = analysis.parse_error() {
        let msg = format!("{err}; the export contains no connections");
        log::warn!("{msg}");
        warnings.push(msg);
    }

    let content = match params.format {
        ExportFormat::Text => text::render_text(analysis, &symbols, &edges),
        ExportFormat::Json => json::render_json(analysis, &symbols, &edges)?,
    };

    Ok(ExportResult {
        content,
        symbol_count: symbols.len(),
        edge_count: edges.len(),
        warnings,
    })
}

/// `<identity>_analysis.<ext>` in the working directory.
pub fn default_export_path(identity: &str, format: ExportFormat) -> PathBuf {
    PathBuf::from(format!(
        "{}_analysis.{}",
        identity.replace(['/', '\\'], "_"),
        format.extension()
    ))
}

/// Write an export result to `path`, replacing any existing file.
pub fn write_export(result: &ExportResult, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, &result.content)
        .with_context(|| format!("failed to write export to {}", path.display()))?;
    log::info!(
        "exported {} symbols and {} edges to {}",
        result.symbol_count,
        result.edge_count,
        path.display()
    );
    Ok(())
}
