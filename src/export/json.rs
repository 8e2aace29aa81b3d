use anyhow::Context;

use crate::analysis::Analysis;
use crate::graph::edge::ConnectionEdge;
use crate::graph::node::SymbolDescriptor;

/// Render the export as a single pretty-printed JSON document.
pub fn render_json(
    analysis: &Analysis,
    symbols: &[&SymbolDescriptor],
    edges: &[ConnectionEdge],
) -> anyhow::Result<String> {
    let inheritance = analysis.inheritance_tree(None).unwrap_or_default();
    let value = serde_json::json!({
        "module": analysis.info(),
        "source_available": analysis.source_available(),
        "source_error": analysis.parse_error().map(|e| e.to_string()),
        "symbols": symbols,
        "foreign": analysis.table().foreign(),
        "others": analysis.table().others(),
        "inheritance": inheritance,
        "edges": edges,
    });
    let mut content = serde_json::to_string_pretty(&value).context("failed to serialize the JSON export")?;
    content.push('\n');
    Ok(content)
}
