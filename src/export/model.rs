/// File format for an analysis export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Plain-text report (default): module info, symbols, inheritance tree, connections.
    #[default]
    Text,
    /// One JSON document with the same content, for tooling.
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}

/// Parameters controlling an export.
#[derive(Clone, Debug, Default)]
pub struct ExportParams {
    pub format: ExportFormat,
    /// List private symbols too. Edges are always exported in full.
    pub include_private: bool,
}

/// Result of an export.
pub struct ExportResult {
    /// The rendered report.
    pub content: String,
    /// Number of symbols listed in the report.
    pub symbol_count: usize,
    /// Number of edges in the report; always the full graph.
    pub edge_count: usize,
    /// Advisory warnings, already logged by `export_module`.
    pub warnings: Vec<String>,
}
