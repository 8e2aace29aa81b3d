use serde::Serialize;

use crate::analysis::Analysis;
use crate::graph::node::SymbolKind;

/// Aggregated module statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub module: String,
    pub classes: usize,
    /// Subset of `classes`.
    pub exception_classes: usize,
    /// Module-level functions.
    pub functions: usize,
    pub methods: usize,
    pub constants: usize,
    /// Imported names and bound modules.
    pub foreign_names: usize,
    pub others: usize,
    pub degraded: usize,
    pub edges: usize,
    pub imports: usize,
    pub source_available: bool,
    /// Why the graph is empty, when source is unavailable.
    pub source_error: Option<String>,
}

impl Analysis {
    /// Counts per symbol category plus graph size.
    pub fn summary(&self) -> ModuleSummary {
        let table = self.table();
        let functions = table.by_kind(SymbolKind::Function);
        let methods = functions.iter().filter(|d| d.is_method()).count();

        ModuleSummary {
            module: self.identity().to_owned(),
            classes: table.by_kind(SymbolKind::Class).len(),
            exception_classes: self.exception_classes().len(),
            functions: functions.len() - methods,
            methods,
            constants: table.by_kind(SymbolKind::Constant).len(),
            foreign_names: table.foreign().len(),
            others: table.others().len(),
            degraded: table.degraded().count(),
            edges: self.graph().edge_count(),
            imports: self.imports().len(),
            source_available: self.source_available(),
            source_error: self.parse_error().map(|e| e.to_string()),
        }
    }
}
