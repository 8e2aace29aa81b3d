use serde::Serialize;

use crate::analysis::{Analysis, AnalysisOptions};
use crate::error::LoadError;
use crate::graph::node::SymbolKind;
use crate::loader::{ModuleEntry, ModuleLoader};

/// Public symbol counts of one submodule of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmoduleSummary {
    pub name: String,
    pub identity: String,
    /// What `load` takes to drill into this submodule.
    pub load_name: String,
    pub is_package: bool,
    /// First docstring line.
    pub description: Option<String>,
    pub classes: usize,
    /// Module-level functions only.
    pub functions: usize,
    pub constants: usize,
    /// Why the submodule could not be analysed; counts are zero then.
    pub error: Option<String>,
}

impl SubmoduleSummary {
    fn failed(entry: ModuleEntry, err: &LoadError) -> Self {
        Self {
            name: entry.name,
            identity: entry.identity,
            load_name: entry.load_name,
            is_package: entry.is_package,
            description: None,
            classes: 0,
            functions: 0,
            constants: 0,
            error: Some(err.to_string()),
        }
    }
}

fn summarize(entry: ModuleEntry, analysis: &Analysis) -> SubmoduleSummary {
    let public = |kind| analysis.symbols(Some(kind), false);
    SubmoduleSummary {
        description: analysis
            .info()
            .doc
            .as_deref()
            .and_then(|d| d.lines().next())
            .map(str::to_owned),
        classes: public(SymbolKind::Class).len(),
        functions: public(SymbolKind::Function)
            .iter()
            .filter(|d| !d.is_method())
            .count(),
        constants: public(SymbolKind::Constant).len(),
        name: entry.name,
        identity: entry.identity,
        load_name: entry.load_name,
        is_package: entry.is_package,
        error: None,
    }
}

/// Load every submodule of `package` and count its public classes, functions and
/// constants.
///
/// A submodule that fails to load is listed with its error instead of failing the
/// whole listing.
///
/// # Errors
/// The loader's [`LoadError`] when `package` itself cannot be located or is not a
/// package.
pub fn submodule_summaries<L: ModuleLoader>(
    loader: &L,
    package: &str,
    options: &AnalysisOptions,
) -> Result<Vec<SubmoduleSummary>, LoadError> {
    let entries = loader.submodules(package)?;
    Ok(entries
        .into_iter()
        .map(|entry| match loader.load(&entry.load_name) {
            Ok(loaded) => summarize(entry, &Analysis::build(loaded, options)),
            Err(err) => {
                log::warn!("skipping submodule '{}': {err}", entry.identity);
                SubmoduleSummary::failed(entry, &err)
            }
        })
        .collect())
}
