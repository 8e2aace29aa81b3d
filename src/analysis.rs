use crate::error::ParseError;
use crate::graph::ConnectionGraph;
use crate::loader::{LoadedModule, ModuleInfo};
use crate::parser::imports::{ImportInfo, extract_imports};
use crate::parser::parse_source;
use crate::parser::references::extract_references;
use crate::resolver::{ResolveStats, resolve_all};
use crate::symbols::{BuildOptions, SymbolTable};

/// Options for the analysis pipeline.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub build: BuildOptions,
}

/// Whether the connection graph could be built from source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Available,
    /// The graph is empty; symbol queries still work.
    Unavailable(ParseError),
}

/// Everything known about one loaded module. Built in one pass and read-only
/// afterwards; replaced wholesale when the session switches modules.
#[derive(Debug)]
pub struct Analysis {
    info: ModuleInfo,
    table: SymbolTable,
    graph: ConnectionGraph,
    imports: Vec<ImportInfo>,
    source_status: SourceStatus,
    resolve_stats: ResolveStats,
}

impl Analysis {
    /// Run symbol table, parser, extractor, resolver and graph builder over a loaded
    /// module.
    ///
    /// Never fails once the module is loaded: unavailable or unparsable source
    /// degrades to an empty graph and is reported through [`Analysis::source_status`].
    pub fn build(loaded: LoadedModule, options: &AnalysisOptions) -> Analysis {
        let LoadedModule {
            info,
            namespace,
            source,
        } = loaded;
        let table = SymbolTable::build(&info.identity, &namespace, &options.build);

        let (graph, imports, source_status, resolve_stats) =
            match parse_source(source.as_deref(), &table) {
                Ok(parsed) => {
                    let references = extract_references(&parsed, &table);
                    let (edges, stats) = resolve_all(&table, references);
                    let imports = extract_imports(&parsed);
                    (
                        ConnectionGraph::from_edges(edges),
                        imports,
                        SourceStatus::Available,
                        stats,
                    )
                }
                Err(err) => {
                    log::warn!(
                        "'{}': {}; connection queries will be empty",
                        info.identity,
                        err
                    );
                    (
                        ConnectionGraph::new(),
                        Vec::new(),
                        SourceStatus::Unavailable(err),
                        ResolveStats::default(),
                    )
                }
            };

        log::info!(
            "analysed '{}': {} symbols, {} edges",
            info.identity,
            table.len(),
            graph.edge_count()
        );

        Analysis {
            info,
            table,
            graph,
            imports,
            source_status,
            resolve_stats,
        }
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    pub fn identity(&self) -> &str {
        &self.info.identity
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    pub fn source_status(&self) -> &SourceStatus {
        &self.source_status
    }

    pub fn source_available(&self) -> bool {
        self.source_status == SourceStatus::Available
    }

    /// The parse failure that disabled connection analysis, if any.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match &self.source_status {
            SourceStatus::Available => None,
            SourceStatus::Unavailable(err) => Some(err),
        }
    }

    pub fn resolve_stats(&self) -> &ResolveStats {
        &self.resolve_stats
    }

    /// The module's import statements in source order. Empty without source.
    pub fn imports(&self) -> &[ImportInfo] {
        &self.imports
    }
}
