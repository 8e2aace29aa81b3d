//! Error types for the analysis engine.
//!
//! Only [`LoadError`] and [`ParseError`] ever cross the engine boundary. Metadata
//! failures degrade a single symbol, and unresolved references are dropped.

use std::path::PathBuf;

use thiserror::Error;

/// The module could not be resolved or loaded. Fatal to the pipeline: no graph is built.
#[derive(Error, Debug)]
pub enum LoadError {
    /// No file matched the module name on any search path.
    #[error("module '{name}' not found (searched: {})", display_paths(.searched))]
    NotFound {
        /// The module name as requested.
        name: String,
        /// Candidate paths that were probed.
        searched: Vec<PathBuf>,
    },

    /// Submodules were requested for a plain module file.
    #[error("'{0}' is a module, not a package")]
    NotAPackage(String),

    /// The module name is not a valid dotted identifier or file path.
    #[error("invalid module name '{0}'")]
    InvalidName(String),

    /// I/O error while reading the module file or manifest.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The module source has a syntax error, so importing it would fail.
    #[error("syntax error in {path} at line {line}")]
    Syntax {
        /// The offending file.
        path: PathBuf,
        /// 1-based line of the first error node.
        line: usize,
    },

    /// The namespace manifest could not be deserialized.
    #[error("invalid namespace manifest {path}: {source}")]
    Manifest {
        /// The manifest file.
        path: PathBuf,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The tree-sitter grammar could not be initialised.
    #[error("parser setup failed: {0}")]
    Parser(String),
}

/// Source text is unavailable or unparsable. The engine degrades to edge-free operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The loader returned no source text for the module.
    #[error("source unavailable")]
    SourceUnavailable,

    /// The source parsed with errors.
    #[error("source unparsable: syntax error at line {line}")]
    Syntax {
        /// 1-based line of the first error node.
        line: usize,
    },

    /// tree-sitter refused to produce a tree.
    #[error("source unparsable: {0}")]
    Parser(String),
}

/// Metadata extraction failed for one symbol. Caught by the symbol table builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A signature string could not be parsed into parameters.
    #[error("invalid signature '{text}': {reason}")]
    InvalidSignature {
        /// The signature text as given.
        text: String,
        /// What went wrong.
        reason: String,
    },

    /// A class base entry is empty.
    #[error("class has an empty base entry at position {0}")]
    EmptyBase(usize),
}

/// A query was asked about something the symbol table does not contain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No symbol with this qualified name exists.
    #[error("symbol '{0}' not found")]
    NotFound(String),

    /// The symbol exists but is not a class.
    #[error("symbol '{0}' is not a class")]
    NotAClass(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no search paths".to_owned();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
