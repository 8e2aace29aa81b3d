//! Connection analysis for Python modules.
//!
//! A module is loaded statically ([`loader`]), its symbols are registered
//! ([`symbols`]), its source is parsed for references ([`parser`]), the references
//! are resolved against the symbol table ([`resolver`]) and accumulated into a
//! [`graph::ConnectionGraph`]. [`analysis::Analysis`] bundles the result and the
//! [`query`] module answers USES / USED BY questions over it.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod loader;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod session;
pub mod shell;
pub mod symbols;

pub use analysis::{Analysis, AnalysisOptions};
pub use error::{LoadError, ParseError, QueryError};
pub use loader::{LoadedModule, ManifestLoader, ModuleLoader, PathLoader};
pub use session::Session;
