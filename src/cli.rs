use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::export::model::ExportFormat;

/// Describe a Python module's structure and the connections between its classes and
/// functions.
///
/// module-graph loads a module by dotted name (or a `.py` file, or a JSON namespace
/// manifest) and answers USES / USED BY queries without executing any code.
#[derive(Parser, Debug)]
#[command(
    name = "module-graph",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory to search for modules. Repeatable; defaults to the config file's
    /// `search_paths`, then the current directory.
    #[arg(long = "path", global = true, value_name = "DIR")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Log debug detail to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format for query results.
#[derive(Clone, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact line-oriented format (default).
    #[default]
    Compact,
    /// Human-readable columnar table with bold headers when stdout is a terminal.
    Table,
    /// Structured JSON suitable for programmatic consumption.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Module information and symbol counts.
    Summary {
        /// Dotted module name, `.py` file, or `.json` manifest.
        module: String,
    },

    /// List classes, functions, methods and constants.
    Symbols {
        /// Dotted module name, `.py` file, or `.json` manifest.
        module: String,

        /// Only this kind (class, function, constant).
        #[arg(long)]
        kind: Option<String>,

        /// Include names starting with an underscore.
        #[arg(long)]
        private: bool,
    },

    /// What a symbol uses and what uses it.
    ///
    /// Without a symbol, every symbol that takes part in at least one connection.
    Connections {
        /// Dotted module name, `.py` file, or `.json` manifest.
        module: String,

        /// Qualified symbol name (`Class` or `Class.method`).
        symbol: Option<String>,

        /// Include names starting with an underscore.
        #[arg(long)]
        private: bool,
    },

    /// Class inheritance forest.
    Tree {
        /// Dotted module name, `.py` file, or `.json` manifest.
        module: String,

        /// Show a single tree rooted at this class.
        #[arg(long)]
        root: Option<String>,

        /// Only exception classes.
        #[arg(long, conflicts_with = "root")]
        exceptions: bool,
    },

    /// Write the full analysis to a file.
    Export {
        /// Dotted module name, `.py` file, or `.json` manifest.
        module: String,

        /// Export file format (overrides the config file's `export_format`).
        #[arg(long = "export-format", value_enum)]
        export_format: Option<ExportFormat>,

        /// Destination file; `-` writes to stdout. Defaults to `<module>_analysis.<ext>`.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include names starting with an underscore.
        #[arg(long)]
        private: bool,
    },

    /// Groups of symbols that call or instantiate each other in a loop.
    Cycles {
        /// Dotted module name, `.py` file, or `.json` manifest.
        module: String,
    },

    /// Import statements of the module source.
    Imports {
        /// Dotted module name, `.py` file, or `.json` manifest.
        module: String,
    },

    /// Submodules of a package with their class, function and constant counts.
    Submodules {
        /// Dotted package name or path to its `__init__.py`.
        package: String,
    },

    /// Modules and packages available on the search paths.
    Modules,

    /// Interactive session reading commands from stdin.
    Shell {
        /// Module to load on start.
        module: Option<String>,
    },
}
