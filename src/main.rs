use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use module_graph::analysis::{Analysis, AnalysisOptions};
use module_graph::cli::{Cli, Commands, OutputFormat};
use module_graph::config::ModuleGraphConfig;
use module_graph::error::QueryError;
use module_graph::export::model::{ExportFormat, ExportParams};
use module_graph::export::{default_export_path, export_module, write_export};
use module_graph::graph::node::SymbolKind;
use module_graph::loader::PathLoader;
use module_graph::query::output;
use module_graph::session::Session;
use module_graph::shell::{Shell, ShellSettings};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load<'s>(session: &'s mut Session<PathLoader>, module: &str) -> Result<&'s Analysis> {
    session
        .load(module)
        .with_context(|| format!("failed to load module '{module}'"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let cwd = std::env::current_dir().context("failed to determine the working directory")?;
    let config = ModuleGraphConfig::load(&cwd);
    let format = cli.global.format.clone().unwrap_or_default();
    let loader = PathLoader::new(config.search_paths(&cli.global.paths));
    let options = AnalysisOptions {
        build: config.build_options(),
    };
    let mut session = Session::new(loader, options);

    match cli.command {
        Commands::Summary { module } => {
            let analysis = load(&mut session, &module)?;
            print!(
                "{}",
                output::format_summary(analysis.info(), &analysis.summary(), &format)
            );
        }

        Commands::Symbols {
            module,
            kind,
            private,
        } => {
            let kind = kind
                .map(|k| {
                    SymbolKind::from_str_loose(&k)
                        .with_context(|| format!("unknown symbol kind '{k}' (expected class, function or constant)"))
                })
                .transpose()?;
            let analysis = load(&mut session, &module)?;
            let symbols = analysis.symbols(kind, config.show_private(private));
            print!("{}", output::format_symbols(&symbols, &format));
        }

        Commands::Connections {
            module,
            symbol,
            private,
        } => {
            let include_private = config.show_private(private);
            let analysis = load(&mut session, &module)?;
            let connections = match symbol {
                Some(name) => match analysis.connections_of(&name, include_private) {
                    Ok(c) => vec![c],
                    Err(QueryError::NotFound(name)) => {
                        let message = output::format_not_found(&name, &analysis.suggest_similar(&name));
                        anyhow::bail!("{}", message.trim_end());
                    }
                    Err(err) => return Err(err.into()),
                },
                None => analysis
                    .connected_symbols(include_private)
                    .into_iter()
                    .map(|name| analysis.connections_of(name, include_private))
                    .collect::<Result<Vec<_>, _>>()?,
            };
            print!("{}", output::format_connections(&connections, &format));
        }

        Commands::Tree {
            module,
            root,
            exceptions,
        } => {
            let analysis = load(&mut session, &module)?;
            let forest = if exceptions {
                analysis.exception_hierarchy()
            } else {
                analysis.inheritance_tree(root.as_deref())?
            };
            print!("{}", output::format_tree(&forest, &format));
        }

        Commands::Export {
            module,
            export_format,
            output: destination,
            private,
        } => {
            let export_format = export_format
                .or_else(|| (format == OutputFormat::Json).then_some(ExportFormat::Json))
                .or(config.export_format)
                .unwrap_or_default();
            let params = ExportParams {
                format: export_format,
                include_private: config.show_private(private),
            };
            let analysis = load(&mut session, &module)?;
            let result = export_module(analysis, &params)?;
            match destination.as_deref() {
                Some(path) if path == Path::new("-") => print!("{}", result.content),
                other => {
                    let path = other
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| default_export_path(analysis.identity(), export_format));
                    write_export(&result, &path)?;
                    println!(
                        "Exported {} symbols and {} edges to {}",
                        result.symbol_count,
                        result.edge_count,
                        path.display()
                    );
                }
            }
        }

        Commands::Cycles { module } => {
            let analysis = load(&mut session, &module)?;
            print!("{}", output::format_cycles(&analysis.usage_cycles(), &format));
        }

        Commands::Imports { module } => {
            let analysis = load(&mut session, &module)?;
            print!(
                "{}",
                output::format_imports(analysis.imports(), analysis.source_available(), &format)
            );
        }

        Commands::Submodules { package } => {
            let summaries = session
                .submodules(&package)
                .with_context(|| format!("failed to list submodules of '{package}'"))?;
            print!("{}", output::format_submodules(&summaries, &format));
        }

        Commands::Modules => {
            print!("{}", output::format_modules(&session.loader().available_modules(), &format));
        }

        Commands::Shell { module } => {
            let settings = ShellSettings {
                format,
                include_private: config.show_private(false),
                export_format: config.export_format.unwrap_or_default(),
                prompt: std::io::stdin().is_terminal(),
            };
            let preload = module.map(|m| format!("load {m}\n")).unwrap_or_default();
            let stdin = std::io::stdin();
            let input = std::io::Read::chain(preload.as_bytes(), stdin.lock());
            let mut shell = Shell::new(&mut session, settings);
            shell.run(std::io::BufReader::new(input), &mut std::io::stdout().lock())?;
        }
    }

    Ok(())
}
