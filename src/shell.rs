use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;

use crate::cli::OutputFormat;
use crate::error::QueryError;
use crate::export::model::{ExportFormat, ExportParams};
use crate::export::{default_export_path, export_module, write_export};
use crate::graph::node::SymbolKind;
use crate::loader::ModuleLoader;
use crate::query::output;
use crate::session::Session;

const HELP: &str = "\
commands:
  load <module|number> load a module (replaces the current one); numbers index the
                       last submodule listing
  summary              module information and counts
  symbols [kind]       list symbols; kind is class, function or constant
  show <name|number>   one symbol with its connections; numbers index the last listing
  tree [class]         inheritance forest, or one class's ancestry
  submodules [package] submodules with their counts (default: the loaded module)
  export [file]        write the analysis report (default <module>_analysis.txt)
  cycles               call/instantiation cycles
  help                 this text
  quit                 leave the shell
";

/// Display settings for a shell session.
#[derive(Debug, Clone, Default)]
pub struct ShellSettings {
    pub format: OutputFormat,
    pub include_private: bool,
    pub export_format: ExportFormat,
    /// Print a prompt before each command (interactive terminals only).
    pub prompt: bool,
}

/// Interactive command loop over an existing session.
pub struct Shell<'s, L: ModuleLoader> {
    session: &'s mut Session<L>,
    settings: ShellSettings,
    /// Names from the last `symbols` listing, for `show <number>`.
    last_listing: Vec<String>,
    /// Load names from the last `submodules` listing, for `load <number>`.
    last_submodules: Vec<String>,
    /// The argument of the last successful `load`.
    loaded_as: Option<String>,
}

enum Flow {
    Continue,
    Quit,
}

impl<'s, L: ModuleLoader> Shell<'s, L> {
    pub fn new(session: &'s mut Session<L>, settings: ShellSettings) -> Self {
        Self {
            session,
            settings,
            last_listing: Vec::new(),
            last_submodules: Vec::new(),
            loaded_as: None,
        }
    }

    /// Read commands from `input` until `quit` or end of input.
    ///
    /// Command failures are reported to `out` and the loop continues; only I/O errors
    /// on `input`/`out` end it early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> anyhow::Result<()> {
        let mut lines = input.lines();
        loop {
            if self.settings.prompt {
                write!(out, "module-graph> ")?;
                out.flush()?;
            }
            let Some(line) = lines.next() else { break };
            let line = line.context("failed to read command")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (command, arg) = match line.split_once(char::is_whitespace) {
                Some((c, a)) => (c, Some(a.trim()).filter(|a| !a.is_empty())),
                None => (line, None),
            };
            log::debug!("shell command '{command}'");
            let text = match self.execute(command, arg) {
                Ok((text, Flow::Quit)) => {
                    out.write_all(text.as_bytes())?;
                    break;
                }
                Ok((text, Flow::Continue)) => text,
                Err(err) => format!("error: {err:#}\n"),
            };
            out.write_all(text.as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    fn execute(&mut self, command: &str, arg: Option<&str>) -> anyhow::Result<(String, Flow)> {
        let text = match command {
            "quit" | "exit" | "q" => return Ok((String::new(), Flow::Quit)),
            "help" | "?" => HELP.to_owned(),
            "load" => {
                let arg = arg.context("usage: load <module|number>")?;
                let name = pick_from(&self.last_submodules, arg);
                let analysis = self.session.load(&name)?;
                self.last_listing.clear();
                self.loaded_as = Some(name);
                let mut text = format!(
                    "loaded {} ({} symbols, {} edges)\n",
                    analysis.identity(),
                    analysis.table().len(),
                    analysis.graph().edge_count()
                );
                if let Some(err) = analysis.parse_error() {
                    text.push_str(&format!("warning: {err}; connections are unavailable\n"));
                }
                text
            }
            "summary" => {
                let analysis = self.current()?;
                output::format_summary(analysis.info(), &analysis.summary(), &self.settings.format)
            }
            "symbols" => {
                let kind = match arg {
                    None => None,
                    Some(k) => Some(
                        SymbolKind::from_str_loose(k)
                            .with_context(|| format!("unknown symbol kind '{k}'"))?,
                    ),
                };
                let include_private = self.settings.include_private;
                let analysis = self.current()?;
                let symbols = analysis.symbols(kind, include_private);
                let names: Vec<String> = symbols.iter().map(|d| d.qualified_name.clone()).collect();
                let text = numbered(&output::format_symbols(&symbols, &self.settings.format), &self.settings.format);
                self.last_listing = names;
                text
            }
            "show" => {
                let arg = arg.context("usage: show <name|number>")?;
                let name = pick_from(&self.last_listing, arg);
                let analysis = self.current()?;
                match analysis.connections_of(&name, self.settings.include_private) {
                    Ok(connections) => {
                        let mut text = String::new();
                        if let Some(desc) = analysis.table().get(&connections.symbol) {
                            text.push_str(&output::format_symbols(&[desc], &self.settings.format));
                        }
                        text.push_str(&output::format_connections(&[connections], &self.settings.format));
                        text
                    }
                    Err(QueryError::NotFound(name)) => {
                        output::format_not_found(&name, &analysis.suggest_similar(&name))
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            "tree" => {
                let analysis = self.current()?;
                let forest = analysis.inheritance_tree(arg)?;
                output::format_tree(&forest, &self.settings.format)
            }
            "submodules" => {
                let package = arg
                    .map(str::to_owned)
                    .or_else(|| self.loaded_as.clone())
                    .context("usage: submodules <package>, or load a package first")?;
                let summaries = self.session.submodules(&package)?;
                self.last_submodules = summaries.iter().map(|s| s.load_name.clone()).collect();
                numbered(&output::format_submodules(&summaries, &self.settings.format), &self.settings.format)
            }
            "cycles" => {
                let analysis = self.current()?;
                output::format_cycles(&analysis.usage_cycles(), &self.settings.format)
            }
            "export" => {
                let analysis = self.current()?;
                let params = ExportParams {
                    format: self.settings.export_format,
                    include_private: self.settings.include_private,
                };
                let result = export_module(analysis, &params)?;
                let path = arg
                    .map(PathBuf::from)
                    .unwrap_or_else(|| default_export_path(analysis.identity(), params.format));
                write_export(&result, &path)?;
                format!(
                    "exported {} symbols and {} edges to {}\n",
                    result.symbol_count,
                    result.edge_count,
                    path.display()
                )
            }
            other => format!("unknown command '{other}'; type 'help' for a list\n"),
        };
        Ok((text, Flow::Continue))
    }

    fn current(&self) -> anyhow::Result<&crate::analysis::Analysis> {
        self.session
            .current()
            .context("no module loaded; use 'load <module>'")
    }

}

/// Resolve a 1-based number against a listing; anything else is taken as a name.
fn pick_from(listing: &[String], arg: &str) -> String {
    arg.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| listing.get(i))
        .cloned()
        .unwrap_or_else(|| arg.to_owned())
}

/// Prefix compact listing lines with `[n]` so `show <n>` can refer to them.
fn numbered(text: &str, format: &OutputFormat) -> String {
    if *format != OutputFormat::Compact {
        return text.to_owned();
    }
    let mut lines: Vec<&str> = text.lines().collect();
    let footer = lines.pop();
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        out.push_str(&format!("[{}] {line}\n", i + 1));
    }
    if let Some(footer) = footer {
        out.push_str(footer);
        out.push('\n');
    }
    out
}
