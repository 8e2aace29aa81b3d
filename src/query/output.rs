use std::fmt::Write;
use std::io::IsTerminal;

use crate::cli::OutputFormat;
use crate::graph::node::{MethodKind, SymbolDescriptor, SymbolDetail};
use crate::loader::{ModuleEntry, ModuleInfo};
use crate::parser::imports::ImportInfo;
use crate::query::connections::{Connections, RelationGroup};
use crate::query::cycles::UsageCycle;
use crate::query::inheritance::InheritanceNode;
use crate::query::stats::ModuleSummary;
use crate::query::submodules::SubmoduleSummary;

fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

/// A table header line, bold when stdout is a terminal, followed by a rule.
fn table_header(out: &mut String, header: &str, width: usize) {
    if use_color() {
        writeln!(out, "\x1b[1m{header}\x1b[0m").unwrap();
    } else {
        writeln!(out, "{header}").unwrap();
    }
    writeln!(out, "{}", "-".repeat(width.max(header.len()))).unwrap();
}

fn pretty_json(value: &serde_json::Value) -> String {
    let mut s = serde_json::to_string_pretty(value).unwrap_or_default();
    s.push('\n');
    s
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Render module information and the summary counts.
pub fn format_summary(info: &ModuleInfo, summary: &ModuleSummary, format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            writeln!(out, "module {}", summary.module).unwrap();
            if let Some(origin) = &info.origin {
                writeln!(out, "file {}", origin.display()).unwrap();
            }
            if let Some(version) = &info.version {
                writeln!(out, "version {version}").unwrap();
            }
            if let Some(author) = &info.author {
                writeln!(out, "author {author}").unwrap();
            }
            if let Some(all) = &info.all {
                writeln!(out, "__all__ {}", all.join(",")).unwrap();
            }
            writeln!(
                out,
                "classes {} exceptions {} functions {} methods {} constants {}",
                summary.classes,
                summary.exception_classes,
                summary.functions,
                summary.methods,
                summary.constants
            )
            .unwrap();
            writeln!(
                out,
                "foreign {} others {} degraded {}",
                summary.foreign_names, summary.others, summary.degraded
            )
            .unwrap();
            writeln!(out, "edges {} imports {}", summary.edges, summary.imports).unwrap();
            if let Some(err) = &summary.source_error {
                writeln!(out, "warning {err}").unwrap();
            }
        }

        OutputFormat::Table => {
            let mut rows: Vec<(&str, String)> = vec![("Module", summary.module.clone())];
            if let Some(origin) = &info.origin {
                rows.push(("File", origin.display().to_string()));
            }
            if let Some(doc) = &info.doc {
                rows.push(("Doc", doc.lines().next().unwrap_or_default().to_owned()));
            }
            if let Some(version) = &info.version {
                rows.push(("Version", version.clone()));
            }
            if let Some(author) = &info.author {
                rows.push(("Author", author.clone()));
            }
            if let Some(all) = &info.all {
                rows.push(("__all__", format!("{} names", all.len())));
            }
            rows.extend([
                ("Classes", summary.classes.to_string()),
                ("  exceptions", summary.exception_classes.to_string()),
                ("Functions", summary.functions.to_string()),
                ("Methods", summary.methods.to_string()),
                ("Constants", summary.constants.to_string()),
                ("Foreign names", summary.foreign_names.to_string()),
                ("Others", summary.others.to_string()),
                ("Degraded", summary.degraded.to_string()),
                ("Edges", summary.edges.to_string()),
                ("Imports", summary.imports.to_string()),
                (
                    "Source",
                    match &summary.source_error {
                        None => "available".to_owned(),
                        Some(err) => err.clone(),
                    },
                ),
            ]);
            let key_w = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(5);
            table_header(&mut out, &format!("{:<key_w$}  VALUE", "FIELD"), key_w + 20);
            for (key, value) in rows {
                writeln!(out, "{key:<key_w$}  {value}").unwrap();
            }
        }

        OutputFormat::Json => {
            out = pretty_json(&serde_json::json!({
                "info": info,
                "summary": summary,
            }));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

fn symbol_detail(desc: &SymbolDescriptor) -> String {
    let mut detail = match &desc.detail {
        SymbolDetail::Class(info) => {
            if info.bases.is_empty() {
                String::new()
            } else {
                format!("({})", info.bases.join(", "))
            }
        }
        SymbolDetail::Function(info) => {
            let mut s = desc.signature().unwrap_or_default();
            if info.is_async {
                s.push_str(" [async]");
            }
            let tag = match info.method_kind {
                Some(MethodKind::Class) => " [classmethod]",
                Some(MethodKind::Static) => " [staticmethod]",
                Some(MethodKind::Property) => " [property]",
                Some(MethodKind::Instance) | None => "",
            };
            s.push_str(tag);
            s
        }
        SymbolDetail::Constant(info) => match &info.repr {
            Some(repr) => format!("{} = {}", info.type_name, repr),
            None => info.type_name.clone(),
        },
    };
    if let Some(reason) = &desc.degraded {
        write!(detail, " [degraded: {reason}]").unwrap();
    }
    detail
}

fn symbol_kind_label(desc: &SymbolDescriptor) -> &'static str {
    if desc.is_method() {
        "method"
    } else {
        desc.kind().as_str()
    }
}

/// Render a symbol listing.
pub fn format_symbols(symbols: &[&SymbolDescriptor], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            for desc in symbols {
                let sep = if matches!(desc.detail, SymbolDetail::Constant(_)) { " " } else { "" };
                writeln!(
                    out,
                    "{} {}{sep}{}",
                    symbol_kind_label(desc),
                    desc.qualified_name,
                    symbol_detail(desc)
                )
                .unwrap();
            }
            writeln!(out, "{} symbols", symbols.len()).unwrap();
        }

        OutputFormat::Table => {
            let name_w = symbols
                .iter()
                .map(|d| d.qualified_name.len())
                .max()
                .unwrap_or(4)
                .max(4);
            let header = format!("{:<8}  {:<name_w$}  {}", "KIND", "NAME", "DETAIL");
            table_header(&mut out, &header, name_w + 30);
            for desc in symbols {
                writeln!(
                    out,
                    "{:<8}  {:<name_w$}  {}",
                    symbol_kind_label(desc),
                    desc.qualified_name,
                    symbol_detail(desc)
                )
                .unwrap();
                if let Some(doc) = doc_of(desc) {
                    writeln!(out, "{:<8}  {:<name_w$}  # {}", "", "", doc).unwrap();
                }
            }
        }

        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = symbols
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "name": d.qualified_name,
                        "kind": symbol_kind_label(d),
                        "owner": d.owner,
                        "signature": d.signature(),
                        "detail": d.detail,
                        "degraded": d.degraded,
                    })
                })
                .collect();
            out = pretty_json(&serde_json::Value::Array(items));
        }
    }
    out
}

/// First docstring line of a class or function.
fn doc_of(desc: &SymbolDescriptor) -> Option<&str> {
    let doc = match &desc.detail {
        SymbolDetail::Class(info) => info.doc.as_deref(),
        SymbolDetail::Function(info) => info.doc.as_deref(),
        SymbolDetail::Constant(_) => None,
    }?;
    doc.lines().next().filter(|l| !l.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

fn write_groups(out: &mut String, title: &str, groups: &[RelationGroup]) {
    writeln!(out, "  {title}:").unwrap();
    if groups.is_empty() {
        writeln!(out, "    (none)").unwrap();
    }
    for group in groups {
        writeln!(out, "    {}: {}", group.label, group.names.join(", ")).unwrap();
    }
}

/// Render the USES / USED BY view of one or more symbols.
pub fn format_connections(connections: &[Connections], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            for c in connections {
                writeln!(out, "{} ({})", c.symbol, c.kind.as_str()).unwrap();
                write_groups(&mut out, "uses", &c.uses);
                write_groups(&mut out, "used by", &c.used_by);
            }
            if connections.iter().any(|c| !c.source_available) {
                writeln!(out, "warning source unavailable: connections are empty").unwrap();
            }
        }

        OutputFormat::Table => {
            let rows: Vec<(&str, &str, &str, String)> = connections
                .iter()
                .flat_map(|c| {
                    let uses = c.uses.iter().map(move |g| (c.symbol.as_str(), "uses", g));
                    let used_by = c.used_by.iter().map(move |g| (c.symbol.as_str(), "used by", g));
                    uses.chain(used_by)
                })
                .map(|(symbol, dir, g)| (symbol, dir, g.label, g.names.join(", ")))
                .collect();
            let sym_w = rows.iter().map(|r| r.0.len()).max().unwrap_or(6).max(6);
            let label_w = rows.iter().map(|r| r.2.len()).max().unwrap_or(8).max(8);
            let header = format!(
                "{:<sym_w$}  {:<7}  {:<label_w$}  {}",
                "SYMBOL", "SIDE", "RELATION", "NAMES"
            );
            table_header(&mut out, &header, sym_w + label_w + 30);
            for (symbol, dir, label, names) in &rows {
                writeln!(out, "{symbol:<sym_w$}  {dir:<7}  {label:<label_w$}  {names}").unwrap();
            }
            if rows.is_empty() {
                writeln!(out, "(no connections)").unwrap();
            }
        }

        OutputFormat::Json => {
            out = pretty_json(&serde_json::to_value(connections).unwrap_or_default());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Inheritance tree
// ---------------------------------------------------------------------------

fn node_label(node: &InheritanceNode) -> String {
    match node {
        InheritanceNode::Class { name, .. } => name.clone(),
        InheritanceNode::External { name } => format!("{name} (external)"),
        InheritanceNode::Cycle { name } => format!("{name} (cycle)"),
    }
}

fn write_tree(out: &mut String, node: &InheritanceNode, prefix: &str, last: bool, root: bool) {
    if root {
        writeln!(out, "{}", node_label(node)).unwrap();
    } else {
        let branch = if last { "└── " } else { "├── " };
        writeln!(out, "{prefix}{branch}{}", node_label(node)).unwrap();
    }
    let child_prefix = if root {
        String::new()
    } else if last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };
    let children = node.children();
    for (i, child) in children.iter().enumerate() {
        write_tree(out, child, &child_prefix, i + 1 == children.len(), false);
    }
}

/// Render an inheritance forest. Compact and table share the tree drawing.
pub fn format_tree(forest: &[InheritanceNode], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact | OutputFormat::Table => {
            for tree in forest {
                write_tree(&mut out, tree, "", true, true);
            }
            if forest.is_empty() {
                writeln!(out, "(no classes)").unwrap();
            }
        }
        OutputFormat::Json => {
            out = pretty_json(&serde_json::to_value(forest).unwrap_or_default());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

/// Render usage cycles.
pub fn format_cycles(cycles: &[UsageCycle], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            for cycle in cycles {
                writeln!(out, "cycle {}", cycle.display_chain()).unwrap();
            }
            writeln!(out, "{} cycles", cycles.len()).unwrap();
        }
        OutputFormat::Table => {
            table_header(&mut out, "#    MEMBERS", 40);
            for (i, cycle) in cycles.iter().enumerate() {
                writeln!(out, "{:<4} {}", i + 1, cycle.display_chain()).unwrap();
            }
            if cycles.is_empty() {
                writeln!(out, "(no cycles)").unwrap();
            }
        }
        OutputFormat::Json => {
            out = pretty_json(&serde_json::to_value(cycles).unwrap_or_default());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

/// Render the module's import statements.
pub fn format_imports(imports: &[ImportInfo], source_available: bool, format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            for import in imports {
                let nested = if import.nested { " (nested)" } else { "" };
                writeln!(out, "{}: {}{}", import.line, import.statement, nested).unwrap();
            }
            writeln!(out, "{} imports", imports.len()).unwrap();
            if !source_available {
                writeln!(out, "warning source unavailable: imports cannot be listed").unwrap();
            }
        }
        OutputFormat::Table => {
            let mod_w = imports.iter().map(|i| i.module.len()).max().unwrap_or(6).max(6);
            let header = format!("{:>5}  {:<mod_w$}  {}", "LINE", "MODULE", "BINDS");
            table_header(&mut out, &header, mod_w + 30);
            for import in imports {
                writeln!(
                    out,
                    "{:>5}  {:<mod_w$}  {}",
                    import.line,
                    import.module,
                    import.names.join(", ")
                )
                .unwrap();
            }
        }
        OutputFormat::Json => {
            out = pretty_json(&serde_json::to_value(imports).unwrap_or_default());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

fn entry_kind(is_package: bool) -> &'static str {
    if is_package { "package" } else { "module" }
}

/// Render the submodules of a package with their public symbol counts.
pub fn format_submodules(summaries: &[SubmoduleSummary], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            for s in summaries {
                match &s.error {
                    Some(err) => writeln!(out, "{} {} error: {err}", entry_kind(s.is_package), s.identity).unwrap(),
                    None => writeln!(
                        out,
                        "{} {} classes {} functions {} constants {}",
                        entry_kind(s.is_package),
                        s.identity,
                        s.classes,
                        s.functions,
                        s.constants
                    )
                    .unwrap(),
                }
            }
            writeln!(out, "{} submodules", summaries.len()).unwrap();
        }
        OutputFormat::Table => {
            let name_w = summaries.iter().map(|s| s.identity.len()).max().unwrap_or(4).max(4);
            let header = format!(
                "{:<name_w$}  {:<7}  {:>7}  {:>9}  {:>9}  {}",
                "NAME", "KIND", "CLASSES", "FUNCTIONS", "CONSTANTS", "DESCRIPTION"
            );
            table_header(&mut out, &header, name_w + 60);
            for s in summaries {
                let description = match &s.error {
                    Some(err) => format!("error: {err}"),
                    None => s.description.clone().unwrap_or_default(),
                };
                writeln!(
                    out,
                    "{:<name_w$}  {:<7}  {:>7}  {:>9}  {:>9}  {}",
                    s.identity,
                    entry_kind(s.is_package),
                    s.classes,
                    s.functions,
                    s.constants,
                    description
                )
                .unwrap();
            }
            if summaries.is_empty() {
                writeln!(out, "(no submodules)").unwrap();
            }
        }
        OutputFormat::Json => {
            out = pretty_json(&serde_json::to_value(summaries).unwrap_or_default());
        }
    }
    out
}

/// Render the modules and packages found on the search paths.
pub fn format_modules(entries: &[ModuleEntry], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            for e in entries {
                writeln!(out, "{} {}", entry_kind(e.is_package), e.identity).unwrap();
            }
            writeln!(out, "{} modules", entries.len()).unwrap();
        }
        OutputFormat::Table => {
            let name_w = entries.iter().map(|e| e.identity.len()).max().unwrap_or(4).max(4);
            let header = format!("{:<name_w$}  {:<7}  {}", "NAME", "KIND", "PATH");
            table_header(&mut out, &header, name_w + 40);
            for e in entries {
                writeln!(
                    out,
                    "{:<name_w$}  {:<7}  {}",
                    e.identity,
                    entry_kind(e.is_package),
                    e.path.display()
                )
                .unwrap();
            }
        }
        OutputFormat::Json => {
            out = pretty_json(&serde_json::to_value(entries).unwrap_or_default());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// "symbol not found" line with up to three suggestions.
pub fn format_not_found(name: &str, suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        format!("symbol '{name}' not found\n")
    } else {
        format!("symbol '{name}' not found; did you mean: {}?\n", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analysis, AnalysisOptions};
    use crate::loader::LoadedModule;

    fn analyse(src: &str) -> Analysis {
        let loaded = LoadedModule::from_source("sample", src).unwrap();
        Analysis::build(loaded, &AnalysisOptions::default())
    }

    #[test]
    fn test_tree_drawing() {
        let forest = vec![InheritanceNode::Class {
            name: "Child".into(),
            bases: vec![
                InheritanceNode::Class {
                    name: "Base".into(),
                    bases: vec![InheritanceNode::External {
                        name: "object".into(),
                    }],
                },
                InheritanceNode::Cycle {
                    name: "Child".into(),
                },
            ],
        }];
        let text = format_tree(&forest, &OutputFormat::Compact);
        assert_eq!(
            text,
            "Child\n├── Base\n│   └── object (external)\n└── Child (cycle)\n"
        );
    }

    #[test]
    fn test_compact_connections() {
        let analysis = analyse("class Base:\n    pass\n\nclass Child(Base):\n    pass\n");
        let conns = analysis.connections_of("Child", false).unwrap();
        let text = format_connections(&[conns], &OutputFormat::Compact);
        assert!(text.starts_with("Child (class)\n  uses:\n    Inherits From: Base\n"));
        assert!(text.contains("  used by:\n    (none)\n"));
    }

    #[test]
    fn test_compact_symbols() {
        let analysis = analyse("LIMIT = 3\n\ndef f(a: int) -> str:\n    pass\n");
        let text = format_symbols(&analysis.symbols(None, false), &OutputFormat::Compact);
        assert_eq!(text, "constant LIMIT int = 3\nfunction f(a: int) -> str\n2 symbols\n");
    }

    #[test]
    fn test_compact_submodules() {
        let ok = SubmoduleSummary {
            name: "core".into(),
            identity: "pkg.core".into(),
            load_name: "pkg.core".into(),
            is_package: false,
            description: Some("Core pieces.".into()),
            classes: 1,
            functions: 2,
            constants: 0,
            error: None,
        };
        let failed = SubmoduleSummary {
            name: "sub".into(),
            identity: "pkg.sub".into(),
            load_name: "pkg.sub".into(),
            is_package: true,
            description: None,
            classes: 0,
            functions: 0,
            constants: 0,
            error: Some("boom".into()),
        };
        assert_eq!(
            format_submodules(&[ok, failed], &OutputFormat::Compact),
            "module pkg.core classes 1 functions 2 constants 0\npackage pkg.sub error: boom\n2 submodules\n"
        );
    }

    #[test]
    fn test_not_found_with_suggestions() {
        assert_eq!(format_not_found("Wdget", &[]), "symbol 'Wdget' not found\n");
        assert_eq!(
            format_not_found("Wdget", &["Widget".to_string()]),
            "symbol 'Wdget' not found; did you mean: Widget?\n"
        );
    }

    #[test]
    fn test_json_summary_is_valid() {
        let analysis = analyse("class A:\n    pass\n");
        let text = format_summary(analysis.info(), &analysis.summary(), &OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["classes"], 1);
        assert_eq!(value["info"]["identity"], "sample");
    }
}
