use std::fmt::Write;

use crate::analysis::Analysis;
use crate::graph::edge::ConnectionEdge;
use crate::graph::node::{SymbolDescriptor, SymbolDetail};
use crate::query::output::format_tree;
use crate::cli::OutputFormat;

const RULE_WIDTH: usize = 72;

fn section(out: &mut String, title: &str) {
    writeln!(out).unwrap();
    writeln!(out, "{title}").unwrap();
    writeln!(out, "{}", "-".repeat(RULE_WIDTH)).unwrap();
}

/// Render the full plain-text report.
///
/// Sections appear in a fixed order and every list inside them is sorted, so two
/// exports of the same module are byte-identical.
pub fn render_text(analysis: &Analysis, symbols: &[&SymbolDescriptor], edges: &[ConnectionEdge]) -> String {
    let mut out = String::new();
    let info = analysis.info();

    writeln!(out, "MODULE {}", info.identity).unwrap();
    writeln!(out, "{}", "=".repeat(RULE_WIDTH)).unwrap();
    if let Some(origin) = &info.origin {
        writeln!(out, "  Location: {}", origin.display()).unwrap();
    }
    if let Some(doc) = info.doc.as_deref().and_then(|d| d.lines().next()) {
        writeln!(out, "  Description: {}", doc.trim()).unwrap();
    }
    if let Some(version) = &info.version {
        writeln!(out, "  Version: {version}").unwrap();
    }
    if let Some(author) = &info.author {
        writeln!(out, "  Author: {author}").unwrap();
    }
    if let Some(err) = analysis.parse_error() {
        writeln!(out, "  Warning: {err}; connections are empty").unwrap();
    }

    write_classes(&mut out, analysis, symbols);
    write_functions(&mut out, symbols);
    write_constants(&mut out, symbols);

    let foreign = analysis.table().foreign();
    if !foreign.is_empty() {
        section(&mut out, &format!("FOREIGN NAMES ({})", foreign.len()));
        for (name, origin) in foreign {
            writeln!(out, "  {name} <- {origin}").unwrap();
        }
    }

    let others = analysis.table().others();
    if !others.is_empty() {
        section(&mut out, &format!("OTHER OBJECTS ({})", others.len()));
        for (name, type_name) in others {
            writeln!(out, "  {name}: {type_name}").unwrap();
        }
    }

    if let Ok(forest) = analysis.inheritance_tree(None) {
        if !forest.is_empty() {
            section(&mut out, "INHERITANCE TREE");
            for line in format_tree(&forest, &OutputFormat::Compact).lines() {
                writeln!(out, "  {line}").unwrap();
            }
        }
    }

    section(&mut out, &format!("CONNECTIONS ({})", edges.len()));
    if edges.is_empty() {
        writeln!(out, "  (none)").unwrap();
    }
    for edge in edges {
        write!(out, "  {} -[{}]-> {} (line {}", edge.from, edge.kind.as_str(), edge.to, edge.line).unwrap();
        if let Some(via) = &edge.via {
            write!(out, ", via {via}").unwrap();
        }
        writeln!(out, ")").unwrap();
    }

    out
}

fn write_classes(out: &mut String, analysis: &Analysis, symbols: &[&SymbolDescriptor]) {
    let classes: Vec<&SymbolDescriptor> = symbols
        .iter()
        .copied()
        .filter(|d| matches!(d.detail, SymbolDetail::Class(_)))
        .collect();
    if classes.is_empty() {
        return;
    }
    section(out, &format!("CLASSES ({})", classes.len()));
    for (i, desc) in classes.iter().enumerate() {
        let Some(info) = desc.as_class() else { continue };
        write!(out, "  [{}] class {}", i + 1, desc.qualified_name).unwrap();
        if !info.bases.is_empty() {
            write!(out, "({})", info.bases.join(", ")).unwrap();
        }
        writeln!(out).unwrap();
        if let Some(reason) = &desc.degraded {
            writeln!(out, "      degraded: {reason}").unwrap();
        }
        if let Some(doc) = info.doc.as_deref().and_then(|d| d.lines().next()) {
            writeln!(out, "      doc: {}", doc.trim()).unwrap();
        }
        let methods: Vec<String> = analysis
            .table()
            .methods_of(&desc.qualified_name)
            .filter(|m| symbols.iter().any(|s| s.qualified_name == m.qualified_name))
            .map(|m| format!("{}{}", m.name, m.signature().unwrap_or_default()))
            .collect();
        if !methods.is_empty() {
            writeln!(out, "      methods: {}", methods.join(", ")).unwrap();
        }
        if !info.attributes.is_empty() {
            writeln!(out, "      attributes: {}", info.attributes.join(", ")).unwrap();
        }
    }
}

fn write_functions(out: &mut String, symbols: &[&SymbolDescriptor]) {
    let functions: Vec<&SymbolDescriptor> = symbols
        .iter()
        .copied()
        .filter(|d| matches!(d.detail, SymbolDetail::Function(_)) && !d.is_method())
        .collect();
    if functions.is_empty() {
        return;
    }
    section(out, &format!("FUNCTIONS ({})", functions.len()));
    for (i, desc) in functions.iter().enumerate() {
        let prefix = if desc.as_function().is_some_and(|f| f.is_async) { "async " } else { "" };
        writeln!(
            out,
            "  [{}] {prefix}{}{}",
            i + 1,
            desc.qualified_name,
            desc.signature().unwrap_or_default()
        )
        .unwrap();
        if let Some(reason) = &desc.degraded {
            writeln!(out, "      degraded: {reason}").unwrap();
        }
    }
}

fn write_constants(out: &mut String, symbols: &[&SymbolDescriptor]) {
    let constants: Vec<(&str, &str, Option<&str>)> = symbols
        .iter()
        .filter_map(|d| match &d.detail {
            SymbolDetail::Constant(c) => {
                Some((d.qualified_name.as_str(), c.type_name.as_str(), c.repr.as_deref()))
            }
            _ => None,
        })
        .collect();
    if constants.is_empty() {
        return;
    }
    section(out, &format!("CONSTANTS ({})", constants.len()));
    for (name, type_name, repr) in constants {
        match repr {
            Some(repr) => {
                writeln!(out, "  {name}: {type_name} = {repr}").unwrap();
            }
            None => {
                writeln!(out, "  {name}: {type_name}").unwrap();
            }
        }
    }
}
