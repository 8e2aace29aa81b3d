use std::sync::OnceLock;

use serde::Serialize;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use super::{ParsedSource, node_text, python_language};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// The kind of import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import a.b` / `import a.b as c`
    Import,
    /// `from a import b`
    FromImport,
    /// `from __future__ import annotations`
    Future,
}

/// An import statement as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportInfo {
    pub kind: ImportKind,
    /// Statement text with line continuations collapsed.
    pub statement: String,
    /// Source module: `a.b` for `import a.b`, `.sibling` for `from .sibling import x`.
    /// Empty for plain `import a, b` with several modules; see `names`.
    pub module: String,
    /// Local names the statement binds (`*` for wildcard imports).
    pub names: Vec<String>,
    /// 1-based line.
    pub line: usize,
    /// Whether the import sits inside a function or class body.
    pub nested: bool,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

const IMPORT_QUERY: &str = r#"
    (import_statement) @import
    (import_from_statement) @from_import
    (future_import_statement) @future
"#;

static IMPORTS: OnceLock<Query> = OnceLock::new();

fn import_query() -> &'static Query {
    IMPORTS.get_or_init(|| Query::new(&python_language(), IMPORT_QUERY).expect("invalid import query"))
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Every import statement in the module, in source order.
pub fn extract_imports(parsed: &ParsedSource) -> Vec<ImportInfo> {
    let source = parsed.source();
    let query = import_query();
    let import_idx = query.capture_index_for_name("import");
    let from_idx = query.capture_index_for_name("from_import");
    let future_idx = query.capture_index_for_name("future");

    let mut out = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, parsed.root(), source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            let node = capture.node;
            let kind = if Some(capture.index) == import_idx {
                ImportKind::Import
            } else if Some(capture.index) == from_idx {
                ImportKind::FromImport
            } else if Some(capture.index) == future_idx {
                ImportKind::Future
            } else {
                continue;
            };
            out.push(import_info(node, kind, source));
        }
    }
    out.sort_by_key(|i| i.line);
    out
}

fn import_info(node: Node, kind: ImportKind, source: &str) -> ImportInfo {
    let statement = node_text(node, source)
        .lines()
        .map(|l| l.trim().trim_end_matches('\\').trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut names = Vec::new();
    let mut modules = Vec::new();
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "dotted_name" => {
                let text = node_text(name, source);
                modules.push(text.to_owned());
                let bound = match kind {
                    ImportKind::Import => text.split('.').next().unwrap_or(text),
                    _ => text,
                };
                names.push(bound.to_owned());
            }
            "aliased_import" => {
                if let Some(target) = name.child_by_field_name("name") {
                    modules.push(node_text(target, source).to_owned());
                }
                if let Some(alias) = name.child_by_field_name("alias") {
                    names.push(node_text(alias, source).to_owned());
                }
            }
            _ => {}
        }
    }

    let module = match kind {
        ImportKind::Import if modules.len() == 1 => modules.remove(0),
        ImportKind::Import => String::new(),
        ImportKind::FromImport => node
            .child_by_field_name("module_name")
            .map(|m| node_text(m, source).to_owned())
            .unwrap_or_default(),
        ImportKind::Future => "__future__".to_owned(),
    };

    let mut has_wildcard = false;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "wildcard_import" {
            has_wildcard = true;
        }
    }
    if has_wildcard {
        names.push("*".to_owned());
    }

    ImportInfo {
        kind,
        statement,
        module,
        names,
        line: node.start_position().row + 1,
        nested: is_nested(node),
    }
}

fn is_nested(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if matches!(parent.kind(), "function_definition" | "class_definition") {
            return true;
        }
        current = parent.parent();
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
