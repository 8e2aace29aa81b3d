use std::sync::OnceLock;

use regex::Regex;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use super::{ParsedSource, SourceSpan, node_text, python_language};
use crate::graph::node::SymbolKind;
use crate::symbols::SymbolTable;
use crate::symbols::signature::is_identifier;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Provisional kind of a raw reference; the resolver turns these into edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A call. Becomes Instantiates or CallsFunction once the target kind is known.
    CallOrInstantiate,
    /// One positional entry of a class's base list.
    InheritsFrom,
    /// A name inside a parameter, return or variable annotation.
    TypeHint,
}

/// A reference as written in source, before resolution. Never retained past the
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    /// Qualified name of the top-level symbol whose definition contains the reference.
    pub from: String,
    /// Referenced name, possibly dotted (`models.Base`).
    pub name: String,
    pub kind: ReferenceKind,
    /// 1-based line.
    pub line: usize,
    /// The method of `from` the reference sits in, if any.
    pub via: Option<String>,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Calls whose callee is a plain name or an attribute chain: `foo()`, `mod.Foo()`.
/// Chains rooted at a call or subscript are filtered in code.
const CALLS_QUERY: &str = r#"
    (call
      function: [(identifier) (attribute)] @callee)
"#;

/// Annotation positions: parameters, return types, annotated assignments.
const ANNOTATIONS_QUERY: &str = r#"
    (typed_parameter type: (type) @annotation)
    (typed_default_parameter type: (type) @annotation)
    (function_definition return_type: (type) @annotation)
    (assignment type: (type) @annotation)
"#;

static CALLS: OnceLock<Query> = OnceLock::new();
static ANNOTATIONS: OnceLock<Query> = OnceLock::new();
static DOTTED_NAME: OnceLock<Regex> = OnceLock::new();

fn calls_query() -> &'static Query {
    CALLS.get_or_init(|| Query::new(&python_language(), CALLS_QUERY).expect("invalid calls query"))
}

fn annotations_query() -> &'static Query {
    ANNOTATIONS.get_or_init(|| {
        Query::new(&python_language(), ANNOTATIONS_QUERY).expect("invalid annotations query")
    })
}

/// Dotted identifier runs inside string annotations (`"Optional[models.Foo]"`).
fn dotted_name_re() -> &'static Regex {
    DOTTED_NAME.get_or_init(|| {
        Regex::new(r"[\p{XID_Start}_]\p{XID_Continue}*(?:\.[\p{XID_Start}_]\p{XID_Continue}*)*")
            .expect("invalid dotted name regex")
    })
}

// ---------------------------------------------------------------------------
// Helper utilities
// ---------------------------------------------------------------------------

/// `a.b.c` with every segment an identifier; whitespace around dots is dropped.
fn dotted_name(node: Node, source: &str) -> Option<String> {
    let compact: String = node_text(node, source)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    compact.split('.').all(is_identifier).then_some(compact)
}

fn is_instance_chain(name: &str) -> bool {
    matches!(name.split('.').next(), Some("self" | "cls"))
}

/// A reference collected during the walk, keyed by byte offset for ordering.
struct Found {
    byte: usize,
    name: String,
    kind: ReferenceKind,
    line: usize,
}

impl Found {
    fn at(node: Node, name: String, kind: ReferenceKind) -> Self {
        Self {
            byte: node.start_byte(),
            name,
            kind,
            line: node.start_position().row + 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Walk every top-level class and function that has a span and emit its raw references.
///
/// Symbols are visited in qualified-name order and each symbol's references come out in
/// source order, so the output is deterministic for a given input.
pub fn extract_references(parsed: &ParsedSource, table: &SymbolTable) -> Vec<RawReference> {
    let source = parsed.source();
    let mut out = Vec::new();

    for desc in table.top_level() {
        if desc.kind() == SymbolKind::Constant {
            continue;
        }
        let Some(span) = parsed.span(&desc.qualified_name) else {
            continue;
        };
        let Some(node) = parsed.definition_node(span) else {
            log::debug!("span of '{}' no longer maps to a definition", desc.qualified_name);
            continue;
        };

        let methods: Vec<(String, SourceSpan)> = table
            .methods_of(&desc.qualified_name)
            .filter_map(|m| parsed.span(&m.qualified_name).map(|s| (m.qualified_name.clone(), s)))
            .collect();

        let mut found = Vec::new();
        if desc.kind() == SymbolKind::Class {
            collect_bases(node, source, &mut found);
        }
        collect_calls(node, source, &mut found);
        collect_annotations(node, source, &mut found);
        found.sort_by_key(|f| f.byte);

        for f in found {
            let via = methods
                .iter()
                .find(|(_, s)| s.contains_byte(f.byte))
                .map(|(q, _)| q.clone());
            out.push(RawReference {
                from: desc.qualified_name.clone(),
                name: f.name,
                kind: f.kind,
                line: f.line,
                via,
            });
        }
    }

    log::debug!("extracted {} raw references", out.len());
    out
}

/// Positional bases of the class itself (nested class bases are not emitted).
fn collect_bases(node: Node, source: &str, found: &mut Vec<Found>) {
    let class = if node.kind() == "decorated_definition" {
        match node.child_by_field_name("definition") {
            Some(def) => def,
            None => return,
        }
    } else {
        node
    };
    let Some(args) = class.child_by_field_name("superclasses") else {
        return;
    };
    let mut cursor = args.walk();
    for arg in args.named_children(&mut cursor) {
        // `Generic[T]` inherits from `Generic`.
        let target = match arg.kind() {
            "keyword_argument" | "comment" | "dictionary_splat" | "list_splat" => continue,
            "subscript" => match arg.child_by_field_name("value") {
                Some(value) => value,
                None => continue,
            },
            _ => arg,
        };
        if let Some(name) = dotted_name(target, source) {
            found.push(Found::at(arg, name, ReferenceKind::InheritsFrom));
        }
    }
}

fn collect_calls(node: Node, source: &str, found: &mut Vec<Found>) {
    let query = calls_query();
    let callee_idx = query
        .capture_index_for_name("callee")
        .expect("calls query must have @callee");

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, node, source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index != callee_idx {
                continue;
            }
            let Some(name) = dotted_name(capture.node, source) else {
                continue;
            };
            if is_instance_chain(&name) {
                continue;
            }
            found.push(Found::at(capture.node, name, ReferenceKind::CallOrInstantiate));
        }
    }
}

fn collect_annotations(node: Node, source: &str, found: &mut Vec<Found>) {
    let query = annotations_query();
    let annotation_idx = query
        .capture_index_for_name("annotation")
        .expect("annotations query must have @annotation");

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, node, source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index == annotation_idx {
                annotation_names(capture.node, source, found);
            }
        }
    }
}

/// Every name inside an annotation: `Optional[Dict[str, Foo]]` yields `Optional`,
/// `Dict`, `str`, `Foo`.
fn annotation_names(node: Node, source: &str, found: &mut Vec<Found>) {
    match node.kind() {
        "identifier" => {
            found.push(Found::at(
                node,
                node_text(node, source).to_owned(),
                ReferenceKind::TypeHint,
            ));
        }
        "attribute" | "member_type" => {
            if let Some(name) = dotted_name(node, source) {
                found.push(Found::at(node, name, ReferenceKind::TypeHint));
            }
        }
        "string" => {
            // Forward reference: tokenize the literal's contents.
            let text = node_text(node, source);
            let Some(inner) = super::unquote(text) else {
                return;
            };
            let offset = text.len() - text.trim_start_matches(|c: char| c != '"' && c != '\'').len();
            for m in dotted_name_re().find_iter(&inner) {
                found.push(Found {
                    byte: node.start_byte() + offset + m.start(),
                    name: m.as_str().to_owned(),
                    kind: ReferenceKind::TypeHint,
                    line: node.start_position().row + 1,
                });
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                annotation_names(child, source, found);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
