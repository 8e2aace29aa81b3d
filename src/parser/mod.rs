pub mod imports;
pub mod references;

use std::collections::HashMap;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::ParseError;
use crate::graph::node::SymbolKind;
use crate::symbols::SymbolTable;

// ---------------------------------------------------------------------------
// Grammar plumbing
// ---------------------------------------------------------------------------

/// The tree-sitter Python grammar.
pub fn python_language() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// Parse Python source into a syntax tree.
///
/// Allocates a fresh `Parser` on every call; analysis is one-shot per module so the
/// overhead is negligible. The returned tree may contain error nodes; callers decide
/// whether that is fatal (see [`first_error_line`]).
///
/// # Errors
/// Returns an error if the grammar cannot be set or tree-sitter returns `None`.
pub fn parse_python(source: &str) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&python_language())
        .map_err(|e| ParseError::Parser(format!("failed to set tree-sitter language: {e}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Parser("tree-sitter returned None".to_owned()))
}

/// 1-based line of the first ERROR or MISSING node under `node`, if any.
pub fn first_error_line(node: Node) -> Option<usize> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(child) {
            return Some(line);
        }
    }
    // has_error() without a visible error child: report the node itself.
    Some(node.start_position().row + 1)
}

pub(crate) fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Definitions inside a block
// ---------------------------------------------------------------------------

/// Whether a textual definition is a `class` or a `def`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Class,
    Function,
}

/// A class or function definition found in a block.
#[derive(Debug, Clone)]
pub struct Definition<'tree> {
    pub name: String,
    pub kind: DefinitionKind,
    /// The `decorated_definition` wrapper when decorators are present, else `node`.
    pub outer: Node<'tree>,
    /// The `class_definition` / `function_definition` node itself.
    pub node: Node<'tree>,
}

/// Statement kinds whose nested blocks still bind names in the enclosing scope.
const COMPOUND_STATEMENTS: &[&str] = &["if_statement", "try_statement", "with_statement"];

/// Clause kinds that carry a block inside a compound statement.
const CLAUSES: &[&str] = &[
    "elif_clause",
    "else_clause",
    "except_clause",
    "except_group_clause",
    "finally_clause",
];

/// Flatten the statements of a block (module root or body), descending into
/// `if`/`try`/`with` so conditional definitions are seen in declaration order.
pub fn block_statements(block: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    collect_statements(block, &mut out);
    out
}

fn collect_statements<'t>(block: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = block.walk();
    for stmt in block.named_children(&mut cursor) {
        if COMPOUND_STATEMENTS.contains(&stmt.kind()) {
            collect_compound(stmt, out);
        } else {
            out.push(stmt);
        }
    }
}

fn collect_compound<'t>(stmt: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = stmt.walk();
    for child in stmt.named_children(&mut cursor) {
        if child.kind() == "block" {
            collect_statements(child, out);
        } else if CLAUSES.contains(&child.kind()) {
            collect_compound(child, out);
        }
    }
}

/// Unwrap a statement into a class/function definition, if it is one.
pub fn as_definition<'t>(stmt: Node<'t>, source: &str) -> Option<Definition<'t>> {
    let node = if stmt.kind() == "decorated_definition" {
        stmt.child_by_field_name("definition")?
    } else {
        stmt
    };
    let kind = match node.kind() {
        "class_definition" => DefinitionKind::Class,
        "function_definition" => DefinitionKind::Function,
        _ => return None,
    };
    let name = node_text(node.child_by_field_name("name")?, source).to_owned();
    Some(Definition {
        name,
        kind,
        outer: stmt,
        node,
    })
}

/// All class/function definitions bound directly in `block`, in declaration order.
pub fn block_definitions<'t>(block: Node<'t>, source: &str) -> Vec<Definition<'t>> {
    block_statements(block)
        .into_iter()
        .filter_map(|stmt| as_definition(stmt, source))
        .collect()
}

/// Decorator expressions (without `@`) attached to a definition statement.
pub fn decorators(outer: Node, source: &str) -> Vec<String> {
    if outer.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut cursor = outer.walk();
    outer
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|d| {
            node_text(d, source)
                .trim_start_matches('@')
                .trim()
                .to_owned()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// String literals and docstrings
// ---------------------------------------------------------------------------

/// Strip prefix letters and quotes from a Python string literal.
pub fn unquote(literal: &str) -> Option<String> {
    let body = literal.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return Some(body[quote.len()..body.len() - quote.len()].to_owned());
        }
    }
    None
}

/// The docstring of a module root or a definition body: the first statement when it is
/// a bare string literal. Indentation is normalised like `inspect.cleandoc`.
pub fn docstring(block: Node, source: &str) -> Option<String> {
    let mut cursor = block.walk();
    let first = block
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }
    let raw = unquote(node_text(literal, source))?;
    let cleaned = clean_doc(&raw);
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

fn clean_doc(raw: &str) -> String {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or("").trim().to_owned();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l))
        .min()
        .unwrap_or(0);
    let mut out = vec![first];
    for line in rest {
        // Indentation is counted in chars; cut on a char boundary.
        let cut = indent.min(leading_whitespace(line));
        let start = line.char_indices().nth(cut).map_or(line.len(), |(i, _)| i);
        out.push(line[start..].trim_end().to_owned());
    }
    out.join("\n").trim().to_owned()
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

// ---------------------------------------------------------------------------
// Source structure: definition spans per symbol
// ---------------------------------------------------------------------------

/// Line and byte extent of a symbol's defining block (decorators included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    /// 1-based first line.
    pub start_line: usize,
    /// 1-based last line.
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl SourceSpan {
    fn of(node: Node) -> Self {
        Self {
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    /// Whether a byte offset falls inside this span.
    pub fn contains_byte(&self, byte: usize) -> bool {
        byte >= self.start_byte && byte < self.end_byte
    }
}

/// A parsed module together with the spans of every symbol that has a textual definition.
pub struct ParsedSource {
    tree: Tree,
    source: String,
    spans: HashMap<String, SourceSpan>,
}

impl ParsedSource {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// The span recorded for a qualified name. `None` for symbols without a textual
    /// definition (constants, builtins, dynamically created objects).
    pub fn span(&self, qualified_name: &str) -> Option<SourceSpan> {
        self.spans.get(qualified_name).copied()
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// The definition node a span was taken from.
    pub fn definition_node(&self, span: SourceSpan) -> Option<Node<'_>> {
        let mut node = self
            .root()
            .descendant_for_byte_range(span.start_byte, span.end_byte)?;
        loop {
            let same_range = node.start_byte() == span.start_byte && node.end_byte() == span.end_byte;
            if same_range
                && matches!(
                    node.kind(),
                    "decorated_definition" | "class_definition" | "function_definition"
                )
            {
                return Some(node);
            }
            node = node.parent()?;
            if node.start_byte() != span.start_byte || node.end_byte() != span.end_byte {
                return None;
            }
        }
    }
}

/// Parse module source and locate the defining block of every symbol in `table`.
///
/// Symbols are matched by name and declaration order: when a name is defined more than
/// once the last definition wins, as it does in the module namespace. Methods are matched
/// inside the body of their class's winning definition.
///
/// # Errors
/// [`ParseError::SourceUnavailable`] when `source` is `None`; [`ParseError::Syntax`] when
/// the tree contains error nodes.
pub fn parse_source(source: Option<&str>, table: &SymbolTable) -> Result<ParsedSource, ParseError> {
    let source = source.ok_or(ParseError::SourceUnavailable)?;
    let tree = parse_python(source)?;
    if let Some(line) = first_error_line(tree.root_node()) {
        return Err(ParseError::Syntax { line });
    }

    let mut spans = HashMap::new();
    let definitions = block_definitions(tree.root_node(), source);

    for desc in table.top_level() {
        let wanted = match desc.kind() {
            SymbolKind::Class => DefinitionKind::Class,
            SymbolKind::Function => DefinitionKind::Function,
            SymbolKind::Constant => continue,
        };
        let Some(def) = definitions
            .iter()
            .rev()
            .find(|d| d.kind == wanted && d.name == desc.name)
        else {
            log::debug!("no textual definition for '{}'", desc.qualified_name);
            continue;
        };
        spans.insert(desc.qualified_name.clone(), SourceSpan::of(def.outer));

        if wanted == DefinitionKind::Class {
            let Some(body) = def.node.child_by_field_name("body") else {
                continue;
            };
            let members = block_definitions(body, source);
            for method in table.methods_of(&desc.qualified_name) {
                if let Some(m) = members
                    .iter()
                    .rev()
                    .find(|d| d.kind == DefinitionKind::Function && d.name == method.name)
                {
                    spans.insert(method.qualified_name.clone(), SourceSpan::of(m.outer));
                }
            }
        }
    }

    log::debug!("located {} definition spans", spans.len());

    Ok(ParsedSource {
        tree,
        source: source.to_owned(),
        spans,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadedModule;
    use crate::symbols::{BuildOptions, SymbolTable};

    fn table_for(source: &str) -> SymbolTable {
        let loaded = LoadedModule::from_source("sample", source).expect("load");
        SymbolTable::build("sample", &loaded.namespace, &BuildOptions::default())
    }

    #[test]
    fn test_unquote_variants() {
        assert_eq!(unquote("\"abc\"").as_deref(), Some("abc"));
        assert_eq!(unquote("'''x'''").as_deref(), Some("x"));
        assert_eq!(unquote("r'raw'").as_deref(), Some("raw"));
        assert_eq!(unquote("b\"\"").as_deref(), Some(""));
        assert_eq!(unquote("abc"), None);
    }

    #[test]
    fn test_docstring_is_cleaned() {
        let src = "def f():\n    \"\"\"Summary.\n\n        Indented detail.\n    \"\"\"\n    pass\n";
        let tree = parse_python(src).unwrap();
        let defs = block_definitions(tree.root_node(), src);
        let body = defs[0].node.child_by_field_name("body").unwrap();
        assert_eq!(
            docstring(body, src).as_deref(),
            Some("Summary.\n\nIndented detail.")
        );
    }

    #[test]
    fn test_docstring_with_unicode_indentation() {
        assert_eq!(clean_doc("Sum.\n  x\n\u{3000}y\n    "), "Sum.\n x\ny");
        assert_eq!(clean_doc("Sum.\n\u{a0}\u{a0}a\n\u{a0}\u{a0}\u{a0}b"), "Sum.\na\n\u{a0}b");

        let src = "def f():\n    \"\"\"Sum.\n  x\n\u{3000}y\n    \"\"\"\n";
        let loaded = LoadedModule::from_source("sample", src).expect("load");
        assert!(loaded.namespace.contains_key("f"));
    }

    #[test]
    fn test_conditional_definitions_are_found() {
        let src = "try:\n    class A:\n        pass\nexcept ImportError:\n    class B:\n        pass\nif True:\n    def f():\n        pass\n";
        let tree = parse_python(src).unwrap();
        let names: Vec<String> = block_definitions(tree.root_node(), src)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "f"]);
    }

    #[test]
    fn test_last_definition_wins_for_span() {
        let src = "def f():\n    pass\n\n\ndef f():\n    return 1\n";
        let table = table_for(src);
        let parsed = parse_source(Some(src), &table).unwrap();
        let span = parsed.span("f").expect("span for f");
        assert_eq!(span.start_line, 5);
        assert_eq!(span.end_line, 6);
    }

    #[test]
    fn test_span_includes_decorators_and_methods() {
        let src = "@register\nclass A:\n    def go(self):\n        pass\n";
        let table = table_for(src);
        let parsed = parse_source(Some(src), &table).unwrap();
        assert_eq!(parsed.span("A").unwrap().start_line, 1);
        assert_eq!(parsed.span("A.go").unwrap().start_line, 3);
        let node = parsed.definition_node(parsed.span("A").unwrap()).unwrap();
        assert_eq!(node.kind(), "decorated_definition");
    }

    #[test]
    fn test_constants_get_no_span() {
        let src = "LIMIT = 10\n";
        let table = table_for(src);
        let parsed = parse_source(Some(src), &table).unwrap();
        assert!(parsed.span("LIMIT").is_none());
        assert_eq!(parsed.span_count(), 0);
    }

    #[test]
    fn test_missing_source_is_reported() {
        let table = table_for("X = 1\n");
        let err = parse_source(None, &table).err().unwrap();
        assert_eq!(err, ParseError::SourceUnavailable);
    }

    #[test]
    fn test_syntax_error_is_reported_with_line() {
        let table = table_for("X = 1\n");
        let err = parse_source(Some("x = 1\ndef broken(:\n"), &table).err().unwrap();
        assert!(matches!(err, ParseError::Syntax { .. }), "got {:?}", err);
    }
}
