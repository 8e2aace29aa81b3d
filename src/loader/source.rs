//! Static namespace construction from Python source.
//!
//! Walks the module's top-level statements (including those nested in `if`/`try`/`with`)
//! and records what each binding would hold after import. Nothing is executed.

use std::path::{Path, PathBuf};

use tree_sitter::Node;

use super::namespace::{ClassObject, FunctionObject, Namespace, ObjectDescriptor, ValueObject};
use super::{LoadedModule, ModuleInfo};
use crate::error::LoadError;
use crate::parser::{
    DefinitionKind, as_definition, block_definitions, block_statements, decorators, docstring,
    first_error_line, node_text, parse_python, unquote,
};

/// Module dunders that describe the module rather than bind symbols.
const INFO_DUNDERS: &[&str] = &["__all__", "__version__", "__author__", "__doc__"];

/// Builtin constructors whose call result has a known constant type.
const TYPED_CONSTRUCTORS: &[&str] = &[
    "str",
    "int",
    "float",
    "bool",
    "bytes",
    "dict",
    "list",
    "tuple",
    "set",
    "frozenset",
];

/// Build a [`LoadedModule`] from source text.
///
/// # Errors
/// [`LoadError::Syntax`] when the tree has error nodes, [`LoadError::Parser`] when the
/// grammar cannot be loaded.
pub fn scan(identity: &str, source: &str, origin: Option<&Path>) -> Result<LoadedModule, LoadError> {
    let tree = parse_python(source).map_err(|e| LoadError::Parser(e.to_string()))?;
    let root = tree.root_node();
    if let Some(line) = first_error_line(root) {
        let path = origin
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(format!("<{identity}>")));
        return Err(LoadError::Syntax { path, line });
    }

    let mut info = ModuleInfo {
        identity: identity.to_owned(),
        origin: origin.map(Path::to_path_buf),
        doc: docstring(root, source),
        ..Default::default()
    };
    let mut namespace = Namespace::new();

    for stmt in block_statements(root) {
        if let Some(def) = as_definition(stmt, source) {
            let decorators = decorators(def.outer, source);
            let object = match def.kind {
                DefinitionKind::Class => ObjectDescriptor::Class(class_object(def.node, source)),
                DefinitionKind::Function => {
                    ObjectDescriptor::Function(function_object(def.node, decorators, source))
                }
            };
            namespace.insert(def.name, object);
            continue;
        }
        match stmt.kind() {
            "import_statement" => bind_import(stmt, source, &mut namespace),
            "import_from_statement" => bind_from_import(stmt, source, &mut namespace),
            "expression_statement" => {
                let mut cursor = stmt.walk();
                for expr in stmt.named_children(&mut cursor) {
                    if expr.kind() == "assignment" {
                        bind_assignment(expr, source, &mut namespace, &mut info);
                    }
                }
            }
            _ => {}
        }
    }

    log::debug!(
        "scanned '{}': {} top-level bindings",
        identity,
        namespace.len()
    );

    Ok(LoadedModule {
        info,
        namespace,
        source: Some(source.to_owned()),
    })
}

fn class_object(node: Node, source: &str) -> ClassObject {
    let mut class = ClassObject {
        bases: base_expressions(node, source),
        ..Default::default()
    };
    let Some(body) = node.child_by_field_name("body") else {
        return class;
    };
    class.doc = docstring(body, source);

    for def in block_definitions(body, source) {
        if def.kind != DefinitionKind::Function {
            continue;
        }
        let decorators = decorators(def.outer, source);
        if def.name == "__init__" {
            if let Some(init_body) = def.node.child_by_field_name("body") {
                collect_self_attributes(init_body, source, &mut class.attributes);
            }
        }
        class
            .methods
            .insert(def.name.clone(), function_object(def.node, decorators, source));
    }

    for stmt in block_statements(body) {
        if stmt.kind() != "expression_statement" {
            continue;
        }
        let mut cursor = stmt.walk();
        for expr in stmt.named_children(&mut cursor) {
            if expr.kind() != "assignment" {
                continue;
            }
            for target in assignment_targets(expr) {
                if target.kind() == "identifier" {
                    class.attributes.push(node_text(target, source).to_owned());
                }
            }
        }
    }

    class.attributes.sort();
    class.attributes.dedup();
    class
}

/// Positional entries of a class's superclass list, as written.
pub fn base_expressions(class_node: Node, source: &str) -> Vec<String> {
    let Some(args) = class_node.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .filter(|arg| !matches!(arg.kind(), "keyword_argument" | "comment" | "dictionary_splat"))
        .map(|arg| node_text(arg, source).to_owned())
        .collect()
}

/// `self.<name> = ...` targets anywhere inside `__init__`.
fn collect_self_attributes(body: Node, source: &str, out: &mut Vec<String>) {
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if matches!(child.kind(), "assignment" | "augmented_assignment") {
            for target in assignment_targets(child) {
                if let Some(name) = self_attribute(target, source) {
                    if !name.starts_with("__") {
                        out.push(name.to_owned());
                    }
                }
            }
        }
        // Nested function and class bodies belong to other scopes.
        if !matches!(child.kind(), "function_definition" | "class_definition" | "lambda") {
            collect_self_attributes(child, source, out);
        }
    }
}

fn self_attribute<'a>(target: Node<'a>, source: &'a str) -> Option<&'a str> {
    if target.kind() != "attribute" {
        return None;
    }
    let object = target.child_by_field_name("object")?;
    if object.kind() != "identifier" || node_text(object, source) != "self" {
        return None;
    }
    Some(node_text(target.child_by_field_name("attribute")?, source))
}

/// Every target of a (possibly chained) assignment: `a = b = 1` yields `a`, `b`.
/// Tuple targets are flattened.
fn assignment_targets(assignment: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut current = Some(assignment);
    while let Some(node) = current {
        if !matches!(node.kind(), "assignment" | "augmented_assignment") {
            break;
        }
        if let Some(left) = node.child_by_field_name("left") {
            flatten_target(left, &mut out);
        }
        current = node.child_by_field_name("right");
    }
    out
}

fn flatten_target<'t>(target: Node<'t>, out: &mut Vec<Node<'t>>) {
    match target.kind() {
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = target.walk();
            for child in target.named_children(&mut cursor) {
                flatten_target(child, out);
            }
        }
        _ => out.push(target),
    }
}

fn function_object(node: Node, decorators: Vec<String>, source: &str) -> FunctionObject {
    let mut cursor = node.walk();
    let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");
    let params = node
        .child_by_field_name("parameters")
        .map(|p| collapse_whitespace(node_text(p, source)))
        .unwrap_or_else(|| "()".to_owned());
    let signature = match node.child_by_field_name("return_type") {
        Some(ret) => format!("{params} -> {}", collapse_whitespace(node_text(ret, source))),
        None => params,
    };
    FunctionObject {
        module: None,
        signature: Some(signature),
        doc: node
            .child_by_field_name("body")
            .and_then(|body| docstring(body, source)),
        is_async,
        decorators,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bind_import(stmt: Node, source: &str, namespace: &mut Namespace) {
    let mut cursor = stmt.walk();
    for name in stmt.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            // `import a.b` binds `a`.
            "dotted_name" => {
                let full = node_text(name, source);
                let head = full.split('.').next().unwrap_or(full).trim();
                namespace.insert(
                    head.to_owned(),
                    ObjectDescriptor::Module {
                        name: head.to_owned(),
                    },
                );
            }
            // `import a.b as c` binds `c` to `a.b`.
            "aliased_import" => {
                let (Some(target), Some(alias)) = (
                    name.child_by_field_name("name"),
                    name.child_by_field_name("alias"),
                ) else {
                    continue;
                };
                namespace.insert(
                    node_text(alias, source).to_owned(),
                    ObjectDescriptor::Module {
                        name: node_text(target, source).to_owned(),
                    },
                );
            }
            _ => {}
        }
    }
}

fn bind_from_import(stmt: Node, source: &str, namespace: &mut Namespace) {
    let Some(module) = stmt.child_by_field_name("module_name") else {
        return;
    };
    let module = node_text(module, source);
    let mut cursor = stmt.walk();
    let mut bound = false;
    for name in stmt.children_by_field_name("name", &mut cursor) {
        let (imported, local) = match name.kind() {
            "dotted_name" => {
                let text = node_text(name, source);
                (text, text)
            }
            "aliased_import" => {
                let (Some(target), Some(alias)) = (
                    name.child_by_field_name("name"),
                    name.child_by_field_name("alias"),
                ) else {
                    continue;
                };
                (node_text(target, source), node_text(alias, source))
            }
            _ => continue,
        };
        let origin = if module.ends_with('.') {
            format!("{module}{imported}")
        } else {
            format!("{module}.{imported}")
        };
        namespace.insert(local.to_owned(), ObjectDescriptor::Imported { origin });
        bound = true;
    }
    if !bound {
        log::debug!("'from {module} import *' binds names that cannot be listed statically");
    }
}

fn bind_assignment(assignment: Node, source: &str, namespace: &mut Namespace, info: &mut ModuleInfo) {
    // Innermost right-hand side of a chained assignment.
    let mut value = assignment.child_by_field_name("right");
    while let Some(node) = value {
        if node.kind() != "assignment" {
            break;
        }
        value = node.child_by_field_name("right");
    }
    // A bare annotation (`x: int`) binds nothing.
    let Some(value) = value else {
        return;
    };

    let targets = assignment_targets(assignment);
    let unpacked = targets.len() > 1 && is_sequence_value(value);
    let values = if unpacked {
        let mut cursor = value.walk();
        value.named_children(&mut cursor).collect::<Vec<_>>()
    } else {
        Vec::new()
    };

    for (i, target) in targets.iter().enumerate() {
        if target.kind() != "identifier" {
            continue;
        }
        let name = node_text(*target, source);
        let rhs = if unpacked {
            values.get(i).copied()
        } else {
            Some(value)
        };
        if record_module_info(name, rhs, source, info) {
            continue;
        }
        let object = match rhs {
            Some(rhs) => describe_value(rhs, source, namespace),
            None => ObjectDescriptor::Value(ValueObject {
                type_name: "object".to_owned(),
                repr: None,
            }),
        };
        namespace.insert(name.to_owned(), object);
    }
}

fn is_sequence_value(node: Node) -> bool {
    matches!(node.kind(), "expression_list" | "tuple" | "list")
}

/// Store `__all__`/`__version__`/`__author__`/`__doc__` in `info`. Returns whether
/// `name` was one of them.
fn record_module_info(name: &str, value: Option<Node>, source: &str, info: &mut ModuleInfo) -> bool {
    if !INFO_DUNDERS.contains(&name) {
        return false;
    }
    let Some(value) = value else {
        return true;
    };
    let text = || unquote(node_text(value, source));
    match name {
        "__version__" => info.version = text(),
        "__author__" => info.author = text(),
        "__doc__" => info.doc = text(),
        "__all__" => {
            if matches!(value.kind(), "list" | "tuple") {
                let mut cursor = value.walk();
                let names = value
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "string")
                    .filter_map(|c| unquote(node_text(c, source)))
                    .collect();
                info.all = Some(names);
            }
        }
        _ => {}
    }
    true
}

/// What a name bound to `value` would hold.
fn describe_value(value: Node, source: &str, namespace: &Namespace) -> ObjectDescriptor {
    let text = node_text(value, source);
    let constant = |type_name: &str| {
        ObjectDescriptor::Value(ValueObject {
            type_name: type_name.to_owned(),
            repr: Some(collapse_whitespace(text)),
        })
    };
    match value.kind() {
        "string" | "concatenated_string" => {
            let prefix: String = text.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
            if prefix.contains(['b', 'B']) {
                constant("bytes")
            } else {
                constant("str")
            }
        }
        "integer" => constant("int"),
        "float" => constant("float"),
        "true" | "false" => constant("bool"),
        "none" => constant("NoneType"),
        "dictionary" | "dictionary_comprehension" => constant("dict"),
        "list" | "list_comprehension" => constant("list"),
        "tuple" | "expression_list" => constant("tuple"),
        "set" | "set_comprehension" => constant("set"),
        "unary_operator" => match value.child_by_field_name("argument").map(|a| a.kind()) {
            Some("integer") => constant("int"),
            Some("float") => constant("float"),
            _ => opaque("object"),
        },
        "parenthesized_expression" => match value.named_child(0) {
            Some(inner) => describe_value(inner, source, namespace),
            None => opaque("object"),
        },
        "lambda" => ObjectDescriptor::Function(FunctionObject {
            signature: Some(match value.child_by_field_name("parameters") {
                Some(params) => format!("({})", collapse_whitespace(node_text(params, source))),
                None => "()".to_owned(),
            }),
            ..Default::default()
        }),
        // `Alias = Base` binds the same object.
        "identifier" => namespace
            .get(text)
            .cloned()
            .unwrap_or_else(|| opaque("object")),
        "call" => {
            let callee = value
                .child_by_field_name("function")
                .map(|f| node_text(f, source))
                .unwrap_or("");
            if TYPED_CONSTRUCTORS.contains(&callee) {
                return constant(callee);
            }
            match namespace.get(callee) {
                Some(ObjectDescriptor::Class(_)) => opaque(callee),
                _ => opaque("object"),
            }
        }
        _ => opaque("object"),
    }
}

fn opaque(type_name: &str) -> ObjectDescriptor {
    ObjectDescriptor::Value(ValueObject {
        type_name: type_name.to_owned(),
        repr: None,
    })
}
