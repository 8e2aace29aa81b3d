pub mod signature;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::MetadataError;
use crate::graph::node::{
    ClassInfo, ConstantInfo, FunctionInfo, MethodKind, SymbolDescriptor, SymbolDetail, SymbolKind,
    is_private,
};
use crate::loader::namespace::{ClassObject, FunctionObject, Namespace, ObjectDescriptor, ValueObject};

/// Value types registered as constants. Anything else non-callable counts as "other".
pub const CONSTANT_TYPES: &[&str] = &[
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
    "NoneType",
];

/// Knobs for [`SymbolTable::build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Constant reprs longer than this many characters are truncated with `...`.
    pub max_repr: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { max_repr: 50 }
    }
}

/// Immutable registry of every symbol defined in one module.
///
/// Built once from the loaded namespace; owns its descriptors exclusively.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    identity: String,
    symbols: BTreeMap<String, SymbolDescriptor>,
    /// Bare name -> sorted qualified names sharing it.
    bare: BTreeMap<String, Vec<String>>,
    public: BTreeSet<String>,
    internal: BTreeSet<String>,
    /// Imported names and bound modules, mapped to their dotted origin.
    foreign: BTreeMap<String, String>,
    /// Names bound to values of no registered kind, mapped to their type name.
    others: BTreeMap<String, String>,
}

impl SymbolTable {
    /// Build the table from a namespace. Never fails: a symbol whose metadata cannot be
    /// extracted is registered with a degraded descriptor instead.
    pub fn build(identity: &str, namespace: &Namespace, options: &BuildOptions) -> SymbolTable {
        let mut table = SymbolTable {
            identity: identity.to_owned(),
            ..Default::default()
        };

        for (name, object) in namespace {
            if let Some(origin) = foreign_origin(identity, name, object) {
                table.foreign.insert(name.clone(), origin);
                continue;
            }
            match object {
                ObjectDescriptor::Class(class) => table.register_class(name, class),
                ObjectDescriptor::Function(function) => {
                    let desc = function_descriptor(name.clone(), name, None, function);
                    table.insert(desc);
                }
                ObjectDescriptor::Value(value) => {
                    if CONSTANT_TYPES.contains(&value.type_name.as_str()) {
                        table.insert(constant_descriptor(name, value, options.max_repr));
                    } else {
                        table.others.insert(name.clone(), value.type_name.clone());
                    }
                }
                // Handled by foreign_origin.
                ObjectDescriptor::Module { .. } | ObjectDescriptor::Imported { .. } => {}
            }
        }

        for names in table.bare.values_mut() {
            names.sort();
        }

        log::info!(
            "symbol table for '{}': {} symbols ({} public), {} foreign names, {} others",
            identity,
            table.symbols.len(),
            table.public.len(),
            table.foreign.len(),
            table.others.len()
        );
        table
    }

    fn register_class(&mut self, name: &str, class: &ClassObject) {
        match class_info(class) {
            Ok(info) => {
                for (method_name, method) in &class.methods {
                    let qualified = format!("{name}.{method_name}");
                    self.insert(function_descriptor(qualified, method_name, Some(name), method));
                }
                self.insert(SymbolDescriptor {
                    qualified_name: name.to_owned(),
                    name: name.to_owned(),
                    owner: None,
                    detail: SymbolDetail::Class(info),
                    degraded: None,
                });
            }
            Err(err) => {
                log::warn!("degraded class '{name}': {err}");
                self.insert(SymbolDescriptor {
                    qualified_name: name.to_owned(),
                    name: name.to_owned(),
                    owner: None,
                    detail: SymbolDetail::Class(ClassInfo::default()),
                    degraded: Some(err.to_string()),
                });
            }
        }
    }

    fn insert(&mut self, desc: SymbolDescriptor) {
        if is_private(&desc.qualified_name) {
            self.internal.insert(desc.qualified_name.clone());
        } else {
            self.public.insert(desc.qualified_name.clone());
        }
        self.bare
            .entry(desc.name.clone())
            .or_default()
            .push(desc.qualified_name.clone());
        self.symbols.insert(desc.qualified_name.clone(), desc);
    }

    /// Dotted identity of the module this table describes.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, qualified_name: &str) -> Option<&SymbolDescriptor> {
        self.symbols.get(qualified_name)
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.symbols.contains_key(qualified_name)
    }

    /// Every descriptor, ordered by qualified name.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolDescriptor> {
        self.symbols.values()
    }

    /// Module-level symbols (everything except methods).
    pub fn top_level(&self) -> impl Iterator<Item = &SymbolDescriptor> {
        self.symbols.values().filter(|d| d.owner.is_none())
    }

    /// Method descriptors owned by `class`, ordered by name.
    pub fn methods_of<'a>(&'a self, class: &str) -> impl Iterator<Item = &'a SymbolDescriptor> + use<'a> {
        let prefix = format!("{class}.");
        let owner = class.to_owned();
        self.symbols
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .map(|(_, desc)| desc)
            .filter(move |desc| desc.owner.as_deref() == Some(owner.as_str()))
    }

    /// Descriptors of one kind, ordered by qualified name. Methods are included for
    /// [`SymbolKind::Function`].
    pub fn by_kind(&self, kind: SymbolKind) -> Vec<&SymbolDescriptor> {
        self.symbols.values().filter(|d| d.kind() == kind).collect()
    }

    /// Qualified names whose bare name is `name`, sorted.
    pub fn bare(&self, name: &str) -> &[String] {
        self.bare.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_public(&self, qualified_name: &str) -> bool {
        self.public.contains(qualified_name)
    }

    pub fn public_names(&self) -> impl Iterator<Item = &String> {
        self.public.iter()
    }

    pub fn internal_names(&self) -> impl Iterator<Item = &String> {
        self.internal.iter()
    }

    /// Whether `name` is bound to an imported object or module.
    pub fn is_foreign(&self, name: &str) -> bool {
        self.foreign.contains_key(name)
    }

    pub fn foreign(&self) -> &BTreeMap<String, String> {
        &self.foreign
    }

    pub fn others(&self) -> &BTreeMap<String, String> {
        &self.others
    }

    /// Descriptors that carry a degradation reason.
    pub fn degraded(&self) -> impl Iterator<Item = &SymbolDescriptor> {
        self.symbols.values().filter(|d| d.degraded.is_some())
    }
}

/// The dotted origin of a name whose object was not defined in `identity`, if so.
fn foreign_origin(identity: &str, name: &str, object: &ObjectDescriptor) -> Option<String> {
    match object {
        ObjectDescriptor::Module { name: module } => Some(module.clone()),
        ObjectDescriptor::Imported { origin } => Some(origin.clone()),
        ObjectDescriptor::Class(ClassObject { module: Some(m), .. })
        | ObjectDescriptor::Function(FunctionObject { module: Some(m), .. })
            if m != identity =>
        {
            Some(format!("{m}.{name}"))
        }
        _ => None,
    }
}

fn class_info(class: &ClassObject) -> Result<ClassInfo, MetadataError> {
    let mut bases = Vec::with_capacity(class.bases.len());
    for (i, base) in class.bases.iter().enumerate() {
        let base = base.trim();
        if base.is_empty() {
            return Err(MetadataError::EmptyBase(i));
        }
        bases.push(base.to_owned());
    }
    let mut attributes = class.attributes.clone();
    attributes.sort();
    attributes.dedup();
    Ok(ClassInfo {
        bases,
        methods: class.methods.keys().cloned().collect(),
        attributes,
        doc: class.doc.clone(),
    })
}

fn function_descriptor(
    qualified_name: String,
    name: &str,
    owner: Option<&str>,
    function: &FunctionObject,
) -> SymbolDescriptor {
    let method_kind = owner.map(|_| method_kind(&function.decorators));
    let parsed = match function.signature.as_deref() {
        Some(text) => signature::parse_signature(text).map(Some),
        None => Ok(None),
    };
    match parsed {
        Ok(sig) => {
            let sig = sig.unwrap_or_default();
            SymbolDescriptor {
                qualified_name,
                name: name.to_owned(),
                owner: owner.map(str::to_owned),
                detail: SymbolDetail::Function(FunctionInfo {
                    params: sig.params,
                    returns: sig.returns,
                    doc: function.doc.clone(),
                    method_kind,
                    is_async: function.is_async,
                }),
                degraded: None,
            }
        }
        Err(err) => {
            log::warn!("degraded function '{qualified_name}': {err}");
            SymbolDescriptor {
                qualified_name,
                name: name.to_owned(),
                owner: owner.map(str::to_owned),
                detail: SymbolDetail::Function(FunctionInfo::default()),
                degraded: Some(err.to_string()),
            }
        }
    }
}

fn constant_descriptor(name: &str, value: &ValueObject, max_repr: usize) -> SymbolDescriptor {
    SymbolDescriptor {
        qualified_name: name.to_owned(),
        name: name.to_owned(),
        owner: None,
        detail: SymbolDetail::Constant(ConstantInfo {
            type_name: value.type_name.clone(),
            repr: value.repr.as_deref().map(|r| truncate(r, max_repr)),
        }),
        degraded: None,
    }
}

fn truncate(repr: &str, max: usize) -> String {
    if repr.chars().count() <= max {
        return repr.to_owned();
    }
    let mut out: String = repr.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Method binding from decorator text.
fn method_kind(decorators: &[String]) -> MethodKind {
    for decorator in decorators {
        let bare = decorator.rsplit('.').next().unwrap_or(decorator);
        match bare {
            "staticmethod" => return MethodKind::Static,
            "classmethod" => return MethodKind::Class,
            "property" | "cached_property" | "setter" | "getter" | "deleter" => {
                return MethodKind::Property;
            }
            _ => {}
        }
    }
    MethodKind::Instance
}
