use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A module's root namespace: every bound name mapped to a description of its object.
///
/// Ordered by name, like `dir(module)`. Later bindings of the same name replace earlier ones.
pub type Namespace = BTreeMap<String, ObjectDescriptor>;

/// A description of the object bound to one namespace name.
///
/// This is the shape both loader backends produce and the shape namespace manifests use
/// on disk (`{"type": "class", ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectDescriptor {
    /// A class object.
    Class(ClassObject),
    /// A plain function (or builtin callable).
    Function(FunctionObject),
    /// Any other value: numbers, strings, containers, instances.
    Value(ValueObject),
    /// A bound module object (`import os`).
    Module {
        /// Dotted name of the bound module.
        name: String,
    },
    /// A name bound by `from x import y` whose object was not inspected.
    Imported {
        /// Dotted origin, e.g. `collections.OrderedDict`.
        origin: String,
    },
}

/// Class metadata as seen at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassObject {
    /// Defining module. `None` means "defined in the loaded module itself".
    #[serde(default)]
    pub module: Option<String>,
    /// Base class expressions as written, in declaration order.
    #[serde(default)]
    pub bases: Vec<String>,
    /// Methods defined directly in the class body.
    #[serde(default)]
    pub methods: BTreeMap<String, FunctionObject>,
    /// Class-level and `__init__`-assigned attribute names.
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub doc: Option<String>,
}

/// Function metadata as seen at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionObject {
    /// Defining module. `None` means "defined in the loaded module itself".
    #[serde(default)]
    pub module: Option<String>,
    /// Signature text in `inspect.signature` form: `(a, b: int = 3) -> str`.
    /// `None` when no signature could be obtained (builtins).
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub is_async: bool,
    /// Decorator expressions without the leading `@`.
    #[serde(default)]
    pub decorators: Vec<String>,
}

/// A non-callable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueObject {
    /// Python type name, e.g. `int`, `dict`, `Config`.
    pub type_name: String,
    /// Value representation, if one is available.
    #[serde(default)]
    pub repr: Option<String>,
}

impl ObjectDescriptor {
    /// The module this object was defined in, when the descriptor records one.
    pub fn defining_module(&self) -> Option<&str> {
        match self {
            ObjectDescriptor::Class(c) => c.module.as_deref(),
            ObjectDescriptor::Function(f) => f.module.as_deref(),
            ObjectDescriptor::Module { name } => Some(name),
            ObjectDescriptor::Imported { origin } => Some(origin),
            ObjectDescriptor::Value(_) => None,
        }
    }
}
