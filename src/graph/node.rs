use serde::Serialize;

/// The kind of symbol registered in the symbol table. Fixed at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// A class defined in the module.
    Class,
    /// A module-level function or a method (methods carry an `owner`).
    Function,
    /// A module-level constant of a plain data type.
    Constant,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Constant => "constant",
        }
    }

    /// Parse a CLI filter string. Case-insensitive.
    pub fn from_str_loose(s: &str) -> Option<SymbolKind> {
        match s.to_lowercase().as_str() {
            "class" | "classes" => Some(SymbolKind::Class),
            "function" | "functions" | "def" | "method" | "methods" => Some(SymbolKind::Function),
            "constant" | "constants" | "const" => Some(SymbolKind::Constant),
            _ => None,
        }
    }
}

/// How a function parameter binds arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    PositionalOnly,
    Positional,
    /// `*args`
    VarPositional,
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

/// One entry of a function's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<String>,
    pub has_default: bool,
    pub kind: ParamKind,
}

/// How a method is bound, derived from its decorators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Instance,
    Class,
    Static,
    Property,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    /// Base references by name, before resolution, in declaration order.
    pub bases: Vec<String>,
    /// Method names; each has its own `Class.method` descriptor in the symbol table.
    pub methods: Vec<String>,
    /// Declared attribute names (class level and `__init__` assignments), sorted.
    pub attributes: Vec<String>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionInfo {
    pub params: Vec<Parameter>,
    pub returns: Option<String>,
    pub doc: Option<String>,
    /// `Some` for methods only.
    pub method_kind: Option<MethodKind>,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantInfo {
    pub type_name: String,
    /// Value repr, truncated for display.
    pub repr: Option<String>,
}

/// Kind-specific metadata of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolDetail {
    Class(ClassInfo),
    Function(FunctionInfo),
    Constant(ConstantInfo),
}

/// An immutable description of one module symbol, owned by the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolDescriptor {
    /// Unique within the module: `Name` or `Class.method`.
    pub qualified_name: String,
    /// The bare name as it appears in source.
    pub name: String,
    /// Enclosing class for methods.
    pub owner: Option<String>,
    pub detail: SymbolDetail,
    /// Set when metadata extraction failed; `detail` is then empty for its kind.
    pub degraded: Option<String>,
}

impl SymbolDescriptor {
    pub fn kind(&self) -> SymbolKind {
        match self.detail {
            SymbolDetail::Class(_) => SymbolKind::Class,
            SymbolDetail::Function(_) => SymbolKind::Function,
            SymbolDetail::Constant(_) => SymbolKind::Constant,
        }
    }

    pub fn is_method(&self) -> bool {
        self.owner.is_some()
    }

    pub fn as_class(&self) -> Option<&ClassInfo> {
        match &self.detail {
            SymbolDetail::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionInfo> {
        match &self.detail {
            SymbolDetail::Function(info) => Some(info),
            _ => None,
        }
    }

    /// Human-readable signature: `(a, b: int = ...) -> str`. `None` for non-functions.
    pub fn signature(&self) -> Option<String> {
        let info = self.as_function()?;
        let mut parts: Vec<String> = Vec::new();
        let mut star_emitted = false;
        for (i, p) in info.params.iter().enumerate() {
            let mut s = match p.kind {
                ParamKind::VarPositional => {
                    star_emitted = true;
                    format!("*{}", p.name)
                }
                ParamKind::VarKeyword => format!("**{}", p.name),
                ParamKind::KeywordOnly if !star_emitted => {
                    star_emitted = true;
                    parts.push("*".to_owned());
                    p.name.clone()
                }
                _ => p.name.clone(),
            };
            if let Some(ann) = &p.annotation {
                s.push_str(": ");
                s.push_str(ann);
            }
            if p.has_default {
                s.push_str(if p.annotation.is_some() { " = ..." } else { "=..." });
            }
            parts.push(s);
            let next_is_positional_only = info
                .params
                .get(i + 1)
                .is_some_and(|n| n.kind == ParamKind::PositionalOnly);
            if p.kind == ParamKind::PositionalOnly && !next_is_positional_only {
                parts.push("/".to_owned());
            }
        }
        let mut sig = format!("({})", parts.join(", "));
        if let Some(ret) = &info.returns {
            sig.push_str(" -> ");
            sig.push_str(ret);
        }
        Some(sig)
    }
}

/// Whether a qualified name is private for display purposes.
///
/// A segment is private when it starts with `_` and is not a dunder (`__init__`).
pub fn is_private(qualified_name: &str) -> bool {
    qualified_name.split('.').any(|seg| {
        let dunder = seg.len() > 4 && seg.starts_with("__") && seg.ends_with("__");
        seg.starts_with('_') && !dunder
    })
}
