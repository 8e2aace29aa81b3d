use serde::Serialize;

/// The kind of a directed reference from a using symbol to a used symbol.
///
/// Declaration order is the export order (`full_export` sorts by kind after `from`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Class -> Class: `class Child(Base)`.
    InheritsFrom,
    /// Symbol -> Class: a call whose callee resolves to a class.
    Instantiates,
    /// Symbol -> Function: a call whose callee resolves to a function or method.
    CallsFunction,
    /// Symbol -> Symbol: the target appears in a parameter, return or variable annotation.
    TypeHintReferences,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::InheritsFrom,
        RelationKind::Instantiates,
        RelationKind::CallsFunction,
        RelationKind::TypeHintReferences,
    ];

    /// Label from the using side (USES).
    pub fn label(&self) -> &'static str {
        match self {
            RelationKind::InheritsFrom => "Inherits From",
            RelationKind::Instantiates => "Instantiates",
            RelationKind::CallsFunction => "Calls",
            RelationKind::TypeHintReferences => "Type Hint References",
        }
    }

    /// Label from the used side (USED BY).
    pub fn reverse_label(&self) -> &'static str {
        match self {
            RelationKind::InheritsFrom => "Inherited By",
            RelationKind::Instantiates => "Instantiated By",
            RelationKind::CallsFunction => "Called By",
            RelationKind::TypeHintReferences => "Type-Hinted By",
        }
    }

    /// Stable machine-readable tag used in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::InheritsFrom => "inherits_from",
            RelationKind::Instantiates => "instantiates",
            RelationKind::CallsFunction => "calls_function",
            RelationKind::TypeHintReferences => "type_hint_references",
        }
    }
}

/// One resolved reference. Edges are never merged: each call site, base entry and
/// annotation keeps its own record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionEdge {
    /// Qualified name of the using symbol.
    pub from: String,
    /// Qualified name of the used symbol.
    pub to: String,
    pub kind: RelationKind,
    /// 1-based source line of the reference.
    pub line: usize,
    /// The method of `from` the reference occurred in, if any.
    pub via: Option<String>,
}

impl ConnectionEdge {
    /// Total order used by `full_export`: from, kind, to, line, via.
    pub fn export_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.from
            .cmp(&other.from)
            .then(self.kind.cmp(&other.kind))
            .then_with(|| self.to.cmp(&other.to))
            .then(self.line.cmp(&other.line))
            .then_with(|| self.via.cmp(&other.via))
    }
}
