use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::graph::edge::{ConnectionEdge, RelationKind};
use crate::graph::node::{SymbolDetail, SymbolKind};
use crate::parser::references::{RawReference, ReferenceKind};
use crate::symbols::SymbolTable;

/// Outcome of looking a referenced name up in the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The name maps to exactly one module symbol.
    Resolved(String),
    /// The head segment is an imported name or bound module.
    Foreign(String),
    /// Nothing in the module matches.
    Unresolved,
    /// Several members match; the resolver never guesses.
    Ambiguous(Vec<String>),
}

/// Statistics collected during resolution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveStats {
    /// References turned into edges.
    pub resolved: usize,
    /// References rooted at imported names.
    pub foreign: usize,
    /// References to names the module does not define.
    pub unresolved: usize,
    /// References matching more than one member.
    pub ambiguous: usize,
    /// Resolved references dropped for a kind mismatch (e.g. inheriting from a
    /// function, calling a constant) or for pointing at their own source.
    pub rejected: usize,
}

/// Maps raw reference names to symbols of one module.
pub struct SymbolResolver<'a> {
    table: &'a SymbolTable,
    /// `<identity>.`, stripped from fully qualified references.
    prefix: String,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self {
            table,
            prefix: format!("{}.", table.identity()),
        }
    }

    fn strip_identity<'n>(&self, name: &'n str) -> &'n str {
        match name.strip_prefix(&self.prefix) {
            Some(rest) if !rest.is_empty() => rest,
            _ => name,
        }
    }

    /// Resolve a possibly dotted name.
    ///
    /// An exact qualified-name match wins. An undotted miss falls back to every symbol
    /// with that bare name. For a dotted name the head segment must be a module-level
    /// symbol, and the last segment is looked up among members of the head class and
    /// its in-module ancestors.
    pub fn resolve_name(&self, name: &str) -> Resolution {
        let name = self.strip_identity(name);
        let head = name.split('.').next().unwrap_or(name);

        if self.table.is_foreign(head) {
            return Resolution::Foreign(head.to_owned());
        }
        let Some((_, last)) = name.rsplit_once('.') else {
            if self.table.get(name).is_some_and(|d| d.owner.is_none()) {
                return Resolution::Resolved(name.to_owned());
            }
            return pick(self.table.bare(name).to_vec());
        };
        let head_is_symbol = self.table.get(head).is_some_and(|d| d.owner.is_none());
        if !head_is_symbol {
            return Resolution::Unresolved;
        }
        if self.table.contains(name) {
            return Resolution::Resolved(name.to_owned());
        }

        let mut owners: HashSet<String> = self.ancestors(head).into_iter().collect();
        owners.insert(head.to_owned());
        let candidates: Vec<String> = self
            .table
            .bare(last)
            .iter()
            .filter(|q| {
                self.table
                    .get(q)
                    .and_then(|d| d.owner.as_ref())
                    .is_some_and(|owner| owners.contains(owner))
            })
            .cloned()
            .collect();
        pick(candidates)
    }

    /// Resolve a base-class expression to an in-module class. Exact matches only.
    pub fn resolve_base(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        // `Generic[T]` inherits from `Generic`.
        let raw = raw.split_once('[').map_or(raw, |(head, _)| head).trim();
        let name = self.strip_identity(raw);
        let desc = self.table.get(name)?;
        (desc.kind() == SymbolKind::Class && desc.owner.is_none()).then(|| name.to_owned())
    }

    /// In-module ancestors of `class`, breadth-first, each listed once. Cycles in the
    /// base graph terminate.
    pub fn ancestors(&self, class: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([class.to_owned()]);
        let mut queue: VecDeque<String> = VecDeque::from([class.to_owned()]);
        while let Some(current) = queue.pop_front() {
            let Some(SymbolDetail::Class(info)) = self.table.get(&current).map(|d| &d.detail) else {
                continue;
            };
            for base in &info.bases {
                if let Some(resolved) = self.resolve_base(base) {
                    if visited.insert(resolved.clone()) {
                        out.push(resolved.clone());
                        queue.push_back(resolved);
                    }
                }
            }
        }
        out
    }

    /// Raw base names of `class` and every in-module ancestor that do not resolve
    /// in-module.
    pub fn external_ancestry(&self, class: &str) -> BTreeSet<String> {
        let mut lineage = self.ancestors(class);
        lineage.push(class.to_owned());
        lineage
            .iter()
            .filter_map(|c| self.table.get(c).and_then(|d| d.as_class()))
            .flat_map(|info| info.bases.iter())
            .filter(|b| self.resolve_base(b).is_none())
            .cloned()
            .collect()
    }

    /// Turn one raw reference into an edge, or `None` when it is dropped.
    pub fn resolve(&self, raw: RawReference, stats: &mut ResolveStats) -> Option<ConnectionEdge> {
        let target = match self.resolve_name(&raw.name) {
            Resolution::Resolved(target) => target,
            Resolution::Foreign(head) => {
                stats.foreign += 1;
                log::debug!("{}: '{}' is foreign (via '{}')", raw.from, raw.name, head);
                return None;
            }
            Resolution::Unresolved => {
                stats.unresolved += 1;
                log::debug!("{}: '{}' unresolved", raw.from, raw.name);
                return None;
            }
            Resolution::Ambiguous(candidates) => {
                stats.ambiguous += 1;
                log::debug!(
                    "{}: '{}' ambiguous between {}",
                    raw.from,
                    raw.name,
                    candidates.join(", ")
                );
                return None;
            }
        };

        let target_kind = self.table.get(&target).map(|d| d.kind());
        let kind = match (raw.kind, target_kind) {
            (ReferenceKind::InheritsFrom, Some(SymbolKind::Class)) => RelationKind::InheritsFrom,
            (ReferenceKind::CallOrInstantiate, Some(SymbolKind::Class)) => RelationKind::Instantiates,
            (ReferenceKind::CallOrInstantiate, Some(SymbolKind::Function)) => RelationKind::CallsFunction,
            (ReferenceKind::TypeHint, Some(_)) => RelationKind::TypeHintReferences,
            _ => {
                stats.rejected += 1;
                log::debug!(
                    "{}: '{}' resolved to '{}' of the wrong kind for {:?}",
                    raw.from,
                    raw.name,
                    target,
                    raw.kind
                );
                return None;
            }
        };

        if target == raw.from && kind != RelationKind::InheritsFrom {
            stats.rejected += 1;
            log::debug!("{}: dropping self-reference", raw.from);
            return None;
        }

        stats.resolved += 1;
        Some(ConnectionEdge {
            from: raw.from,
            to: target,
            kind,
            line: raw.line,
            via: raw.via,
        })
    }
}

fn pick(mut candidates: Vec<String>) -> Resolution {
    match candidates.len() {
        0 => Resolution::Unresolved,
        1 => Resolution::Resolved(candidates.remove(0)),
        _ => Resolution::Ambiguous(candidates),
    }
}

/// Resolve a batch of raw references, preserving their order.
pub fn resolve_all(
    table: &SymbolTable,
    references: impl IntoIterator<Item = RawReference>,
) -> (Vec<ConnectionEdge>, ResolveStats) {
    let resolver = SymbolResolver::new(table);
    let mut stats = ResolveStats::default();
    let edges: Vec<ConnectionEdge> = references
        .into_iter()
        .filter_map(|raw| resolver.resolve(raw, &mut stats))
        .collect();
    log::debug!(
        "resolution: {} resolved, {} foreign, {} unresolved, {} ambiguous, {} rejected",
        stats.resolved,
        stats.foreign,
        stats.unresolved,
        stats.ambiguous,
        stats.rejected
    );
    (edges, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::namespace::{ClassObject, FunctionObject, Namespace, ObjectDescriptor, ValueObject};
    use crate::symbols::BuildOptions;

    fn class(bases: &[&str], methods: &[&str]) -> ObjectDescriptor {
        ObjectDescriptor::Class(ClassObject {
            bases: bases.iter().map(|b| b.to_string()).collect(),
            methods: methods
                .iter()
                .map(|m| (m.to_string(), FunctionObject::default()))
                .collect(),
            ..Default::default()
        })
    }

    fn table() -> SymbolTable {
        let mut ns = Namespace::new();
        ns.insert("Base".into(), class(&["Exception"], &["run", "shared"]));
        ns.insert("Mixin".into(), class(&[], &["shared"]));
        ns.insert("Child".into(), class(&["Base", "Mixin"], &["tick"]));
        ns.insert("Loop".into(), class(&["Loop"], &[]));
        ns.insert("helper".into(), ObjectDescriptor::Function(FunctionObject::default()));
        ns.insert(
            "LIMIT".into(),
            ObjectDescriptor::Value(ValueObject {
                type_name: "int".into(),
                repr: Some("3".into()),
            }),
        );
        ns.insert("requests".into(), ObjectDescriptor::Module { name: "requests".into() });
        SymbolTable::build("pkg.mod", &ns, &BuildOptions::default())
    }

    fn raw(from: &str, name: &str, kind: ReferenceKind) -> RawReference {
        RawReference {
            from: from.into(),
            name: name.into(),
            kind,
            line: 1,
            via: None,
        }
    }

    #[test]
    fn test_resolve_name_rules() {
        let table = table();
        let r = SymbolResolver::new(&table);
        assert_eq!(r.resolve_name("Base"), Resolution::Resolved("Base".into()));
        assert_eq!(r.resolve_name("pkg.mod.Base"), Resolution::Resolved("Base".into()));
        assert_eq!(r.resolve_name("Base.run"), Resolution::Resolved("Base.run".into()));
        assert_eq!(r.resolve_name("Child.run"), Resolution::Resolved("Base.run".into()));
        assert_eq!(r.resolve_name("requests.get"), Resolution::Foreign("requests".into()));
        assert_eq!(r.resolve_name("unknown"), Resolution::Unresolved);
        assert_eq!(r.resolve_name("Child.missing"), Resolution::Unresolved);
        assert!(matches!(r.resolve_name("Child.shared"), Resolution::Ambiguous(c) if c.len() == 2));
    }

    #[test]
    fn test_undotted_name_falls_back_to_bare_table() {
        let table = table();
        let r = SymbolResolver::new(&table);
        assert_eq!(r.resolve_name("tick"), Resolution::Resolved("Child.tick".into()));
        assert_eq!(r.resolve_name("run"), Resolution::Resolved("Base.run".into()));
        assert_eq!(
            r.resolve_name("shared"),
            Resolution::Ambiguous(vec!["Base.shared".into(), "Mixin.shared".into()])
        );

        let (edges, stats) = resolve_all(
            &table,
            vec![
                raw("helper", "tick", ReferenceKind::CallOrInstantiate),
                raw("helper", "shared", ReferenceKind::CallOrInstantiate),
            ],
        );
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, "Child.tick");
        assert_eq!(edges[0].kind, RelationKind::CallsFunction);
        assert_eq!(stats.ambiguous, 1);
    }

    #[test]
    fn test_kinds_follow_target() {
        let table = table();
        let refs = vec![
            raw("Child", "Base", ReferenceKind::InheritsFrom),
            raw("Child", "helper", ReferenceKind::CallOrInstantiate),
            raw("helper", "Child", ReferenceKind::CallOrInstantiate),
            raw("helper", "LIMIT", ReferenceKind::CallOrInstantiate),
            raw("helper", "helper", ReferenceKind::CallOrInstantiate),
            raw("Child", "helper", ReferenceKind::InheritsFrom),
            raw("helper", "Base", ReferenceKind::TypeHint),
            raw("helper", "requests.get", ReferenceKind::CallOrInstantiate),
        ];
        let (edges, stats) = resolve_all(&table, refs);
        let kinds: Vec<(String, RelationKind)> =
            edges.iter().map(|e| (e.to.clone(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("Base".to_string(), RelationKind::InheritsFrom),
                ("helper".to_string(), RelationKind::CallsFunction),
                ("Child".to_string(), RelationKind::Instantiates),
                ("Base".to_string(), RelationKind::TypeHintReferences),
            ]
        );
        assert_eq!(stats.resolved, 4);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.foreign, 1);
    }

    #[test]
    fn test_self_inheritance_is_kept() {
        let table = table();
        let (edges, _) = resolve_all(&table, vec![raw("Loop", "Loop", ReferenceKind::InheritsFrom)]);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_ancestors_and_external_bases() {
        let table = table();
        let r = SymbolResolver::new(&table);
        assert_eq!(r.ancestors("Child"), vec!["Base".to_string(), "Mixin".to_string()]);
        assert!(r.ancestors("Loop").is_empty());
        assert_eq!(
            r.external_ancestry("Child").into_iter().collect::<Vec<_>>(),
            vec!["Exception".to_string()]
        );
        assert_eq!(r.resolve_base("Base[int]").as_deref(), Some("Base"));
        assert_eq!(r.resolve_base("helper"), None);
    }
}
