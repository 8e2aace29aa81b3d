use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::analysis::Analysis;
use crate::error::QueryError;
use crate::graph::node::SymbolKind;
use crate::resolver::SymbolResolver;

/// One node of the inheritance forest. Children are the node's bases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InheritanceNode {
    /// A class defined in the module.
    Class {
        name: String,
        bases: Vec<InheritanceNode>,
    },
    /// A base that does not resolve to a module class, shown by its raw name.
    External { name: String },
    /// A class already on the current path; not descended again.
    Cycle { name: String },
}

impl InheritanceNode {
    pub fn name(&self) -> &str {
        match self {
            InheritanceNode::Class { name, .. }
            | InheritanceNode::External { name }
            | InheritanceNode::Cycle { name } => name,
        }
    }

    pub fn children(&self) -> &[InheritanceNode] {
        match self {
            InheritanceNode::Class { bases, .. } => bases,
            _ => &[],
        }
    }
}

/// Base names that mark a class as an exception type.
const EXCEPTION_ROOTS: &[&str] = &["BaseException", "Exception"];
const EXCEPTION_SUFFIXES: &[&str] = &["Error", "Exception", "Warning"];

struct TreeBuilder<'a> {
    analysis: &'a Analysis,
    resolver: SymbolResolver<'a>,
    /// Classes allowed in the tree; `None` means all.
    allowed: Option<&'a BTreeSet<String>>,
    visited: HashSet<String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(analysis: &'a Analysis, allowed: Option<&'a BTreeSet<String>>) -> Self {
        Self {
            analysis,
            resolver: SymbolResolver::new(analysis.table()),
            allowed,
            visited: HashSet::new(),
        }
    }

    fn is_allowed(&self, class: &str) -> bool {
        self.allowed.is_none_or(|set| set.contains(class))
    }

    fn node(&mut self, class: &str, path: &mut Vec<String>) -> InheritanceNode {
        if path.iter().any(|p| p == class) {
            return InheritanceNode::Cycle {
                name: class.to_owned(),
            };
        }
        self.visited.insert(class.to_owned());
        path.push(class.to_owned());

        let raw_bases: Vec<String> = self
            .analysis
            .table()
            .get(class)
            .and_then(|d| d.as_class())
            .map(|info| info.bases.clone())
            .unwrap_or_default();
        let mut bases = Vec::new();
        for raw in raw_bases {
            match self.resolver.resolve_base(&raw) {
                Some(base) if self.is_allowed(&base) => bases.push(self.node(&base, path)),
                Some(_) => {}
                None => bases.push(InheritanceNode::External { name: raw }),
            }
        }

        path.pop();
        InheritanceNode::Class {
            name: class.to_owned(),
            bases,
        }
    }

    /// Classes in scope, sorted, that are no other in-scope class's in-module base;
    /// followed by anything left unvisited (pure cycles).
    fn forest(&mut self) -> Vec<InheritanceNode> {
        let classes: Vec<String> = self
            .analysis
            .table()
            .top_level()
            .filter(|d| d.kind() == SymbolKind::Class)
            .map(|d| d.qualified_name.clone())
            .filter(|q| self.is_allowed(q))
            .collect();

        let mut used_as_base: HashSet<String> = HashSet::new();
        for class in &classes {
            let Some(info) = self.analysis.table().get(class).and_then(|d| d.as_class()) else {
                continue;
            };
            for raw in &info.bases {
                if let Some(base) = self.resolver.resolve_base(raw) {
                    if &base != class {
                        used_as_base.insert(base);
                    }
                }
            }
        }

        let mut forest = Vec::new();
        for class in classes.iter().filter(|c| !used_as_base.contains(*c)) {
            forest.push(self.node(class, &mut Vec::new()));
        }
        for class in &classes {
            if !self.visited.contains(class) {
                forest.push(self.node(class, &mut Vec::new()));
            }
        }
        forest
    }
}

impl Analysis {
    /// The inheritance forest from base lists.
    ///
    /// With `root`, a single tree for that class. Without, one tree per class that no
    /// other class inherits from, plus one per class only reachable through a cycle.
    /// Works without source: only descriptor base lists are consulted.
    ///
    /// # Errors
    /// [`QueryError::NotFound`] for an unknown root, [`QueryError::NotAClass`] when the
    /// root is not a class.
    pub fn inheritance_tree(&self, root: Option<&str>) -> Result<Vec<InheritanceNode>, QueryError> {
        let mut builder = TreeBuilder::new(self, None);
        let Some(root) = root else {
            return Ok(builder.forest());
        };
        let qualified = self
            .canonical_name(root)
            .ok_or_else(|| QueryError::NotFound(root.to_owned()))?;
        let is_class = self
            .table()
            .get(qualified)
            .is_some_and(|d| d.kind() == SymbolKind::Class);
        if !is_class {
            return Err(QueryError::NotAClass(root.to_owned()));
        }
        Ok(vec![builder.node(qualified, &mut Vec::new())])
    }

    /// Classes whose ancestry reaches `BaseException`/`Exception` or an external base
    /// named `*Error`, `*Exception` or `*Warning`, sorted.
    pub fn exception_classes(&self) -> BTreeSet<String> {
        let resolver = SymbolResolver::new(self.table());
        self.table()
            .top_level()
            .filter(|d| d.kind() == SymbolKind::Class)
            .filter(|d| {
                resolver
                    .external_ancestry(&d.qualified_name)
                    .iter()
                    .any(|raw| is_exception_base(raw))
            })
            .map(|d| d.qualified_name.clone())
            .collect()
    }

    /// The inheritance forest restricted to exception classes.
    pub fn exception_hierarchy(&self) -> Vec<InheritanceNode> {
        let exceptions = self.exception_classes();
        TreeBuilder::new(self, Some(&exceptions)).forest()
    }
}

fn is_exception_base(raw: &str) -> bool {
    let head = raw.split_once('[').map_or(raw, |(h, _)| h).trim();
    let last = head.rsplit('.').next().unwrap_or(head);
    EXCEPTION_ROOTS.contains(&last) || EXCEPTION_SUFFIXES.iter().any(|s| last.ends_with(s))
}
