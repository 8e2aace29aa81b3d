use serde::Serialize;

use crate::analysis::Analysis;
use crate::error::QueryError;
use crate::graph::edge::{ConnectionEdge, RelationKind};
use crate::graph::node::{SymbolKind, is_private};

/// Names connected to a symbol by one relation kind, in order of first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationGroup {
    pub kind: RelationKind,
    /// Display label; reverse labels ("Called By") on the USED BY side.
    pub label: &'static str,
    pub names: Vec<String>,
}

/// USES / USED BY view of one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connections {
    pub symbol: String,
    pub kind: SymbolKind,
    /// Outgoing groups; empty groups are omitted.
    pub uses: Vec<RelationGroup>,
    /// Incoming groups; empty groups are omitted.
    pub used_by: Vec<RelationGroup>,
    /// `false` when the module had no usable source, so both sides are necessarily empty.
    pub source_available: bool,
}

impl Connections {
    /// Names the symbol uses through `kind`.
    pub fn uses_of(&self, kind: RelationKind) -> &[String] {
        group_names(&self.uses, kind)
    }

    /// Names using the symbol through `kind`.
    pub fn used_by_of(&self, kind: RelationKind) -> &[String] {
        group_names(&self.used_by, kind)
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.used_by.is_empty()
    }
}

fn group_names(groups: &[RelationGroup], kind: RelationKind) -> &[String] {
    groups
        .iter()
        .find(|g| g.kind == kind)
        .map(|g| g.names.as_slice())
        .unwrap_or(&[])
}

/// Group edges by kind in [`RelationKind::ALL`] order, keeping first occurrences only.
fn group<'e>(
    edges: &[&'e ConnectionEdge],
    endpoint: impl Fn(&'e ConnectionEdge) -> &'e str,
    label: impl Fn(RelationKind) -> &'static str,
    include_private: bool,
) -> Vec<RelationGroup> {
    let mut groups = Vec::new();
    for kind in RelationKind::ALL {
        let mut names: Vec<String> = Vec::new();
        for edge in edges.iter().copied().filter(|e| e.kind == kind) {
            let name = endpoint(edge);
            if !include_private && is_private(name) {
                continue;
            }
            if !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
        if !names.is_empty() {
            groups.push(RelationGroup {
                kind,
                label: label(kind),
                names,
            });
        }
    }
    groups
}

impl Analysis {
    /// Look up a symbol by qualified name, accepting a leading `<identity>.`.
    pub(crate) fn canonical_name<'n>(&self, name: &'n str) -> Option<&'n str> {
        if self.table().contains(name) {
            return Some(name);
        }
        let stripped = name.strip_prefix(self.identity())?.strip_prefix('.')?;
        self.table().contains(stripped).then_some(stripped)
    }

    /// What `name` uses and what uses it, grouped by relation kind.
    ///
    /// Private names are hidden unless `include_private` is set; the graph itself is not
    /// filtered. Never mutates the analysis.
    ///
    /// # Errors
    /// [`QueryError::NotFound`] when `name` is not in the symbol table.
    pub fn connections_of(&self, name: &str, include_private: bool) -> Result<Connections, QueryError> {
        let qualified = self
            .canonical_name(name)
            .ok_or_else(|| QueryError::NotFound(name.to_owned()))?;
        let desc = self
            .table()
            .get(qualified)
            .ok_or_else(|| QueryError::NotFound(name.to_owned()))?;
        let mut outgoing: Vec<&ConnectionEdge> = self.graph().outgoing(qualified).collect();
        // Method references are stored on the owning class with the method as `via`.
        if let Some(owner) = desc.owner.as_deref() {
            outgoing.extend(
                self.graph()
                    .outgoing(owner)
                    .filter(|e| e.via.as_deref() == Some(qualified) && e.to != qualified),
            );
        }
        let incoming: Vec<&ConnectionEdge> = self.graph().incoming(qualified).collect();

        Ok(Connections {
            symbol: qualified.to_owned(),
            kind: desc.kind(),
            uses: group(
                &outgoing,
                |e| e.to.as_str(),
                |k| k.label(),
                include_private,
            ),
            used_by: group(
                &incoming,
                |e| e.from.as_str(),
                |k| k.reverse_label(),
                include_private,
            ),
            source_available: self.source_available(),
        })
    }

    /// Every symbol that appears in at least one edge, sorted.
    pub fn connected_symbols(&self, include_private: bool) -> Vec<&str> {
        self.table()
            .iter()
            .map(|d| d.qualified_name.as_str())
            .filter(|q| self.graph().touches(q))
            .filter(|q| include_private || !is_private(q))
            .collect()
    }
}
