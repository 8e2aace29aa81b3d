use std::collections::HashMap;

use petgraph::Directed;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{Graph, NodeIndex};
use serde::Serialize;

use crate::analysis::Analysis;
use crate::graph::edge::RelationKind;

/// A set of symbols that mutually reach each other through calls and instantiations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCycle {
    /// Members ordered by qualified name.
    pub members: Vec<String>,
}

impl UsageCycle {
    /// `a -> b -> c -> a`
    pub fn display_chain(&self) -> String {
        let mut chain = self.members.clone();
        if let Some(first) = self.members.first() {
            chain.push(first.clone());
        }
        chain.join(" -> ")
    }
}

impl Analysis {
    /// Strongly connected components of the usage subgraph (Instantiates and
    /// CallsFunction edges) with more than one member.
    ///
    /// Returns cycles sorted by their first member.
    pub fn usage_cycles(&self) -> Vec<UsageCycle> {
        // Build a regular petgraph Graph containing only usage edges; kosaraju_scc
        // needs a plain graph.
        let mut usage: Graph<String, (), Directed> = Graph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for edge in self.graph().edges() {
            if !matches!(
                edge.kind,
                RelationKind::Instantiates | RelationKind::CallsFunction
            ) {
                continue;
            }
            let from = *index
                .entry(edge.from.as_str())
                .or_insert_with(|| usage.add_node(edge.from.clone()));
            let to = *index
                .entry(edge.to.as_str())
                .or_insert_with(|| usage.add_node(edge.to.clone()));
            usage.add_edge(from, to, ());
        }

        let mut cycles: Vec<UsageCycle> = kosaraju_scc(&usage)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<String> = scc.iter().map(|&i| usage[i].clone()).collect();
                members.sort();
                UsageCycle { members }
            })
            .collect();

        cycles.sort_by(|a, b| a.members.cmp(&b.members));
        cycles
    }
}
