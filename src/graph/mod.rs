pub mod edge;
pub mod node;

use std::collections::HashMap;

use edge::{ConnectionEdge, RelationKind};

/// The connection graph: an append-only arena of edges plus forward and reverse
/// indexes into it.
///
/// Both indexes are projections of the arena computed at construction and never
/// mutated on their own, so `outgoing(x)` plus `incoming(x)` is always exactly the
/// set of stored edges touching `x`. Cycles between symbols are plain data.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    edges: Vec<ConnectionEdge>,
    /// Maps a qualified name to the arena positions of edges where it is `from`.
    forward: HashMap<String, Vec<usize>>,
    /// Maps a qualified name to the arena positions of edges where it is `to`.
    reverse: HashMap<String, Vec<usize>>,
}

impl ConnectionGraph {
    /// Create an empty graph. An empty graph is a valid terminal state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a resolved edge stream, keeping every edge in arrival order.
    pub fn from_edges(edges: impl IntoIterator<Item = ConnectionEdge>) -> Self {
        let edges: Vec<ConnectionEdge> = edges.into_iter().collect();
        let mut forward: HashMap<String, Vec<usize>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            forward.entry(edge.from.clone()).or_default().push(i);
            reverse.entry(edge.to.clone()).or_default().push(i);
        }
        Self {
            edges,
            forward,
            reverse,
        }
    }

    /// All edges in arrival order.
    pub fn edges(&self) -> &[ConnectionEdge] {
        &self.edges
    }

    /// Number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges where `name` is the using symbol, in arrival order.
    pub fn outgoing<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ConnectionEdge> + use<'a> {
        self.project(&self.forward, name)
    }

    /// Edges where `name` is the used symbol, in arrival order.
    pub fn incoming<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ConnectionEdge> + use<'a> {
        self.project(&self.reverse, name)
    }

    /// Whether any edge touches `name`.
    pub fn touches(&self, name: &str) -> bool {
        self.forward.contains_key(name) || self.reverse.contains_key(name)
    }

    /// Number of edges of each kind.
    pub fn edges_by_kind(&self) -> HashMap<RelationKind, usize> {
        let mut map: HashMap<RelationKind, usize> = HashMap::new();
        for edge in &self.edges {
            *map.entry(edge.kind).or_insert(0) += 1;
        }
        map
    }

    fn project<'a>(
        &'a self,
        index: &'a HashMap<String, Vec<usize>>,
        name: &str,
    ) -> impl Iterator<Item = &'a ConnectionEdge> + use<'a> {
        index
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn edge(from: &str, to: &str, kind: RelationKind, line: usize) -> ConnectionEdge {
        ConnectionEdge {
            from: from.into(),
            to: to.into(),
            kind,
            line,
            via: None,
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = ConnectionGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.outgoing("A").count(), 0);
        assert_eq!(graph.incoming("A").count(), 0);
        assert!(!graph.touches("A"));
    }

    #[test]
    fn test_parallel_edges_are_retained() {
        let graph = ConnectionGraph::from_edges(vec![
            edge("Child", "Base", RelationKind::InheritsFrom, 1),
            edge("Child", "Base", RelationKind::Instantiates, 4),
            edge("Child", "Base", RelationKind::Instantiates, 7),
        ]);
        assert_eq!(graph.edge_count(), 3, "no silent merge of parallel edges");
        assert_eq!(graph.outgoing("Child").count(), 3);
        assert_eq!(graph.incoming("Base").count(), 3);
        let by_kind = graph.edges_by_kind();
        assert_eq!(by_kind.get(&RelationKind::Instantiates), Some(&2));
    }

    #[test]
    fn test_indexes_cover_exactly_touching_edges() {
        let edges = vec![
            edge("A", "B", RelationKind::CallsFunction, 1),
            edge("B", "C", RelationKind::CallsFunction, 2),
            edge("C", "A", RelationKind::Instantiates, 3),
            edge("D", "E", RelationKind::TypeHintReferences, 4),
        ];
        let graph = ConnectionGraph::from_edges(edges.clone());
        for name in ["A", "B", "C", "D", "E", "Z"] {
            let projected: HashSet<&ConnectionEdge> = graph
                .outgoing(name)
                .chain(graph.incoming(name))
                .collect();
            let expected: HashSet<&ConnectionEdge> = graph
                .edges()
                .iter()
                .filter(|e| e.from == name || e.to == name)
                .collect();
            assert_eq!(projected, expected, "projection mismatch for {name}");
        }
    }

    #[test]
    fn test_outgoing_preserves_arrival_order() {
        let graph = ConnectionGraph::from_edges(vec![
            edge("A", "Z", RelationKind::CallsFunction, 9),
            edge("A", "B", RelationKind::CallsFunction, 2),
        ]);
        let targets: Vec<&str> = graph.outgoing("A").map(|e| e.to.as_str()).collect();
        assert_eq!(targets, vec!["Z", "B"]);
    }
}
