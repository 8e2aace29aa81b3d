use std::collections::HashSet;

use crate::analysis::Analysis;
use crate::graph::edge::ConnectionEdge;
use crate::graph::node::{SymbolDescriptor, SymbolKind, is_private};

impl Analysis {
    /// Descriptors of one kind (or all kinds), ordered by qualified name.
    /// Private symbols are skipped unless `include_private` is set.
    pub fn symbols(&self, kind: Option<SymbolKind>, include_private: bool) -> Vec<&SymbolDescriptor> {
        self.table()
            .iter()
            .filter(|d| kind.is_none_or(|k| d.kind() == k))
            .filter(|d| include_private || self.table().is_public(&d.qualified_name))
            .collect()
    }

    /// Every edge in total order: from, kind, to, line, via.
    ///
    /// Two analyses of the same module yield identical lists.
    pub fn full_export(&self) -> Vec<ConnectionEdge> {
        let mut edges = self.graph().edges().to_vec();
        edges.sort_by(ConnectionEdge::export_cmp);
        edges
    }

    /// Up to three qualified names similar to `query`, best first.
    pub fn suggest_similar(&self, query: &str) -> Vec<String> {
        let query_trigrams = trigrams(query);
        if query_trigrams.is_empty() {
            return Vec::new();
        }

        const THRESHOLD: f32 = 0.3;

        let mut scored: Vec<(String, f32)> = self
            .table()
            .iter()
            .filter(|d| !is_private(&d.qualified_name))
            .filter_map(|d| {
                let score = jaccard_similarity(&query_trigrams, &trigrams(&d.qualified_name));
                (score >= THRESHOLD).then(|| (d.qualified_name.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(3);
        scored.into_iter().map(|(name, _)| name).collect()
    }
}

/// Lowercased character trigrams. Empty for strings shorter than 3 characters.
fn trigrams(s: &str) -> HashSet<[char; 3]> {
    let chars: Vec<char> = s.to_lowercase().chars().collect();
    if chars.len() < 3 {
        return HashSet::new();
    }
    chars.windows(3).map(|w| [w[0], w[1], w[2]]).collect()
}

/// |A ∩ B| / |A ∪ B|; 0.0 when both are empty.
fn jaccard_similarity(a: &HashSet<[char; 3]>, b: &HashSet<[char; 3]>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}
