//! Transitive flow ("X-Ray") around a focus item.

use std::collections::BTreeSet;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, Reversed};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Matrix;

/// Everything upstream and downstream of a focus item. The focus itself is in
/// neither set, even when it sits on a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitiveSet {
    pub focus: String,
    pub ancestors: BTreeSet<String>,
    pub descendants: BTreeSet<String>,
}

impl TransitiveSet {
    pub fn contains(&self, item: &str) -> bool {
        self.focus == item || self.ancestors.contains(item) || self.descendants.contains(item)
    }
}

/// Walk the matrix flows from `focus` in both directions.
pub fn transitive_flow(matrix: &Matrix, focus: &str) -> TransitiveSet {
    let mut result = TransitiveSet {
        focus: focus.to_string(),
        ..TransitiveSet::default()
    };
    let Some(start) = matrix.index_of(focus) else {
        return result;
    };

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..matrix.len() {
        graph.add_node(i);
    }
    for from in 0..matrix.len() {
        for to in 0..matrix.len() {
            if matrix.flows_into(from, to) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut bfs = Bfs::new(&graph, start);
    while let Some(idx) = bfs.next(&graph) {
        if idx != start {
            result.descendants.insert(matrix.items[idx].clone());
        }
    }

    let reversed = Reversed(&graph);
    let mut bfs = Bfs::new(reversed, start);
    while let Some(idx) = bfs.next(reversed) {
        if idx != start {
            result.ancestors.insert(matrix.items[idx].clone());
        }
    }

    result
}
