//! Search and selection flags.
//!
//! Highlighting only touches flags, so a search or selection change can be applied
//! to a graph that is already laid out without rebuilding it. A selection lights
//! every edge on a directed path through the selected node or column, upstream
//! and downstream.

use std::collections::HashSet;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, Reversed};

use crate::state::ViewState;
use crate::types::{FlowEdge, FlowGraph, FlowNode, FlowNodeData};

/// Recompute highlight and selection flags in place.
pub fn apply_highlights(graph: &mut FlowGraph, state: &ViewState) {
    let term = state.normalized_search();
    let term = term.as_deref();
    let selected = state.selected_node_id.as_deref();

    // Node holding the selection: the selected node itself or the table owning
    // the selected column.
    let mut selected_node: Option<String> = None;

    for node in &mut graph.nodes {
        let is_selected = mark_node(node, term, selected);
        if is_selected && selected_node.is_none() {
            selected_node = Some(node.id.clone());
        }
    }

    let lit = match (selected, selected_node.as_deref()) {
        // A column is selected: follow column handles, and the owning table
        // for edges drawn without them.
        (Some(selected), Some(node_id)) if selected != node_id => {
            lineage_edges(&graph.edges, &[selected, node_id], handle_endpoints)
        }
        (_, Some(node_id)) => lineage_edges(&graph.edges, &[node_id], node_endpoints),
        _ => HashSet::new(),
    };
    for (index, edge) in graph.edges.iter_mut().enumerate() {
        edge.data.is_highlighted = lit.contains(&index);
    }
}

fn node_endpoints(edge: &FlowEdge) -> (&str, &str) {
    (edge.source.as_str(), edge.target.as_str())
}

fn handle_endpoints(edge: &FlowEdge) -> (&str, &str) {
    (
        edge.source_handle.as_deref().unwrap_or(&edge.source),
        edge.target_handle.as_deref().unwrap_or(&edge.target),
    )
}

/// Indices of the edges upstream or downstream of any of `starts`.
fn lineage_edges<'a>(
    edges: &'a [FlowEdge],
    starts: &[&'a str],
    endpoints: fn(&FlowEdge) -> (&str, &str),
) -> HashSet<usize> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for edge in edges {
        let (source, target) = endpoints(edge);
        graph.add_edge(source, target, ());
    }

    let mut downstream: HashSet<&str> = HashSet::new();
    let mut upstream: HashSet<&str> = HashSet::new();
    for &start in starts {
        if !graph.contains_node(start) {
            continue;
        }
        let mut bfs = Bfs::new(&graph, start);
        while let Some(node) = bfs.next(&graph) {
            downstream.insert(node);
        }
        let reversed = Reversed(&graph);
        let mut bfs = Bfs::new(reversed, start);
        while let Some(node) = bfs.next(reversed) {
            upstream.insert(node);
        }
    }

    edges
        .iter()
        .enumerate()
        .filter(|&(_, edge)| {
            let (source, target) = endpoints(edge);
            downstream.contains(source) || upstream.contains(target)
        })
        .map(|(index, _)| index)
        .collect()
}

fn matches(term: Option<&str>, text: &str) -> bool {
    term.is_some_and(|term| text.to_lowercase().contains(term))
}

/// Set the node's flags and return whether it holds the selection.
fn mark_node(node: &mut FlowNode, term: Option<&str>, selected: Option<&str>) -> bool {
    let id_selected = selected == Some(node.id.as_str());
    match &mut node.data {
        FlowNodeData::Table(data) => {
            let mut any_column_selected = false;
            let mut any_column_matches = false;
            for column in &mut data.columns {
                column.is_highlighted = matches(term, &column.name);
                column.is_selected = selected == Some(column.id.as_str());
                any_column_matches |= column.is_highlighted;
                any_column_selected |= column.is_selected;
            }
            data.is_highlighted = matches(term, &data.label) || any_column_matches;
            data.is_selected = id_selected || any_column_selected;
            data.is_selected
        }
        FlowNodeData::Script(data) => {
            data.is_highlighted = matches(term, &data.label)
                || data
                    .tables_read
                    .iter()
                    .chain(&data.tables_written)
                    .any(|table| matches(term, table));
            data.is_selected = id_selected;
            id_selected
        }
        FlowNodeData::SimpleTable(data) => {
            data.is_highlighted =
                matches(term, &data.label) || matches(term, &data.qualified_name);
            data.is_selected = id_selected;
            id_selected
        }
    }
}
