//! Column-level view: the table nodes of the table view, wired column to column.

use std::collections::HashSet;

#[cfg(feature = "tracing")]
use tracing::debug;

use super::highlight::apply_highlights;
use super::table::TableScaffold;
use crate::error::GraphError;
use crate::state::ViewState;
use crate::types::{
    EdgeStyle, FlowEdge, FlowGraph, NodeType, ResolvedSchemaMetadata, StatementLineage,
};

/// Build the column view.
///
/// Each data-flow or derivation edge between two columns on different tables
/// becomes one edge whose handles are the column ids. Edges with a
/// transformation (an edge expression or a computed target column) are dashed.
/// Columns of a collapsed table are hidden, so edges into or out of one attach
/// to the table node instead of the column handle.
pub fn build_column_graph(
    statements: &[StatementLineage],
    resolved_schema: Option<&ResolvedSchemaMetadata>,
    state: &ViewState,
) -> Result<FlowGraph, GraphError> {
    let scaffold = TableScaffold::new(statements, resolved_schema, state)?;
    let edges = column_edges(&scaffold, state);

    #[cfg(feature = "tracing")]
    debug!(
        nodes = scaffold.nodes.len(),
        edges = edges.len(),
        "built column graph"
    );

    let mut graph = FlowGraph::new(scaffold.nodes, edges);
    apply_highlights(&mut graph, state);
    Ok(graph)
}

fn column_edges(scaffold: &TableScaffold<'_>, state: &ViewState) -> Vec<FlowEdge> {
    let index = scaffold.index();
    let mut seen: HashSet<String> = HashSet::new();
    let mut edges = Vec::new();
    for edge in scaffold.merged.edges.iter().filter(|edge| edge.is_flow()) {
        let (Some(from), Some(to)) = (index.node(&edge.from), index.node(&edge.to)) else {
            continue;
        };
        if from.node_type != NodeType::Column || to.node_type != NodeType::Column {
            continue;
        }
        let (Some(source), Some(target)) = (
            scaffold.resolve_endpoint(&index, &from.id),
            scaffold.resolve_endpoint(&index, &to.id),
        ) else {
            continue;
        };
        if source == target {
            continue;
        }
        let source_handle = (!state.is_collapsed(source)).then_some(from.id.as_str());
        let target_handle = (!state.is_collapsed(target)).then_some(to.id.as_str());
        let id = format!(
            "cedge:{}->{}",
            source_handle.unwrap_or(source),
            target_handle.unwrap_or(target)
        );
        if !seen.insert(id.clone()) {
            continue;
        }

        let expression = edge.expression.clone().or_else(|| to.expression.clone());
        let mut flow = FlowEdge::new(id, source, target);
        flow.source_handle = source_handle.map(str::to_string);
        flow.target_handle = target_handle.map(str::to_string);
        if expression.is_some() {
            flow.data.style = EdgeStyle::Dashed;
        }
        flow.data.expression = expression;
        flow.data.join_type = edge.join_type;
        edges.push(flow);
    }
    edges
}
