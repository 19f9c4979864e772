//! Table-level view: one node per table, view or CTE plus the Output node.

use std::collections::HashSet;

#[cfg(feature = "tracing")]
use tracing::debug;

use super::helpers::{is_select_like, namespace_of, table_kind, LineageIndex};
use super::highlight::apply_highlights;
use super::OUTPUT_NODE_ID;
use crate::adapter::{merge_statements, validate_statement};
use crate::error::GraphError;
use crate::state::ViewState;
use crate::types::{
    ColumnEntry, FlowEdge, FlowGraph, FlowNode, Node, NodeType, ResolvedSchemaMetadata,
    ResolvedSchemaTable, StatementLineage, TableKind, TableNodeData,
};

/// Build the table view: table nodes with their columns and table-to-table edges.
pub fn build_table_graph(
    statements: &[StatementLineage],
    resolved_schema: Option<&ResolvedSchemaMetadata>,
    state: &ViewState,
) -> Result<FlowGraph, GraphError> {
    let scaffold = TableScaffold::new(statements, resolved_schema, state)?;
    let edges = scaffold.table_edges();

    #[cfg(feature = "tracing")]
    debug!(
        nodes = scaffold.nodes.len(),
        edges = edges.len(),
        has_output = scaffold.has_output,
        "built table graph"
    );

    let mut graph = FlowGraph::new(scaffold.nodes, edges);
    apply_highlights(&mut graph, state);
    Ok(graph)
}

/// Merged lineage plus the table nodes shared by the table and column views.
pub(crate) struct TableScaffold<'a> {
    pub(crate) statements: &'a [StatementLineage],
    pub(crate) merged: std::borrow::Cow<'a, StatementLineage>,
    pub(crate) nodes: Vec<FlowNode>,
    pub(crate) has_output: bool,
}

impl<'a> TableScaffold<'a> {
    pub(crate) fn new(
        statements: &'a [StatementLineage],
        resolved_schema: Option<&ResolvedSchemaMetadata>,
        state: &ViewState,
    ) -> Result<Self, GraphError> {
        for stmt in statements {
            validate_statement(stmt)?;
        }
        let merged = merge_statements(statements);
        let has_output = statements.iter().any(is_select_like);

        let nodes = {
            let index = LineageIndex::new(&merged);
            let mut nodes: Vec<FlowNode> = merged
                .nodes
                .iter()
                .filter(|node| node.node_type.is_table_like())
                .map(|node| {
                    table_node(
                        node,
                        &index,
                        merged.source_name.as_deref(),
                        resolved_schema,
                        state,
                    )
                })
                .collect();
            if has_output {
                nodes.push(output_node(&merged, &index, state));
            }
            nodes
        };

        Ok(Self {
            statements,
            merged,
            nodes,
            has_output,
        })
    }

    pub(crate) fn index(&self) -> LineageIndex<'_> {
        LineageIndex::new(&self.merged)
    }

    /// Table a lineage endpoint is drawn on. Unowned columns land on Output
    /// when there is one; anything else unresolvable is dropped.
    pub(crate) fn resolve_endpoint<'i>(
        &self,
        index: &LineageIndex<'i>,
        id: &str,
    ) -> Option<&'i str> {
        let node = index.node(id)?;
        if node.node_type.is_table_like() {
            return Some(node.id.as_str());
        }
        match index.owner(id) {
            Some(owner) => Some(owner),
            None if self.has_output => Some(OUTPUT_NODE_ID),
            None => None,
        }
    }

    fn table_edges(&self) -> Vec<FlowEdge> {
        let index = self.index();
        let mut seen: HashSet<String> = HashSet::new();
        let mut edges = Vec::new();

        for edge in self.merged.edges.iter().filter(|edge| edge.is_flow()) {
            let (Some(source), Some(target)) = (
                self.resolve_endpoint(&index, &edge.from),
                self.resolve_endpoint(&index, &edge.to),
            ) else {
                continue;
            };

            if source == target {
                let touches_table = [&edge.from, &edge.to].iter().any(|id| {
                    index
                        .node(id)
                        .is_some_and(|node| node.node_type.is_table_like())
                });
                if edge.from != edge.to && !touches_table {
                    continue;
                }
            }

            let id = format!("tedge:{source}->{target}");
            if !seen.insert(id.clone()) {
                continue;
            }
            let mut flow = FlowEdge::new(id, source, target);
            // Output edges fall back to the join recorded on the source table.
            let join_type = match edge.join_type {
                None if target == OUTPUT_NODE_ID => {
                    index.node(source).and_then(|node| node.join_type)
                }
                join_type => join_type,
            };
            if let Some(join_type) = join_type {
                flow.data.join_type = Some(join_type);
                flow.data.label = Some(join_type.label().to_string());
            }
            edges.push(flow);
        }

        if self.has_output {
            let with_outgoing: HashSet<String> = edges
                .iter()
                .filter(|edge| !edge.is_self_loop())
                .map(|edge| edge.source.clone())
                .collect();

            for stmt in self.statements.iter().filter(|stmt| is_select_like(stmt)) {
                for node in stmt.nodes.iter().filter(|node| node.node_type.is_table_like()) {
                    if with_outgoing.contains(&node.id) || index.node(&node.id).is_none() {
                        continue;
                    }
                    let id = format!("tedge:{}->{OUTPUT_NODE_ID}", node.id);
                    if !seen.insert(id.clone()) {
                        continue;
                    }
                    let mut flow = FlowEdge::new(id, node.id.clone(), OUTPUT_NODE_ID);
                    if let Some(join_type) = node.join_type {
                        flow.data.join_type = Some(join_type);
                        flow.data.label = Some(join_type.label().to_string());
                    }
                    edges.push(flow);
                }
            }
        }

        edges
    }
}

fn table_node(
    node: &Node,
    index: &LineageIndex<'_>,
    fallback_source: Option<&str>,
    resolved_schema: Option<&ResolvedSchemaMetadata>,
    state: &ViewState,
) -> FlowNode {
    let schema_table = resolved_schema
        .filter(|_| node.node_type.is_relation())
        .and_then(|schema| schema.find_table(node));

    let mut columns: Vec<ColumnEntry> = index
        .owned_columns(&node.id)
        .iter()
        .map(|column| column_entry(column, schema_table))
        .collect();

    let mut hidden_column_count = 0;
    if let Some(table) = schema_table {
        let expanded = state.is_table_expanded(&node.id);
        for schema_column in &table.columns {
            if columns
                .iter()
                .any(|column| column.name.eq_ignore_ascii_case(&schema_column.name))
            {
                continue;
            }
            if expanded {
                let mut entry = ColumnEntry::new(
                    format!("schema:{}:{}", node.id, schema_column.name),
                    schema_column.name.clone(),
                );
                entry.data_type = schema_column.data_type.clone();
                entry.from_schema = true;
                columns.push(entry);
            } else {
                hidden_column_count += 1;
            }
        }
    }

    let mut data = TableNodeData::new(node.label.clone(), table_kind(node.node_type));
    data.qualified_name = node.qualified_name.clone();
    data.namespace = node.qualified_name.as_deref().and_then(namespace_of);
    data.source_name = node
        .source_name()
        .or(fallback_source)
        .map(str::to_string);
    data.columns = columns;
    data.hidden_column_count = hidden_column_count;
    data.filters = node.filters.clone();
    data.join_type = node.join_type;
    data.join_condition = node.join_condition.clone();
    data.is_collapsed = state.is_collapsed(&node.id);

    FlowNode::table(node.id.clone(), data)
}

fn output_node(merged: &StatementLineage, index: &LineageIndex<'_>, state: &ViewState) -> FlowNode {
    let mut seen: HashSet<&str> = HashSet::new();
    let columns = merged
        .nodes
        .iter()
        .filter(|node| node.node_type == NodeType::Column && index.owner(&node.id).is_none())
        .filter(|node| seen.insert(node.id.as_str()))
        .map(|node| column_entry(node, None))
        .collect();

    let mut data = TableNodeData::new("Output", TableKind::Output);
    data.columns = columns;
    data.source_name = merged.source_name.clone();
    data.is_collapsed = state.is_collapsed(OUTPUT_NODE_ID);
    FlowNode::table(OUTPUT_NODE_ID, data)
}

fn column_entry(column: &Node, schema_table: Option<&ResolvedSchemaTable>) -> ColumnEntry {
    let mut entry = ColumnEntry::new(column.id.clone(), column.label.clone());
    entry.expression = column.expression.clone();
    entry.aggregation = column.aggregation.clone();
    entry.data_type = schema_table.and_then(|table| {
        table
            .columns
            .iter()
            .find(|schema_column| schema_column.name.eq_ignore_ascii_case(&column.label))
            .and_then(|schema_column| schema_column.data_type.clone())
    });
    entry
}
