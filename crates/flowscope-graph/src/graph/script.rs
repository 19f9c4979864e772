//! Script-level view: one node per source file.

use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::debug;

use super::helpers::{shared_tables_label, source_name_or_default, table_access, TableAccess};
use super::highlight::apply_highlights;
use crate::adapter::validate_statement;
use crate::error::GraphError;
use crate::state::ViewState;
use crate::types::{
    FlowEdge, FlowGraph, FlowNode, ScriptNodeData, SimpleTableNodeData, StatementLineage,
    TableKind,
};

/// Per-script read and write sets, aggregated over the script's statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ScriptSummary {
    pub(crate) statement_count: usize,
    pub(crate) access: TableAccess,
}

/// Group statements by source name and collect what each script touches.
pub(crate) fn summarize_scripts(
    statements: &[StatementLineage],
) -> BTreeMap<String, ScriptSummary> {
    let mut scripts: BTreeMap<String, ScriptSummary> = BTreeMap::new();
    for stmt in statements {
        let entry = scripts
            .entry(source_name_or_default(stmt.source_name.as_deref()))
            .or_default();
        entry.statement_count += 1;
        entry.access.extend(table_access(stmt));
    }
    scripts
}

pub(crate) fn script_node_id(name: &str) -> String {
    format!("script:{name}")
}

pub(crate) fn table_node_id(name: &str) -> String {
    format!("table:{name}")
}

/// Build the script view.
///
/// Without tables, a producer script is connected to every script reading a
/// table it writes. With `show_tables` (hybrid view), tables become nodes of
/// their own and scripts connect through them instead.
pub fn build_script_graph(
    statements: &[StatementLineage],
    state: &ViewState,
    show_tables: bool,
) -> Result<FlowGraph, GraphError> {
    for stmt in statements {
        validate_statement(stmt)?;
    }
    let scripts = summarize_scripts(statements);

    let mut nodes: Vec<FlowNode> = scripts
        .iter()
        .map(|(name, summary)| {
            FlowNode::script(
                script_node_id(name),
                ScriptNodeData {
                    label: name.clone(),
                    statement_count: summary.statement_count,
                    tables_read: summary.access.read.iter().cloned().collect(),
                    tables_written: summary.access.written.iter().cloned().collect(),
                    is_selected: false,
                    is_highlighted: false,
                },
            )
        })
        .collect();

    let edges = if show_tables {
        let mut kinds: BTreeMap<&str, TableKind> = BTreeMap::new();
        for summary in scripts.values() {
            for (name, kind) in &summary.access.kinds {
                kinds.entry(name.as_str()).or_insert(*kind);
            }
        }
        nodes.extend(kinds.iter().map(|(name, kind)| {
            FlowNode::simple_table(
                table_node_id(name),
                SimpleTableNodeData {
                    label: short_name(name).to_string(),
                    qualified_name: name.to_string(),
                    table_kind: *kind,
                    is_selected: false,
                    is_highlighted: false,
                },
            )
        }));
        hybrid_edges(&scripts)
    } else {
        direct_edges(&scripts)
    };

    #[cfg(feature = "tracing")]
    debug!(
        scripts = scripts.len(),
        nodes = nodes.len(),
        edges = edges.len(),
        show_tables,
        "built script graph"
    );

    let mut graph = FlowGraph::new(nodes, edges);
    apply_highlights(&mut graph, state);
    Ok(graph)
}

fn direct_edges(scripts: &BTreeMap<String, ScriptSummary>) -> Vec<FlowEdge> {
    let mut edges = Vec::new();
    for (producer, producer_summary) in scripts {
        for (consumer, consumer_summary) in scripts {
            if producer == consumer {
                continue;
            }
            let shared: Vec<String> = producer_summary
                .access
                .written
                .intersection(&consumer_summary.access.read)
                .cloned()
                .collect();
            if shared.is_empty() {
                continue;
            }

            let mut edge = FlowEdge::new(
                format!("sedge:{producer}->{consumer}"),
                script_node_id(producer),
                script_node_id(consumer),
            )
            .with_label(shared_tables_label(&shared));
            edge.data.shared_tables = shared;
            edges.push(edge);
        }
    }
    edges
}

fn hybrid_edges(scripts: &BTreeMap<String, ScriptSummary>) -> Vec<FlowEdge> {
    let mut edges = Vec::new();
    for (script, summary) in scripts {
        let script_id = script_node_id(script);
        for table in &summary.access.read {
            let table_id = table_node_id(table);
            edges.push(FlowEdge::new(
                format!("hedge:{table_id}->{script_id}"),
                table_id,
                script_id.clone(),
            ));
        }
        for table in &summary.access.written {
            let table_id = table_node_id(table);
            edges.push(FlowEdge::new(
                format!("hedge:{script_id}->{table_id}"),
                script_id.clone(),
                table_id,
            ));
        }
    }
    edges
}

fn short_name(qualified: &str) -> &str {
    qualified
        .rsplit_once('.')
        .map(|(_, name)| name)
        .unwrap_or(qualified)
}
