//! Flow-graph types produced by the view builders.
//!
//! A [`FlowGraph`] is ephemeral: it is rebuilt whenever inputs change. Only node
//! positions survive across rebuilds, and that is handled by the staging
//! controller, not here.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::lineage::{AggregationInfo, FilterPredicate, JoinType};

/// A 2D position in view coordinates (top-left corner of the node).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Nodes and edges ready for rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn new(nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&FlowEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}

/// Renderer component used for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum FlowNodeKind {
    /// Table, view, CTE or the virtual Output node, with its columns
    TableNode,
    /// One script (source file)
    ScriptNode,
    /// Compact table node used by the hybrid script view
    SimpleTableNode,
}

/// A positioned node in a view graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: FlowNodeKind,

    #[serde(default)]
    pub position: Position,

    pub data: FlowNodeData,
}

impl FlowNode {
    pub fn table(id: impl Into<String>, data: TableNodeData) -> Self {
        Self {
            id: id.into(),
            node_type: FlowNodeKind::TableNode,
            position: Position::default(),
            data: FlowNodeData::Table(data),
        }
    }

    pub fn script(id: impl Into<String>, data: ScriptNodeData) -> Self {
        Self {
            id: id.into(),
            node_type: FlowNodeKind::ScriptNode,
            position: Position::default(),
            data: FlowNodeData::Script(data),
        }
    }

    pub fn simple_table(id: impl Into<String>, data: SimpleTableNodeData) -> Self {
        Self {
            id: id.into(),
            node_type: FlowNodeKind::SimpleTableNode,
            position: Position::default(),
            data: FlowNodeData::SimpleTable(data),
        }
    }

    pub fn label(&self) -> &str {
        match &self.data {
            FlowNodeData::Table(data) => &data.label,
            FlowNodeData::Script(data) => &data.label,
            FlowNodeData::SimpleTable(data) => &data.label,
        }
    }

    /// Number of visible column rows (drives node height).
    pub fn column_count(&self) -> usize {
        match &self.data {
            FlowNodeData::Table(data) => data.columns.len(),
            FlowNodeData::Script(data) => data.tables_read.len() + data.tables_written.len(),
            FlowNodeData::SimpleTable(_) => 0,
        }
    }

    pub fn filter_count(&self) -> usize {
        match &self.data {
            FlowNodeData::Table(data) => data.filters.len(),
            _ => 0,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        match &self.data {
            FlowNodeData::Table(data) => data.is_collapsed,
            _ => false,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        match &self.data {
            FlowNodeData::Table(data) => data.is_highlighted,
            FlowNodeData::Script(data) => data.is_highlighted,
            FlowNodeData::SimpleTable(data) => data.is_highlighted,
        }
    }

    pub fn is_selected(&self) -> bool {
        match &self.data {
            FlowNodeData::Table(data) => data.is_selected,
            FlowNodeData::Script(data) => data.is_selected,
            FlowNodeData::SimpleTable(data) => data.is_selected,
        }
    }
}

/// View-specific node payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FlowNodeData {
    Table(TableNodeData),
    Script(ScriptNodeData),
    SimpleTable(SimpleTableNodeData),
}

/// What a table node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TableKind {
    Table,
    View,
    Cte,
    /// The synthetic node collecting unowned columns of select-like statements
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableNodeData {
    pub label: String,
    pub table_kind: TableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    /// Schema/catalog prefix of the qualified name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnEntry>,
    /// Schema columns not shown because the table is not expanded
    #[serde(default)]
    pub hidden_column_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterPredicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_condition: Option<String>,
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub is_highlighted: bool,
}

impl TableNodeData {
    pub fn new(label: impl Into<String>, table_kind: TableKind) -> Self {
        Self {
            label: label.into(),
            table_kind,
            qualified_name: None,
            namespace: None,
            source_name: None,
            columns: Vec::new(),
            hidden_column_count: 0,
            filters: Vec::new(),
            join_type: None,
            join_condition: None,
            is_collapsed: false,
            is_selected: false,
            is_highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationInfo>,
    /// Injected from the resolved schema rather than the lineage
    #[serde(default)]
    pub from_schema: bool,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub is_highlighted: bool,
}

impl ColumnEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            expression: None,
            data_type: None,
            aggregation: None,
            from_schema: false,
            is_selected: false,
            is_highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptNodeData {
    pub label: String,
    pub statement_count: usize,
    pub tables_read: Vec<String>,
    pub tables_written: Vec<String>,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub is_highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimpleTableNodeData {
    pub label: String,
    pub qualified_name: String,
    pub table_kind: TableKind,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub is_highlighted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum EdgeStyle {
    #[default]
    Solid,
    /// Transformation (expression) between source and target
    Dashed,
}

/// An edge in a view graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Column handle on the source node (column view)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Column handle on the target node (column view)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub data: FlowEdgeData,
}

impl FlowEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            data: FlowEdgeData::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.label = Some(label.into());
        self
    }

    pub fn with_handles(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_handle = Some(source.into());
        self.target_handle = Some(target.into());
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default)]
    pub style: EdgeStyle,
    /// Tables written by the source script and read by the target script
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_tables: Vec<String>,
    #[serde(default)]
    pub is_highlighted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_node_wire_shape() {
        let node = FlowNode::script(
            "script:a.sql",
            ScriptNodeData {
                label: "a.sql".to_string(),
                statement_count: 2,
                tables_read: vec!["users".to_string()],
                tables_written: vec![],
                is_selected: false,
                is_highlighted: true,
            },
        );

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "scriptNode");
        assert_eq!(json["data"]["kind"], "script");
        assert_eq!(json["data"]["statementCount"], 2);
        assert_eq!(json["position"]["x"], 0.0);

        let back: FlowNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.column_count(), 1);
    }
}
