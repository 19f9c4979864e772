//! Lineage input types produced by the FlowScope analyzer.
//!
//! These mirror the analyzer's response shape so an `AnalyzeResult` JSON document
//! can be deserialized directly. Fields the view layer does not need are accepted
//! and preserved but never interpreted.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::common::{Issue, Span, Summary};

/// Metadata key used to tag merged nodes with the statement source they came from.
pub(crate) const SOURCE_NAME_KEY: &str = "sourceName";

/// The result of analyzing SQL for data lineage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    /// Per-statement lineage analysis results
    pub statements: Vec<StatementLineage>,

    /// Global lineage graph spanning all statements (passed through, not used for views)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_lineage: Option<serde_json::Value>,

    /// All issues encountered during analysis
    #[serde(default)]
    pub issues: Vec<Issue>,

    /// Summary statistics, used only to detect a changed result
    #[serde(default)]
    pub summary: Summary,

    /// Effective schema used during analysis (imported + implied)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_schema: Option<ResolvedSchemaMetadata>,
}

/// Lineage information for a single SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementLineage {
    /// Zero-based index of the statement in the input SQL
    #[serde(default)]
    pub statement_index: usize,

    /// Type of SQL statement (SELECT, INSERT, CREATE_TABLE, ...)
    pub statement_type: String,

    /// Optional source name (file path or script identifier) for grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    /// All nodes in the lineage graph for this statement
    #[serde(default)]
    pub nodes: Vec<Node>,

    /// All edges connecting nodes in the lineage graph
    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Optional span of the entire statement in source SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,

    /// Number of JOIN operations in the statement
    #[serde(default)]
    pub join_count: usize,

    /// Complexity score (1-100) based on query structure
    #[serde(default)]
    pub complexity_score: u8,
}

impl StatementLineage {
    /// Create an empty statement of the given type.
    pub fn new(statement_type: impl Into<String>) -> Self {
        Self {
            statement_index: 0,
            statement_type: statement_type.into(),
            source_name: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            span: None,
            join_count: 0,
            complexity_score: 0,
        }
    }

    /// Set the source name.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Append a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append an edge.
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }
}

/// A node in the lineage graph (table, view, CTE, or column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable content-based hash ID
    pub id: String,

    /// Node type
    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Human-readable label (short name)
    pub label: String,

    /// Fully qualified name when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,

    /// SQL expression text for computed columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Source location in original SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,

    /// Extensible metadata (e.g. `sourceName`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,

    /// Aggregation details for aggregated or grouping columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationInfo>,

    /// Filter predicates (WHERE clause conditions) that affect this table's rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterPredicate>,

    /// For joined table nodes: the type of join used to include this table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,

    /// For joined table nodes: the join condition (ON clause).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_condition: Option<String>,
}

impl Node {
    fn with_type(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            qualified_name: None,
            expression: None,
            span: None,
            metadata: None,
            aggregation: None,
            filters: Vec::new(),
            join_type: None,
            join_condition: None,
        }
    }

    /// Create a new table node with required fields.
    pub fn table(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(id, NodeType::Table, label)
    }

    /// Create a new view node with required fields.
    pub fn view(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(id, NodeType::View, label)
    }

    /// Create a new CTE node with required fields.
    pub fn cte(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(id, NodeType::Cte, label)
    }

    /// Create a new column node with required fields.
    pub fn column(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(id, NodeType::Column, label)
    }

    /// Set the qualified name.
    pub fn with_qualified_name(mut self, name: impl Into<String>) -> Self {
        self.qualified_name = Some(name.into());
        self
    }

    /// Set the expression.
    pub fn with_expression(mut self, expr: impl Into<String>) -> Self {
        self.expression = Some(expr.into());
        self
    }

    /// Add a filter predicate.
    pub fn with_filter(
        mut self,
        expression: impl Into<String>,
        clause_type: FilterClauseType,
    ) -> Self {
        self.filters.push(FilterPredicate {
            expression: expression.into(),
            clause_type,
        });
        self
    }

    /// Set the join type.
    pub fn with_join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = Some(join_type);
        self
    }

    /// Set the join condition.
    pub fn with_join_condition(mut self, condition: impl Into<String>) -> Self {
        self.join_condition = Some(condition.into());
        self
    }

    /// Name used to identify this relation across statements.
    pub fn display_name(&self) -> &str {
        self.qualified_name.as_deref().unwrap_or(&self.label)
    }

    /// Source name recorded in metadata, if any.
    pub fn source_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get(SOURCE_NAME_KEY))
            .and_then(|value| value.as_str())
    }
}

/// Aggregation details attached to a column node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregationInfo {
    /// True when the column is a GROUP BY key rather than an aggregate
    #[serde(default)]
    pub is_grouping_key: bool,

    /// Aggregate function name (SUM, COUNT, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    /// True for DISTINCT aggregates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
}

/// An edge connecting two nodes in the lineage graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Stable content-based hash ID
    pub id: String,

    /// Source node ID
    pub from: String,

    /// Target node ID
    pub to: String,

    /// Edge type
    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    /// Optional: SQL expression if this edge represents a transformation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Optional: operation label ('JOIN', 'UNION', 'AGGREGATE', etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Optional: specific join type for JOIN edges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,

    /// Optional: join condition expression (ON clause)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_condition: Option<String>,

    /// Extensible metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,

    /// True if this edge represents approximate/uncertain lineage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approximate: Option<bool>,
}

impl Edge {
    /// Create a new edge with required fields.
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            edge_type,
            expression: None,
            operation: None,
            join_type: None,
            join_condition: None,
            metadata: None,
            approximate: None,
        }
    }

    /// Create a data flow edge.
    pub fn data_flow(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(id, from, to, EdgeType::DataFlow)
    }

    /// Create a derivation edge.
    pub fn derivation(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(id, from, to, EdgeType::Derivation)
    }

    /// Create an ownership edge.
    pub fn ownership(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(id, from, to, EdgeType::Ownership)
    }

    /// Set the expression.
    pub fn with_expression(mut self, expr: impl Into<String>) -> Self {
        self.expression = Some(expr.into());
        self
    }

    /// Set the join type.
    pub fn with_join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = Some(join_type);
        self
    }

    /// True for edges that carry data (data flow or derivation).
    pub fn is_flow(&self) -> bool {
        matches!(self.edge_type, EdgeType::DataFlow | EdgeType::Derivation)
    }
}

/// A filter predicate from a WHERE, HAVING, or JOIN ON clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterPredicate {
    /// The SQL expression text of the predicate
    pub expression: String,

    /// Where this filter appears in the query
    pub clause_type: FilterClauseType,
}

/// The type of SQL clause where a filter predicate appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterClauseType {
    Where,
    Having,
    JoinOn,
}

/// The type of a node in the lineage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A database table
    Table,
    /// A database view
    View,
    /// A Common Table Expression (WITH clause)
    Cte,
    /// A column
    Column,
}

impl NodeType {
    /// Tables, views and CTEs: anything that owns columns.
    pub fn is_table_like(self) -> bool {
        matches!(self, NodeType::Table | NodeType::View | NodeType::Cte)
    }

    /// Persistent relations (tables and views, not CTEs).
    pub fn is_relation(self) -> bool {
        matches!(self, NodeType::Table | NodeType::View)
    }
}

/// The type of SQL JOIN operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    LeftSemi,
    RightSemi,
    LeftAnti,
    RightAnti,
    CrossApply,
    OuterApply,
    AsOf,
}

impl JoinType {
    /// Label shown on edges that bring a joined table into a query.
    pub fn label(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
            JoinType::LeftSemi => "LEFT SEMI JOIN",
            JoinType::RightSemi => "RIGHT SEMI JOIN",
            JoinType::LeftAnti => "LEFT ANTI JOIN",
            JoinType::RightAnti => "RIGHT ANTI JOIN",
            JoinType::CrossApply => "CROSS APPLY",
            JoinType::OuterApply => "OUTER APPLY",
            JoinType::AsOf => "AS OF JOIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Table/CTE owns columns
    Ownership,
    /// Data flows from one column to another
    DataFlow,
    /// Output derived from inputs (with transformation)
    Derivation,
    /// Table is required by a join but contributes no columns
    JoinDependency,
    /// Cross-statement dependency
    CrossStatement,
}

/// Resolved schema metadata showing the effective schema used during analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSchemaMetadata {
    /// All tables used during analysis (imported + implied)
    pub tables: Vec<ResolvedSchemaTable>,
}

impl ResolvedSchemaMetadata {
    /// Find a schema table matching a lineage table node by qualified name or label.
    pub fn find_table(&self, node: &Node) -> Option<&ResolvedSchemaTable> {
        let qualified = node.display_name();
        self.tables
            .iter()
            .find(|table| table.qualified_name().eq_ignore_ascii_case(qualified))
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|table| table.name.eq_ignore_ascii_case(&node.label))
            })
    }
}

/// A table in the resolved schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSchemaTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ResolvedColumnSchema>,
}

impl ResolvedSchemaTable {
    /// `catalog.schema.name` with absent parts omitted.
    pub fn qualified_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref cat) = self.catalog {
            parts.push(cat.as_str());
        }
        if let Some(ref sch) = self.schema {
            parts.push(sch.as_str());
        }
        parts.push(&self.name);
        parts.join(".")
    }
}

/// A column in the resolved schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedColumnSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_result_deserializes_analyzer_output() {
        let json = r#"{
            "statements": [{
                "statementIndex": 0,
                "statementType": "SELECT",
                "sourceName": "a.sql",
                "nodes": [
                    {"id": "tbl_1", "type": "table", "label": "users", "qualifiedName": "public.users"},
                    {"id": "col_1", "type": "column", "label": "id"}
                ],
                "edges": [
                    {"id": "e1", "from": "tbl_1", "to": "col_1", "type": "ownership"}
                ]
            }],
            "globalLineage": {"nodes": [], "edges": []},
            "issues": [],
            "summary": {"statementCount": 1, "tableCount": 1, "columnCount": 1}
        }"#;

        let result: AnalyzeResult = serde_json::from_str(json).unwrap();
        let stmt = &result.statements[0];
        assert_eq!(stmt.nodes[0].node_type, NodeType::Table);
        assert_eq!(stmt.nodes[0].display_name(), "public.users");
        assert_eq!(stmt.edges[0].edge_type, EdgeType::Ownership);
        assert_eq!(stmt.join_count, 0);
        assert!(result.resolved_schema.is_none());
    }

    #[test]
    fn test_schema_table_lookup_is_case_insensitive() {
        let schema = ResolvedSchemaMetadata {
            tables: vec![ResolvedSchemaTable {
                catalog: None,
                schema: Some("public".to_string()),
                name: "Users".to_string(),
                columns: vec![],
            }],
        };

        let qualified = Node::table("t", "users").with_qualified_name("PUBLIC.USERS");
        assert!(schema.find_table(&qualified).is_some());

        let bare = Node::table("t", "users");
        assert!(schema.find_table(&bare).is_some());

        let other = Node::table("t", "orders");
        assert!(schema.find_table(&other).is_none());
    }

    #[test]
    fn test_join_type_label() {
        assert_eq!(JoinType::Left.label(), "LEFT JOIN");
        let parsed: JoinType = serde_json::from_str("\"LEFT_SEMI\"").unwrap();
        assert_eq!(parsed, JoinType::LeftSemi);
    }
}
