//! Lineage model adapter: merges statement lineages into one graph source.
//!
//! Multiple statements (one per source file or per SQL batch) are merged as a
//! set union on node and edge ids. The first statement to mention an id wins,
//! and merged nodes are tagged with that statement's source name so views can
//! still tell which script a node came from.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::error::GraphError;
use crate::types::SOURCE_NAME_KEY;
use crate::types::{Edge, Node, StatementLineage};

/// Statement type given to a merge of statements with different types.
pub const MIXED_STATEMENT_TYPE: &str = "MIXED";

/// Statement type given to the merge of zero statements.
pub const EMPTY_STATEMENT_TYPE: &str = "UNKNOWN";

/// Merge statement lineages into a single statement with `statement_index = 0`.
///
/// A single statement is returned borrowed and untouched. Nodes and edges keep
/// first-seen order. `join_count` is summed and `complexity_score` is the maximum.
pub fn merge_statements(statements: &[StatementLineage]) -> Cow<'_, StatementLineage> {
    match statements {
        [single] => Cow::Borrowed(single),
        [] => Cow::Owned(StatementLineage::new(EMPTY_STATEMENT_TYPE)),
        _ => Cow::Owned(merge_many(statements)),
    }
}

fn merge_many(statements: &[StatementLineage]) -> StatementLineage {
    let mut nodes: IndexMap<&str, Node> = IndexMap::new();
    let mut edges: IndexMap<&str, Edge> = IndexMap::new();
    let mut join_count = 0usize;
    let mut complexity_score = 0u8;

    for stmt in statements {
        join_count += stmt.join_count;
        complexity_score = complexity_score.max(stmt.complexity_score);

        for node in &stmt.nodes {
            nodes
                .entry(node.id.as_str())
                .or_insert_with(|| tag_source(node, stmt.source_name.as_deref()));
        }
        for edge in &stmt.edges {
            edges
                .entry(edge.id.as_str())
                .or_insert_with(|| edge.clone());
        }
    }

    let first_type = &statements[0].statement_type;
    let statement_type = if statements
        .iter()
        .all(|stmt| stmt.statement_type.eq_ignore_ascii_case(first_type))
    {
        first_type.clone()
    } else {
        MIXED_STATEMENT_TYPE.to_string()
    };

    let source_name = statements[0].source_name.clone().filter(|first| {
        statements
            .iter()
            .all(|stmt| stmt.source_name.as_deref() == Some(first.as_str()))
    });

    StatementLineage {
        statement_index: 0,
        statement_type,
        source_name,
        nodes: nodes.into_values().collect(),
        edges: edges.into_values().collect(),
        span: None,
        join_count,
        complexity_score,
    }
}

fn tag_source(node: &Node, source_name: Option<&str>) -> Node {
    let mut node = node.clone();
    if let Some(source) = source_name {
        let metadata = node.metadata.get_or_insert_with(Default::default);
        metadata
            .entry(SOURCE_NAME_KEY.to_string())
            .or_insert_with(|| serde_json::Value::String(source.to_string()));
    }
    node
}

/// Reject statements whose nodes or edges cannot be identified.
pub fn validate_statement(stmt: &StatementLineage) -> Result<(), GraphError> {
    if let Some(node) = stmt.nodes.iter().find(|node| node.id.trim().is_empty()) {
        return Err(GraphError::malformed(
            stmt.statement_index,
            format!("node '{}' has an empty id", node.label),
        ));
    }
    if stmt.edges.iter().any(|edge| edge.id.trim().is_empty()) {
        return Err(GraphError::malformed(
            stmt.statement_index,
            "edge with an empty id",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;

    fn stmt(source: &str, kind: &str) -> StatementLineage {
        StatementLineage::new(kind).with_source_name(source)
    }

    #[test]
    fn test_single_statement_is_borrowed() {
        let statements = vec![stmt("a.sql", "SELECT").with_node(Node::table("t1", "users"))];
        let merged = merge_statements(&statements);
        assert!(matches!(merged, Cow::Borrowed(_)));
        assert!(std::ptr::eq(&*merged, &statements[0]));
    }

    #[test]
    fn test_empty_input_yields_empty_graph() {
        let merged = merge_statements(&[]);
        assert!(merged.nodes.is_empty());
        assert!(merged.edges.is_empty());
        assert_eq!(merged.statement_type, EMPTY_STATEMENT_TYPE);
    }

    #[test]
    fn test_merge_first_seen_wins() {
        let mut first = stmt("a.sql", "INSERT").with_node(Node::table("t1", "users"));
        first.join_count = 2;
        first.complexity_score = 10;
        let mut second = stmt("b.sql", "INSERT")
            .with_node(Node::table("t1", "renamed"))
            .with_node(Node::column("c1", "id"))
            .with_edge(Edge::ownership("e1", "t1", "c1"));
        second.join_count = 1;
        second.complexity_score = 40;
        second.statement_index = 1;

        let statements = [first, second];
        let merged = merge_statements(&statements);

        assert_eq!(merged.statement_index, 0);
        assert_eq!(merged.nodes.len(), 2);
        assert_eq!(merged.nodes[0].label, "users");
        assert_eq!(merged.nodes[0].source_name(), Some("a.sql"));
        assert_eq!(merged.nodes[1].source_name(), Some("b.sql"));
        assert_eq!(merged.nodes[1].node_type, NodeType::Column);
        assert_eq!(merged.edges.len(), 1);
        assert_eq!(merged.join_count, 3);
        assert_eq!(merged.complexity_score, 40);
        assert_eq!(merged.statement_type, "INSERT");
        assert_eq!(merged.source_name, None);
    }

    #[test]
    fn test_merge_mixed_statement_types() {
        let statements = [stmt("a.sql", "SELECT"), stmt("a.sql", "INSERT")];
        let merged = merge_statements(&statements);
        assert_eq!(merged.statement_type, MIXED_STATEMENT_TYPE);
        assert_eq!(merged.source_name.as_deref(), Some("a.sql"));
    }

    #[test]
    fn test_existing_source_metadata_is_kept() {
        let mut node = Node::table("t1", "users");
        node.metadata = Some(
            [(
                SOURCE_NAME_KEY.to_string(),
                serde_json::Value::String("origin.sql".to_string()),
            )]
            .into_iter()
            .collect(),
        );
        let statements = [stmt("a.sql", "SELECT").with_node(node), stmt("b.sql", "SELECT")];
        let merged = merge_statements(&statements);
        assert_eq!(merged.nodes[0].source_name(), Some("origin.sql"));
    }

    #[test]
    fn test_validate_rejects_empty_ids() {
        let bad = stmt("a.sql", "SELECT").with_node(Node::table("  ", "users"));
        assert!(validate_statement(&bad).is_err());

        let bad_edge = stmt("a.sql", "SELECT").with_edge(Edge::data_flow("", "a", "b"));
        assert!(validate_statement(&bad_edge).is_err());

        let good = stmt("a.sql", "SELECT").with_node(Node::table("t1", "users"));
        assert!(validate_statement(&good).is_ok());
    }
}
