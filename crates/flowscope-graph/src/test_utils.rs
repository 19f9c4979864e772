//! Test utilities for loading analysis fixtures.

use std::path::PathBuf;

use crate::types::{AnalyzeResult, Edge, Node, StatementLineage};

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(manifest_dir).join("tests").join("fixtures")
}

/// Load an analysis result JSON fixture by name
pub fn load_result_fixture(name: &str) -> AnalyzeResult {
    let path = fixtures_dir().join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to load fixture {path:?}: {e}"));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {path:?}: {e}"))
}

/// `INSERT INTO target SELECT ... FROM source` as lineage, one column wide.
pub fn insert_select(source_name: &str, from: &str, to: &str) -> StatementLineage {
    StatementLineage::new("INSERT")
        .with_source_name(source_name)
        .with_node(Node::table(from, from))
        .with_node(Node::column(format!("{from}.c"), "c"))
        .with_node(Node::table(to, to))
        .with_node(Node::column(format!("{to}.c"), "c"))
        .with_edge(Edge::ownership(format!("own:{from}.c"), from, format!("{from}.c")))
        .with_edge(Edge::ownership(format!("own:{to}.c"), to, format!("{to}.c")))
        .with_edge(Edge::data_flow(
            format!("flow:{from}->{to}"),
            format!("{from}.c"),
            format!("{to}.c"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etl_fixture_loads() {
        let result = load_result_fixture("etl_pipeline.json");
        assert_eq!(result.statements.len(), 3);
        assert!(result.resolved_schema.is_some());
    }

    #[test]
    fn test_insert_select_shape() {
        let stmt = insert_select("a.sql", "src", "dst");
        assert_eq!(stmt.nodes.len(), 4);
        assert_eq!(stmt.edges.iter().filter(|edge| edge.is_flow()).count(), 1);
    }
}
