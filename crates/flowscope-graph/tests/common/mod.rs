#![allow(dead_code)]

use std::path::PathBuf;

use flowscope_graph::{AnalyzeResult, Edge, Node, StatementLineage};

pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn load_result(name: &str) -> AnalyzeResult {
    let path = fixtures_root().join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {path:?}: {e}"));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("failed to parse fixture {path:?}: {e}"))
}

/// The single-statement scenario: a table with one column that flows into a
/// node no statement defines.
pub fn dangling_statement() -> StatementLineage {
    StatementLineage::new("SELECT")
        .with_source_name("a.sql")
        .with_node(Node::table("T1", "t1"))
        .with_node(Node::column("C1", "c1"))
        .with_edge(Edge::ownership("e1", "T1", "C1"))
        .with_edge(Edge::data_flow("e2", "C1", "OUT"))
}

/// `to` is loaded from `from` in script `source`.
pub fn load_step(source: &str, from: &str, to: &str) -> StatementLineage {
    StatementLineage::new("INSERT")
        .with_source_name(source)
        .with_node(Node::table(from, from))
        .with_node(Node::column(format!("{from}.id"), "id"))
        .with_node(Node::table(to, to))
        .with_node(Node::column(format!("{to}.id"), "id"))
        .with_edge(Edge::ownership(format!("own:{from}.id"), from, format!("{from}.id")))
        .with_edge(Edge::ownership(format!("own:{to}.id"), to, format!("{to}.id")))
        .with_edge(Edge::data_flow(
            format!("flow:{from}->{to}"),
            format!("{from}.id"),
            format!("{to}.id"),
        ))
}
