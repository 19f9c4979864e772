//! Types for lineage view graphs.
//!
//! This module defines the lineage input types (the FlowScope analyzer output
//! consumed by the graph builders) and the flow-graph types produced for
//! rendering. Both sides serialize with camelCase field names so they can cross
//! the worker boundary unchanged.

mod common;
mod flow;
mod lineage;

pub use common::{Issue, IssueCount, Severity, Span, Summary};
pub use flow::{
    ColumnEntry, EdgeStyle, FlowEdge, FlowEdgeData, FlowGraph, FlowNode, FlowNodeData,
    FlowNodeKind, Position, ScriptNodeData, SimpleTableNodeData, TableKind, TableNodeData,
};
pub use lineage::{
    AggregationInfo, AnalyzeResult, Edge, EdgeType, FilterClauseType, FilterPredicate, JoinType,
    Node, NodeType, ResolvedColumnSchema, ResolvedSchemaMetadata, ResolvedSchemaTable,
    StatementLineage,
};

pub(crate) use lineage::SOURCE_NAME_KEY;
