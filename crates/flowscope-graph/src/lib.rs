pub mod adapter;
pub mod error;
pub mod graph;
pub mod layout;
pub mod matrix;
pub mod protocol;
pub mod staging;
pub mod state;
pub mod types;

// Re-export main types and functions
pub use adapter::{merge_statements, validate_statement};
pub use error::{GraphError, LayoutError};
pub use graph::{
    apply_highlights, build_column_graph, build_script_graph, build_table_graph, build_view_graph,
    OUTPUT_NODE_ID,
};
pub use layout::{
    compute_layout, instant_layout, sizing_hints, LayoutAlgorithm, LayoutDirection, LayoutEdge,
    LayoutNode, LayoutOptions, LayoutResult, SizingHints,
};
pub use matrix::{
    build_matrix, cluster_order, trace_field, transitive_flow, CellType, FieldTrace, Matrix,
    MatrixCellData, MatrixMode, MatrixOptions, TransitiveSet,
};
pub use protocol::{handle_json, handle_request, protocol_schema, WorkerRequest, WorkerResponse};
pub use staging::{BuildOutcome, RenderKey, RenderStage, StagingController};
pub use state::{ViewMode, ViewSnapshot, ViewState, ViewStateStore};

// Re-export types explicitly
pub use types::{
    // Lineage input
    AnalyzeResult,
    Edge,
    EdgeType,
    JoinType,
    Node,
    NodeType,
    ResolvedSchemaMetadata,
    StatementLineage,
    // View graph output
    FlowEdge,
    FlowGraph,
    FlowNode,
    FlowNodeKind,
    Position,
};

// Test utilities (must be at end of file)
#[cfg(test)]
pub mod test_utils;
