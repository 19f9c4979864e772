//! Output formatting modules.

pub mod json;
pub mod table;

use flowscope_graph::{FieldTrace, FlowEdge, FlowNode, Matrix, TransitiveSet, ViewMode};
use serde::Serialize;

pub use json::format_json;
pub use table::{format_graph, format_matrix};

/// A laid-out view graph as printed by the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphReport {
    pub view: ViewMode,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A dependency matrix with the optional X-Ray and field trace overlays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixReport {
    pub matrix: Matrix,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xray: Option<TransitiveSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<FieldTrace>,
}
