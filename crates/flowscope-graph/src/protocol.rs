//! Worker message protocol.
//!
//! Requests and responses are plain data (sets travel as arrays) so they can
//! cross a thread or a browser worker boundary as JSON. [`handle_request`] is
//! the worker side; it never fails. Build and layout errors are reported in
//! the response `error` field next to an empty result.

use std::collections::BTreeMap;

use schemars::generate::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::adapter::merge_statements;
use crate::graph::build_view_graph;
use crate::layout::{
    compute_layout, LayoutAlgorithm, LayoutDirection, LayoutEdge, LayoutOptions, SizingHints,
};
use crate::state::{ViewMode, ViewSnapshot, ViewState};
use crate::types::{FlowEdge, FlowNode, Node, Position, ResolvedSchemaMetadata, StatementLineage};

/// Request sent to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerRequest {
    BuildTableGraph(BuildGraphRequest),
    BuildScriptGraph(BuildGraphRequest),
    Layout(LayoutRequest),
}

impl WorkerRequest {
    pub fn request_id(&self) -> u64 {
        match self {
            WorkerRequest::BuildTableGraph(req) | WorkerRequest::BuildScriptGraph(req) => {
                req.request_id
            }
            WorkerRequest::Layout(req) => req.request_id,
        }
    }

    pub fn set_request_id(&mut self, request_id: u64) {
        match self {
            WorkerRequest::BuildTableGraph(req) | WorkerRequest::BuildScriptGraph(req) => {
                req.request_id = request_id
            }
            WorkerRequest::Layout(req) => req.request_id = request_id,
        }
    }

    /// Build request for a view mode and a view-state snapshot.
    pub fn build(
        statements: Vec<StatementLineage>,
        resolved_schema: Option<ResolvedSchemaMetadata>,
        snapshot: &ViewSnapshot,
    ) -> Self {
        let state = &snapshot.state;
        let request = BuildGraphRequest {
            request_id: 0,
            statements,
            selected_node_id: state.selected_node_id.clone(),
            search_term: state.search_term.clone(),
            collapsed_node_ids: state.collapsed_node_ids.iter().cloned().collect(),
            expanded_table_ids: state.expanded_table_ids.iter().cloned().collect(),
            resolved_schema,
            default_collapsed: state.default_collapsed,
            show_column_edges: snapshot.view_mode == ViewMode::Column,
            show_tables: snapshot.view_mode == ViewMode::Hybrid,
        };
        if snapshot.view_mode.is_script_level() {
            WorkerRequest::BuildScriptGraph(request)
        } else {
            WorkerRequest::BuildTableGraph(request)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildGraphRequest {
    pub request_id: u64,
    pub statements: Vec<StatementLineage>,
    #[serde(default)]
    pub selected_node_id: Option<String>,
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub collapsed_node_ids: Vec<String>,
    #[serde(default)]
    pub expanded_table_ids: Vec<String>,
    #[serde(default)]
    pub resolved_schema: Option<ResolvedSchemaMetadata>,
    #[serde(default)]
    pub default_collapsed: bool,
    /// Table requests only: wire columns instead of tables
    #[serde(default)]
    pub show_column_edges: bool,
    /// Script requests only: add table nodes (hybrid view)
    #[serde(default)]
    pub show_tables: bool,
}

impl BuildGraphRequest {
    pub fn view_state(&self) -> ViewState {
        ViewState {
            selected_node_id: self.selected_node_id.clone(),
            search_term: self.search_term.clone(),
            collapsed_node_ids: self.collapsed_node_ids.iter().cloned().collect(),
            expanded_table_ids: self.expanded_table_ids.iter().cloned().collect(),
            default_collapsed: self.default_collapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub request_id: u64,
    pub nodes: Vec<SizingHints>,
    #[serde(default)]
    pub edges: Vec<LayoutEdge>,
    #[serde(default)]
    pub direction: LayoutDirection,
    #[serde(default)]
    pub algorithm: LayoutAlgorithm,
}

/// Response from the worker, matched to its request by `requestId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum WorkerResponse {
    Graph(GraphResponse),
    Layout(LayoutResponse),
}

impl WorkerResponse {
    pub fn request_id(&self) -> u64 {
        match self {
            WorkerResponse::Graph(resp) => resp.request_id,
            WorkerResponse::Layout(resp) => resp.request_id,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            WorkerResponse::Graph(resp) => resp.error.as_deref(),
            WorkerResponse::Layout(resp) => resp.error.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphResponse {
    pub request_id: u64,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Merged lineage nodes, for column lookups in table views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage_nodes: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub request_id: u64,
    pub positions: BTreeMap<String, Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serve one request.
pub fn handle_request(request: WorkerRequest) -> WorkerResponse {
    match request {
        WorkerRequest::BuildTableGraph(req) => {
            let mode = if req.show_column_edges {
                ViewMode::Column
            } else {
                ViewMode::Table
            };
            WorkerResponse::Graph(build_graph(req, mode))
        }
        WorkerRequest::BuildScriptGraph(req) => {
            let mode = if req.show_tables {
                ViewMode::Hybrid
            } else {
                ViewMode::Script
            };
            WorkerResponse::Graph(build_graph(req, mode))
        }
        WorkerRequest::Layout(req) => WorkerResponse::Layout(layout(req)),
    }
}

fn build_graph(req: BuildGraphRequest, mode: ViewMode) -> GraphResponse {
    let state = req.view_state();
    match build_view_graph(&req.statements, req.resolved_schema.as_ref(), mode, &state) {
        Ok(graph) => {
            #[cfg(feature = "tracing")]
            debug!(
                request_id = req.request_id,
                mode = %mode,
                nodes = graph.nodes.len(),
                edges = graph.edges.len(),
                "graph request served"
            );
            let lineage_nodes =
                (!mode.is_script_level()).then(|| merge_statements(&req.statements).nodes.clone());
            GraphResponse {
                request_id: req.request_id,
                nodes: graph.nodes,
                edges: graph.edges,
                error: None,
                lineage_nodes,
            }
        }
        Err(err) => {
            #[cfg(feature = "tracing")]
            warn!(request_id = req.request_id, error = %err, "graph build failed");
            GraphResponse {
                request_id: req.request_id,
                error: Some(err.to_string()),
                ..GraphResponse::default()
            }
        }
    }
}

fn layout(req: LayoutRequest) -> LayoutResponse {
    let nodes: Vec<_> = req.nodes.iter().map(SizingHints::to_layout_node).collect();
    let options = LayoutOptions {
        direction: req.direction,
        algorithm: req.algorithm,
        ..LayoutOptions::default()
    };
    match compute_layout(&nodes, &req.edges, &options) {
        Ok(result) => LayoutResponse {
            request_id: req.request_id,
            positions: result.positions,
            error: None,
        },
        Err(err) => {
            #[cfg(feature = "tracing")]
            warn!(request_id = req.request_id, error = %err, "layout failed");
            LayoutResponse {
                request_id: req.request_id,
                positions: BTreeMap::new(),
                error: Some(err.to_string()),
            }
        }
    }
}

/// Serve one JSON-encoded request and return the JSON-encoded response.
///
/// Undecodable requests produce a graph-shaped response carrying the error and,
/// when it can be read, the request id.
pub fn handle_json(request: &str) -> String {
    let response = match serde_json::from_str::<WorkerRequest>(request) {
        Ok(request) => handle_request(request),
        Err(err) => {
            let request_id = serde_json::from_str::<serde_json::Value>(request)
                .ok()
                .and_then(|value| value.get("requestId").and_then(serde_json::Value::as_u64))
                .unwrap_or(0);
            WorkerResponse::Graph(GraphResponse {
                request_id,
                error: Some(format!("invalid request: {err}")),
                ..GraphResponse::default()
            })
        }
    };
    serde_json::to_string(&response).unwrap_or_else(|err| {
        error_json(
            response.request_id(),
            &format!("failed to encode response: {err}"),
        )
    })
}

/// Empty graph-shaped response carrying `message`.
fn error_json(request_id: u64, message: &str) -> String {
    serde_json::json!({
        "requestId": request_id,
        "nodes": [],
        "edges": [],
        "error": message,
    })
    .to_string()
}

/// Both sides of the protocol, for schema generation.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct WorkerProtocol {
    request: WorkerRequest,
    response: WorkerResponse,
}

/// JSON schema (draft 7) of the worker protocol.
pub fn protocol_schema() -> serde_json::Value {
    let generator = SchemaSettings::draft07().into_generator();
    serde_json::to_value(generator.into_root_schema_for::<WorkerProtocol>())
        .unwrap_or(serde_json::Value::Null)
}
