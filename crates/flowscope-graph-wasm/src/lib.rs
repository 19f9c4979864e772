use flowscope_graph::protocol::{GraphResponse, LayoutRequest, LayoutResponse};
use flowscope_graph::{
    build_matrix, handle_request, trace_field, transitive_flow, FieldTrace, Matrix, MatrixOptions,
    StatementLineage, TransitiveSet, WorkerRequest, WorkerResponse,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Install the panic hook (and the tracing layer when enabled). Call once
/// from the web worker before anything else.
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
    #[cfg(feature = "tracing")]
    tracing_wasm::set_as_global_default();
}

/// Build a table, column, script or hybrid graph from a worker request.
/// This function never throws - errors are returned in the response's error field
#[wasm_bindgen]
pub fn build_graph_json(request_json: &str) -> String {
    let response = match serde_json::from_str::<WorkerRequest>(request_json) {
        Ok(WorkerRequest::Layout(req)) => {
            graph_error(req.request_id, "layout requests go to layout_json")
        }
        Ok(request) => handle_request(request),
        Err(e) => graph_error(request_id_of(request_json), &format!("invalid request: {e}")),
    };
    to_json(&response)
}

/// Lay out a graph from its sizing hints and edges.
/// This function never throws - errors are returned in the response's error field
#[wasm_bindgen]
pub fn layout_json(request_json: &str) -> String {
    let response = match serde_json::from_str::<LayoutRequest>(request_json) {
        Ok(request) => handle_request(WorkerRequest::Layout(request)),
        Err(e) => WorkerResponse::Layout(LayoutResponse {
            request_id: request_id_of(request_json),
            error: Some(format!("invalid request: {e}")),
            ..LayoutResponse::default()
        }),
    };
    to_json(&response)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatrixRequest {
    statements: Vec<StatementLineage>,
    #[serde(flatten)]
    options: MatrixOptions,
    #[serde(default)]
    focus: Option<String>,
    #[serde(default)]
    trace_field: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatrixResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    matrix: Option<Matrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    xray: Option<TransitiveSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<FieldTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Build a dependency matrix, with an optional X-Ray focus and field trace.
/// This function never throws - errors are returned in the response's error field
#[wasm_bindgen]
pub fn build_matrix_json(request_json: &str) -> String {
    let request: MatrixRequest = match serde_json::from_str(request_json) {
        Ok(req) => req,
        Err(e) => {
            return to_json(&MatrixResponse {
                error: Some(format!("invalid request: {e}")),
                ..MatrixResponse::default()
            })
        }
    };

    let response = match build_matrix(&request.statements, &request.options) {
        Ok(matrix) => MatrixResponse {
            xray: request
                .focus
                .as_deref()
                .map(|focus| transitive_flow(&matrix, focus)),
            trace: request
                .trace_field
                .as_deref()
                .filter(|term| !term.trim().is_empty())
                .map(|term| trace_field(&matrix, term)),
            matrix: Some(matrix),
            error: None,
        },
        Err(e) => MatrixResponse {
            error: Some(e.to_string()),
            ..MatrixResponse::default()
        },
    };
    to_json(&response)
}

/// Get version information
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn graph_error(request_id: u64, message: &str) -> WorkerResponse {
    WorkerResponse::Graph(GraphResponse {
        request_id,
        error: Some(message.to_string()),
        ..GraphResponse::default()
    })
}

fn request_id_of(request_json: &str) -> u64 {
    serde_json::from_str::<serde_json::Value>(request_json)
        .ok()
        .and_then(|value| value.get("requestId").and_then(serde_json::Value::as_u64))
        .unwrap_or(0)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| r#"{"error":"Failed to serialize result"}"#.to_string())
}
