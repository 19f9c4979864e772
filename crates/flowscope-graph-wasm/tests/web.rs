//! Entry point tests for the wasm32 target. Run with `wasm-pack test --node`.
#![cfg(target_arch = "wasm32")]

use flowscope_graph_wasm::{build_graph_json, build_matrix_json, get_version, init, layout_json};
use serde_json::{json, Value};
use wasm_bindgen_test::wasm_bindgen_test;

fn statements() -> Value {
    json!([
        {
            "statementIndex": 0,
            "statementType": "INSERT",
            "sourceName": "load.sql",
            "nodes": [
                { "id": "raw", "type": "table", "label": "raw", "qualifiedName": "raw" },
                { "id": "raw.id", "type": "column", "label": "id" },
                { "id": "stage", "type": "table", "label": "stage", "qualifiedName": "stage" },
                { "id": "stage.id", "type": "column", "label": "id" }
            ],
            "edges": [
                { "id": "o1", "from": "raw", "to": "raw.id", "type": "ownership" },
                { "id": "o2", "from": "stage", "to": "stage.id", "type": "ownership" },
                { "id": "f1", "from": "raw.id", "to": "stage.id", "type": "data_flow" }
            ]
        }
    ])
}

fn parse(output: &str) -> Value {
    serde_json::from_str(output).expect("entry points return JSON")
}

#[wasm_bindgen_test]
fn column_graph_over_the_boundary() {
    init();
    let request = json!({
        "type": "build-table-graph",
        "requestId": 11,
        "statements": statements(),
        "showColumnEdges": true,
    });
    let response = parse(&build_graph_json(&request.to_string()));
    assert_eq!(response["requestId"], 11);
    assert!(response.get("error").is_none());
    let edges = response["edges"].as_array().expect("edges");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["sourceHandle"], "raw.id");
}

#[wasm_bindgen_test]
fn layout_places_every_node() {
    let request = json!({
        "type": "layout",
        "requestId": 12,
        "nodes": [
            { "id": "raw", "type": "tableNode", "columnCount": 1 },
            { "id": "stage", "type": "tableNode", "columnCount": 1 }
        ],
        "edges": [{ "id": "e", "source": "raw", "target": "stage" }],
        "direction": "LR",
        "algorithm": "rank",
    });
    let response = parse(&layout_json(&request.to_string()));
    assert_eq!(response["requestId"], 12);
    assert!(response["positions"]["raw"]["x"].is_number());
    assert!(response["positions"]["stage"]["x"].is_number());
}

#[wasm_bindgen_test]
fn matrix_with_focus() {
    let request = json!({ "statements": statements(), "focus": "stage" });
    let response = parse(&build_matrix_json(&request.to_string()));
    assert_eq!(response["matrix"]["items"], json!(["raw", "stage"]));
    assert_eq!(response["xray"]["ancestors"], json!(["raw"]));
}

#[wasm_bindgen_test]
fn malformed_input_never_throws() {
    assert!(parse(&build_graph_json("{")).get("error").is_some());
    assert!(parse(&layout_json("[]")).get("error").is_some());
    assert!(!get_version().is_empty());
}
