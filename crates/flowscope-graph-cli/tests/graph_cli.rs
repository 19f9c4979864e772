use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::tempdir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../flowscope-graph/tests/fixtures/etl_pipeline.json")
}

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_flowscope-graph"))
}

#[test]
fn column_view_as_json_has_positions() {
    let output = cli()
        .args(["--view", "column", "-f", "json"])
        .arg(fixture())
        .output()
        .expect("run CLI");

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(report["view"], "column");
    let nodes = report["nodes"].as_array().expect("nodes");
    assert!(nodes.iter().any(|node| node["id"] == "tbl:mart.revenue"));
    for node in nodes {
        assert!(node["position"]["x"].is_number());
    }
    assert!(report.get("error").is_none());
}

#[test]
fn matrix_with_xray_written_to_file() {
    let dir = tempdir().expect("temp dir");
    let output_path = dir.path().join("matrix.txt");

    let status = cli()
        .args(["--view", "matrix", "--cluster", "--xray", "staging.orders", "--trace-field", "amount", "-o"])
        .arg(&output_path)
        .arg(fixture())
        .status()
        .expect("run CLI");

    assert!(status.success());
    let text = std::fs::read_to_string(&output_path).expect("output exists");
    assert!(text.contains("FlowScope Dependency Matrix (table mode)"));
    assert!(text.contains("X-Ray staging.orders:"));
    assert!(text.contains("upstream:   raw.orders"));
    assert!(text.contains("Field trace 'amount'"));
}

#[test]
fn script_view_from_stdin_without_worker() {
    let mut child = cli()
        .args(["--view", "script", "-f", "json", "--compact", "--no-worker"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("run CLI");
    let input = std::fs::read(fixture()).expect("fixture");
    child.stdin.take().expect("stdin").write_all(&input).expect("write stdin");

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json output");
    let ids: Vec<&str> = report["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .filter_map(|node| node["id"].as_str())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&"script:report.sql"));
}

#[test]
fn malformed_lineage_exits_with_failure() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("broken.json");
    std::fs::write(
        &input,
        r#"{"statements":[{"statementIndex":0,"statementType":"SELECT","nodes":[{"id":" ","type":"table","label":"t"}],"edges":[]}]}"#,
    )
    .expect("write input");

    let output = cli()
        .args(["-f", "json", "--quiet"])
        .arg(&input)
        .output()
        .expect("run CLI");

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert!(report["error"].as_str().expect("error").contains("empty id"));
    assert_eq!(report["nodes"], serde_json::json!([]));
}

#[test]
fn input_and_config_errors_exit_66() {
    let missing = cli()
        .arg("/nonexistent/result.json")
        .output()
        .expect("run CLI");
    assert_eq!(missing.status.code(), Some(66));

    let xray_on_graph = cli()
        .args(["--view", "table", "--xray", "a"])
        .arg(fixture())
        .output()
        .expect("run CLI");
    assert_eq!(xray_on_graph.status.code(), Some(66));
    assert!(String::from_utf8_lossy(&xray_on_graph.stderr).contains("--xray requires --view matrix"));
}

#[test]
fn prints_protocol_schema() {
    let output = cli().arg("--schema").output().expect("run CLI");
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).expect("json schema");
    assert!(schema.is_object());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("build-table-graph"));
    assert!(text.contains("requestId"));
}
