//! FlowScope Graph CLI - lineage view graphs and dependency matrices

use flowscope_graph_cli::cli;
use flowscope_graph_cli::input;
use flowscope_graph_cli::output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flowscope_graph::{
    build_matrix, protocol_schema, trace_field, transitive_flow, AnalyzeResult, LayoutOptions,
    MatrixOptions, ViewMode,
};
use flowscope_graph_worker::{GraphService, RenderSession, RenderStatus};
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use cli::{Args, OutputFormat};
use output::{format_graph, format_json, format_matrix, GraphReport, MatrixReport};

/// The graph or matrix could not be built.
const EXIT_FAILURE: u8 = 1;
/// Configuration or input error.
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("flowscope-graph: error: {e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG`. `--verbose` raises the default to
/// debug and `--quiet` lowers it to errors.
fn init_tracing(args: &Args) {
    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Returns whether a build error was reported.
fn run(args: Args) -> Result<bool> {
    if args.schema {
        let schema = serde_json::to_string_pretty(&protocol_schema())
            .context("Failed to serialize protocol schema")?;
        write_output(&args.output, &schema)?;
        return Ok(false);
    }

    validate_args(&args)?;
    let result = input::read_input(&args.files)?;
    debug!(statements = result.statements.len(), "loaded analysis result");

    match args.view.view_mode() {
        Some(mode) => run_graph(&args, mode, result),
        None => run_matrix(&args, result),
    }
}

fn validate_args(args: &Args) -> Result<()> {
    if args.view.view_mode().is_some() {
        if args.xray.is_some() {
            bail!("--xray requires --view matrix");
        }
        if args.trace_field.is_some() {
            bail!("--trace-field requires --view matrix");
        }
    }
    Ok(())
}

fn run_graph(args: &Args, mode: ViewMode, result: AnalyzeResult) -> Result<bool> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let service = if args.no_worker {
        GraphService::synchronous()
    } else {
        // The worker client spawns its reader task on this runtime.
        let _guard = runtime.enter();
        GraphService::spawn().unwrap_or_else(|e| {
            warn!(error = %e, "worker unavailable, computing on the main thread");
            GraphService::synchronous()
        })
    };

    let options = LayoutOptions {
        algorithm: args.layout.into(),
        direction: args.direction.into(),
        ..LayoutOptions::default()
    };
    let mut session = RenderSession::new(Arc::new(service), options);
    session.set_result(result);

    let store = session.store_mut();
    store.set_view_mode(mode);
    store.set_default_collapsed(args.default_collapsed);
    if let Some(term) = &args.search {
        store.set_search_term(term.as_str());
    }
    store.select_node(args.select.clone());
    for node_id in &args.collapse {
        store.toggle_collapsed(node_id);
    }
    for node_id in &args.expand {
        store.toggle_table_expanded(node_id);
    }

    let status = runtime.block_on(session.render());
    if status == RenderStatus::Superseded {
        bail!("graph render was cancelled");
    }

    let error = session.last_error().map(str::to_string);
    if let Some(error) = &error {
        if !args.quiet {
            eprintln!("flowscope-graph: warning: {error}");
        }
    }

    let graph = session.graph();
    let report = GraphReport {
        view: mode,
        nodes: graph.nodes.clone(),
        edges: graph.edges.clone(),
        error,
    };
    let output_str = match args.format {
        OutputFormat::Json => format_json(&report, args.compact)?,
        OutputFormat::Table => format_graph(&report, args.output.is_none()),
    };
    write_output(&args.output, &output_str)?;

    Ok(report.error.is_some())
}

fn run_matrix(args: &Args, result: AnalyzeResult) -> Result<bool> {
    let options = MatrixOptions {
        mode: args.matrix_mode.into(),
        cluster: args.cluster,
        ..MatrixOptions::default()
    };
    let matrix = match build_matrix(&result.statements, &options) {
        Ok(matrix) => matrix,
        Err(e) => {
            eprintln!("flowscope-graph: error: {e}");
            return Ok(true);
        }
    };

    if let Some(focus) = &args.xray {
        if matrix.index_of(focus).is_none() && !args.quiet {
            eprintln!("flowscope-graph: warning: '{focus}' is not a matrix item");
        }
    }
    let report = MatrixReport {
        xray: args.xray.as_deref().map(|focus| transitive_flow(&matrix, focus)),
        trace: args.trace_field.as_deref().map(|term| trace_field(&matrix, term)),
        matrix,
    };

    let output_str = match args.format {
        OutputFormat::Json => format_json(&report, args.compact)?,
        OutputFormat::Table => format_matrix(&report, args.output.is_none()),
    };
    write_output(&args.output, &output_str)?;
    Ok(false)
}

fn write_output(path: &Option<std::path::PathBuf>, content: &str) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, content)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    } else {
        io::stdout()
            .write_all(content.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure newline at end for terminal output
        if !content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
