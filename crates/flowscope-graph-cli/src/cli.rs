//! CLI argument parsing using clap.

use clap::{Parser, ValueEnum};
use flowscope_graph::{LayoutAlgorithm, LayoutDirection, MatrixMode, ViewMode};
use std::path::PathBuf;

/// FlowScope Graph - lineage view graphs and dependency matrices
#[derive(Parser, Debug)]
#[command(name = "flowscope-graph")]
#[command(about = "Build lineage view graphs from FlowScope analysis results", long_about = None)]
#[command(version)]
pub struct Args {
    /// Analysis result JSON files (reads from stdin if none provided)
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Which view to build
    #[arg(short, long, default_value = "table", value_enum)]
    pub view: ViewArg,

    /// Output format
    #[arg(short, long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Highlight nodes and columns matching this term
    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,

    /// Select a node; its upstream and downstream are highlighted
    #[arg(long, value_name = "NODE_ID")]
    pub select: Option<String>,

    /// Flip a node's collapse state relative to the default (can be repeated)
    #[arg(long, value_name = "NODE_ID")]
    pub collapse: Vec<String>,

    /// Show schema-only columns of a table (can be repeated)
    #[arg(long, value_name = "NODE_ID")]
    pub expand: Vec<String>,

    /// Start with every node collapsed
    #[arg(long)]
    pub default_collapsed: bool,

    /// Layout algorithm
    #[arg(long, default_value = "rank", value_enum)]
    pub layout: LayoutArg,

    /// Direction ranks advance in
    #[arg(long, default_value = "lr", value_enum)]
    pub direction: DirectionArg,

    /// Items of the dependency matrix (with --view matrix)
    #[arg(long, default_value = "table", value_enum)]
    pub matrix_mode: MatrixModeArg,

    /// Reorder matrix items so related items sit together
    #[arg(long)]
    pub cluster: bool,

    /// Show everything upstream and downstream of a matrix item
    #[arg(long, value_name = "ITEM")]
    pub xray: Option<String>,

    /// Mark matrix cells whose column mappings mention a field
    #[arg(long, value_name = "FIELD")]
    pub trace_field: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Suppress warnings on stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Log debug events to stderr
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Compute graphs on the calling thread instead of a worker thread
    #[arg(long)]
    pub no_worker: bool,

    /// Print the JSON schema of the worker protocol and exit
    #[arg(long)]
    pub schema: bool,
}

/// Views the CLI can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    Table,
    Column,
    Script,
    Hybrid,
    Matrix,
}

impl ViewArg {
    /// The graph view, or `None` for the matrix.
    pub fn view_mode(self) -> Option<ViewMode> {
        match self {
            ViewArg::Table => Some(ViewMode::Table),
            ViewArg::Column => Some(ViewMode::Column),
            ViewArg::Script => Some(ViewMode::Script),
            ViewArg::Hybrid => Some(ViewMode::Hybrid),
            ViewArg::Matrix => None,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Table,
    /// JSON output
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// Layered layout (longest-path ranks, barycenter ordering)
    Rank,
    /// Layered layout relaxed with springs; falls back to rank on large graphs
    Constraint,
}

impl From<LayoutArg> for LayoutAlgorithm {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Rank => LayoutAlgorithm::Rank,
            LayoutArg::Constraint => LayoutAlgorithm::Constraint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Left to right
    Lr,
    /// Top to bottom
    Tb,
}

impl From<DirectionArg> for LayoutDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Lr => LayoutDirection::LR,
            DirectionArg::Tb => LayoutDirection::TB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatrixModeArg {
    Table,
    Script,
}

impl From<MatrixModeArg> for MatrixMode {
    fn from(arg: MatrixModeArg) -> Self {
        match arg {
            MatrixModeArg::Table => MatrixMode::Table,
            MatrixModeArg::Script => MatrixMode::Script,
        }
    }
}
