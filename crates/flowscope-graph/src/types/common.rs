//! Common types shared between lineage input and view output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An issue reported by the analyzer (error, warning, or info).
///
/// Issues are carried through untouched; the graph builders never inspect them.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Severity level
    pub severity: Severity,

    /// Machine-readable issue code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional: which statement index this issue relates to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_index: Option<usize>,

    /// Optional: source file name where the issue occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A byte range in the source SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Byte offset from start of SQL string (inclusive)
    pub start: usize,
    /// Byte offset from start of SQL string (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Summary statistics for an analysis result.
///
/// Only used to detect that a new analysis result arrived; the graph
/// algorithms never read it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Summary {
    /// Total number of statements analyzed
    pub statement_count: usize,

    /// Total unique tables/CTEs discovered across all statements
    pub table_count: usize,

    /// Total columns in output
    pub column_count: usize,

    /// Total number of JOIN operations
    pub join_count: usize,

    /// Complexity score (1-100) based on query structure
    pub complexity_score: u8,

    /// Issue counts by severity
    pub issue_count: IssueCount,

    /// Quick check: true if any errors were encountered
    pub has_errors: bool,
}

/// Counts of issues by severity level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueCount {
    /// Number of error-level issues
    pub errors: usize,
    /// Number of warning-level issues
    pub warnings: usize,
    /// Number of info-level issues
    pub infos: usize,
}
