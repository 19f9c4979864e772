//! JSON output formatting.

use anyhow::{Context, Result};
use serde::Serialize;

/// Format a report as JSON.
///
/// If `compact` is true, outputs minified JSON without whitespace.
pub fn format_json<T: Serialize>(report: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    };
    json.context("Failed to serialize output")
}
