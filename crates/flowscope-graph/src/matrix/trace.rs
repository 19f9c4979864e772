//! Field tracing: which dependencies carry a given column.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Matrix;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TracedCell {
    pub row: String,
    pub col: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldTrace {
    pub term: String,
    /// Cells whose column mappings mention the field, in row-major order
    pub cells: Vec<TracedCell>,
    pub items: BTreeSet<String>,
}

/// Find the cells with a column mapping whose source or target column contains
/// `term` (trimmed, case-insensitive). Both a write cell and its read mirror
/// are reported. Script matrices carry no mappings and never match.
pub fn trace_field(matrix: &Matrix, term: &str) -> FieldTrace {
    let needle = term.trim().to_lowercase();
    let mut trace = FieldTrace {
        term: term.trim().to_string(),
        ..FieldTrace::default()
    };
    if needle.is_empty() {
        return trace;
    }

    for (row, cells) in matrix.cells.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let hit = cell.details.as_ref().is_some_and(|details| {
                details.mappings.iter().any(|mapping| {
                    mapping.source_column.to_lowercase().contains(&needle)
                        || mapping.target_column.to_lowercase().contains(&needle)
                })
            });
            if hit {
                let row_item = matrix.items[row].clone();
                let col_item = matrix.items[col].clone();
                trace.items.insert(row_item.clone());
                trace.items.insert(col_item.clone());
                trace.cells.push(TracedCell {
                    row: row_item,
                    col: col_item,
                });
            }
        }
    }
    trace
}
