//! Error types for graph building and layout.
//!
//! # Error Handling Strategy
//!
//! Most lineage anomalies are not errors. A dangling edge is dropped, and a
//! column without an owning table is shown as an output column. Only input that
//! cannot be turned into a graph at all is reported:
//!
//! - [`GraphError`]: the lineage itself is malformed. Call sites degrade this to
//!   an empty graph so one bad statement never takes the whole view down.
//!
//! - [`LayoutError`]: the layout engine broke its contract (a node without a
//!   position, or a non-finite coordinate).

use thiserror::Error;

/// Failure to build a view graph or matrix from lineage input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node or edge cannot be identified.
    #[error("malformed lineage in statement {statement_index}: {message}")]
    MalformedLineage {
        statement_index: usize,
        message: String,
    },
}

impl GraphError {
    pub fn malformed(statement_index: usize, message: impl Into<String>) -> Self {
        Self::MalformedLineage {
            statement_index,
            message: message.into(),
        }
    }
}

/// Violation of the layout contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A node passed in received no position.
    #[error("layout produced no position for node '{0}'")]
    MissingPosition(String),

    /// A computed coordinate is NaN or infinite.
    #[error("layout produced a non-finite position for node '{0}'")]
    NonFinitePosition(String),
}
