//! Node sizes derived from what a node shows.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::LayoutNode;
use crate::types::{FlowGraph, FlowNode, FlowNodeKind};

pub const TABLE_WIDTH: f64 = 280.0;
pub const HEADER_HEIGHT: f64 = 44.0;
pub const COLUMN_ROW_HEIGHT: f64 = 24.0;
pub const FILTER_ROW_HEIGHT: f64 = 20.0;
pub const BODY_PADDING: f64 = 12.0;
pub const SCRIPT_WIDTH: f64 = 240.0;
pub const SCRIPT_BASE_HEIGHT: f64 = 72.0;
pub const SCRIPT_ROW_HEIGHT: f64 = 18.0;
/// Script nodes list at most this many tables before scrolling.
pub const SCRIPT_MAX_ROWS: usize = 8;
pub const SIMPLE_TABLE_WIDTH: f64 = 180.0;
pub const SIMPLE_TABLE_HEIGHT: f64 = 40.0;

/// What the layout needs to know about a node to size it.
///
/// Two graphs whose nodes have equal hints lay out identically, which is what
/// the staging controller relies on to skip a layout pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SizingHints {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: FlowNodeKind,
    #[serde(default)]
    pub column_count: usize,
    #[serde(default)]
    pub filter_count: usize,
    #[serde(default)]
    pub is_collapsed: bool,
}

impl SizingHints {
    pub fn from_node(node: &FlowNode) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type,
            column_count: node.column_count(),
            filter_count: node.filter_count(),
            is_collapsed: node.is_collapsed(),
        }
    }

    /// Width and height of the rendered node.
    pub fn size(&self) -> (f64, f64) {
        match self.node_type {
            FlowNodeKind::TableNode => {
                if self.is_collapsed {
                    return (TABLE_WIDTH, HEADER_HEIGHT);
                }
                let rows = self.column_count as f64 * COLUMN_ROW_HEIGHT
                    + self.filter_count as f64 * FILTER_ROW_HEIGHT;
                let padding = if rows > 0.0 { BODY_PADDING } else { 0.0 };
                (TABLE_WIDTH, HEADER_HEIGHT + rows + padding)
            }
            FlowNodeKind::ScriptNode => {
                let rows = self.column_count.min(SCRIPT_MAX_ROWS) as f64;
                (SCRIPT_WIDTH, SCRIPT_BASE_HEIGHT + rows * SCRIPT_ROW_HEIGHT)
            }
            FlowNodeKind::SimpleTableNode => (SIMPLE_TABLE_WIDTH, SIMPLE_TABLE_HEIGHT),
        }
    }

    pub fn to_layout_node(&self) -> LayoutNode {
        let (width, height) = self.size();
        LayoutNode {
            id: self.id.clone(),
            width,
            height,
        }
    }
}

/// Sizing hints for every node of a graph, in node order.
pub fn sizing_hints(graph: &FlowGraph) -> Vec<SizingHints> {
    graph.nodes.iter().map(SizingHints::from_node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(node_type: FlowNodeKind, columns: usize, collapsed: bool) -> SizingHints {
        SizingHints {
            id: "n".to_string(),
            node_type,
            column_count: columns,
            filter_count: 0,
            is_collapsed: collapsed,
        }
    }

    #[test]
    fn test_table_height_grows_with_columns() {
        let (_, empty) = hints(FlowNodeKind::TableNode, 0, false).size();
        let (_, three) = hints(FlowNodeKind::TableNode, 3, false).size();
        assert_eq!(empty, HEADER_HEIGHT);
        assert_eq!(three, HEADER_HEIGHT + 3.0 * COLUMN_ROW_HEIGHT + BODY_PADDING);
    }

    #[test]
    fn test_collapsed_table_is_header_only() {
        let (_, height) = hints(FlowNodeKind::TableNode, 12, true).size();
        assert_eq!(height, HEADER_HEIGHT);
    }

    #[test]
    fn test_script_rows_are_capped() {
        let (_, many) = hints(FlowNodeKind::ScriptNode, 40, false).size();
        let (_, max) = hints(FlowNodeKind::ScriptNode, SCRIPT_MAX_ROWS, false).size();
        assert_eq!(many, max);
    }
}
