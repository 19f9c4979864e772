//! Layout engine.
//!
//! Three placements are available:
//!
//! 1. **Instant**: a grid, used as a placeholder for the first paint.
//! 2. **Rank**: layered drawing. Cycles are collapsed into a single rank,
//!    nodes are ordered within ranks by barycenter sweeps and coordinates are
//!    assigned from node sizes. Deterministic; the default.
//! 3. **Constraint**: starts from the rank layout and relaxes the cross axis
//!    with springs toward neighbors under a minimum separation. Graphs larger
//!    than [`LayoutOptions::constraint_node_limit`] are laid out by rank instead.
//!
//! Every node passed in receives a finite position or the call fails with a
//! [`LayoutError`].

mod constraint;
mod rank;
mod sizing;

pub use sizing::{sizing_hints, SizingHints};

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::LayoutError;
use crate::types::{FlowGraph, Position};

/// Default cutoff above which the constraint layout is downgraded to rank.
pub const CONSTRAINT_NODE_LIMIT: usize = 150;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Direction ranks advance in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum LayoutDirection {
    /// Left to right
    #[default]
    LR,
    /// Top to bottom
    TB,
}

impl std::str::FromStr for LayoutDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LR" => Ok(LayoutDirection::LR),
            "TB" => Ok(LayoutDirection::TB),
            other => Err(format!("unknown layout direction '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAlgorithm {
    #[default]
    #[serde(alias = "dagre")]
    Rank,
    #[serde(alias = "elk")]
    Constraint,
}

impl LayoutAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutAlgorithm::Rank => "rank",
            LayoutAlgorithm::Constraint => "constraint",
        }
    }
}

impl std::fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayoutAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rank" | "dagre" => Ok(LayoutAlgorithm::Rank),
            "constraint" | "elk" => Ok(LayoutAlgorithm::Constraint),
            other => Err(format!("unknown layout algorithm '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    pub algorithm: LayoutAlgorithm,
    /// Gap between consecutive ranks
    pub rank_spacing: f64,
    /// Gap between neighbors within a rank
    pub node_spacing: f64,
    /// Barycenter ordering sweeps
    pub ordering_sweeps: usize,
    /// Spring relaxation rounds of the constraint layout
    pub relax_iterations: usize,
    pub constraint_node_limit: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::LR,
            algorithm: LayoutAlgorithm::Rank,
            rank_spacing: 120.0,
            node_spacing: 40.0,
            ordering_sweeps: 4,
            relax_iterations: 24,
            constraint_node_limit: CONSTRAINT_NODE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub positions: BTreeMap<String, Position>,
    /// Algorithm that actually ran (after any downgrade)
    pub algorithm: LayoutAlgorithm,
}

/// Lay out nodes and edges.
pub fn compute_layout(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    options: &LayoutOptions,
) -> Result<LayoutResult, LayoutError> {
    let nodes: Vec<LayoutNode> = nodes.iter().map(sanitize).collect();

    let algorithm = match options.algorithm {
        LayoutAlgorithm::Constraint if nodes.len() > options.constraint_node_limit => {
            #[cfg(feature = "tracing")]
            debug!(
                nodes = nodes.len(),
                limit = options.constraint_node_limit,
                "constraint layout downgraded to rank"
            );
            LayoutAlgorithm::Rank
        }
        algorithm => algorithm,
    };

    let ranked = rank::rank_layout(&nodes, edges, options);
    let positions = match algorithm {
        LayoutAlgorithm::Rank => ranked.positions,
        LayoutAlgorithm::Constraint => constraint::relax(&nodes, ranked, options),
    };

    let positions: BTreeMap<String, Position> = nodes
        .iter()
        .zip(positions)
        .map(|(node, position)| (node.id.clone(), position))
        .collect();
    check_complete(&nodes, &positions)?;

    Ok(LayoutResult {
        positions,
        algorithm,
    })
}

/// Grid placement for the first paint, before the real layout is known.
pub fn instant_layout(nodes: &[LayoutNode], options: &LayoutOptions) -> BTreeMap<String, Position> {
    if nodes.is_empty() {
        return BTreeMap::new();
    }
    let nodes: Vec<LayoutNode> = nodes.iter().map(sanitize).collect();
    let per_line = (nodes.len() as f64).sqrt().ceil() as usize;
    let cell_width = nodes.iter().map(|n| n.width).fold(0.0, f64::max) + options.node_spacing;
    let cell_height = nodes.iter().map(|n| n.height).fold(0.0, f64::max) + options.node_spacing;

    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let (line, slot) = (i / per_line, i % per_line);
            let position = match options.direction {
                // Lines are columns when ranks run left to right.
                LayoutDirection::LR => {
                    Position::new(line as f64 * cell_width, slot as f64 * cell_height)
                }
                LayoutDirection::TB => {
                    Position::new(slot as f64 * cell_width, line as f64 * cell_height)
                }
            };
            (node.id.clone(), position)
        })
        .collect()
}

/// Fail unless every node has a finite position.
pub fn check_complete(
    nodes: &[LayoutNode],
    positions: &BTreeMap<String, Position>,
) -> Result<(), LayoutError> {
    for node in nodes {
        match positions.get(&node.id) {
            None => return Err(LayoutError::MissingPosition(node.id.clone())),
            Some(position) if !position.is_finite() => {
                return Err(LayoutError::NonFinitePosition(node.id.clone()))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Layout nodes for a built graph.
pub fn layout_nodes(graph: &FlowGraph) -> Vec<LayoutNode> {
    graph
        .nodes
        .iter()
        .map(|node| SizingHints::from_node(node).to_layout_node())
        .collect()
}

pub fn layout_edges(graph: &FlowGraph) -> Vec<LayoutEdge> {
    graph
        .edges
        .iter()
        .map(|edge| LayoutEdge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
        })
        .collect()
}

/// Copy positions onto graph nodes. Nodes without a position are left alone.
pub fn apply_positions(graph: &mut FlowGraph, positions: &BTreeMap<String, Position>) {
    for node in &mut graph.nodes {
        if let Some(position) = positions.get(&node.id) {
            node.position = *position;
        }
    }
}

fn sanitize(node: &LayoutNode) -> LayoutNode {
    let fallback = |value: f64, default: f64| {
        if value.is_finite() && value > 0.0 {
            value
        } else {
            default
        }
    };
    LayoutNode {
        id: node.id.clone(),
        width: fallback(node.width, sizing::TABLE_WIDTH),
        height: fallback(node.height, sizing::HEADER_HEIGHT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> LayoutNode {
        LayoutNode {
            id: id.to_string(),
            width: 200.0,
            height: 80.0,
        }
    }

    fn edge(source: &str, target: &str) -> LayoutEdge {
        LayoutEdge {
            id: format!("{source}->{target}"),
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_algorithm_aliases() {
        let dagre: LayoutAlgorithm = serde_json::from_str("\"dagre\"").unwrap();
        let elk: LayoutAlgorithm = serde_json::from_str("\"elk\"").unwrap();
        assert_eq!(dagre, LayoutAlgorithm::Rank);
        assert_eq!(elk, LayoutAlgorithm::Constraint);
        assert_eq!("ELK".parse::<LayoutAlgorithm>().unwrap(), LayoutAlgorithm::Constraint);
        assert_eq!("tb".parse::<LayoutDirection>().unwrap(), LayoutDirection::TB);
    }

    #[test]
    fn test_rank_layout_orders_along_direction() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];

        let lr = compute_layout(&nodes, &edges, &LayoutOptions::default()).unwrap();
        assert!(lr.positions["a"].x < lr.positions["b"].x);
        assert!(lr.positions["b"].x < lr.positions["c"].x);

        let options = LayoutOptions {
            direction: LayoutDirection::TB,
            ..LayoutOptions::default()
        };
        let tb = compute_layout(&nodes, &edges, &options).unwrap();
        assert!(tb.positions["a"].y < tb.positions["b"].y);
        assert!(tb.positions["b"].y < tb.positions["c"].y);
    }

    #[test]
    fn test_constraint_downgrades_above_limit() {
        let nodes: Vec<LayoutNode> = (0..5).map(|i| node(&format!("n{i}"))).collect();
        let options = LayoutOptions {
            algorithm: LayoutAlgorithm::Constraint,
            constraint_node_limit: 4,
            ..LayoutOptions::default()
        };
        let result = compute_layout(&nodes, &[], &options).unwrap();
        assert_eq!(result.algorithm, LayoutAlgorithm::Rank);
        assert_eq!(result.positions.len(), 5);
    }

    #[test]
    fn test_bad_sizes_still_get_positions() {
        let nodes = vec![LayoutNode {
            id: "weird".to_string(),
            width: f64::NAN,
            height: -3.0,
        }];
        let result = compute_layout(&nodes, &[], &LayoutOptions::default()).unwrap();
        assert!(result.positions["weird"].is_finite());
    }

    #[test]
    fn test_instant_layout_is_a_grid() {
        let nodes: Vec<LayoutNode> = (0..4).map(|i| node(&format!("n{i}"))).collect();
        let positions = instant_layout(&nodes, &LayoutOptions::default());
        assert_eq!(positions.len(), 4);
        assert_eq!(positions["n0"], Position::new(0.0, 0.0));
        assert_eq!(positions["n1"], Position::new(0.0, 120.0));
        assert_eq!(positions["n2"], Position::new(240.0, 0.0));
    }

    #[test]
    fn test_check_complete_reports_missing() {
        let nodes = vec![node("a")];
        assert_eq!(
            check_complete(&nodes, &BTreeMap::new()),
            Err(LayoutError::MissingPosition("a".to_string()))
        );
        let mut positions = BTreeMap::new();
        positions.insert("a".to_string(), Position::new(f64::INFINITY, 0.0));
        assert_eq!(
            check_complete(&nodes, &positions),
            Err(LayoutError::NonFinitePosition("a".to_string()))
        );
    }
}
