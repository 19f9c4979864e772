//! Layered (rank-based) layout.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{LayoutDirection, LayoutEdge, LayoutNode, LayoutOptions};
use crate::types::Position;

/// Rank layout plus the structure the constraint layout refines.
pub(crate) struct RankedLayout {
    /// Node indices per rank, in cross-axis order
    pub(crate) ranks: Vec<Vec<usize>>,
    pub(crate) predecessors: Vec<Vec<usize>>,
    pub(crate) successors: Vec<Vec<usize>>,
    /// Indexed like the input nodes
    pub(crate) positions: Vec<Position>,
}

/// Size of a node along the rank axis and across it.
pub(crate) fn extents(node: &LayoutNode, direction: LayoutDirection) -> (f64, f64) {
    match direction {
        LayoutDirection::LR => (node.width, node.height),
        LayoutDirection::TB => (node.height, node.width),
    }
}

pub(crate) fn position(direction: LayoutDirection, along: f64, across: f64) -> Position {
    match direction {
        LayoutDirection::LR => Position::new(along, across),
        LayoutDirection::TB => Position::new(across, along),
    }
}

pub(crate) fn rank_layout(
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    options: &LayoutOptions,
) -> RankedLayout {
    let (predecessors, successors) = adjacency(nodes, edges);
    let rank_of = assign_ranks(nodes.len(), &successors);

    let rank_count = rank_of.iter().copied().max().map_or(0, |max| max + 1);
    let mut ranks: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    for (node, &rank) in rank_of.iter().enumerate() {
        ranks[rank].push(node);
    }

    order_ranks(
        &mut ranks,
        &rank_of,
        &predecessors,
        &successors,
        options.ordering_sweeps,
    );
    let positions = assign_coordinates(nodes, &ranks, options);

    RankedLayout {
        ranks,
        predecessors,
        successors,
        positions,
    }
}

/// Distinct neighbor lists by node index. Self-loops and edges to unknown
/// nodes do not influence placement.
fn adjacency(nodes: &[LayoutNode], edges: &[LayoutEdge]) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        index.entry(node.id.as_str()).or_insert(i);
    }

    let mut predecessors = vec![Vec::new(); nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in edges {
        let (Some(&from), Some(&to)) =
            (index.get(edge.source.as_str()), index.get(edge.target.as_str()))
        else {
            continue;
        };
        if from == to || successors[from].contains(&to) {
            continue;
        }
        successors[from].push(to);
        predecessors[to].push(from);
    }
    (predecessors, successors)
}

/// Longest-path ranks over the condensation: every member of a cycle shares
/// the rank of its strongly connected component.
fn assign_ranks(node_count: usize, successors: &[Vec<usize>]) -> Vec<usize> {
    let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(node_count, 0);
    for _ in 0..node_count {
        graph.add_node(());
    }
    for (from, targets) in successors.iter().enumerate() {
        for &to in targets {
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }
    }

    // Components come back in reverse topological order.
    let components = tarjan_scc(&graph);
    let mut component_of = vec![0usize; node_count];
    for (component, members) in components.iter().enumerate() {
        for member in members {
            component_of[member.index()] = component;
        }
    }

    let mut component_rank = vec![0usize; components.len()];
    for (component, members) in components.iter().enumerate().rev() {
        for member in members {
            for &to in &successors[member.index()] {
                let target = component_of[to];
                if target != component {
                    component_rank[target] =
                        component_rank[target].max(component_rank[component] + 1);
                }
            }
        }
    }

    (0..node_count)
        .map(|node| component_rank[component_of[node]])
        .collect()
}

/// Barycenter sweeps, alternating downward (by predecessors) and upward (by
/// successors). Nodes without neighbors on the swept side keep their place.
fn order_ranks(
    ranks: &mut [Vec<usize>],
    rank_of: &[usize],
    predecessors: &[Vec<usize>],
    successors: &[Vec<usize>],
    sweeps: usize,
) {
    let mut order = vec![0.0f64; rank_of.len()];
    for rank in ranks.iter() {
        for (slot, &node) in rank.iter().enumerate() {
            order[node] = slot as f64;
        }
    }

    for sweep in 0..sweeps {
        let downward = sweep % 2 == 0;
        let rank_range: Vec<usize> = if downward {
            (1..ranks.len()).collect()
        } else {
            (0..ranks.len().saturating_sub(1)).rev().collect()
        };

        for r in rank_range {
            let barycenters: HashMap<usize, f64> = ranks[r]
                .iter()
                .map(|&node| {
                    let neighbors = if downward {
                        &predecessors[node]
                    } else {
                        &successors[node]
                    };
                    let placed: Vec<f64> = neighbors
                        .iter()
                        .filter(|&&other| {
                            if downward {
                                rank_of[other] < r
                            } else {
                                rank_of[other] > r
                            }
                        })
                        .map(|&other| order[other])
                        .collect();
                    let barycenter = if placed.is_empty() {
                        order[node]
                    } else {
                        placed.iter().sum::<f64>() / placed.len() as f64
                    };
                    (node, barycenter)
                })
                .collect();

            ranks[r].sort_by(|a, b| barycenters[a].total_cmp(&barycenters[b]));
            for (slot, &node) in ranks[r].iter().enumerate() {
                order[node] = slot as f64;
            }
        }
    }
}

/// Ranks are spaced by their widest member; each rank is centered on the
/// cross axis.
fn assign_coordinates(
    nodes: &[LayoutNode],
    ranks: &[Vec<usize>],
    options: &LayoutOptions,
) -> Vec<Position> {
    let direction = options.direction;
    let mut positions = vec![Position::default(); nodes.len()];

    let cross_totals: Vec<f64> = ranks
        .iter()
        .map(|rank| {
            let sizes: f64 = rank.iter().map(|&n| extents(&nodes[n], direction).1).sum();
            sizes + rank.len().saturating_sub(1) as f64 * options.node_spacing
        })
        .collect();
    let max_cross = cross_totals.iter().copied().fold(0.0, f64::max);

    let mut along = 0.0;
    for (rank, cross_total) in ranks.iter().zip(&cross_totals) {
        let depth = rank
            .iter()
            .map(|&n| extents(&nodes[n], direction).0)
            .fold(0.0, f64::max);

        let mut across = (max_cross - cross_total) / 2.0;
        for &node in rank {
            let (node_depth, breadth) = extents(&nodes[node], direction);
            // Center narrower nodes within the rank's band.
            let offset = (depth - node_depth) / 2.0;
            positions[node] = position(direction, along + offset, across);
            across += breadth + options.node_spacing;
        }
        along += depth + options.rank_spacing;
    }

    positions
}
