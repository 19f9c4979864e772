//! Constraint relaxation on top of the rank layout.
//!
//! Ranks and the order within each rank stay fixed. Each round pulls every node
//! toward the mean cross position of its neighbors, then restores the minimum
//! separation between consecutive nodes of a rank.

use super::rank::{extents, position, RankedLayout};
use super::{LayoutDirection, LayoutNode, LayoutOptions};
use crate::types::Position;

/// Fraction of the distance to the neighbor mean covered per round.
const SPRING: f64 = 0.5;

pub(crate) fn relax(
    nodes: &[LayoutNode],
    ranked: RankedLayout,
    options: &LayoutOptions,
) -> Vec<Position> {
    let direction = options.direction;
    let breadth: Vec<f64> = nodes.iter().map(|n| extents(n, direction).1).collect();
    let along: Vec<f64> = ranked
        .positions
        .iter()
        .map(|p| match direction {
            LayoutDirection::LR => p.x,
            LayoutDirection::TB => p.y,
        })
        .collect();
    let mut centers: Vec<f64> = ranked
        .positions
        .iter()
        .zip(&breadth)
        .map(|(p, b)| {
            let across = match direction {
                LayoutDirection::LR => p.y,
                LayoutDirection::TB => p.x,
            };
            across + b / 2.0
        })
        .collect();

    for _ in 0..options.relax_iterations {
        let targets: Vec<f64> = (0..nodes.len())
            .map(|node| {
                let neighbors: Vec<usize> = ranked.predecessors[node]
                    .iter()
                    .chain(&ranked.successors[node])
                    .copied()
                    .collect();
                if neighbors.is_empty() {
                    centers[node]
                } else {
                    neighbors.iter().map(|&n| centers[n]).sum::<f64>() / neighbors.len() as f64
                }
            })
            .collect();
        for (center, target) in centers.iter_mut().zip(&targets) {
            *center += (target - *center) * SPRING;
        }
        for rank in &ranked.ranks {
            separate(rank, &mut centers, &breadth, options.node_spacing);
        }
    }

    // Shift so the layout starts at zero on the cross axis.
    let min_edge = centers
        .iter()
        .zip(&breadth)
        .map(|(c, b)| c - b / 2.0)
        .fold(f64::INFINITY, f64::min);
    let shift = if min_edge.is_finite() { min_edge } else { 0.0 };

    (0..nodes.len())
        .map(|node| position(direction, along[node], centers[node] - breadth[node] / 2.0 - shift))
        .collect()
}

/// Push consecutive nodes apart until they no longer overlap, then move the
/// rank back so its mean center is where the springs left it.
fn separate(rank: &[usize], centers: &mut [f64], breadth: &[f64], spacing: f64) {
    if rank.len() < 2 {
        return;
    }
    let before = mean_center(rank, centers);

    for pair in rank.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let min_center = centers[prev] + breadth[prev] / 2.0 + spacing + breadth[cur] / 2.0;
        if centers[cur] < min_center {
            centers[cur] = min_center;
        }
    }

    let shift = before - mean_center(rank, centers);
    for &node in rank {
        centers[node] += shift;
    }
}

fn mean_center(rank: &[usize], centers: &[f64]) -> f64 {
    rank.iter().map(|&n| centers[n]).sum::<f64>() / rank.len() as f64
}

#[cfg(test)]
mod tests {
    use super::super::rank::rank_layout;
    use super::super::LayoutEdge;
    use super::*;

    fn node(id: &str, height: f64) -> LayoutNode {
        LayoutNode {
            id: id.to_string(),
            width: 100.0,
            height,
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
    fn test_separation_holds_after_relaxation() {
        let nodes = vec![
            node("hub", 60.0),
            node("a", 200.0),
            node("b", 40.0),
            node("c", 120.0),
        ];
        let edges = vec![edge("hub", "a"), edge("hub", "b"), edge("hub", "c")];
        let options = LayoutOptions::default();
        let ranked = rank_layout(&nodes, &edges, &options);
        let rank = ranked.ranks[1].clone();
        let positions = relax(&nodes, ranked, &options);

        for pair in rank.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            let gap = positions[cur].y - (positions[prev].y + nodes[prev].height);
            assert!(gap >= options.node_spacing - 1e-9, "gap {gap} too small");
        }
    }

    #[test]
    fn test_ranks_stay_fixed() {
        let nodes = vec![node("a", 50.0), node("b", 50.0), node("c", 50.0)];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let options = LayoutOptions::default();
        let ranked = rank_layout(&nodes, &edges, &options);
        let before: Vec<f64> = ranked.positions.iter().map(|p| p.x).collect();
        let positions = relax(&nodes, ranked, &options);
        let after: Vec<f64> = positions.iter().map(|p| p.x).collect();
        assert_eq!(before, after);
        assert!(positions.iter().all(Position::is_finite));
    }
}
