//! Barycenter reordering of matrix items.

use super::Matrix;

/// Order items so that dependent items end up close to each other.
///
/// Each sweep moves every item to the mean position of the items it has a
/// dependency with (row cells other than `self` and `none`). An item without
/// dependencies uses its current index as its barycenter, so it can still be
/// displaced by items sorting ahead of it. The sort is stable, so equal
/// barycenters keep the previous order and the result is deterministic.
pub fn cluster_order(matrix: &Matrix, iterations: usize) -> Vec<String> {
    let n = matrix.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut position: Vec<usize> = (0..n).collect();

    for _ in 0..iterations {
        let barycenters: Vec<f64> = (0..n)
            .map(|item| {
                let neighbors: Vec<usize> = (0..n)
                    .filter(|&other| other != item)
                    .filter(|&other| {
                        matrix
                            .cell_at(item, other)
                            .is_some_and(|cell| cell.is_dependency())
                    })
                    .collect();
                if neighbors.is_empty() {
                    position[item] as f64
                } else {
                    let sum: usize = neighbors.iter().map(|&other| position[other]).sum();
                    sum as f64 / neighbors.len() as f64
                }
            })
            .collect();

        order.sort_by(|&a, &b| barycenters[a].total_cmp(&barycenters[b]));
        for (pos, &item) in order.iter().enumerate() {
            position[item] = pos;
        }
    }

    order.into_iter().map(|i| matrix.items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{CellType, MatrixCellData, MatrixMode};

    fn matrix(items: &[&str], deps: &[(usize, usize)]) -> Matrix {
        let n = items.len();
        let cells = (0..n)
            .map(|row| {
                (0..n)
                    .map(|col| {
                        let cell_type = if row == col {
                            CellType::SelfRef
                        } else if deps.contains(&(row, col)) {
                            CellType::Write
                        } else if deps.contains(&(col, row)) {
                            CellType::Read
                        } else {
                            CellType::None
                        };
                        MatrixCellData {
                            cell_type,
                            details: None,
                            intensity: 0.0,
                            mutual: false,
                        }
                    })
                    .collect()
            })
            .collect();
        Matrix {
            mode: MatrixMode::Table,
            items: items.iter().map(|s| s.to_string()).collect(),
            cells,
        }
    }

    #[test]
    fn test_sweep_moves_items_to_neighbor_barycenter() {
        // Barycenters: a = b = 4 (at e), e = 0.5 (between a and b). The
        // unlinked c and d stay at 2 and 3, and e sorting ahead of them
        // shifts both one slot right.
        let m = matrix(&["a", "b", "c", "d", "e"], &[(0, 4), (1, 4)]);
        assert_eq!(cluster_order(&m, 1), vec!["e", "c", "d", "a", "b"]);
    }

    #[test]
    fn test_result_is_a_permutation() {
        let m = matrix(&["a", "b", "c", "d"], &[(0, 3), (1, 2), (2, 0)]);
        let mut order = cluster_order(&m, 2);
        order.sort();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_independent_items_keep_order() {
        let m = matrix(&["a", "b", "c"], &[]);
        assert_eq!(cluster_order(&m, 2), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let m = matrix(&["a", "b", "c"], &[(0, 2)]);
        assert_eq!(cluster_order(&m, 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deterministic() {
        let m = matrix(&["a", "b", "c", "d", "e"], &[(0, 4), (1, 3), (2, 4)]);
        assert_eq!(cluster_order(&m, 2), cluster_order(&m, 2));
    }
}
