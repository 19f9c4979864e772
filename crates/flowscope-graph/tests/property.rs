mod common;

use std::collections::BTreeSet;

use common::load_step;
use flowscope_graph::matrix::CellType;
use flowscope_graph::{
    build_matrix, cluster_order, compute_layout, merge_statements, Edge, LayoutAlgorithm,
    LayoutDirection, LayoutEdge, LayoutNode, LayoutOptions, MatrixOptions, Node, StatementLineage,
};
use proptest::prelude::*;

fn statement_strategy() -> impl Strategy<Value = StatementLineage> {
    (
        prop::collection::btree_set(0u8..12, 0..6),
        prop::collection::btree_set((0u8..12, 0u8..12), 0..6),
        prop::option::of("[a-c]\\.sql"),
    )
        .prop_map(|(nodes, edges, source)| {
            let mut stmt = StatementLineage::new("SELECT");
            if let Some(source) = &source {
                stmt = stmt.with_source_name(source.as_str());
            }
            let tag = source.as_deref().unwrap_or("anon");
            for n in nodes {
                stmt = stmt.with_node(Node::column(format!("n{n}"), format!("col{n}@{tag}")));
            }
            for (from, to) in edges {
                stmt = stmt.with_edge(Edge::data_flow(
                    format!("e{from}-{to}"),
                    format!("n{from}"),
                    format!("n{to}"),
                ));
            }
            stmt
        })
}

fn layout_graph() -> impl Strategy<Value = (Vec<LayoutNode>, Vec<LayoutEdge>)> {
    (1usize..30).prop_flat_map(|count| {
        (
            prop::collection::vec((20.0f64..400.0, 20.0f64..300.0), count),
            prop::collection::vec((0..count, 0..count), 0..count * 2),
        )
            .prop_map(|(sizes, pairs)| {
                let nodes = sizes
                    .into_iter()
                    .enumerate()
                    .map(|(i, (width, height))| LayoutNode {
                        id: format!("n{i}"),
                        width,
                        height,
                    })
                    .collect();
                let edges = pairs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (s, t))| LayoutEdge {
                        id: format!("e{i}"),
                        source: format!("n{s}"),
                        target: format!("n{t}"),
                    })
                    .collect();
                (nodes, edges)
            })
    })
}

fn dependency_statements() -> impl Strategy<Value = Vec<StatementLineage>> {
    prop::collection::vec((0u8..8, 0u8..8), 1..12).prop_map(|pairs| {
        pairs
            .into_iter()
            .filter(|(from, to)| from != to)
            .enumerate()
            .map(|(i, (from, to))| load_step(&format!("s{i}.sql"), &format!("t{from}"), &format!("t{to}")))
            .collect()
    })
}

proptest! {
    #[test]
    fn merge_is_a_first_seen_union(
        statements in prop::collection::vec(statement_strategy(), 0..7),
    ) {
        let merged = merge_statements(&statements);

        let mut expected_nodes: Vec<&str> = Vec::new();
        let mut expected_edges: Vec<&str> = Vec::new();
        for stmt in &statements {
            for node in &stmt.nodes {
                if !expected_nodes.contains(&node.id.as_str()) {
                    expected_nodes.push(&node.id);
                }
            }
            for edge in &stmt.edges {
                if !expected_edges.contains(&edge.id.as_str()) {
                    expected_edges.push(&edge.id);
                }
            }
        }

        let node_ids: Vec<&str> = merged.nodes.iter().map(|node| node.id.as_str()).collect();
        let edge_ids: Vec<&str> = merged.edges.iter().map(|edge| edge.id.as_str()).collect();
        prop_assert_eq!(node_ids, expected_nodes);
        prop_assert_eq!(edge_ids, expected_edges);
        if statements.len() != 1 {
            prop_assert_eq!(merged.statement_index, 0);
        }

        // The first statement holding an id wins: its copy of the node is kept
        // and tagged with that statement's source name.
        if statements.len() > 1 {
            for node in &merged.nodes {
                let first = statements
                    .iter()
                    .find_map(|stmt| {
                        let original = stmt.nodes.iter().find(|n| n.id == node.id)?;
                        Some((stmt, original))
                    });
                prop_assert!(first.is_some());
                let (stmt, original) = first.unwrap();
                prop_assert_eq!(&node.label, &original.label);
                prop_assert_eq!(node.source_name(), stmt.source_name.as_deref());
            }
        }
    }

    #[test]
    fn every_node_gets_a_finite_position(
        (nodes, edges) in layout_graph(),
        constraint in any::<bool>(),
        top_down in any::<bool>(),
    ) {
        let options = LayoutOptions {
            algorithm: if constraint { LayoutAlgorithm::Constraint } else { LayoutAlgorithm::Rank },
            direction: if top_down { LayoutDirection::TB } else { LayoutDirection::LR },
            ..LayoutOptions::default()
        };
        let result = compute_layout(&nodes, &edges, &options);
        prop_assert!(result.is_ok());
        let positions = result.unwrap().positions;
        prop_assert_eq!(positions.len(), nodes.len());
        for node in &nodes {
            prop_assert!(positions[&node.id].is_finite());
        }
    }

    #[test]
    fn clustering_is_a_deterministic_permutation(statements in dependency_statements(), iterations in 0usize..4) {
        let matrix = build_matrix(&statements, &MatrixOptions::default()).unwrap();
        let first = cluster_order(&matrix, iterations);
        let second = cluster_order(&matrix, iterations);
        prop_assert_eq!(&first, &second);

        let ordered: BTreeSet<&String> = first.iter().collect();
        let items: BTreeSet<&String> = matrix.items.iter().collect();
        prop_assert_eq!(first.len(), matrix.len());
        prop_assert_eq!(ordered, items);
    }

    #[test]
    fn write_and_read_cells_mirror_each_other(statements in dependency_statements()) {
        let matrix = build_matrix(&statements, &MatrixOptions::default()).unwrap();
        for row in 0..matrix.len() {
            for col in 0..matrix.len() {
                let cell = matrix.cell_at(row, col).unwrap();
                let mirror = matrix.cell_at(col, row).unwrap();
                match cell.cell_type {
                    CellType::Write => prop_assert_eq!(mirror.cell_type, CellType::Read),
                    CellType::Read => prop_assert_eq!(mirror.cell_type, CellType::Write),
                    CellType::SelfRef => prop_assert_eq!(row, col),
                    CellType::None => prop_assert_eq!(mirror.cell_type, CellType::None),
                }
            }
        }
    }
}
