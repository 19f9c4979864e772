//! Dependency matrices between tables or between scripts.
//!
//! A matrix has one row and one column per item. Cell `(row, col)` is `write`
//! when the row item flows into the column item, `read` when the column item
//! flows into the row item, `self` on the diagonal and `none` otherwise.
//!
//! When two items depend on each other, the cell above the diagonal is `write`,
//! its mirror is `read`, and both are flagged `mutual`.

mod cluster;
mod trace;
mod xray;

pub use cluster::cluster_order;
pub use trace::{trace_field, FieldTrace, TracedCell};
pub use xray::{transitive_flow, TransitiveSet};

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::debug;

use crate::adapter::validate_statement;
use crate::error::GraphError;
use crate::graph::helpers::LineageIndex;
use crate::graph::script::summarize_scripts;
use crate::types::{NodeType, StatementLineage};

/// Lowest intensity of a non-empty cell, so light dependencies stay visible.
pub const MIN_INTENSITY: f64 = 0.2;

/// Default number of barycenter sweeps.
pub const DEFAULT_CLUSTER_ITERATIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatrixMode {
    #[default]
    Table,
    Script,
}

impl MatrixMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixMode::Table => "table",
            MatrixMode::Script => "script",
        }
    }
}

impl std::fmt::Display for MatrixMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`build_matrix`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MatrixOptions {
    pub mode: MatrixMode,
    /// Reorder items with the barycenter heuristic
    pub cluster: bool,
    pub cluster_iterations: usize,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            mode: MatrixMode::Table,
            cluster: false,
            cluster_iterations: DEFAULT_CLUSTER_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Write,
    Read,
    #[serde(rename = "self")]
    SelfRef,
    None,
}

impl CellType {
    pub fn symbol(&self) -> &'static str {
        match self {
            CellType::Write => "W",
            CellType::Read => "R",
            CellType::SelfRef => "-",
            CellType::None => "",
        }
    }
}

/// One column-to-column flow behind a table dependency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// What a dependency consists of.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CellDetails {
    /// Distinct target columns fed by the dependency (table mode)
    #[serde(default)]
    pub column_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<ColumnMapping>,
    /// Tables written by one script and read by the other (script mode)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_tables: Vec<String>,
}

impl CellDetails {
    /// Weight of the dependency, at least 1.
    fn count(&self) -> usize {
        self.mappings.len().max(self.shared_tables.len()).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatrixCellData {
    #[serde(rename = "type")]
    pub cell_type: CellType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<CellDetails>,
    /// Heat value in `[0, 1]`
    pub intensity: f64,
    #[serde(default)]
    pub mutual: bool,
}

impl MatrixCellData {
    fn empty(cell_type: CellType) -> Self {
        Self {
            cell_type,
            details: None,
            intensity: 0.0,
            mutual: false,
        }
    }

    /// A write or read dependency.
    pub fn is_dependency(&self) -> bool {
        matches!(self.cell_type, CellType::Write | CellType::Read)
    }
}

/// A square dependency matrix with a cell for every ordered item pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Matrix {
    pub mode: MatrixMode,
    pub items: Vec<String>,
    /// Row-major cells, `cells[row][col]`
    pub cells: Vec<Vec<MatrixCellData>>,
}

impl Matrix {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, item: &str) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }

    pub fn cell(&self, row: &str, col: &str) -> Option<&MatrixCellData> {
        let row = self.index_of(row)?;
        let col = self.index_of(col)?;
        self.cell_at(row, col)
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<&MatrixCellData> {
        self.cells.get(row).and_then(|cells| cells.get(col))
    }

    /// True when item `from` flows into item `to`.
    pub fn flows_into(&self, from: usize, to: usize) -> bool {
        from != to
            && self
                .cell_at(from, to)
                .is_some_and(|cell| cell.cell_type == CellType::Write || cell.mutual)
    }

    /// The same matrix with items in the given order. Unknown names are skipped.
    pub fn reordered(&self, order: &[String]) -> Matrix {
        let indices: Vec<usize> = order
            .iter()
            .filter_map(|item| self.index_of(item))
            .collect();
        Matrix {
            mode: self.mode,
            items: indices.iter().map(|&i| self.items[i].clone()).collect(),
            cells: indices
                .iter()
                .map(|&row| {
                    indices
                        .iter()
                        .map(|&col| self.cells[row][col].clone())
                        .collect()
                })
                .collect(),
        }
    }
}

/// Directed relations between items, with what each one carries.
type Relations = BTreeMap<(String, String), CellDetails>;

/// Build a table or script dependency matrix.
pub fn build_matrix(
    statements: &[StatementLineage],
    options: &MatrixOptions,
) -> Result<Matrix, GraphError> {
    for stmt in statements {
        validate_statement(stmt)?;
    }

    let (items, relations) = match options.mode {
        MatrixMode::Table => table_relations(statements),
        MatrixMode::Script => script_relations(statements),
    };
    let items: Vec<String> = items.into_iter().collect();
    let matrix = classify(options.mode, items, &relations);

    #[cfg(feature = "tracing")]
    debug!(
        mode = %options.mode,
        items = matrix.len(),
        relations = relations.len(),
        "built dependency matrix"
    );

    if options.cluster && !matrix.is_empty() {
        let order = cluster_order(&matrix, options.cluster_iterations);
        return Ok(matrix.reordered(&order));
    }
    Ok(matrix)
}

fn table_relations(statements: &[StatementLineage]) -> (BTreeSet<String>, Relations) {
    let mut items = BTreeSet::new();
    let mut relations = Relations::new();

    for stmt in statements {
        let index = LineageIndex::new(stmt);
        items.extend(
            stmt.nodes
                .iter()
                .filter(|node| node.node_type.is_relation())
                .map(|node| node.display_name().to_string()),
        );

        for edge in stmt.edges.iter().filter(|edge| edge.is_flow()) {
            let relation_name = |id: &str| {
                index
                    .resolve_table(id)
                    .and_then(|table_id| index.node(table_id))
                    .filter(|table| table.node_type.is_relation())
                    .map(|table| table.display_name().to_string())
            };
            let (Some(source), Some(target)) = (relation_name(&edge.from), relation_name(&edge.to))
            else {
                continue;
            };
            if source == target {
                continue;
            }

            let details = relations.entry((source, target)).or_default();
            let (Some(from), Some(to)) = (index.node(&edge.from), index.node(&edge.to)) else {
                continue;
            };
            if from.node_type == NodeType::Column && to.node_type == NodeType::Column {
                let mapping = ColumnMapping {
                    source_column: from.label.clone(),
                    target_column: to.label.clone(),
                    expression: edge.expression.clone().or_else(|| to.expression.clone()),
                };
                if !details.mappings.contains(&mapping) {
                    details.mappings.push(mapping);
                }
            }
        }
    }

    for details in relations.values_mut() {
        details.mappings.sort();
        let targets: BTreeSet<&str> = details
            .mappings
            .iter()
            .map(|mapping| mapping.target_column.as_str())
            .collect();
        details.column_count = targets.len();
    }

    (items, relations)
}

fn script_relations(statements: &[StatementLineage]) -> (BTreeSet<String>, Relations) {
    let scripts = summarize_scripts(statements);
    let mut relations = Relations::new();

    for (producer, producer_summary) in &scripts {
        for (consumer, consumer_summary) in &scripts {
            if producer == consumer {
                continue;
            }
            let shared: Vec<String> = producer_summary
                .access
                .written
                .intersection(&consumer_summary.access.read)
                .cloned()
                .collect();
            if !shared.is_empty() {
                relations.insert(
                    (producer.clone(), consumer.clone()),
                    CellDetails {
                        shared_tables: shared,
                        ..CellDetails::default()
                    },
                );
            }
        }
    }

    (scripts.into_keys().collect(), relations)
}

fn classify(mode: MatrixMode, items: Vec<String>, relations: &Relations) -> Matrix {
    let lookup = |from: &str, to: &str| relations.get(&(from.to_string(), to.to_string()));
    let max_count = relations.values().map(CellDetails::count).max().unwrap_or(1);

    let cells = items
        .iter()
        .enumerate()
        .map(|(row, row_item)| {
            items
                .iter()
                .enumerate()
                .map(|(col, col_item)| {
                    if row == col {
                        return MatrixCellData::empty(CellType::SelfRef);
                    }
                    let forward = lookup(row_item, col_item);
                    let backward = lookup(col_item, row_item);
                    let (cell_type, details, mutual) = match (forward, backward) {
                        (Some(fwd), Some(_)) if row < col => (CellType::Write, fwd, true),
                        (Some(_), Some(back)) => (CellType::Read, back, true),
                        (Some(fwd), None) => (CellType::Write, fwd, false),
                        (None, Some(back)) => (CellType::Read, back, false),
                        (None, None) => return MatrixCellData::empty(CellType::None),
                    };
                    let intensity =
                        (details.count() as f64 / max_count as f64).clamp(MIN_INTENSITY, 1.0);
                    MatrixCellData {
                        cell_type,
                        details: Some(details.clone()),
                        intensity,
                        mutual,
                    }
                })
                .collect()
        })
        .collect();

    Matrix { mode, items, cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, Node};

    /// `src_table` columns flow into `dst_table` columns.
    fn flow(source: &str, src_table: &str, dst_table: &str, columns: &[&str]) -> StatementLineage {
        let mut stmt = StatementLineage::new("INSERT")
            .with_source_name(source)
            .with_node(Node::table(src_table, src_table))
            .with_node(Node::table(dst_table, dst_table));
        for (i, column) in columns.iter().enumerate() {
            let src_col = format!("{src_table}.{column}");
            let dst_col = format!("{dst_table}.{column}");
            stmt = stmt
                .with_node(Node::column(src_col.clone(), *column))
                .with_node(Node::column(dst_col.clone(), *column))
                .with_edge(Edge::ownership(format!("os{i}"), src_table, src_col.clone()))
                .with_edge(Edge::ownership(format!("od{i}"), dst_table, dst_col.clone()))
                .with_edge(Edge::data_flow(format!("f{i}"), src_col, dst_col));
        }
        stmt
    }

    #[test]
    fn test_table_matrix_classification() {
        let statements = vec![
            flow("a.sql", "raw", "staging", &["id", "name"]),
            flow("b.sql", "staging", "mart", &["id"]),
        ];
        let matrix = build_matrix(&statements, &MatrixOptions::default()).unwrap();

        assert_eq!(matrix.items, vec!["mart", "raw", "staging"]);
        assert_eq!(matrix.cell("raw", "staging").unwrap().cell_type, CellType::Write);
        assert_eq!(matrix.cell("staging", "raw").unwrap().cell_type, CellType::Read);
        assert_eq!(matrix.cell("raw", "raw").unwrap().cell_type, CellType::SelfRef);
        assert_eq!(matrix.cell("raw", "mart").unwrap().cell_type, CellType::None);

        let cell = matrix.cell("raw", "staging").unwrap();
        let details = cell.details.as_ref().unwrap();
        assert_eq!(details.mappings.len(), 2);
        assert_eq!(details.column_count, 2);
        assert_eq!(cell.intensity, 1.0);

        let light = matrix.cell("staging", "mart").unwrap();
        assert_eq!(light.intensity, 0.5);
    }

    #[test]
    fn test_every_pair_has_a_cell() {
        let statements = vec![flow("a.sql", "a", "b", &["x"]), flow("a.sql", "c", "d", &["y"])];
        let matrix = build_matrix(&statements, &MatrixOptions::default()).unwrap();
        for row in &matrix.items {
            for col in &matrix.items {
                assert!(matrix.cell(row, col).is_some());
            }
        }
    }

    #[test]
    fn test_mutual_dependency_is_asymmetric() {
        let statements = vec![
            flow("a.sql", "left", "right", &["id"]),
            flow("b.sql", "right", "left", &["id"]),
        ];
        let matrix = build_matrix(&statements, &MatrixOptions::default()).unwrap();

        let upper = matrix.cell("left", "right").unwrap();
        let lower = matrix.cell("right", "left").unwrap();
        assert_eq!(upper.cell_type, CellType::Write);
        assert_eq!(lower.cell_type, CellType::Read);
        assert!(upper.mutual && lower.mutual);
        assert!(matrix.flows_into(0, 1));
        assert!(matrix.flows_into(1, 0));
    }

    #[test]
    fn test_script_matrix_uses_shared_tables() {
        let statements = vec![
            flow("load.sql", "raw", "staging", &["id"]),
            flow("report.sql", "staging", "mart", &["id"]),
        ];
        let options = MatrixOptions {
            mode: MatrixMode::Script,
            ..MatrixOptions::default()
        };
        let matrix = build_matrix(&statements, &options).unwrap();

        assert_eq!(matrix.items, vec!["load.sql", "report.sql"]);
        let cell = matrix.cell("load.sql", "report.sql").unwrap();
        assert_eq!(cell.cell_type, CellType::Write);
        assert_eq!(
            cell.details.as_ref().unwrap().shared_tables,
            vec!["staging".to_string()]
        );
        assert_eq!(
            matrix.cell("report.sql", "load.sql").unwrap().cell_type,
            CellType::Read
        );
    }

    #[test]
    fn test_low_counts_are_floored() {
        let columns: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        let statements = vec![
            flow("a.sql", "wide", "target", &column_refs),
            flow("a.sql", "narrow", "target", &["c0"]),
        ];
        let matrix = build_matrix(&statements, &MatrixOptions::default()).unwrap();
        assert_eq!(matrix.cell("narrow", "target").unwrap().intensity, MIN_INTENSITY);
    }

    #[test]
    fn test_cell_type_wire_names() {
        assert_eq!(serde_json::to_value(CellType::SelfRef).unwrap(), "self");
        assert_eq!(serde_json::to_value(CellType::Write).unwrap(), "write");
    }
}
