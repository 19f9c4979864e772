//! Human-readable table output formatting.

use super::{GraphReport, MatrixReport};
use flowscope_graph::matrix::CellType;
use flowscope_graph::{FlowNode, FlowNodeKind, Matrix};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Format a view graph as human-readable text with optional colors.
pub fn format_graph(report: &GraphReport, use_colors: bool) -> String {
    let colored = use_colors && std::io::stdout().is_terminal();
    let mut lines = Vec::new();

    header(&mut lines, &format!("FlowScope Graph ({} view)", report.view), colored);
    summary(
        &mut lines,
        &format!("Summary: {} nodes | {} edges", report.nodes.len(), report.edges.len()),
        colored,
    );

    if let Some(error) = &report.error {
        let message = format!("Build failed: {error}");
        lines.push(if colored { message.red().to_string() } else { message });
        lines.push(String::new());
    }

    if !report.nodes.is_empty() {
        lines.push(section("Nodes:", colored));
        lines.push(node_table(&report.nodes));
        lines.push(String::new());
    }

    if !report.edges.is_empty() {
        lines.push(section("Edges:", colored));
        let arrow = if colored {
            "→".green().to_string()
        } else {
            "→".to_string()
        };
        for edge in &report.edges {
            let source = edge.source_handle.as_deref().unwrap_or(&edge.source);
            let target = edge.target_handle.as_deref().unwrap_or(&edge.target);
            let mut line = format!("  {source} {arrow} {target}");
            if let Some(detail) = edge.data.expression.as_deref().or(edge.data.label.as_deref()) {
                line.push_str(&format!("  [{detail}]"));
            }
            if !edge.data.shared_tables.is_empty() {
                line.push_str(&format!("  via {}", edge.data.shared_tables.join(", ")));
            }
            lines.push(line);
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Format a dependency matrix as a grid plus the X-Ray and trace overlays.
pub fn format_matrix(report: &MatrixReport, use_colors: bool) -> String {
    let colored = use_colors && std::io::stdout().is_terminal();
    let matrix = &report.matrix;
    let mut lines = Vec::new();

    header(
        &mut lines,
        &format!("FlowScope Dependency Matrix ({} mode)", matrix.mode),
        colored,
    );
    let dependencies = matrix
        .cells
        .iter()
        .flatten()
        .filter(|cell| cell.cell_type == CellType::Write)
        .count();
    summary(
        &mut lines,
        &format!("Summary: {} items | {} dependencies", matrix.len(), dependencies),
        colored,
    );

    if matrix.is_empty() {
        return lines.join("\n");
    }

    lines.push(matrix_grid(report));
    lines.push("  W = row writes to column, R = row reads from column".to_string());
    lines.push(String::new());

    if let Some(xray) = &report.xray {
        lines.push(section(&format!("X-Ray {}:", xray.focus), colored));
        lines.push(format!("  upstream:   {}", join_or_none(xray.ancestors.iter())));
        lines.push(format!("  downstream: {}", join_or_none(xray.descendants.iter())));
        lines.push(String::new());
    }

    if let Some(trace) = &report.trace {
        lines.push(section(
            &format!(
                "Field trace '{}': {} cells across {} items",
                trace.term,
                trace.cells.len(),
                trace.items.len()
            ),
            colored,
        ));
        for cell in &trace.cells {
            lines.push(format!("  {} / {}", cell.row, cell.col));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn header(lines: &mut Vec<String>, title: &str, colored: bool) {
    let rule = "═".repeat(50);
    if colored {
        lines.push(title.bold().to_string());
        lines.push(rule.dimmed().to_string());
    } else {
        lines.push(title.to_string());
        lines.push(rule);
    }
}

fn summary(lines: &mut Vec<String>, stats: &str, colored: bool) {
    lines.push(String::new());
    lines.push(if colored {
        stats.cyan().to_string()
    } else {
        stats.to_string()
    });
    lines.push(String::new());
}

fn section(title: &str, colored: bool) -> String {
    if colored {
        title.bold().to_string()
    } else {
        title.to_string()
    }
}

fn node_table(nodes: &[FlowNode]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["", "Id", "Kind", "Label", "Columns", "Position"]);
    for node in nodes {
        let marker = if node.is_selected() {
            ">"
        } else if node.is_highlighted() {
            "*"
        } else {
            ""
        };
        let columns = if node.is_collapsed() {
            format!("{} (collapsed)", node.column_count())
        } else {
            node.column_count().to_string()
        };
        builder.push_record([
            marker.to_string(),
            node.id.clone(),
            kind_name(node.node_type).to_string(),
            node.label().to_string(),
            columns,
            format!("{:.0}, {:.0}", node.position.x, node.position.y),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn kind_name(kind: FlowNodeKind) -> &'static str {
    match kind {
        FlowNodeKind::TableNode => "table",
        FlowNodeKind::ScriptNode => "script",
        FlowNodeKind::SimpleTableNode => "simple table",
    }
}

/// Rows and columns are numbered; the first column names each row.
fn matrix_grid(report: &MatrixReport) -> String {
    let matrix: &Matrix = &report.matrix;
    let traced = |row: &str, col: &str| {
        report
            .trace
            .as_ref()
            .is_some_and(|trace| trace.cells.iter().any(|cell| cell.row == row && cell.col == col))
    };
    let in_xray = |item: &str| report.xray.as_ref().map_or(true, |xray| xray.contains(item));

    let mut builder = Builder::default();
    let mut head = vec![String::new()];
    head.extend((1..=matrix.len()).map(|index| index.to_string()));
    builder.push_record(head);

    for (row, item) in matrix.items.iter().enumerate() {
        let label = if in_xray(item) {
            format!("{} {item}", row + 1)
        } else {
            format!("{} ({item})", row + 1)
        };
        let mut record = vec![label];
        for (col, other) in matrix.items.iter().enumerate() {
            let symbol = matrix
                .cell_at(row, col)
                .map(|cell| cell.cell_type.symbol())
                .unwrap_or_default();
            record.push(if traced(item, other) {
                format!("[{symbol}]")
            } else {
                symbol.to_string()
            });
        }
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let items: Vec<&str> = items.map(String::as_str).collect();
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
