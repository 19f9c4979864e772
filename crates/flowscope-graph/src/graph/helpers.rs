//! Lookups shared by the view builders and the matrix builder.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{Edge, EdgeType, Node, NodeType, StatementLineage, TableKind};

/// Statement types that only read data.
const QUERY_STATEMENT_TYPES: &[&str] = &[
    "SELECT",
    "WITH",
    "QUERY",
    "UNION",
    "INTERSECT",
    "EXCEPT",
    "VALUES",
];

/// Node and ownership lookups over one lineage graph.
pub(crate) struct LineageIndex<'a> {
    nodes: HashMap<&'a str, &'a Node>,
    owners: HashMap<&'a str, &'a str>,
    owned: HashMap<&'a str, Vec<&'a Node>>,
}

impl<'a> LineageIndex<'a> {
    pub(crate) fn new(stmt: &'a StatementLineage) -> Self {
        let nodes: HashMap<&str, &Node> = stmt
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), node))
            .collect();

        let mut owners: HashMap<&str, &str> = HashMap::new();
        let mut owned: HashMap<&str, Vec<&Node>> = HashMap::new();
        for edge in stmt.edges.iter().filter(|e| e.edge_type == EdgeType::Ownership) {
            let (Some(table), Some(column)) =
                (nodes.get(edge.from.as_str()), nodes.get(edge.to.as_str()))
            else {
                continue;
            };
            if !table.node_type.is_table_like() || column.node_type != NodeType::Column {
                continue;
            }
            // First owner wins; a column listed twice is shown once.
            if owners.contains_key(column.id.as_str()) {
                continue;
            }
            owners.insert(column.id.as_str(), table.id.as_str());
            owned.entry(table.id.as_str()).or_default().push(column);
        }

        Self {
            nodes,
            owners,
            owned,
        }
    }

    pub(crate) fn node(&self, id: &str) -> Option<&'a Node> {
        self.nodes.get(id).copied()
    }

    pub(crate) fn owner(&self, column_id: &str) -> Option<&'a str> {
        self.owners.get(column_id).copied()
    }

    pub(crate) fn owned_columns(&self, table_id: &str) -> &[&'a Node] {
        self.owned.get(table_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The table-like node an endpoint belongs to: its owner for a column, the
    /// node itself for a table, view or CTE.
    pub(crate) fn resolve_table(&self, id: &str) -> Option<&'a str> {
        let node = self.node(id)?;
        if node.node_type.is_table_like() {
            Some(node.id.as_str())
        } else {
            self.owner(id)
        }
    }

    /// True when `id` is a table or view, or a column owned by one.
    pub(crate) fn is_relation_target(&self, id: &str) -> bool {
        self.resolve_table(id)
            .and_then(|table_id| self.node(table_id))
            .is_some_and(|table| table.node_type.is_relation())
    }
}

pub(crate) fn is_query_statement_type(statement_type: &str) -> bool {
    let normalized = statement_type.trim().to_ascii_uppercase();
    normalized.starts_with("SELECT") || QUERY_STATEMENT_TYPES.contains(&normalized.as_str())
}

/// `CREATE_TABLE`, `CREATE TABLE AS`, `CREATE_VIEW` and similar spellings.
pub(crate) fn is_create_statement_type(statement_type: &str) -> bool {
    let normalized = statement_type
        .trim()
        .to_ascii_uppercase()
        .replace([' ', '-'], "_");
    normalized.starts_with("CREATE_TABLE") || normalized.starts_with("CREATE_VIEW")
}

/// A query-typed statement that does not write into a table or view.
///
/// `INSERT ... SELECT` style statements reported with a query type still flow
/// into a real table and therefore get no Output node.
pub(crate) fn is_select_like(stmt: &StatementLineage) -> bool {
    if stmt.nodes.is_empty() || !is_query_statement_type(&stmt.statement_type) {
        return false;
    }
    let index = LineageIndex::new(stmt);
    !stmt
        .edges
        .iter()
        .filter(|edge| edge.is_flow())
        .any(|edge| index.is_relation_target(&edge.to))
}

pub(crate) fn table_kind(node_type: NodeType) -> TableKind {
    match node_type {
        NodeType::View => TableKind::View,
        NodeType::Cte => TableKind::Cte,
        _ => TableKind::Table,
    }
}

/// Everything before the last `.` of a qualified name.
pub(crate) fn namespace_of(qualified_name: &str) -> Option<String> {
    qualified_name
        .rsplit_once('.')
        .map(|(namespace, _)| namespace.to_string())
        .filter(|namespace| !namespace.is_empty())
}

pub(crate) fn source_name_or_default(source_name: Option<&str>) -> String {
    match source_name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => "default".to_string(),
    }
}

/// `a, b, c` for up to three names, `a, b, c...` beyond that.
pub(crate) fn shared_tables_label(tables: &[String]) -> String {
    let shown = tables
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if tables.len() > 3 {
        format!("{shown}...")
    } else {
        shown
    }
}

/// Tables a single statement reads and writes, keyed by display name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct TableAccess {
    pub(crate) read: BTreeSet<String>,
    pub(crate) written: BTreeSet<String>,
    pub(crate) kinds: BTreeMap<String, TableKind>,
}

impl TableAccess {
    pub(crate) fn extend(&mut self, other: TableAccess) {
        self.read.extend(other.read);
        self.written.extend(other.written);
        for (name, kind) in other.kinds {
            self.kinds.entry(name).or_insert(kind);
        }
    }
}

/// Compute the read and write sets of one statement.
///
/// A table counts as written when flow reaches it (directly or through one of
/// its columns), or when a CREATE TABLE/VIEW statement names it and nothing
/// flows out of it. Every other referenced table counts as read.
pub(crate) fn table_access(stmt: &StatementLineage) -> TableAccess {
    let index = LineageIndex::new(stmt);
    let flows: Vec<&Edge> = stmt.edges.iter().filter(|edge| edge.is_flow()).collect();
    let creates = is_create_statement_type(&stmt.statement_type);

    let mut access = TableAccess::default();
    for node in stmt.nodes.iter().filter(|node| node.node_type.is_relation()) {
        let id = node.id.as_str();
        let flows_out = flows.iter().any(|edge| {
            index.resolve_table(&edge.from) == Some(id) && index.resolve_table(&edge.to) != Some(id)
        });
        let flows_in = flows.iter().any(|edge| {
            index.resolve_table(&edge.to) == Some(id) && index.resolve_table(&edge.from) != Some(id)
        });

        let is_written = flows_in || (creates && !flows_out);
        let is_read = flows_out;

        let name = node.display_name().to_string();
        access.kinds.entry(name.clone()).or_insert(table_kind(node.node_type));
        if is_written {
            access.written.insert(name.clone());
        }
        if is_read || !is_written {
            access.read.insert(name);
        }
    }
    access
}
