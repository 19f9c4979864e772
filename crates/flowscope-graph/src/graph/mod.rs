//! View graph builders.
//!
//! Each builder is a pure function from statement lineages and a [`ViewState`]
//! snapshot to a [`FlowGraph`]. Positions are left at the origin; the layout
//! engine assigns them.
//!
//! Ids invented here carry a prefix so they never collide with lineage ids:
//!
//! | Prefix | Used for |
//! |--------|----------|
//! | `virtual:output` | the Output node of select-like statements |
//! | `script:` | script nodes |
//! | `table:` | simplified table nodes of the hybrid view |
//! | `tedge:` | table-to-table edges |
//! | `cedge:` | column-to-column edges |
//! | `sedge:` | script-to-script edges |
//! | `hedge:` | hybrid view edges |
//! | `schema:` | schema-only columns |

mod column;
pub(crate) mod helpers;
mod highlight;
pub(crate) mod script;
mod table;

pub use column::build_column_graph;
pub use highlight::apply_highlights;
pub use script::build_script_graph;
pub use table::build_table_graph;

use crate::error::GraphError;
use crate::state::{ViewMode, ViewState};
use crate::types::{FlowGraph, ResolvedSchemaMetadata, StatementLineage};

/// Id of the synthetic node collecting unowned columns.
pub const OUTPUT_NODE_ID: &str = "virtual:output";

/// Build the graph for a view mode.
pub fn build_view_graph(
    statements: &[StatementLineage],
    resolved_schema: Option<&ResolvedSchemaMetadata>,
    view_mode: ViewMode,
    state: &ViewState,
) -> Result<FlowGraph, GraphError> {
    match view_mode {
        ViewMode::Table => build_table_graph(statements, resolved_schema, state),
        ViewMode::Column => build_column_graph(statements, resolved_schema, state),
        ViewMode::Script => build_script_graph(statements, state, false),
        ViewMode::Hybrid => build_script_graph(statements, state, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::load_result_fixture;

    #[test]
    fn test_empty_input_builds_empty_graphs() {
        for mode in [
            ViewMode::Table,
            ViewMode::Column,
            ViewMode::Script,
            ViewMode::Hybrid,
        ] {
            let graph = build_view_graph(&[], None, mode, &ViewState::default()).unwrap();
            assert!(graph.is_empty(), "{mode} view should be empty");
        }
    }

    #[test]
    fn test_fixture_builds_in_every_mode() {
        let result = load_result_fixture("etl_pipeline.json");
        let schema = result.resolved_schema.as_ref();
        let state = ViewState::default();

        let build = |mode| build_view_graph(&result.statements, schema, mode, &state).unwrap();

        let table = build(ViewMode::Table);
        assert_eq!(table.nodes.len(), 5);
        assert!(table.node(OUTPUT_NODE_ID).is_some());

        let column = build(ViewMode::Column);
        assert_eq!(column.nodes.len(), table.nodes.len());
        assert_eq!(column.edges.len(), 5);

        let script = build(ViewMode::Script);
        assert_eq!(script.nodes.len(), 3);
        assert_eq!(script.edges.len(), 2);

        let hybrid = build(ViewMode::Hybrid);
        assert_eq!(hybrid.nodes.len(), 3 + 4);
    }
}
