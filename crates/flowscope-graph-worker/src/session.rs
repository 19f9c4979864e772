//! A render session: one analysis result, one view state, one live graph.

use std::sync::Arc;

use flowscope_graph::layout::layout_edges;
use flowscope_graph::protocol::LayoutRequest;
use flowscope_graph::{
    sizing_hints, AnalyzeResult, BuildOutcome, FlowGraph, LayoutOptions, Position, RenderKey,
    RenderStage, ResolvedSchemaMetadata, StagingController, StatementLineage, ViewStateStore,
    WorkerRequest,
};
use tracing::{debug, warn};

use crate::service::{GraphService, Outcome};

/// How a render call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// The live graph is final.
    Finalized,
    /// A newer request or a cancel overtook this render; nothing was applied.
    Superseded,
}

/// Drives the staging controller with graphs and layouts from a
/// [`GraphService`].
pub struct RenderSession {
    service: Arc<GraphService>,
    store: ViewStateStore,
    staging: StagingController,
    statements: Arc<[StatementLineage]>,
    resolved_schema: Option<Arc<ResolvedSchemaMetadata>>,
    revision: u64,
    last_error: Option<String>,
}

impl RenderSession {
    pub fn new(service: Arc<GraphService>, options: LayoutOptions) -> Self {
        Self {
            service,
            store: ViewStateStore::new(),
            staging: StagingController::new(options),
            statements: Arc::from(Vec::new()),
            resolved_schema: None,
            revision: 0,
            last_error: None,
        }
    }

    /// Replace the analysis result. The next render is a full update.
    pub fn set_result(&mut self, result: AnalyzeResult) {
        self.statements = Arc::from(result.statements);
        self.resolved_schema = result.resolved_schema.map(Arc::new);
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ViewStateStore {
        &mut self.store
    }

    /// Error of the most recent graph build, if it failed and degraded to an
    /// empty graph.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn stage(&self) -> RenderStage {
        self.staging.stage()
    }

    pub fn graph(&self) -> &FlowGraph {
        self.staging.live_graph()
    }

    pub fn node_moved(&mut self, node_id: &str, position: Position) {
        self.staging.node_moved(node_id, position);
    }

    /// Build the graph for the current view state and lay it out.
    pub async fn render(&mut self) -> RenderStatus {
        let snapshot = self.store.snapshot();
        let cycle = self.staging.begin();
        debug!(cycle, version = snapshot.version, mode = %snapshot.view_mode, "render started");

        let request = WorkerRequest::build(
            self.statements.to_vec(),
            self.resolved_schema.as_deref().cloned(),
            &snapshot,
        );
        let response = match self.service.build_graph(request).await {
            Outcome::Ready(response) => response,
            Outcome::Superseded => return self.superseded(),
        };
        self.last_error = response.error;

        let graph = FlowGraph::new(response.nodes, response.edges);
        let key = RenderKey::new(&snapshot, self.revision);
        match self.staging.graph_built(cycle, graph, key) {
            Some(BuildOutcome::Finalized) => return RenderStatus::Finalized,
            Some(BuildOutcome::NeedsLayout) => {}
            None => return self.superseded(),
        }

        let live = self.staging.live_graph();
        let options = self.staging.layout_options();
        let request = LayoutRequest {
            request_id: 0,
            nodes: sizing_hints(live),
            edges: layout_edges(live),
            direction: options.direction,
            algorithm: options.algorithm,
        };
        self.staging.layout_started(cycle);

        match self.service.layout(request).await {
            Outcome::Ready(Ok(layout)) => {
                self.staging.layout_finished(cycle, &layout.positions);
            }
            Outcome::Ready(Err(e)) => {
                warn!(cycle, error = %e, "layout failed, keeping preview positions");
                self.staging.layout_failed(cycle);
            }
            Outcome::Superseded => return self.superseded(),
        }
        RenderStatus::Finalized
    }

    fn superseded(&mut self) -> RenderStatus {
        self.staging.cancel();
        RenderStatus::Superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowscope_graph::{Edge, Node, ViewMode};

    fn session() -> RenderSession {
        RenderSession::new(Arc::new(GraphService::synchronous()), LayoutOptions::default())
    }

    fn result() -> AnalyzeResult {
        let stmt = StatementLineage::new("INSERT")
            .with_source_name("load.sql")
            .with_node(Node::table("src", "src"))
            .with_node(Node::column("src.id", "id"))
            .with_node(Node::table("dst", "dst"))
            .with_node(Node::column("dst.id", "id"))
            .with_edge(Edge::ownership("o1", "src", "src.id"))
            .with_edge(Edge::ownership("o2", "dst", "dst.id"))
            .with_edge(Edge::data_flow("f1", "src.id", "dst.id"));
        serde_json::from_value(serde_json::json!({ "statements": [stmt] })).unwrap()
    }

    #[tokio::test]
    async fn test_render_lays_out_every_node() {
        let mut session = session();
        session.set_result(result());

        assert_eq!(session.render().await, RenderStatus::Finalized);
        assert_eq!(session.stage(), RenderStage::Finalized);
        assert_eq!(session.last_error(), None);
        let graph = session.graph();
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.node("src").unwrap().position.x < graph.node("dst").unwrap().position.x);
    }

    #[tokio::test]
    async fn test_highlight_change_is_a_data_patch() {
        let mut session = session();
        session.set_result(result());
        session.render().await;
        session.node_moved("dst", Position::new(999.0, 5.0));

        session.store_mut().set_search_term("dst");
        assert_eq!(session.render().await, RenderStatus::Finalized);
        let dst = session.graph().node("dst").unwrap();
        assert!(dst.is_highlighted());
        assert_eq!(dst.position, Position::new(999.0, 5.0));
    }

    #[tokio::test]
    async fn test_view_mode_switch_rebuilds() {
        let mut session = session();
        session.set_result(result());
        session.render().await;

        session.store_mut().set_view_mode(ViewMode::Script);
        session.render().await;
        let ids: Vec<_> = session.graph().nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["script:load.sql"]);
    }
}
