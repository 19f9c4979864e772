//! Two-stage render staging.
//!
//! A render cycle builds a graph, shows a preview with whatever positions are
//! already known, then swaps in the computed layout:
//!
//! ```text
//! Idle -> Building -> StagedPreview -> LayingOut -> Finalized
//!            \___________________________________/
//!                      data patch
//! ```
//!
//! Every event carries the id of the cycle it belongs to. Events from an older
//! cycle are ignored, so a slow response can never overwrite a newer graph.

use std::collections::{BTreeMap, BTreeSet, HashMap};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::layout::{
    apply_positions, instant_layout, layout_nodes, sizing_hints, LayoutDirection, LayoutOptions,
};
use crate::state::{ViewMode, ViewSnapshot};
use crate::types::{FlowGraph, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderStage {
    #[default]
    Idle,
    Building,
    StagedPreview,
    LayingOut,
    Finalized,
}

/// Inputs whose change invalidates manually dragged positions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderKey {
    pub view_mode: ViewMode,
    /// Revision of the analysis result being rendered
    pub result_revision: u64,
    pub default_collapsed: bool,
    pub collapsed_node_ids: BTreeSet<String>,
    pub expanded_table_ids: BTreeSet<String>,
}

impl RenderKey {
    pub fn new(snapshot: &ViewSnapshot, result_revision: u64) -> Self {
        Self {
            view_mode: snapshot.view_mode,
            result_revision,
            default_collapsed: snapshot.state.default_collapsed,
            collapsed_node_ids: snapshot.state.collapsed_node_ids.clone(),
            expanded_table_ids: snapshot.state.expanded_table_ids.clone(),
        }
    }
}

/// What the caller has to do after a graph was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The graph is final; no layout pass is needed.
    Finalized,
    /// A preview is live; request a layout for [`StagingController::live_graph`].
    NeedsLayout,
}

#[derive(Debug, Default)]
pub struct StagingController {
    options: LayoutOptions,
    stage: RenderStage,
    cycle: u64,
    live: FlowGraph,
    live_key: Option<RenderKey>,
    /// Last settled graph while a preview is on screen.
    settled: Option<FlowGraph>,
    pending_key: Option<RenderKey>,
    full_update: bool,
    dragged: BTreeSet<String>,
}

impl StagingController {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn stage(&self) -> RenderStage {
        self.stage
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The graph currently on screen.
    pub fn live_graph(&self) -> &FlowGraph {
        &self.live
    }

    pub fn layout_options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn set_direction(&mut self, direction: LayoutDirection) {
        self.options.direction = direction;
    }

    /// Start a new cycle, superseding any cycle in flight.
    pub fn begin(&mut self) -> u64 {
        self.discard_preview();
        self.cycle += 1;
        self.stage = RenderStage::Building;
        self.pending_key = None;
        self.full_update = false;
        self.dragged.clear();
        self.cycle
    }

    /// Abandon the current cycle. Events still in flight become stale and an
    /// unfinished preview is replaced by the last settled graph.
    pub fn cancel(&mut self) {
        self.discard_preview();
        self.cycle += 1;
        self.stage = RenderStage::Idle;
        self.pending_key = None;
        self.dragged.clear();
    }

    fn is_current(&self, cycle: u64, expected: &[RenderStage]) -> bool {
        let current = cycle == self.cycle && expected.contains(&self.stage);
        #[cfg(feature = "tracing")]
        if !current {
            debug!(
                cycle,
                live_cycle = self.cycle,
                stage = ?self.stage,
                "ignoring stale render event"
            );
        }
        current
    }

    /// Apply a freshly built graph. Returns `None` for a stale cycle.
    pub fn graph_built(
        &mut self,
        cycle: u64,
        mut graph: FlowGraph,
        key: RenderKey,
    ) -> Option<BuildOutcome> {
        if !self.is_current(cycle, &[RenderStage::Building]) {
            return None;
        }

        if self.same_structure(&graph, &key) {
            copy_positions(&self.live, &mut graph);
            self.live = graph;
            self.live_key = Some(key);
            self.stage = RenderStage::Finalized;
            #[cfg(feature = "tracing")]
            debug!(cycle, "structure unchanged, data patched");
            return Some(BuildOutcome::Finalized);
        }

        self.full_update = self.live_key.as_ref() != Some(&key);
        let known = self.preview_positions(&graph);
        apply_positions(&mut graph, &known);
        let empty = graph.is_empty();
        let previous = std::mem::replace(&mut self.live, graph);

        if empty {
            self.live_key = Some(key);
            self.stage = RenderStage::Finalized;
            return Some(BuildOutcome::Finalized);
        }
        self.settled = Some(previous);
        self.pending_key = Some(key);
        self.stage = RenderStage::StagedPreview;
        Some(BuildOutcome::NeedsLayout)
    }

    /// The layout request for the preview has been sent.
    pub fn layout_started(&mut self, cycle: u64) -> bool {
        if !self.is_current(cycle, &[RenderStage::StagedPreview]) {
            return false;
        }
        self.stage = RenderStage::LayingOut;
        true
    }

    /// Apply computed positions and finish the cycle.
    ///
    /// Nodes dragged since the preview keep their position unless the cycle is
    /// a full update.
    pub fn layout_finished(&mut self, cycle: u64, positions: &BTreeMap<String, Position>) -> bool {
        if !self.is_current(cycle, &[RenderStage::LayingOut]) {
            return false;
        }
        for node in &mut self.live.nodes {
            let Some(position) = positions.get(&node.id) else {
                continue;
            };
            if self.full_update || !self.dragged.contains(&node.id) {
                node.position = *position;
            }
        }
        self.finish();
        true
    }

    /// Keep the preview positions when the layout could not be computed.
    pub fn layout_failed(&mut self, cycle: u64) -> bool {
        if !self.is_current(cycle, &[RenderStage::StagedPreview, RenderStage::LayingOut]) {
            return false;
        }
        self.finish();
        true
    }

    /// Record a manual move of a node on the live graph.
    pub fn node_moved(&mut self, node_id: &str, position: Position) {
        let Some(node) = self.live.nodes.iter_mut().find(|node| node.id == node_id) else {
            return;
        };
        node.position = position;
        if matches!(self.stage, RenderStage::StagedPreview | RenderStage::LayingOut) {
            self.dragged.insert(node_id.to_string());
        }
    }

    fn finish(&mut self) {
        self.settled = None;
        self.live_key = self.pending_key.take();
        self.stage = RenderStage::Finalized;
        self.dragged.clear();
    }

    fn discard_preview(&mut self) {
        if let Some(settled) = self.settled.take() {
            self.live = settled;
        }
    }

    /// Same render key, node ids, edge ids and sizing hints as the live graph.
    fn same_structure(&self, graph: &FlowGraph, key: &RenderKey) -> bool {
        if self.live_key.as_ref() != Some(key) || self.live.nodes.len() != graph.nodes.len() {
            return false;
        }
        let same_edges = self.live.edges.len() == graph.edges.len()
            && self
                .live
                .edges
                .iter()
                .zip(&graph.edges)
                .all(|(a, b)| a.id == b.id);
        same_edges && sizing_hints(&self.live) == sizing_hints(graph)
    }

    /// Known positions for surviving nodes; new nodes are placed on a grid past
    /// the known ones.
    fn preview_positions(&self, graph: &FlowGraph) -> BTreeMap<String, Position> {
        let known: HashMap<&str, Position> = self
            .live
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), node.position))
            .collect();

        let mut positions = BTreeMap::new();
        let mut fresh = Vec::new();
        let nodes = layout_nodes(graph);
        for node in nodes {
            match known.get(node.id.as_str()) {
                Some(position) => {
                    positions.insert(node.id.clone(), *position);
                }
                None => fresh.push(node),
            }
        }
        if fresh.is_empty() {
            return positions;
        }

        let offset = if positions.is_empty() {
            Position::default()
        } else {
            let start = far_edge(&self.live, self.options.direction) + self.options.rank_spacing;
            match self.options.direction {
                LayoutDirection::LR => Position::new(start, 0.0),
                LayoutDirection::TB => Position::new(0.0, start),
            }
        };
        for (id, position) in instant_layout(&fresh, &self.options) {
            positions.insert(id, Position::new(position.x + offset.x, position.y + offset.y));
        }
        positions
    }
}

/// Far edge of a graph along the rank axis.
fn far_edge(graph: &FlowGraph, direction: LayoutDirection) -> f64 {
    graph
        .nodes
        .iter()
        .zip(layout_nodes(graph))
        .map(|(node, size)| match direction {
            LayoutDirection::LR => node.position.x + size.width,
            LayoutDirection::TB => node.position.y + size.height,
        })
        .fold(0.0, f64::max)
}

fn copy_positions(from: &FlowGraph, to: &mut FlowGraph) {
    let known: HashMap<&str, Position> =
        from.nodes.iter().map(|node| (node.id.as_str(), node.position)).collect();
    for node in &mut to.nodes {
        if let Some(position) = known.get(node.id.as_str()) {
            node.position = *position;
        }
    }
}
