//! View state: collapse, expansion, selection and search.
//!
//! This is the only mutable state shared by the view pipeline. It is owned by a
//! single [`ViewStateStore`] and changed through explicit actions. Builders never
//! see the store; they receive an immutable [`ViewSnapshot`] per invocation.

use std::collections::BTreeSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which graph the view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Tables with their columns, table-level edges
    #[default]
    Table,
    /// Tables with their columns, column-level edges
    Column,
    /// One node per script, script-to-script edges
    Script,
    /// Scripts plus simplified table nodes
    Hybrid,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Table => "table",
            ViewMode::Column => "column",
            ViewMode::Script => "script",
            ViewMode::Hybrid => "hybrid",
        }
    }

    pub fn is_script_level(&self) -> bool {
        matches!(self, ViewMode::Script | ViewMode::Hybrid)
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI state read by the builders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub selected_node_id: Option<String>,
    pub search_term: String,
    /// Nodes whose collapse state differs from `default_collapsed`
    pub collapsed_node_ids: BTreeSet<String>,
    /// Tables showing schema-only columns
    pub expanded_table_ids: BTreeSet<String>,
    pub default_collapsed: bool,
}

impl ViewState {
    /// A node is collapsed when exactly one of the default and its toggle says so.
    pub fn is_collapsed(&self, node_id: &str) -> bool {
        self.default_collapsed != self.collapsed_node_ids.contains(node_id)
    }

    pub fn is_table_expanded(&self, node_id: &str) -> bool {
        self.expanded_table_ids.contains(node_id)
    }

    /// Trimmed, lowercased search term, or `None` when there is nothing to match.
    pub fn normalized_search(&self) -> Option<String> {
        let term = self.search_term.trim();
        (!term.is_empty()).then(|| term.to_lowercase())
    }
}

/// Immutable, versioned copy of the store contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub version: u64,
    pub view_mode: ViewMode,
    pub state: Arc<ViewState>,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            view_mode: ViewMode::default(),
            state: Arc::new(ViewState::default()),
        }
    }
}

/// Single owner of the view state.
///
/// Every action that changes something bumps the version; no-op actions leave it
/// alone, so consumers can compare versions to skip work.
#[derive(Debug, Default)]
pub struct ViewStateStore {
    version: u64,
    view_mode: ViewMode,
    state: Arc<ViewState>,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view_mode(view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            ..Self::default()
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            version: self.version,
            view_mode: self.view_mode,
            state: Arc::clone(&self.state),
        }
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        if self.view_mode != view_mode {
            self.view_mode = view_mode;
            self.version += 1;
        }
    }

    pub fn select_node(&mut self, node_id: Option<String>) {
        self.update(|state| {
            if state.selected_node_id == node_id {
                return false;
            }
            state.selected_node_id = node_id;
            true
        });
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        self.update(|state| {
            if state.search_term == term {
                return false;
            }
            state.search_term = term;
            true
        });
    }

    /// Flip a node between collapsed and expanded.
    pub fn toggle_collapsed(&mut self, node_id: &str) {
        self.update(|state| {
            if !state.collapsed_node_ids.remove(node_id) {
                state.collapsed_node_ids.insert(node_id.to_string());
            }
            true
        });
    }

    pub fn set_collapsed(&mut self, node_id: &str, collapsed: bool) {
        self.update(|state| {
            if state.is_collapsed(node_id) == collapsed {
                return false;
            }
            if !state.collapsed_node_ids.remove(node_id) {
                state.collapsed_node_ids.insert(node_id.to_string());
            }
            true
        });
    }

    /// Show or hide schema-only columns of a table.
    pub fn toggle_table_expanded(&mut self, node_id: &str) {
        self.update(|state| {
            if !state.expanded_table_ids.remove(node_id) {
                state.expanded_table_ids.insert(node_id.to_string());
            }
            true
        });
    }

    /// Change the default collapse state. Individual toggles are relative to the
    /// old default, so they are cleared.
    pub fn set_default_collapsed(&mut self, default_collapsed: bool) {
        self.update(|state| {
            if state.default_collapsed == default_collapsed {
                return false;
            }
            state.default_collapsed = default_collapsed;
            state.collapsed_node_ids.clear();
            true
        });
    }

    /// Drop selection and per-node toggles, keeping the default collapse setting.
    pub fn reset(&mut self) {
        self.update(|state| {
            let default_collapsed = state.default_collapsed;
            let cleared = ViewState {
                default_collapsed,
                ..ViewState::default()
            };
            if *state == cleared {
                return false;
            }
            *state = cleared;
            true
        });
    }

    fn update(&mut self, action: impl FnOnce(&mut ViewState) -> bool) {
        // Copy-on-write: outstanding snapshots keep the previous state.
        let mut next = (*self.state).clone();
        if action(&mut next) {
            self.state = Arc::new(next);
            self.version += 1;
        }
    }
}
