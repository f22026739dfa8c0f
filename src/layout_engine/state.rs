use tracing::trace;

use super::Layer;
use super::autotile::Autotile;
use super::navigation::FocusOverrides;
use super::tab_group::TabGroupManager;
use crate::common::collections::BTreeMap;
use crate::common::config::Settings;
use crate::model::tree::{NodeId, NodeStore};
use crate::sys::host::{WindowId, WorkspaceId};

/// Floating windows of one workspace. They never enter the node tree.
#[derive(Default, Debug, Clone)]
pub struct FloatingLayer {
    /// Most recently focused last.
    pub windows: Vec<WindowId>,
    /// Keyboard focus is on the floating layer rather than the tiled tree.
    pub active: bool,
}

impl FloatingLayer {
    pub fn touch(&mut self, window: WindowId) {
        self.windows.retain(|&w| w != window);
        self.windows.push(window);
    }

    pub fn last(&self) -> Option<WindowId> { self.windows.last().copied() }
}

/// Everything the layout core remembers between host events.
#[derive(Debug)]
pub struct LayoutState {
    pub store: NodeStore,
    pub tabs: TabGroupManager,
    pub overrides: FocusOverrides,
    pub autotile: Autotile,
    pub floating: BTreeMap<WorkspaceId, FloatingLayer>,
    pub settings: Settings,
}

impl LayoutState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            store: NodeStore::new(),
            tabs: TabGroupManager::default(),
            overrides: FocusOverrides::default(),
            autotile: Autotile::from_settings(&settings.autotile),
            floating: BTreeMap::new(),
            settings: settings.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.tabs.clear();
        self.overrides.clear();
        self.floating.clear();
    }

    pub fn set_settings(&mut self, settings: &Settings) {
        self.autotile = Autotile::from_settings(&settings.autotile);
        self.settings = settings.clone();
    }

    pub fn workspace_of_window(&self, window: WindowId) -> Option<WorkspaceId> {
        if let Some(node) = self.store.lookup_by_window(window) {
            return self.store.workspace_of(node);
        }
        self.floating
            .iter()
            .find(|(_, layer)| layer.windows.contains(&window))
            .map(|(ws, _)| *ws)
    }

    pub fn window_layer(&self, window: WindowId) -> Option<Layer> {
        if let Some(node) = self.store.lookup_by_window(window) {
            return self.store.get(node).map(|n| n.layer);
        }
        self.floating
            .values()
            .any(|layer| layer.windows.contains(&window))
            .then_some(Layer::FLOATING)
    }

    /// Layer keyboard focus is on within `workspace`.
    pub fn focused_layer(&self, workspace: WorkspaceId) -> Layer {
        if self.floating_active(workspace) { Layer::FLOATING } else { Layer::TILED }
    }

    pub fn floating_active(&self, workspace: WorkspaceId) -> bool {
        self.floating.get(&workspace).is_some_and(|l| l.active && !l.windows.is_empty())
    }

    /// The window keyboard focus rests on within `workspace`, tiled or floating.
    pub fn focused_window(&self, workspace: WorkspaceId) -> Option<WindowId> {
        if self.floating_active(workspace) {
            return self.floating.get(&workspace).and_then(FloatingLayer::last);
        }
        let node = self.store.workspace_focused_node(workspace, false, false)?;
        self.store.window(self.store.focused_descendant(node, false, false))
    }

    /// Leaf the focus walk would reach from `node`, ignoring group focus.
    pub fn focus_leaf(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(group) = self.store.group(current) {
            let next = group
                .focused_child
                .filter(|c| group.children.contains(c))
                .or_else(|| group.children.first().copied());
            match next {
                Some(child) => current = child,
                None => break,
            }
        }
        current
    }

    /// Brings tab groups of `workspace` in line with the tree after a mutation
    /// and checks the structural invariants in debug builds.
    pub(crate) fn settle(&mut self, workspace: WorkspaceId) {
        let Some(root) = self.store.workspace_root(workspace) else { return };
        for node in self.store.descendants(root) {
            self.sync_tab_group(node);
        }
        #[cfg(debug_assertions)]
        self.check_invariants(workspace);
        trace!(%workspace, "settled");
    }

    #[cfg(debug_assertions)]
    fn check_invariants(&self, workspace: WorkspaceId) {
        let Some(root) = self.store.workspace_root(workspace) else { return };
        for node in self.store.descendants(root) {
            let Some(group) = self.store.group(node) else { continue };
            if group.children.is_empty() {
                tracing::warn!(?node, "group without children survived an operation");
            }
            let total: f64 =
                group.children.iter().filter_map(|&c| self.store.get(c)).map(|c| c.ratio).sum();
            debug_assert!((total - 1.0).abs() < 1e-6, "child ratios of {node:?} sum to {total}");
            for &child in &group.children {
                debug_assert_eq!(self.store.parent(child), Some(node), "broken parent link");
            }
            debug_assert_eq!(
                group.kind.is_tabbed(),
                group.tab_group.is_some(),
                "tab entry out of sync for {node:?}"
            );
        }
    }
}
