//! Creating, retagging and dissolving groups, plus the insert/remove paths
//! that feed them.

use tracing::{debug, trace};

use super::state::LayoutState;
use super::{Ephemerality, LayoutKind, Orientation, SetSwallowOption};
use crate::model::tree::NodeId;
use crate::sys::host::{WindowId, WorkspaceId};

impl LayoutState {
    /// Wraps `node` in a new group of the given shape and returns the group.
    ///
    /// When `node` is already the only child of its parent, the parent is
    /// retagged instead of nesting another level.
    pub fn make_group_on(
        &mut self,
        node: NodeId,
        axis: Orientation,
        kind: LayoutKind,
        ephemerality: Ephemerality,
    ) -> NodeId {
        let Some(workspace) = self.store.workspace_of(node) else { return node };
        if let Some(parent) = self.store.parent(node) {
            if self.store.children(parent).len() == 1 {
                if let Some(group) = self.store.group_mut(parent) {
                    group.axis = axis;
                    group.kind = kind;
                    if group.ephemerality != Ephemerality::ForceEphemeral {
                        group.ephemerality = ephemerality;
                    }
                }
                self.settle(workspace);
                debug!(?node, ?parent, ?axis, ?kind, "retagged lone parent");
                return parent;
            }
        }

        let group = self.store.new_group(workspace, axis, kind, ephemerality);
        self.store.replace(node, group);
        self.store.attach(node, group, 0, None);
        self.settle(workspace);
        debug!(?node, ?group, ?axis, ?kind, ?ephemerality, "made group");
        group
    }

    /// Like [`make_group_on`](Self::make_group_on) with the axis orthogonal to
    /// the one `node` currently sits in.
    pub fn make_opposite_group_on(&mut self, node: NodeId, ephemerality: Ephemerality) -> NodeId {
        let axis = self
            .store
            .parent(node)
            .and_then(|p| self.store.group(p))
            .map(|g| g.axis.opposite())
            .unwrap_or(Orientation::Horizontal);
        self.make_group_on(node, axis, LayoutKind::Split, ephemerality)
    }

    /// Sets the split axis. A tabbed group becomes a split along `axis`.
    pub fn change_group_on(&mut self, group: NodeId, axis: Orientation) -> NodeId {
        let Some(g) = self.store.group_mut(group) else { return group };
        if g.axis == axis && !g.kind.is_tabbed() {
            return group;
        }
        g.axis = axis;
        g.kind = LayoutKind::Split;
        self.settle_node(group);
        group
    }

    /// Flips the axis. The layout kind is left alone, so a tabbed group only
    /// changes the axis it will split along once untabbed.
    pub fn change_group_to_opposite_on(&mut self, group: NodeId) -> NodeId {
        let Some(g) = self.store.group_mut(group) else { return group };
        g.axis = g.axis.opposite();
        trace!(?group, axis = ?g.axis, "flipped axis");
        self.settle_node(group);
        group
    }

    pub fn tab_group_on(&mut self, group: NodeId) -> NodeId {
        self.set_group_kind(group, LayoutKind::Tabbed)
    }

    pub fn untab_group_on(&mut self, group: NodeId) -> NodeId {
        self.set_group_kind(group, LayoutKind::Split)
    }

    pub fn toggle_tab_group_on(&mut self, group: NodeId) -> NodeId {
        match self.store.group(group).map(|g| g.kind) {
            Some(LayoutKind::Tabbed) => self.untab_group_on(group),
            Some(LayoutKind::Split) => self.tab_group_on(group),
            None => group,
        }
    }

    fn set_group_kind(&mut self, group: NodeId, kind: LayoutKind) -> NodeId {
        let Some(g) = self.store.group_mut(group) else { return group };
        if g.kind != kind {
            g.kind = kind;
            debug!(?group, ?kind, "changed layout kind");
            self.settle_node(group);
        }
        group
    }

    /// Marks a group ephemeral or standard. Force-ephemeral groups ignore this.
    /// Nothing collapses until the group next loses a child.
    pub fn change_group_ephemerality_on(&mut self, group: NodeId, ephemeral: bool) -> NodeId {
        let Some(g) = self.store.group_mut(group) else { return group };
        if g.ephemerality == Ephemerality::ForceEphemeral {
            trace!(?group, "force-ephemeral group keeps its ephemerality");
            return group;
        }
        g.ephemerality = if ephemeral { Ephemerality::Ephemeral } else { Ephemerality::Standard };
        group
    }

    /// Group that group commands act on: the focused group itself when a group
    /// holds focus, otherwise the parent of the focused node.
    pub fn focused_group(&self, workspace: WorkspaceId) -> Option<NodeId> {
        let focused = self.store.workspace_focused_node(workspace, false, false)?;
        if self.store.group(focused).is_some_and(|g| g.group_focused) {
            return Some(focused);
        }
        self.store.parent(focused)
    }

    fn settle_node(&mut self, node: NodeId) {
        if let Some(workspace) = self.store.workspace_of(node) {
            self.settle(workspace);
        }
    }

    /// Sets the swallow flag of the group containing the focused node of
    /// `workspace`. Returns the new value.
    pub fn set_node_swallow(
        &mut self,
        workspace: WorkspaceId,
        option: SetSwallowOption,
    ) -> Option<bool> {
        let focused = self.store.workspace_focused_node(workspace, false, false)?;
        let parent = self.store.parent(focused)?;
        let group = self.store.group_mut(parent)?;
        group.swallow = option.apply(group.swallow);
        debug!(?parent, swallow = group.swallow, "set swallow");
        Some(group.swallow)
    }

    /// Nearest group at or above `node` that swallows new windows.
    fn swallowing_group(&self, node: NodeId) -> Option<NodeId> {
        self.store.ancestors(node).find(|&n| self.store.group(n).is_some_and(|g| g.swallow))
    }

    /// Places a detached node into `workspace` next to its focused node and
    /// focuses it.
    ///
    /// An empty workspace takes the node as its root. A focused group, or the
    /// nearest swallowing group around the focused node, takes it as its last
    /// child. A lone root leaf is wrapped in an ephemeral horizontal group
    /// first.
    pub fn insert_node(&mut self, workspace: WorkspaceId, node: NodeId) {
        let focused = self.store.workspace_focused_node(workspace, false, false);
        let receiver = focused.and_then(|f| match self.store.get(f) {
            Some(n) if n.is_group() => Some(f),
            _ => self.swallowing_group(f),
        });
        match (focused, receiver) {
            (None, _) => self.store.set_root(workspace, node),
            (Some(_), Some(group)) => {
                let index = self.store.children(group).len();
                self.store.attach(node, group, index, None);
                trace!(?node, ?group, "appended to group");
            }
            (Some(focused), None) => match self.store.parent(focused) {
                Some(parent) => {
                    let index = self.store.index_in_parent(focused).map_or(0, |i| i + 1);
                    self.store.attach(node, parent, index, None);
                }
                None => {
                    let group = self.store.new_group(
                        workspace,
                        Orientation::Horizontal,
                        LayoutKind::Split,
                        Ephemerality::Ephemeral,
                    );
                    self.store.replace(focused, group);
                    self.store.attach(focused, group, 0, None);
                    self.store.attach(node, group, 1, None);
                }
            },
        }
        self.store.select(node);
        self.settle(workspace);
    }

    /// Detaches `node` and dissolves whatever the removal leaves empty or
    /// down to a single child of a collapsing group.
    pub(crate) fn detach_and_collapse(&mut self, node: NodeId) {
        let parent = self.store.parent(node);
        self.store.detach(node);
        if let Some(parent) = parent {
            self.collapse(parent);
        }
    }

    fn collapse(&mut self, group: NodeId) {
        let Some(g) = self.store.group(group) else { return };
        let (children, collapses, focused) =
            (g.children.clone(), g.ephemerality.collapses(), g.group_focused);
        match children.as_slice() {
            [] => {
                trace!(?group, "dropping empty group");
                let parent = self.store.parent(group);
                self.store.detach(group);
                self.destroy_subtree(group);
                if let Some(parent) = parent {
                    self.collapse(parent);
                }
            }
            &[child] if collapses => {
                trace!(?group, ?child, "dissolving ephemeral group");
                self.store.detach(child);
                self.store.replace(group, child);
                if focused {
                    if let Some(child_group) = self.store.group_mut(child) {
                        child_group.group_focused = true;
                    }
                }
                self.destroy_subtree(group);
            }
            _ => self.sync_tab_group(group),
        }
    }

    pub(crate) fn destroy_subtree(&mut self, node: NodeId) {
        for id in self.store.remove_subtree(node) {
            self.tabs.remove(id);
        }
    }

    /// Removes a window from the tree or the floating layer. Returns the
    /// workspace it lived on.
    pub fn remove_window(&mut self, window: WindowId) -> Option<WorkspaceId> {
        self.overrides.remove(window);
        if let Some(node) = self.store.lookup_by_window(window) {
            let workspace = self.store.workspace_of(node)?;
            self.detach_and_collapse(node);
            self.destroy_subtree(node);
            self.settle(workspace);
            debug!(%window, %workspace, "removed tiled window");
            return Some(workspace);
        }
        let (&workspace, layer) =
            self.floating.iter_mut().find(|(_, l)| l.windows.contains(&window))?;
        layer.windows.retain(|&w| w != window);
        if layer.windows.is_empty() {
            layer.active = false;
        }
        debug!(%window, %workspace, "removed floating window");
        Some(workspace)
    }
}
