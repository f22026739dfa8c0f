//! Storage for every layout node of every workspace.
//!
//! Groups own their children through the `children` list; the `parent` field
//! is a plain key back into the same map. Keys are generational, so a key kept
//! around after its node was removed simply fails to resolve.

use serde::Serialize;
use slotmap::SlotMap;
use tracing::{trace, warn};

use crate::common::collections::{BTreeMap, HashMap};
use crate::layout_engine::tab_group::TabGroupId;
use crate::layout_engine::{Ephemerality, ExpandState, Layer, LayoutKind, Orientation};
use crate::sys::geometry::Rect;
use crate::sys::host::{WindowId, WorkspaceId};

slotmap::new_key_type! { pub struct NodeId; }

const RATIO_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub workspace: WorkspaceId,
    pub data: NodeData,
    /// Share of the parent's extent along its axis. Siblings sum to 1.
    pub ratio: f64,
    pub layer: Layer,
    /// Last computed frame. Derived from the tree, never read back into it.
    pub geometry: Rect,
    pub expand: ExpandState,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Window(WindowId),
    Group(Group),
}

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub axis: Orientation,
    pub kind: LayoutKind,
    pub ephemerality: Ephemerality,
    #[serde(skip)]
    pub children: Vec<NodeId>,
    /// Child the focus walk descends into.
    #[serde(skip)]
    pub focused_child: Option<NodeId>,
    /// The group itself holds focus instead of one of its descendants.
    pub group_focused: bool,
    /// New windows opened while focus is inside this group become its
    /// children rather than siblings of the focused node.
    pub swallow: bool,
    #[serde(skip)]
    pub tab_group: Option<TabGroupId>,
}

impl Group {
    fn new(axis: Orientation, kind: LayoutKind, ephemerality: Ephemerality) -> Self {
        Self {
            axis,
            kind,
            ephemerality,
            children: Vec::new(),
            focused_child: None,
            group_focused: false,
            swallow: false,
            tab_group: None,
        }
    }

    /// The axis directional commands move along. Tabs are ordered left to right.
    pub fn nav_axis(&self) -> Orientation {
        match self.kind {
            LayoutKind::Split => self.axis,
            LayoutKind::Tabbed => Orientation::Horizontal,
        }
    }

    pub fn position(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }
}

impl Node {
    pub fn window(&self) -> Option<WindowId> {
        match &self.data {
            NodeData::Window(wid) => Some(*wid),
            NodeData::Group(_) => None,
        }
    }

    pub fn group(&self) -> Option<&Group> {
        match &self.data {
            NodeData::Group(group) => Some(group),
            NodeData::Window(_) => None,
        }
    }

    pub fn group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.data {
            NodeData::Group(group) => Some(group),
            NodeData::Window(_) => None,
        }
    }

    pub fn is_group(&self) -> bool { matches!(self.data, NodeData::Group(_)) }

    /// Split axis of a group; leaves have none.
    pub fn axis(&self) -> Option<Orientation> { self.group().map(|g| g.axis) }
}

#[derive(Default, Debug)]
pub struct NodeStore {
    nodes: SlotMap<NodeId, Node>,
    windows: HashMap<WindowId, NodeId>,
    roots: BTreeMap<WorkspaceId, NodeId>,
}

pub struct Ancestors<'a> {
    store: &'a NodeStore,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.store.parent(current);
        Some(current)
    }
}

impl NodeStore {
    pub fn new() -> Self { Self::default() }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.windows.clear();
        self.roots.clear();
    }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn get(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> { self.nodes.get_mut(id) }

    pub fn contains(&self, id: NodeId) -> bool { self.nodes.contains_key(id) }

    pub fn lookup_by_window(&self, window: WindowId) -> Option<NodeId> {
        self.windows.get(&window).copied()
    }

    pub fn workspace_root(&self, workspace: WorkspaceId) -> Option<NodeId> {
        self.roots.get(&workspace).copied()
    }

    pub fn workspaces(&self) -> impl Iterator<Item = WorkspaceId> + '_ {
        self.roots.keys().copied()
    }

    pub fn workspace_of(&self, id: NodeId) -> Option<WorkspaceId> {
        self.nodes.get(id).map(|n| n.workspace)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.nodes.get(id)?.parent }

    pub fn window(&self, id: NodeId) -> Option<WindowId> { self.nodes.get(id)?.window() }

    pub fn group(&self, id: NodeId) -> Option<&Group> { self.nodes.get(id)?.group() }

    pub fn group_mut(&mut self, id: NodeId) -> Option<&mut Group> {
        self.nodes.get_mut(id)?.group_mut()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.group(id).map(|g| g.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.group(parent)?.position(id)
    }

    /// Iterates from `id` (inclusive) up to its workspace root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            store: self,
            next: self.contains(id).then_some(id),
        }
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// Preorder listing of the subtree rooted at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if !self.contains(node) {
                continue;
            }
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn windows_under(&self, id: NodeId) -> Vec<WindowId> {
        self.descendants(id).into_iter().filter_map(|n| self.window(n)).collect()
    }

    pub fn new_leaf(&mut self, workspace: WorkspaceId, window: WindowId) -> NodeId {
        let id = self.nodes.insert(Node {
            parent: None,
            workspace,
            data: NodeData::Window(window),
            ratio: 1.0,
            layer: Layer::TILED,
            geometry: Rect::ZERO,
            expand: ExpandState::None,
        });
        if let Some(old) = self.windows.insert(window, id) {
            warn!(?window, ?old, "window was already bound to a node");
        }
        id
    }

    pub fn new_group(
        &mut self,
        workspace: WorkspaceId,
        axis: Orientation,
        kind: LayoutKind,
        ephemerality: Ephemerality,
    ) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            workspace,
            data: NodeData::Group(Group::new(axis, kind, ephemerality)),
            ratio: 1.0,
            layer: Layer::TILED,
            geometry: Rect::ZERO,
            expand: ExpandState::None,
        })
    }

    /// Makes a detached node the root of `workspace`.
    pub fn set_root(&mut self, workspace: WorkspaceId, root: NodeId) {
        debug_assert!(self.parent(root).is_none(), "root must not have a parent");
        if !self.contains(root) {
            return;
        }
        if let Some(old) = self.roots.insert(workspace, root) {
            if old != root {
                warn!(%workspace, ?old, "replacing a workspace root that was still attached");
            }
        }
        self.set_workspace(root, workspace);
        self.nodes[root].ratio = 1.0;
    }

    /// Inserts a detached node into `parent` at `index`.
    ///
    /// With `ratio` the node takes that share and its new siblings are scaled to
    /// fit the rest; otherwise every child ends up with an equal share of the new
    /// total.
    pub fn attach(&mut self, child: NodeId, parent: NodeId, index: usize, ratio: Option<f64>) {
        if !self.contains(child) || self.group(parent).is_none() {
            warn!(?child, ?parent, "attach target is not a live group");
            return;
        }
        debug_assert!(self.nodes[child].parent.is_none(), "node is already attached");
        let workspace = self.nodes[parent].workspace;
        if self.roots.get(&self.nodes[child].workspace) == Some(&child) {
            self.roots.remove(&self.nodes[child].workspace);
        }

        let siblings = self.children(parent).to_vec();
        let share = if siblings.is_empty() {
            1.0
        } else {
            ratio.unwrap_or(1.0 / (siblings.len() + 1) as f64).clamp(0.0, 1.0)
        };
        for sibling in &siblings {
            self.nodes[*sibling].ratio *= 1.0 - share;
        }

        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.ratio = share;
        let Some(group) = self.nodes[parent].group_mut() else { return };
        let index = index.min(group.children.len());
        group.children.insert(index, child);
        if group.focused_child.is_none() {
            group.focused_child = Some(child);
        }
        self.normalize(parent);
        self.set_workspace(child, workspace);
        trace!(?child, ?parent, index, share, "attached");
    }

    /// Unlinks a node from its parent (or workspace root slot) without removing
    /// it. The remaining siblings absorb its share proportionally. Collapsing the
    /// emptied parent is left to the caller.
    pub fn detach(&mut self, node: NodeId) {
        let Some(n) = self.nodes.get_mut(node) else { return };
        let workspace = n.workspace;
        let Some(parent) = n.parent.take() else {
            if self.roots.get(&workspace) == Some(&node) {
                self.roots.remove(&workspace);
            }
            return;
        };
        if let Some(group) = self.nodes[parent].group_mut() {
            if let Some(index) = group.position(node) {
                group.children.remove(index);
                if group.focused_child == Some(node) {
                    group.focused_child = group
                        .children
                        .get(index)
                        .or_else(|| index.checked_sub(1).and_then(|i| group.children.get(i)))
                        .copied();
                }
            }
        }
        self.normalize(parent);
        trace!(?node, ?parent, "detached");
    }

    /// Puts detached `new` into the slot `old` occupies, taking over its share.
    /// `old` is left detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if !self.contains(old) || !self.contains(new) || old == new {
            return;
        }
        debug_assert!(self.nodes[new].parent.is_none(), "replacement must be detached");
        let workspace = self.nodes[old].workspace;
        let ratio = self.nodes[old].ratio;
        match self.nodes[old].parent.take() {
            Some(parent) => {
                if let Some(group) = self.nodes[parent].group_mut() {
                    if let Some(index) = group.position(old) {
                        group.children[index] = new;
                    }
                    if group.focused_child == Some(old) {
                        group.focused_child = Some(new);
                    }
                }
                self.nodes[new].parent = Some(parent);
                self.nodes[new].ratio = ratio;
            }
            None => {
                self.roots.insert(workspace, new);
                self.nodes[new].ratio = 1.0;
            }
        }
        self.set_workspace(new, workspace);
    }

    /// Moves the child at `from` to position `to` within the same group.
    pub fn move_child(&mut self, parent: NodeId, from: usize, to: usize) {
        let Some(group) = self.group_mut(parent) else { return };
        if from >= group.children.len() {
            return;
        }
        let child = group.children.remove(from);
        let to = to.min(group.children.len());
        group.children.insert(to, child);
    }

    /// Frees a detached subtree. Returns the tab groups that were bound to it.
    pub fn remove_subtree(&mut self, node: NodeId) -> Vec<TabGroupId> {
        debug_assert!(self.parent(node).is_none(), "subtree must be detached first");
        let mut tab_groups = Vec::new();
        for id in self.descendants(node) {
            let Some(removed) = self.nodes.remove(id) else { continue };
            match removed.data {
                NodeData::Window(wid) => {
                    if self.windows.get(&wid) == Some(&id) {
                        self.windows.remove(&wid);
                    }
                }
                NodeData::Group(group) => tab_groups.extend(group.tab_group),
            }
        }
        if self.roots.values().any(|&r| r == node) {
            self.roots.retain(|_, r| *r != node);
        }
        tab_groups
    }

    /// Rebinds a leaf to a different window.
    pub fn rebind_window(&mut self, node: NodeId, window: WindowId) -> bool {
        let Some(NodeData::Window(old)) = self.nodes.get(node).map(|n| &n.data) else {
            return false;
        };
        let old = *old;
        if self.windows.get(&old) == Some(&node) {
            self.windows.remove(&old);
        }
        self.nodes[node].data = NodeData::Window(window);
        self.windows.insert(window, node);
        true
    }

    /// Points every ancestor's focus at the path leading to `node`.
    pub fn select(&mut self, node: NodeId) {
        let Some(workspace) = self.workspace_of(node) else { return };
        if let Some(root) = self.workspace_root(workspace) {
            for id in self.descendants(root) {
                if let Some(group) = self.group_mut(id) {
                    group.group_focused = false;
                }
            }
        }
        let path: Vec<_> = self.ancestors(node).collect();
        for pair in path.windows(2) {
            if let Some(group) = self.group_mut(pair[1]) {
                group.focused_child = Some(pair[0]);
            }
        }
        if let Some(group) = self.group_mut(node) {
            group.group_focused = true;
        }
    }

    /// Follows focus pointers down from `node`.
    ///
    /// `ignore_group_focus` walks to the last child at every level instead;
    /// `stop_at_expanded` stops at the first expanded node on the way.
    pub fn focused_descendant(
        &self,
        node: NodeId,
        ignore_group_focus: bool,
        stop_at_expanded: bool,
    ) -> NodeId {
        let mut current = node;
        loop {
            let Some(n) = self.nodes.get(current) else { return current };
            if stop_at_expanded && n.expand.is_expanded() {
                return current;
            }
            let Some(group) = n.group() else { return current };
            let next = if ignore_group_focus {
                group.children.last().copied()
            } else {
                if group.group_focused {
                    return current;
                }
                group
                    .focused_child
                    .filter(|c| group.children.contains(c))
                    .or_else(|| group.children.first().copied())
            };
            match next {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    pub fn workspace_focused_node(
        &self,
        workspace: WorkspaceId,
        ignore_group_focus: bool,
        stop_at_expanded: bool,
    ) -> Option<NodeId> {
        let root = self.workspace_root(workspace)?;
        Some(self.focused_descendant(root, ignore_group_focus, stop_at_expanded))
    }

    /// Rescales a group's child ratios so they sum to 1.
    pub fn normalize(&mut self, group: NodeId) {
        let children = self.children(group).to_vec();
        if children.is_empty() {
            return;
        }
        let total: f64 = children.iter().map(|&c| self.nodes[c].ratio.max(0.0)).sum();
        for &child in &children {
            self.nodes[child].ratio = if total <= RATIO_EPSILON {
                1.0 / children.len() as f64
            } else {
                self.nodes[child].ratio.max(0.0) / total
            };
        }
    }

    fn set_workspace(&mut self, node: NodeId, workspace: WorkspaceId) {
        if self.nodes.get(node).map(|n| n.workspace) == Some(workspace) {
            return;
        }
        for id in self.descendants(node) {
            self.nodes[id].workspace = workspace;
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const WS: WorkspaceId = WorkspaceId(1);

    fn split(store: &mut NodeStore, windows: &[u64]) -> (NodeId, Vec<NodeId>) {
        let group = store.new_group(WS, Orientation::Horizontal, LayoutKind::Split, Ephemerality::Standard);
        store.set_root(WS, group);
        let leaves = windows
            .iter()
            .map(|&w| {
                let leaf = store.new_leaf(WS, WindowId(w));
                let len = store.children(group).len();
                store.attach(leaf, group, len, None);
                leaf
            })
            .collect();
        (group, leaves)
    }

    fn ratios(store: &NodeStore, group: NodeId) -> Vec<f64> {
        store.children(group).iter().map(|&c| store.get(c).unwrap().ratio).collect()
    }

    #[test]
    fn attach_gives_equal_shares() {
        let mut store = NodeStore::new();
        let (group, _) = split(&mut store, &[1, 2, 3, 4]);
        for ratio in ratios(&store, group) {
            assert!((ratio - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn attach_with_explicit_share_scales_siblings() {
        let mut store = NodeStore::new();
        let (group, _) = split(&mut store, &[1, 2]);
        let leaf = store.new_leaf(WS, WindowId(3));
        store.attach(leaf, group, 0, Some(0.5));
        let r = ratios(&store, group);
        assert!((r[0] - 0.5).abs() < 1e-9);
        assert!((r[1] - 0.25).abs() < 1e-9);
        assert!((r.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn detach_redistributes_proportionally() {
        let mut store = NodeStore::new();
        let (group, leaves) = split(&mut store, &[1, 2, 3]);
        store.get_mut(leaves[0]).unwrap().ratio = 0.5;
        store.get_mut(leaves[1]).unwrap().ratio = 0.25;
        store.get_mut(leaves[2]).unwrap().ratio = 0.25;
        store.detach(leaves[2]);
        let r = ratios(&store, group);
        assert!((r[0] - 2.0 / 3.0).abs() < 1e-9);
        assert!((r[1] - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(store.parent(leaves[2]), None);
    }

    #[test]
    fn detach_moves_focus_to_neighbour() {
        let mut store = NodeStore::new();
        let (group, leaves) = split(&mut store, &[1, 2, 3]);
        store.select(leaves[2]);
        store.detach(leaves[2]);
        assert_eq!(store.group(group).unwrap().focused_child, Some(leaves[1]));
    }

    #[test]
    fn focus_walk_follows_selection() {
        let mut store = NodeStore::new();
        let (root, leaves) = split(&mut store, &[1, 2, 3]);
        store.select(leaves[1]);
        assert_eq!(store.workspace_focused_node(WS, false, false), Some(leaves[1]));
        assert_eq!(store.workspace_focused_node(WS, true, false), Some(leaves[2]));

        store.select(root);
        assert_eq!(store.workspace_focused_node(WS, false, false), Some(root));
        store.select(leaves[0]);
        assert_eq!(store.workspace_focused_node(WS, false, false), Some(leaves[0]));
    }

    #[test]
    fn focus_walk_stops_at_expanded_node() {
        let mut store = NodeStore::new();
        let (root, leaves) = split(&mut store, &[1, 2]);
        let inner = store.new_group(WS, Orientation::Vertical, LayoutKind::Split, Ephemerality::Standard);
        store.detach(leaves[1]);
        store.attach(inner, root, 1, None);
        store.attach(leaves[1], inner, 0, None);
        store.select(leaves[1]);
        store.get_mut(inner).unwrap().expand = ExpandState::Maximized;
        assert_eq!(store.workspace_focused_node(WS, false, true), Some(inner));
        assert_eq!(store.workspace_focused_node(WS, false, false), Some(leaves[1]));
    }

    #[test]
    fn replace_takes_over_slot_and_share() {
        let mut store = NodeStore::new();
        let (group, leaves) = split(&mut store, &[1, 2]);
        store.get_mut(leaves[0]).unwrap().ratio = 0.7;
        store.get_mut(leaves[1]).unwrap().ratio = 0.3;
        let other = store.new_leaf(WS, WindowId(9));
        store.replace(leaves[1], other);
        assert_eq!(store.children(group), &[leaves[0], other]);
        assert!((store.get(other).unwrap().ratio - 0.3).abs() < 1e-9);
        assert_eq!(store.parent(leaves[1]), None);
    }

    #[test]
    fn removed_nodes_are_stale_keys() {
        let mut store = NodeStore::new();
        let (root, leaves) = split(&mut store, &[1, 2]);
        store.detach(root);
        store.remove_subtree(root);
        assert!(!store.contains(leaves[0]));
        assert_eq!(store.lookup_by_window(WindowId(1)), None);
        assert_eq!(store.workspace_root(WS), None);
        assert!(store.is_empty());
    }
}
