//! Directional focus and movement over the node tree.
//!
//! Siblings are found purely by child order. The nearest ancestor whose axis
//! matches the direction and that has a sibling on the requested side wins.

use tracing::{debug, trace};

use super::state::LayoutState;
use super::{Direction, Ephemerality, LayoutKind};
use crate::common::collections::HashMap;
use crate::model::tree::NodeId;
use crate::sys::host::WindowId;

/// Explicit per-direction focus targets recorded for one window.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusOverride {
    pub left: Option<NodeId>,
    pub up: Option<NodeId>,
    pub down: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl FocusOverride {
    pub fn get(&self, direction: Direction) -> Option<NodeId> {
        match direction {
            Direction::Left => self.left,
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Right => self.right,
        }
    }

    fn slot(&mut self, direction: Direction) -> &mut Option<NodeId> {
        match direction {
            Direction::Left => &mut self.left,
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Right => &mut self.right,
        }
    }
}

/// Override table keyed by window. Targets are not invalidated when their node
/// goes away; a dead key simply fails to resolve.
#[derive(Default, Debug)]
pub struct FocusOverrides {
    entries: HashMap<WindowId, FocusOverride>,
}

impl FocusOverrides {
    pub fn target(&self, window: WindowId, direction: Direction) -> Option<NodeId> {
        self.entries.get(&window)?.get(direction)
    }

    pub fn set(&mut self, window: WindowId, direction: Direction, target: NodeId) {
        *self.entries.entry(window).or_default().slot(direction) = Some(target);
    }

    pub fn get(&self, window: WindowId) -> Option<&FocusOverride> { self.entries.get(&window) }

    pub fn remove(&mut self, window: WindowId) -> Option<FocusOverride> {
        self.entries.remove(&window)
    }

    /// Carries the entry of `from` over to `to`, replacing whatever `to` had.
    pub fn rename(&mut self, from: WindowId, to: WindowId) {
        if let Some(entry) = self.entries.remove(&from) {
            self.entries.insert(to, entry);
        }
    }

    pub fn clear(&mut self) { self.entries.clear() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// The ancestor level at which a directional query found a sibling.
struct Hit {
    /// Child of `group` on the path from the queried node.
    path_child: NodeId,
    sibling: NodeId,
}

impl LayoutState {
    /// Resolves a directional query from `node`.
    ///
    /// Without `shift` this returns the node focus should move to and changes
    /// nothing. With `shift` it moves `node` and returns it. `once` forbids
    /// breaking out at the workspace root; `visible_only` ignores siblings
    /// hidden behind tabs or an expanded node.
    pub fn shift_or_get_focus(
        &mut self,
        node: NodeId,
        direction: Direction,
        shift: bool,
        once: bool,
        visible_only: bool,
    ) -> Option<NodeId> {
        let workspace = self.store.workspace_of(node)?;
        if !shift {
            if let Some(target) = self.override_target(node, direction) {
                trace!(?node, ?direction, ?target, "focus override");
                return Some(target);
            }
        }

        let Some(hit) = self.find_sibling(node, direction, visible_only) else {
            if !shift || once {
                trace!(?node, ?direction, "nothing in that direction");
                return None;
            }
            let moved = self.break_out(node, direction);
            self.settle(workspace);
            return moved;
        };

        if !shift {
            return Some(self.store.focused_descendant(hit.sibling, false, false));
        }
        if hit.path_child == node {
            self.shift_past_sibling(node, hit.sibling, direction);
        } else {
            self.detach_and_collapse(node);
            self.insert_beside(node, hit.sibling, direction.opposite());
        }
        self.store.select(node);
        self.settle(workspace);
        debug!(?node, ?direction, "shifted node");
        Some(node)
    }

    fn override_target(&self, node: NodeId, direction: Direction) -> Option<NodeId> {
        let window = self.store.window(node)?;
        let target = self.overrides.target(window, direction)?;
        // A target that moved to another workspace is as stale as a dead key.
        let same_workspace = self.store.workspace_of(target) == self.store.workspace_of(node);
        (target != node && same_workspace).then_some(target)
    }

    fn find_sibling(&self, node: NodeId, direction: Direction, visible_only: bool) -> Option<Hit> {
        let axis = direction.orientation();
        let mut child = node;
        while let Some(parent) = self.store.parent(child) {
            let group = self.store.group(parent)?;
            let hidden = visible_only
                && (group.kind.is_tabbed()
                    || group
                        .children
                        .iter()
                        .any(|&c| self.store.get(c).is_some_and(|n| n.expand.is_expanded())));
            if group.nav_axis() == axis && !hidden {
                let index = group.position(child)?;
                let sibling = if direction.is_positive() {
                    group.children.get(index + 1)
                } else {
                    index.checked_sub(1).and_then(|i| group.children.get(i))
                };
                if let Some(&sibling) = sibling {
                    return Some(Hit { path_child: child, sibling });
                }
            }
            child = parent;
        }
        None
    }

    /// Moves a direct child of the matched group past `sibling`, entering it
    /// when it is a group.
    fn shift_past_sibling(&mut self, node: NodeId, sibling: NodeId, direction: Direction) {
        let Some(target) = self.store.group(sibling) else {
            let Some(parent) = self.store.parent(node) else { return };
            let (Some(from), Some(to)) =
                (self.store.index_in_parent(node), self.store.index_in_parent(sibling))
            else {
                return;
            };
            self.store.move_child(parent, from, to);
            return;
        };
        let index = if target.nav_axis() == direction.orientation() {
            if direction.is_positive() { 0 } else { target.children.len() }
        } else {
            target
                .focused_child
                .and_then(|c| target.position(c))
                .map_or(target.children.len(), |i| i + 1)
        };
        self.detach_and_collapse(node);
        self.store.attach(node, sibling, index, None);
    }

    /// Inserts detached `node` next to `anchor` on the `side` of it, wrapping
    /// the anchor in a new ephemeral group if its parent splits the other way.
    pub(crate) fn insert_beside(&mut self, node: NodeId, anchor: NodeId, side: Direction) {
        let Some(workspace) = self.store.workspace_of(anchor) else { return };
        let axis = side.orientation();
        let offset = usize::from(side.is_positive());
        match self.store.parent(anchor) {
            Some(parent) if self.store.group(parent).is_some_and(|g| g.nav_axis() == axis) => {
                let index = self.store.index_in_parent(anchor).unwrap_or(0);
                self.store.attach(node, parent, index + offset, None);
            }
            _ => {
                let group = self.store.new_group(
                    workspace,
                    axis,
                    LayoutKind::Split,
                    Ephemerality::Ephemeral,
                );
                self.store.replace(anchor, group);
                self.store.attach(anchor, group, 0, None);
                self.store.attach(node, group, offset, None);
            }
        }
    }

    /// Moves `node` to the edge of its workspace in `direction`, splitting the
    /// root along the direction's axis if it does not already.
    fn break_out(&mut self, node: NodeId, direction: Direction) -> Option<NodeId> {
        let workspace = self.store.workspace_of(node)?;
        let root = self.store.workspace_root(workspace)?;
        if root == node {
            return None;
        }
        let axis = direction.orientation();
        let root_matches = self.store.group(root).is_some_and(|g| g.nav_axis() == axis);
        if root_matches && self.store.parent(node) == Some(root) {
            return None;
        }

        self.detach_and_collapse(node);
        match self.store.workspace_root(workspace) {
            None => self.store.set_root(workspace, node),
            Some(root) => {
                let edge_group = self.store.group(root).filter(|g| g.nav_axis() == axis);
                match edge_group {
                    Some(group) => {
                        let index =
                            if direction.is_positive() { group.children.len() } else { 0 };
                        self.store.attach(node, root, index, None);
                    }
                    None => self.insert_beside(node, root, direction),
                }
            }
        }
        self.store.select(node);
        debug!(?node, ?direction, "broke out to workspace edge");
        Some(node)
    }

    /// Removes the recorded overrides of `window`.
    pub fn clear_focus_override(&mut self, window: WindowId) -> bool {
        self.overrides.remove(window).is_some()
    }
}
