//! Focus movement that is not directional, node expansion, the floating layer
//! and moving windows between workspaces.

use serde::{Deserialize, Serialize};
use strum::EnumString;
use tracing::{debug, trace};

use super::{ExpandState, Layer};
use super::state::LayoutState;
use crate::model::tree::NodeId;
use crate::sys::host::{WindowId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum FocusShift {
    /// The workspace root.
    Top,
    /// The leaf the focus walk ends at.
    Bottom,
    /// The parent of the focused node.
    Raise,
    /// The remembered child of a focused group.
    Lower,
    /// The nearest tabbed group around the focused node.
    Tab,
    /// The tab of that group holding the focused node.
    TabNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ExpandOption {
    Expand,
    Shrink,
    Base,
    Maximize,
    Fullscreen,
}

/// What expanding does once a node already covers its whole workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExpandFullscreenOption {
    /// Stop at maximized.
    #[strum(serialize = "maximize_only")]
    MaximizeOnly,
    /// Maximize first, fullscreen on the next expand.
    #[default]
    #[strum(serialize = "maximize_intermediate", serialize = "intermediate_maximize")]
    MaximizeIntermediate,
    /// Skip maximized and go straight to fullscreen.
    #[strum(serialize = "maximize_as_fullscreen", serialize = "fullscreen_expand")]
    MaximizeAsFullscreen,
}

impl LayoutState {
    /// Moves focus up or down the tree without changing its shape.
    pub fn change_focus(&mut self, workspace: WorkspaceId, shift: FocusShift) -> Option<NodeId> {
        let root = self.store.workspace_root(workspace)?;
        let focused = self.store.workspace_focused_node(workspace, false, false)?;
        let target = match shift {
            FocusShift::Top => root,
            FocusShift::Bottom => self.focus_leaf(focused),
            FocusShift::Raise => self.store.parent(focused)?,
            FocusShift::Lower => {
                let group = self.store.group(focused)?;
                group.focused_child.or_else(|| group.children.first().copied())?
            }
            FocusShift::Tab => self.tab_group_of(self.store.parent(focused)?)?,
            FocusShift::TabNode => {
                let tabbed = self.tab_group_of(self.store.parent(focused)?)?;
                self.store.ancestors(focused).find(|&n| self.store.parent(n) == Some(tabbed))?
            }
        };
        self.store.select(target);
        self.settle(workspace);
        trace!(?shift, ?target, "changed focus");
        Some(target)
    }

    /// Changes how far the focused node is drawn past its own slot.
    pub fn expand(
        &mut self,
        workspace: WorkspaceId,
        option: ExpandOption,
        fullscreen: ExpandFullscreenOption,
    ) -> Option<NodeId> {
        let node = self.store.workspace_focused_node(workspace, false, true)?;
        let current = self.store.get(node)?.expand;
        let depth = self.store.ancestors(node).count() as u32 - 1;
        let next = match option {
            ExpandOption::Expand => match current {
                ExpandState::None if depth > 0 => ExpandState::Expanded(1),
                ExpandState::Expanded(level) if level < depth => ExpandState::Expanded(level + 1),
                ExpandState::Maximized if fullscreen == ExpandFullscreenOption::MaximizeIntermediate => {
                    ExpandState::Fullscreen
                }
                ExpandState::Maximized | ExpandState::Fullscreen => current,
                _ if fullscreen == ExpandFullscreenOption::MaximizeAsFullscreen => {
                    ExpandState::Fullscreen
                }
                _ => ExpandState::Maximized,
            },
            ExpandOption::Shrink => match current {
                ExpandState::Expanded(level) if level > 1 => ExpandState::Expanded(level - 1),
                ExpandState::Fullscreen if fullscreen != ExpandFullscreenOption::MaximizeAsFullscreen => {
                    ExpandState::Maximized
                }
                _ => ExpandState::None,
            },
            ExpandOption::Base => ExpandState::None,
            ExpandOption::Maximize if current == ExpandState::Maximized => ExpandState::None,
            ExpandOption::Maximize => ExpandState::Maximized,
            ExpandOption::Fullscreen if current == ExpandState::Fullscreen => ExpandState::None,
            ExpandOption::Fullscreen => ExpandState::Fullscreen,
        };
        self.store.get_mut(node)?.expand = next;
        debug!(?node, ?current, ?next, "expand");
        Some(node)
    }

    /// Fullscreen or maximize request for a single window, as issued by the
    /// window itself rather than the user.
    pub fn set_window_expand(&mut self, window: WindowId, state: ExpandState) -> Option<NodeId> {
        let node = self.store.lookup_by_window(window)?;
        self.store.get_mut(node)?.expand = state;
        Some(node)
    }

    pub fn add_floating_window(&mut self, workspace: WorkspaceId, window: WindowId) {
        let layer = self.floating.entry(workspace).or_default();
        layer.touch(window);
        layer.active = true;
    }

    /// Records that the host focused `window`. Returns its workspace.
    pub fn window_focused(&mut self, window: WindowId) -> Option<WorkspaceId> {
        if let Some(node) = self.store.lookup_by_window(window) {
            let workspace = self.store.workspace_of(node)?;
            self.store.select(node);
            self.settle(workspace);
            if let Some(layer) = self.floating.get_mut(&workspace) {
                layer.active = false;
            }
            return Some(workspace);
        }
        let (&workspace, layer) =
            self.floating.iter_mut().find(|(_, l)| l.windows.contains(&window))?;
        layer.touch(window);
        layer.active = true;
        Some(workspace)
    }

    /// Swaps keyboard focus between the tiled tree and the floating windows.
    /// Returns the window that should now hold focus.
    pub fn toggle_focus_layer(&mut self, workspace: WorkspaceId) -> Option<WindowId> {
        if self.floating_active(workspace) {
            let layer = self.floating.get_mut(&workspace)?;
            layer.active = false;
            let focused = self.store.workspace_focused_node(workspace, false, false)?;
            return self.store.window(self.focus_leaf(focused));
        }
        let layer = self.floating.get_mut(&workspace)?;
        let window = layer.last()?;
        layer.active = true;
        Some(window)
    }

    /// Windows the host should close for `killactive`. The tree itself only
    /// changes once the host reports them gone.
    pub fn kill_focused_node(&self, workspace: WorkspaceId) -> Vec<WindowId> {
        if self.floating_active(workspace) {
            return self.focused_window(workspace).into_iter().collect();
        }
        self.store
            .workspace_focused_node(workspace, false, false)
            .map(|node| self.store.windows_under(node))
            .unwrap_or_default()
    }

    /// Moves the focused node of `origin` next to the focused node of `target`.
    /// Returns the node focus should end up on.
    pub fn move_node_to_workspace(
        &mut self,
        origin: WorkspaceId,
        target: WorkspaceId,
        follow: bool,
    ) -> Option<NodeId> {
        if origin == target {
            return None;
        }
        let node = self.store.workspace_focused_node(origin, false, true)?;
        self.detach_and_collapse(node);
        self.settle(origin);
        if let Some(n) = self.store.get_mut(node) {
            n.expand = ExpandState::None;
        }
        self.insert_node(target, node);
        debug!(?node, %origin, %target, follow, "moved node to workspace");
        if follow {
            Some(node)
        } else {
            self.store.workspace_focused_node(origin, false, false)
        }
    }

    /// Exchanges the positions of two tiled windows.
    pub fn switch_windows(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(na), Some(nb)) = (self.store.lookup_by_window(a), self.store.lookup_by_window(b))
        else {
            return false;
        };
        if na == nb {
            return false;
        }
        self.store.rebind_window(na, b);
        self.store.rebind_window(nb, a);
        true
    }

    /// Puts `to` in the slot `from` occupied.
    pub fn replace_window(&mut self, from: WindowId, to: WindowId) -> bool {
        let Some(node) = self.store.lookup_by_window(from) else { return false };
        if self.store.lookup_by_window(to).is_some() {
            return false;
        }
        self.store.rebind_window(node, to);
        self.overrides.rename(from, to);
        true
    }

    /// Makes every tab on the way to `window` the active one without moving
    /// focus anywhere else.
    pub fn bring_window_to_top(&mut self, window: WindowId) -> bool {
        let Some(node) = self.store.lookup_by_window(window) else { return false };
        let path: Vec<_> = self.store.ancestors(node).collect();
        let mut changed = false;
        for pair in path.windows(2) {
            let Some(group) = self.store.group_mut(pair[1]) else { continue };
            if group.kind.is_tabbed() && group.focused_child != Some(pair[0]) {
                group.focused_child = Some(pair[0]);
                changed = true;
            }
        }
        if changed {
            if let Some(workspace) = self.store.workspace_of(node) {
                self.settle(workspace);
            }
        }
        changed
    }

    /// Whether `window` is tiled and not hidden behind another tab.
    pub fn window_reachable(&self, window: WindowId) -> bool {
        let Some(node) = self.store.lookup_by_window(window) else { return false };
        let path: Vec<_> = self.store.ancestors(node).collect();
        path.windows(2).all(|pair| {
            self.store
                .group(pair[1])
                .is_some_and(|g| !g.kind.is_tabbed() || g.focused_child == Some(pair[0]))
        })
    }

    pub fn is_window_tiled(&self, window: WindowId) -> bool {
        self.window_layer(window).is_some_and(|l| l.contains(Layer::TILED))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::common::config::Settings;
    use crate::layout_engine::{Ephemerality, LayoutKind, Orientation};

    const WS: WorkspaceId = WorkspaceId(1);

    fn state_with(windows: &[u64]) -> (LayoutState, Vec<NodeId>) {
        let mut state = LayoutState::new(&Settings::default());
        let nodes = windows.iter().map(|&w| state.insert_tiled_window(WS, WindowId(w))).collect();
        (state, nodes)
    }

    #[test]
    fn raise_lower_top_bottom() {
        let (mut state, n) = state_with(&[1, 2]);
        let root = state.store.workspace_root(WS).unwrap();
        assert_eq!(state.change_focus(WS, FocusShift::Raise), Some(root));
        assert_eq!(state.store.workspace_focused_node(WS, false, false), Some(root));
        assert_eq!(state.change_focus(WS, FocusShift::Raise), None);
        assert_eq!(state.change_focus(WS, FocusShift::Lower), Some(n[1]));
        assert_eq!(state.change_focus(WS, FocusShift::Top), Some(root));
        assert_eq!(state.change_focus(WS, FocusShift::Bottom), Some(n[1]));
    }

    #[test]
    fn tab_and_tab_node() {
        let (mut state, n) = state_with(&[1, 2]);
        let group = state.make_group_on(n[1], Orientation::Vertical, LayoutKind::Split, Ephemerality::Standard);
        let root = state.store.workspace_root(WS).unwrap();
        state.tab_group_on(root);
        state.store.select(n[1]);
        assert_eq!(state.change_focus(WS, FocusShift::TabNode), Some(group));
        state.store.select(n[1]);
        assert_eq!(state.change_focus(WS, FocusShift::Tab), Some(root));
        assert_eq!(state.change_focus(WS, FocusShift::Tab), None);
    }

    #[test]
    fn expand_walks_up_then_maximizes_then_fullscreens() {
        let (mut state, n) = state_with(&[1, 2]);
        let opt = ExpandFullscreenOption::MaximizeIntermediate;
        state.expand(WS, ExpandOption::Expand, opt);
        assert_eq!(state.store.get(n[1]).unwrap().expand, ExpandState::Expanded(1));
        state.expand(WS, ExpandOption::Expand, opt);
        assert_eq!(state.store.get(n[1]).unwrap().expand, ExpandState::Maximized);
        state.expand(WS, ExpandOption::Expand, opt);
        assert_eq!(state.store.get(n[1]).unwrap().expand, ExpandState::Fullscreen);
        state.expand(WS, ExpandOption::Shrink, opt);
        assert_eq!(state.store.get(n[1]).unwrap().expand, ExpandState::Maximized);
        state.expand(WS, ExpandOption::Base, opt);
        assert_eq!(state.store.get(n[1]).unwrap().expand, ExpandState::None);
    }

    #[test]
    fn maximize_as_fullscreen_skips_maximized() {
        let (mut state, n) = state_with(&[1]);
        state.expand(WS, ExpandOption::Expand, ExpandFullscreenOption::MaximizeAsFullscreen);
        assert_eq!(state.store.get(n[0]).unwrap().expand, ExpandState::Fullscreen);
        state.expand(WS, ExpandOption::Fullscreen, ExpandFullscreenOption::MaximizeOnly);
        assert_eq!(state.store.get(n[0]).unwrap().expand, ExpandState::None);
    }

    #[test]
    fn focus_layer_toggles_between_tiled_and_floating() {
        let (mut state, _) = state_with(&[1, 2]);
        assert_eq!(state.toggle_focus_layer(WS), None);
        state.add_floating_window(WS, WindowId(9));
        assert_eq!(state.focused_window(WS), Some(WindowId(9)));
        assert_eq!(state.toggle_focus_layer(WS), Some(WindowId(2)));
        assert_eq!(state.focused_window(WS), Some(WindowId(2)));
        assert_eq!(state.toggle_focus_layer(WS), Some(WindowId(9)));
        assert_eq!(state.kill_focused_node(WS), vec![WindowId(9)]);
    }

    #[test]
    fn kill_targets_every_window_of_a_focused_group() {
        let (mut state, _) = state_with(&[1, 2, 3]);
        state.change_focus(WS, FocusShift::Top);
        assert_eq!(state.kill_focused_node(WS), vec![WindowId(1), WindowId(2), WindowId(3)]);
    }

    #[test]
    fn moving_to_another_workspace() {
        let (mut state, n) = state_with(&[1, 2]);
        let other = WorkspaceId(2);
        assert_eq!(state.move_node_to_workspace(WS, other, false), Some(n[0]));
        assert_eq!(state.store.workspace_root(other), Some(n[1]));
        assert_eq!(state.store.workspace_root(WS), Some(n[0]));
        assert_eq!(state.store.workspace_of(n[1]), Some(other));
        assert_eq!(state.move_node_to_workspace(WS, other, true), Some(n[0]));
        assert_eq!(state.store.workspace_root(WS), None);
        assert_eq!(state.focused_window(other), Some(WindowId(1)));
    }

    #[test]
    fn switch_and_replace_rebind_leaves() {
        let (mut state, n) = state_with(&[1, 2]);
        assert!(state.switch_windows(WindowId(1), WindowId(2)));
        assert_eq!(state.store.window(n[0]), Some(WindowId(2)));
        assert_eq!(state.store.lookup_by_window(WindowId(1)), Some(n[1]));
        assert!(state.replace_window(WindowId(1), WindowId(7)));
        assert_eq!(state.store.lookup_by_window(WindowId(7)), Some(n[1]));
        assert!(!state.is_window_tiled(WindowId(1)));
    }

    #[test]
    fn bring_to_top_activates_tabs_only() {
        let (mut state, n) = state_with(&[1, 2, 3]);
        let root = state.store.workspace_root(WS).unwrap();
        state.tab_group_on(root);
        assert!(!state.window_reachable(WindowId(1)));
        assert!(state.bring_window_to_top(WindowId(1)));
        assert!(state.window_reachable(WindowId(1)));
        assert_eq!(state.tabs.get(state.store.group(root).unwrap().tab_group.unwrap()).unwrap().active, 0);
        assert_eq!(state.store.group(root).unwrap().focused_child, Some(n[0]));
    }
}
