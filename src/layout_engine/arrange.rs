use serde::Serialize;
use tracing::trace;

use super::state::LayoutState;
use super::{ExpandState, LayoutKind, Orientation};
use crate::common::collections::{HashMap, HashSet};
use crate::model::tree::{NodeData, NodeId};
use crate::sys::geometry::{Rect, Round};
use crate::sys::host::{WindowId, WorkspaceId};

/// How the host should draw one tiled window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderHint {
    pub window: WindowId,
    pub frame: Rect,
    /// False for background tabs and windows covered by an expanded node.
    pub visible: bool,
    /// Part of the focused node, drawn with the active border.
    pub selected: bool,
    pub fullscreen: bool,
}

#[derive(Clone, Copy)]
struct Gaps {
    horizontal: f64,
    vertical: f64,
}

impl Gaps {
    fn along(&self, axis: Orientation) -> f64 {
        match axis {
            Orientation::Horizontal => self.horizontal,
            Orientation::Vertical => self.vertical,
        }
    }
}

impl LayoutState {
    /// Lays out the tiled tree of `workspace` inside `monitor` and returns a
    /// hint for every tiled window on it.
    pub fn recalculate_workspace(&mut self, workspace: WorkspaceId, monitor: Rect) -> Vec<RenderHint> {
        let Some(root) = self.store.workspace_root(workspace) else { return Vec::new() };
        let tiled = self.store.windows_under(root).len();
        let settings = &self.settings;
        let (area, gaps) = if settings.no_gaps_when_only && tiled == 1 {
            (monitor, Gaps { horizontal: 0.0, vertical: 0.0 })
        } else {
            let outer = &settings.gaps.outer;
            (
                monitor.inset(outer.top, outer.left, outer.bottom, outer.right),
                Gaps {
                    horizontal: settings.gaps.inner.horizontal,
                    vertical: settings.gaps.inner.vertical,
                },
            )
        };

        let mut frames = Vec::new();
        self.layout_node(root, area.round(), gaps, true, &mut frames);
        let mut hints: HashMap<WindowId, RenderHint> = frames
            .iter()
            .map(|&(window, frame, visible)| {
                (window, RenderHint { window, frame, visible, selected: false, fullscreen: false })
            })
            .collect();

        self.apply_expansions(root, area, monitor, gaps, &mut hints);

        if let Some(focused) = self.store.workspace_focused_node(workspace, false, false) {
            if !self.floating_active(workspace) {
                for window in self.store.windows_under(focused) {
                    if let Some(hint) = hints.get_mut(&window) {
                        hint.selected = true;
                    }
                }
            }
        }

        // Keep tree order for the host.
        let order = self.store.windows_under(root);
        let out: Vec<_> = order.into_iter().filter_map(|w| hints.remove(&w)).collect();
        trace!(%workspace, windows = out.len(), "recalculated workspace");
        out
    }

    fn layout_node(
        &mut self,
        node: NodeId,
        rect: Rect,
        gaps: Gaps,
        visible: bool,
        out: &mut Vec<(WindowId, Rect, bool)>,
    ) {
        let Some(n) = self.store.get_mut(node) else { return };
        n.geometry = rect;
        let group = match &n.data {
            NodeData::Window(window) => {
                out.push((*window, rect, visible));
                return;
            }
            NodeData::Group(group) => group,
        };
        let (kind, axis, active, tab_group) =
            (group.kind, group.axis, group.focused_child, group.tab_group);
        let children = group.children.clone();
        if children.is_empty() {
            return;
        }
        match kind {
            LayoutKind::Split => {
                let gap = gaps.along(axis);
                let total_gap = (children.len() - 1) as f64 * gap;
                let usable = (rect.extent(axis) - total_gap).max(0.0);
                let mut offset = 0.0;
                for child in children {
                    let ratio = self.store.get(child).map_or(0.0, |c| c.ratio);
                    let len = usable * ratio;
                    let child_rect = rect.slice(axis, offset, len).round();
                    self.layout_node(child, child_rect, gaps, visible, out);
                    offset += len + gap;
                }
            }
            LayoutKind::Tabbed => {
                let tabs = &self.settings.tabs;
                let reserved = tabs.height + tabs.padding;
                let (bar, content) = if tabs.from_top {
                    (
                        Rect::new(rect.origin.x, rect.origin.y, rect.size.width, tabs.height),
                        rect.inset(reserved, 0.0, 0.0, 0.0),
                    )
                } else {
                    (
                        Rect::new(
                            rect.origin.x,
                            rect.max().y - tabs.height,
                            rect.size.width,
                            tabs.height,
                        ),
                        rect.inset(0.0, 0.0, reserved, 0.0),
                    )
                };
                if let Some(entry) = tab_group.and_then(|id| self.tabs.get_mut(id)) {
                    entry.bar = bar.round();
                }
                let content = content.round();
                for child in children {
                    let shown = visible && (active == Some(child) || active.is_none());
                    self.layout_node(child, content, gaps, shown, out);
                }
            }
        }
    }

    /// Redraws expanded nodes over the area they cover and hides what they
    /// cover.
    fn apply_expansions(
        &mut self,
        root: NodeId,
        area: Rect,
        monitor: Rect,
        gaps: Gaps,
        hints: &mut HashMap<WindowId, RenderHint>,
    ) {
        for node in self.store.descendants(root) {
            let Some(state) = self.store.get(node).map(|n| n.expand) else { continue };
            let (cover, target) = match state {
                ExpandState::None => continue,
                ExpandState::Expanded(depth) => {
                    let ancestor = self
                        .store
                        .ancestors(node)
                        .nth(depth as usize)
                        .unwrap_or(root);
                    let rect = self.store.get(ancestor).map_or(area, |a| a.geometry);
                    (ancestor, rect)
                }
                ExpandState::Maximized => (root, area),
                ExpandState::Fullscreen => (root, monitor),
            };
            let own: HashSet<WindowId> = self.store.windows_under(node).into_iter().collect();
            for window in self.store.windows_under(cover) {
                if !own.contains(&window) {
                    if let Some(hint) = hints.get_mut(&window) {
                        hint.visible = false;
                    }
                }
            }
            let mut frames = Vec::new();
            self.layout_node(node, target.round(), gaps, true, &mut frames);
            for (window, frame, visible) in frames {
                if let Some(hint) = hints.get_mut(&window) {
                    hint.frame = frame;
                    hint.visible = visible;
                    hint.fullscreen = state == ExpandState::Fullscreen;
                }
            }
        }
    }
}
