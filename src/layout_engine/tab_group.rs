//! Tab strips of tabbed groups.
//!
//! Each tabbed group owns exactly one [`TabGroup`]. The strip mirrors the
//! group's child order and its active index follows the group's focused child,
//! so switching tabs is just moving that pointer.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use strum::EnumString;
use tracing::{debug, trace};

use super::state::LayoutState;
use crate::model::tree::NodeId;
use crate::sys::geometry::{Point, Rect};
use crate::sys::host::WorkspaceId;

slotmap::new_key_type! { pub struct TabGroupId; }

#[derive(Debug, Clone)]
pub struct TabGroup {
    pub group: NodeId,
    pub tabs: Vec<NodeId>,
    pub active: usize,
    /// Where the bar was last drawn, for pointer hit tests.
    pub bar: Rect,
}

impl TabGroup {
    fn sync(&mut self, children: &[NodeId], focused: Option<NodeId>) {
        self.tabs.clear();
        self.tabs.extend_from_slice(children);
        self.active = focused
            .and_then(|f| self.tabs.iter().position(|&t| t == f))
            .unwrap_or(0);
    }

    pub fn active_tab(&self) -> Option<NodeId> { self.tabs.get(self.active).copied() }

    /// Index of the tab under `point`, with the bar split evenly between tabs.
    pub fn tab_at(&self, point: Point) -> Option<usize> {
        if self.tabs.is_empty() || !self.bar.contains(point) {
            return None;
        }
        let width = self.bar.size.width / self.tabs.len() as f64;
        let index = ((point.x - self.bar.origin.x) / width).floor() as usize;
        Some(index.min(self.tabs.len() - 1))
    }

    fn step(&self, forward: bool, wrap: bool) -> usize {
        let last = self.tabs.len().saturating_sub(1);
        match (forward, self.active) {
            (true, i) if i >= last => {
                if wrap {
                    0
                } else {
                    last
                }
            }
            (true, i) => i + 1,
            (false, 0) => {
                if wrap {
                    last
                } else {
                    0
                }
            }
            (false, i) => i - 1,
        }
    }
}

#[derive(Default, Debug)]
pub struct TabGroupManager {
    groups: SlotMap<TabGroupId, TabGroup>,
}

impl TabGroupManager {
    pub fn create(&mut self, group: NodeId) -> TabGroupId {
        self.groups.insert(TabGroup {
            group,
            tabs: Vec::new(),
            active: 0,
            bar: Rect::ZERO,
        })
    }

    pub fn remove(&mut self, id: TabGroupId) -> Option<TabGroup> { self.groups.remove(id) }

    pub fn get(&self, id: TabGroupId) -> Option<&TabGroup> { self.groups.get(id) }

    pub fn get_mut(&mut self, id: TabGroupId) -> Option<&mut TabGroup> { self.groups.get_mut(id) }

    pub fn iter(&self) -> impl Iterator<Item = (TabGroupId, &TabGroup)> { self.groups.iter() }

    pub fn len(&self) -> usize { self.groups.len() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    pub fn clear(&mut self) { self.groups.clear() }
}

/// Which tab `focus_tab` should activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabFocus {
    MouseLocation,
    Left,
    Right,
    Index(usize),
}

/// How much the pointer position matters when choosing the tab group to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TabFocusMousePriority {
    #[default]
    Ignore,
    #[strum(serialize = "prioritize", serialize = "prioritize_hovered")]
    Prioritize,
    #[strum(serialize = "require", serialize = "require_hovered")]
    Require,
}

impl LayoutState {
    /// Creates, refreshes or drops the strip bound to `node` to match its layout.
    pub(crate) fn sync_tab_group(&mut self, node: NodeId) {
        let Some(group) = self.store.group(node) else { return };
        let tabbed = group.kind.is_tabbed();
        match (tabbed, group.tab_group) {
            (true, existing) => {
                let id = match existing.filter(|id| self.tabs.get(*id).is_some()) {
                    Some(id) => id,
                    None => {
                        let id = self.tabs.create(node);
                        trace!(?node, ?id, "created tab group");
                        if let Some(group) = self.store.group_mut(node) {
                            group.tab_group = Some(id);
                        }
                        id
                    }
                };
                let Some(group) = self.store.group(node) else { return };
                let (children, focused) = (group.children.clone(), group.focused_child);
                if let Some(tabs) = self.tabs.get_mut(id) {
                    tabs.sync(&children, focused);
                }
            }
            (false, Some(id)) => {
                self.tabs.remove(id);
                if let Some(group) = self.store.group_mut(node) {
                    group.tab_group = None;
                }
                trace!(?node, ?id, "dropped tab group");
            }
            (false, None) => {}
        }
    }

    /// Nearest tabbed group containing `node`, itself included.
    pub fn tab_group_of(&self, node: NodeId) -> Option<NodeId> {
        self.store
            .ancestors(node)
            .find(|&n| self.store.group(n).is_some_and(|g| g.kind.is_tabbed()))
    }

    fn hovered_tab_group(&self, workspace: WorkspaceId, cursor: Point) -> Option<NodeId> {
        self.tabs
            .iter()
            .filter(|(_, tabs)| self.store.workspace_of(tabs.group) == Some(workspace))
            .filter(|(_, tabs)| tabs.tab_at(cursor).is_some())
            // Nested strips: the innermost one is drawn on top.
            .max_by_key(|(_, tabs)| self.store.ancestors(tabs.group).count())
            .map(|(_, tabs)| tabs.group)
    }

    /// Activates a tab and moves focus into it. Returns the newly focused node.
    pub fn focus_tab(
        &mut self,
        workspace: WorkspaceId,
        target: TabFocus,
        priority: TabFocusMousePriority,
        wrap_scroll: bool,
        cursor: Point,
    ) -> Option<NodeId> {
        let keyboard = self
            .store
            .workspace_focused_node(workspace, false, false)
            .and_then(|n| self.tab_group_of(n));
        let hovered = self.hovered_tab_group(workspace, cursor);
        let (group, from_pointer) = match (target, priority) {
            (TabFocus::Index(_), _) | (_, TabFocusMousePriority::Ignore) => (keyboard?, false),
            (_, TabFocusMousePriority::Prioritize) => match hovered {
                Some(group) => (group, true),
                None => (keyboard?, false),
            },
            (_, TabFocusMousePriority::Require) => (hovered?, true),
        };
        let tabs = self.tabs.get(self.store.group(group)?.tab_group?)?;

        let index = match target {
            TabFocus::Index(index) if index >= tabs.tabs.len() => {
                debug!(index, len = tabs.tabs.len(), "tab index out of range");
                return None;
            }
            TabFocus::Index(index) => index,
            TabFocus::Left => tabs.step(false, wrap_scroll),
            TabFocus::Right => tabs.step(true, wrap_scroll),
            TabFocus::MouseLocation if from_pointer => tabs.tab_at(cursor)?,
            TabFocus::MouseLocation => tabs.active,
        };
        let tab = *tabs.tabs.get(index)?;
        let focus = self.store.focused_descendant(tab, false, false);
        self.store.select(focus);
        self.settle(workspace);
        debug!(?group, index, ?focus, "focused tab");
        Some(focus)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn strip(n: usize, active: usize) -> TabGroup {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        TabGroup {
            group: nodes.insert(()),
            tabs: (0..n).map(|_| nodes.insert(())).collect(),
            active,
            bar: Rect::new(0.0, 0.0, 400.0, 20.0),
        }
    }

    #[test]
    fn stepping_wraps_only_when_asked() {
        let tabs = strip(3, 2);
        assert_eq!(tabs.step(true, true), 0);
        assert_eq!(tabs.step(true, false), 2);
        let tabs = strip(3, 0);
        assert_eq!(tabs.step(false, true), 2);
        assert_eq!(tabs.step(false, false), 0);
        assert_eq!(tabs.step(true, false), 1);
    }

    #[test]
    fn pointer_hit_test_splits_bar_evenly() {
        let tabs = strip(4, 0);
        assert_eq!(tabs.tab_at(Point::new(10.0, 5.0)), Some(0));
        assert_eq!(tabs.tab_at(Point::new(250.0, 5.0)), Some(2));
        assert_eq!(tabs.tab_at(Point::new(399.0, 19.0)), Some(3));
        assert_eq!(tabs.tab_at(Point::new(250.0, 25.0)), None);
    }

    #[test]
    fn priority_names_parse() {
        use std::str::FromStr;
        assert_eq!(
            TabFocusMousePriority::from_str("require_hovered"),
            Ok(TabFocusMousePriority::Require)
        );
        assert_eq!(
            TabFocusMousePriority::from_str("prioritize"),
            Ok(TabFocusMousePriority::Prioritize)
        );
    }
}
