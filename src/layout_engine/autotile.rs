use std::ops::RangeInclusive;

use tracing::{debug, warn};

use super::state::LayoutState;
use super::{Ephemerality, LayoutKind, Orientation};
use crate::common::config::AutotileSettings;
use crate::model::tree::NodeId;
use crate::sys::host::{WindowId, WorkspaceId};

/// Workspace filter parsed from `all`, `not:<list>` or `<list>`, where a list
/// holds comma separated ids and inclusive `a-b` ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkspacePattern {
    exclude: bool,
    /// `None` means every workspace.
    ranges: Option<Vec<RangeInclusive<i32>>>,
}

impl WorkspacePattern {
    pub fn all() -> Self { Self::default() }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") || raw.is_empty() {
            return Self::all();
        }
        let (exclude, list) = match raw.strip_prefix("not:") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let ranges = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let range = Self::parse_entry(entry);
                if range.is_none() {
                    warn!(entry, "ignoring malformed autotile workspace entry");
                }
                range
            })
            .collect();
        Self { exclude, ranges: Some(ranges) }
    }

    fn parse_entry(entry: &str) -> Option<RangeInclusive<i32>> {
        // A leading '-' is a negative id, not a range separator.
        match entry.char_indices().skip(1).find(|&(_, c)| c == '-').map(|(i, _)| i) {
            Some(split) => {
                let start = entry[..split].trim().parse().ok()?;
                let end = entry[split + 1..].trim().parse().ok()?;
                Some(start..=end)
            }
            None => {
                let id = entry.parse().ok()?;
                Some(id..=id)
            }
        }
    }

    pub fn matches(&self, workspace: WorkspaceId) -> bool {
        let listed = match &self.ranges {
            None => return !self.exclude,
            Some(ranges) => ranges.iter().any(|r| r.contains(&workspace.0)),
        };
        listed != self.exclude
    }
}

#[derive(Debug, Clone, Default)]
pub struct Autotile {
    pub enabled: bool,
    pub ephemeral_groups: bool,
    pub pattern: WorkspacePattern,
}

impl Autotile {
    pub fn from_settings(settings: &AutotileSettings) -> Self {
        Self {
            enabled: settings.enable,
            ephemeral_groups: settings.ephemeral_groups,
            pattern: WorkspacePattern::parse(&settings.workspaces),
        }
    }

    pub fn applies_to(&self, workspace: WorkspaceId) -> bool {
        self.enabled && self.pattern.matches(workspace)
    }
}

impl LayoutState {
    /// Adds a tiled window to `workspace` and returns its node.
    ///
    /// On an autotiled workspace without a root group, the current occupant
    /// and the new window are wrapped together in a group first. Every other
    /// case is an ordinary insertion next to the focused node.
    pub fn insert_tiled_window(&mut self, workspace: WorkspaceId, window: WindowId) -> NodeId {
        if let Some(existing) = self.store.lookup_by_window(window) {
            debug!(%window, "window is already tiled");
            return existing;
        }
        let node = self.store.new_leaf(workspace, window);
        let root = self.store.workspace_root(workspace);
        let has_root_group = root.and_then(|r| self.store.get(r)).is_some_and(|r| r.is_group());
        if !self.autotile.applies_to(workspace) || has_root_group {
            self.insert_node(workspace, node);
            return node;
        }

        // A group that starts out holding a single window cannot be ephemeral.
        let ephemerality = if self.autotile.ephemeral_groups && root.is_some() {
            Ephemerality::Ephemeral
        } else {
            Ephemerality::Standard
        };
        let group =
            self.store.new_group(workspace, Orientation::Horizontal, LayoutKind::Split, ephemerality);
        match root {
            Some(leaf) => {
                self.store.replace(leaf, group);
                self.store.attach(leaf, group, 0, None);
            }
            None => self.store.set_root(workspace, group),
        }
        let index = self.store.children(group).len();
        self.store.attach(node, group, index, None);
        self.store.select(node);
        self.settle(workspace);
        debug!(%window, %workspace, ?group, "autotiled");
        node
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::common::config::Settings;

    fn ws(id: i32) -> WorkspaceId { WorkspaceId(id) }

    #[test]
    fn pattern_grammar() {
        let all = WorkspacePattern::parse("all");
        assert!(all.matches(ws(1)) && all.matches(ws(-99)));

        let list = WorkspacePattern::parse("1, 3,5-7");
        assert!(list.matches(ws(1)));
        assert!(!list.matches(ws(2)));
        assert!(list.matches(ws(6)));
        assert!(!list.matches(ws(8)));

        let not = WorkspacePattern::parse("not:2,4-5");
        assert!(not.matches(ws(1)));
        assert!(!not.matches(ws(2)));
        assert!(!not.matches(ws(5)));
        assert!(not.matches(ws(6)));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let pattern = WorkspacePattern::parse("x,3,-2,4-");
        assert!(pattern.matches(ws(3)));
        assert!(pattern.matches(ws(-2)));
        assert!(!pattern.matches(ws(4)));
    }

    fn autotile_state(workspaces: &str) -> LayoutState {
        let mut settings = Settings::default();
        settings.autotile.enable = true;
        settings.autotile.workspaces = workspaces.to_string();
        LayoutState::new(&settings)
    }

    #[test]
    fn first_window_on_autotiled_workspace_is_grouped() {
        let mut state = autotile_state("all");
        let a = state.insert_tiled_window(ws(1), WindowId(1));
        let root = state.store.workspace_root(ws(1)).unwrap();
        assert_ne!(root, a);
        assert_eq!(state.store.children(root), &[a]);
        assert_eq!(state.store.group(root).unwrap().ephemerality, Ephemerality::Standard);

        let b = state.insert_tiled_window(ws(1), WindowId(2));
        assert_eq!(state.store.children(root), &[a, b]);
    }

    #[test]
    fn lone_leaf_is_wrapped_with_the_newcomer() {
        let mut state = autotile_state("all");
        state.autotile.enabled = false;
        let a = state.insert_tiled_window(ws(1), WindowId(1));
        state.autotile.enabled = true;
        let b = state.insert_tiled_window(ws(1), WindowId(2));
        let root = state.store.workspace_root(ws(1)).unwrap();
        assert_eq!(state.store.children(root), &[a, b]);
        assert_eq!(state.store.group(root).unwrap().ephemerality, Ephemerality::Ephemeral);
    }

    #[test]
    fn excluded_workspace_gets_plain_root_leaf() {
        let mut state = autotile_state("not:2");
        let a = state.insert_tiled_window(ws(2), WindowId(1));
        assert_eq!(state.store.workspace_root(ws(2)), Some(a));
    }
}
