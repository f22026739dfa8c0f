//! An in-memory host with no compositor behind it.
//!
//! Used by the `grove` binary to replay scripts and by tests as the stand-in
//! for a real compositor.

use super::geometry::{Point, Rect};
use super::host::{HostAdapter, MonitorId, WindowId, WorkspaceId};
use crate::common::collections::{BTreeMap, BTreeSet, HashMap};
use crate::layout_engine::{Direction, EventResponse};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessMonitor {
    pub frame: Rect,
    pub workspace: WorkspaceId,
}

#[derive(Debug, Default, Clone)]
pub struct HeadlessHost {
    monitors: BTreeMap<MonitorId, HeadlessMonitor>,
    workspaces: BTreeSet<WorkspaceId>,
    windows: HashMap<WindowId, WorkspaceId>,
    fullscreen: BTreeSet<WorkspaceId>,
    focused: Option<WindowId>,
    cursor: Point,
}

impl HeadlessHost {
    pub fn new() -> Self { Self::default() }

    /// Single monitor of the given size showing `workspace`.
    pub fn with_monitor(frame: Rect, workspace: WorkspaceId) -> Self {
        let mut host = Self::new();
        host.add_monitor(MonitorId(0), frame, workspace);
        host
    }

    pub fn add_monitor(&mut self, id: MonitorId, frame: Rect, workspace: WorkspaceId) {
        self.workspaces.insert(workspace);
        self.monitors.insert(id, HeadlessMonitor { frame, workspace });
    }

    pub fn show_workspace(&mut self, monitor: MonitorId, workspace: WorkspaceId) {
        self.workspaces.insert(workspace);
        if let Some(m) = self.monitors.get_mut(&monitor) {
            m.workspace = workspace;
        }
    }

    pub fn create_workspace(&mut self, workspace: WorkspaceId) { self.workspaces.insert(workspace); }

    pub fn open_window(&mut self, window: WindowId, workspace: WorkspaceId) {
        self.workspaces.insert(workspace);
        self.windows.insert(window, workspace);
        self.focused = Some(window);
    }

    pub fn close_window(&mut self, window: WindowId) {
        self.windows.remove(&window);
        if self.focused == Some(window) {
            self.focused = None;
        }
    }

    pub fn focus(&mut self, window: Option<WindowId>) { self.focused = window; }

    pub fn set_cursor(&mut self, cursor: Point) { self.cursor = cursor; }

    pub fn set_fullscreen(&mut self, workspace: WorkspaceId, fullscreen: bool) {
        if fullscreen {
            self.fullscreen.insert(workspace);
        } else {
            self.fullscreen.remove(&workspace);
        }
    }

    pub fn monitors(&self) -> impl Iterator<Item = (MonitorId, HeadlessMonitor)> + '_ {
        self.monitors.iter().map(|(&id, &m)| (id, m))
    }

    pub fn windows(&self) -> impl Iterator<Item = (WindowId, WorkspaceId)> + '_ {
        self.windows.iter().map(|(&w, &ws)| (w, ws))
    }

    /// Carries out what the layout asked for, the way a compositor would.
    /// Returns the windows it was asked to close.
    pub fn apply(&mut self, response: &EventResponse) -> Vec<WindowId> {
        for &(window, workspace) in &response.move_windows {
            self.windows.insert(window, workspace);
        }
        if let Some(window) = response.focus_window {
            self.focused = Some(window);
        }
        response.close_windows.clone()
    }
}

impl HostAdapter for HeadlessHost {
    fn focused_window(&self) -> Option<WindowId> { self.focused }

    fn workspace_of_window(&self, window: WindowId) -> Option<WorkspaceId> {
        self.windows.get(&window).copied()
    }

    fn workspace_exists(&self, workspace: WorkspaceId) -> bool {
        self.workspaces.contains(&workspace)
    }

    fn monitor_of_workspace(&self, workspace: WorkspaceId) -> Option<MonitorId> {
        self.monitors.iter().find(|(_, m)| m.workspace == workspace).map(|(id, _)| *id)
    }

    fn monitor_workspace(&self, monitor: MonitorId) -> Option<WorkspaceId> {
        self.monitors.get(&monitor).map(|m| m.workspace)
    }

    fn monitor_frame(&self, monitor: MonitorId) -> Option<Rect> {
        self.monitors.get(&monitor).map(|m| m.frame)
    }

    fn monitor_in_direction(&self, from: MonitorId, direction: Direction) -> Option<MonitorId> {
        let origin = self.monitors.get(&from)?.frame.center();
        let axis = direction.orientation();
        let cross = axis.opposite();
        self.monitors
            .iter()
            .filter(|(id, _)| **id != from)
            .map(|(id, m)| (*id, m.frame.center()))
            .filter(|(_, c)| {
                let d = c.along(axis) - origin.along(axis);
                if direction.is_positive() { d > 0.0 } else { d < 0.0 }
            })
            .min_by(|(_, a), (_, b)| {
                let key = |p: &Point| {
                    (
                        (p.along(axis) - origin.along(axis)).abs(),
                        (p.along(cross) - origin.along(cross)).abs(),
                    )
                };
                key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(id, _)| id)
    }

    fn workspace_has_fullscreen(&self, workspace: WorkspaceId) -> bool {
        self.fullscreen.contains(&workspace)
    }

    fn cursor_position(&self) -> Point { self.cursor }
}
