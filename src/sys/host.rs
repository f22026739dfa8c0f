//! The boundary between the layout core and the compositor hosting it.
//!
//! The host owns windows, workspaces and monitors. The core only refers to
//! them by id and asks the host about them through [`HostAdapter`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};
use crate::layout_engine::Direction;

/// Opaque handle of a host window. Only valid while the host keeps the window alive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WindowId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WorkspaceId(pub i32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MonitorId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Queries the core issues against the compositor.
///
/// Every call is synchronous and happens on the host's dispatch thread while a
/// layout operation is running; implementations must not call back into the
/// layout engine.
pub trait HostAdapter {
    fn focused_window(&self) -> Option<WindowId>;

    fn workspace_of_window(&self, window: WindowId) -> Option<WorkspaceId>;

    fn workspace_exists(&self, workspace: WorkspaceId) -> bool;

    fn monitor_of_workspace(&self, workspace: WorkspaceId) -> Option<MonitorId>;

    /// The workspace currently shown on `monitor`.
    fn monitor_workspace(&self, monitor: MonitorId) -> Option<WorkspaceId>;

    /// Usable area of the monitor, with reserved areas (bars, docks) already removed.
    fn monitor_frame(&self, monitor: MonitorId) -> Option<Rect>;

    fn monitor_in_direction(&self, from: MonitorId, direction: Direction) -> Option<MonitorId>;

    fn workspace_has_fullscreen(&self, workspace: WorkspaceId) -> bool;

    fn cursor_position(&self) -> Point;
}
