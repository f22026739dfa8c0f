use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::command::{GroupChange, GroupShape, LayoutCommand};
use super::state::LayoutState;
use super::{Direction, ExpandState, Layer, LayoutKind, Orientation, RenderHint, ResizeCorner};
use crate::common::config::Settings;
use crate::model::tree::{NodeData, NodeId};
use crate::sys::geometry::Point;
use crate::sys::host::{HostAdapter, MonitorId, WindowId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullscreenMode {
    Maximized,
    Fullscreen,
}

/// Notifications the host delivers to the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutEvent {
    WindowCreated { window: WindowId, workspace: WorkspaceId, floating: bool },
    WindowRemoved(WindowId),
    WindowFocused(WindowId),
    FullscreenRequested { window: WindowId, mode: FullscreenMode, enable: bool },
    RecalculateMonitor(MonitorId),
    RecalculateWorkspace(WorkspaceId),
    /// A drag of `delta` pixels. Without a corner, the one nearest the cursor is used.
    ResizeRequested { delta: Point, corner: Option<ResizeCorner>, window: Option<WindowId> },
    /// Host-driven directional move of a tiled window.
    MoveWindowRequested { window: WindowId, direction: Direction },
    SplitRatioRequested { window: WindowId, ratio: f64, exact: bool },
}

/// What the host should do after an event or command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventResponse {
    /// Windows that came to the front, e.g. a newly activated tab.
    pub raise_windows: Vec<WindowId>,
    pub focus_window: Option<WindowId>,
    pub close_windows: Vec<WindowId>,
    pub move_windows: Vec<(WindowId, WorkspaceId)>,
    pub hints: Vec<RenderHint>,
}

/// Entry point the host drives. Owns all layout state for every workspace.
#[derive(Debug)]
pub struct LayoutEngine {
    state: LayoutState,
}

impl LayoutEngine {
    pub fn new(settings: &Settings) -> Self { Self { state: LayoutState::new(settings) } }

    pub fn state(&self) -> &LayoutState { &self.state }

    pub fn state_mut(&mut self) -> &mut LayoutState { &mut self.state }

    pub fn on_enable(&mut self) {
        self.state.clear();
        info!("layout enabled");
    }

    pub fn on_disable(&mut self) {
        self.state.clear();
        info!("layout disabled");
    }

    pub fn set_settings(&mut self, settings: &Settings) { self.state.set_settings(settings); }

    pub fn handle_event(&mut self, host: &impl HostAdapter, event: LayoutEvent) -> EventResponse {
        debug!(?event);
        let mut response = EventResponse::default();
        let workspace = match event {
            LayoutEvent::WindowCreated { window, workspace, floating } => {
                if floating {
                    self.state.add_floating_window(workspace, window);
                } else {
                    self.state.insert_tiled_window(workspace, window);
                }
                response.focus_window = Some(window);
                Some(workspace)
            }
            LayoutEvent::WindowRemoved(window) => {
                let workspace = self.state.remove_window(window);
                if let Some(workspace) = workspace {
                    response.focus_window = self.next_window_candidate(workspace);
                }
                workspace
            }
            LayoutEvent::WindowFocused(window) => self.state.window_focused(window),
            LayoutEvent::FullscreenRequested { window, mode, enable } => {
                let state = match (enable, mode) {
                    (false, _) => ExpandState::None,
                    (true, FullscreenMode::Maximized) => ExpandState::Maximized,
                    (true, FullscreenMode::Fullscreen) => ExpandState::Fullscreen,
                };
                self.state.set_window_expand(window, state);
                self.state.workspace_of_window(window)
            }
            LayoutEvent::RecalculateMonitor(monitor) => host.monitor_workspace(monitor),
            LayoutEvent::RecalculateWorkspace(workspace) => Some(workspace),
            LayoutEvent::ResizeRequested { delta, corner, window } => {
                self.resize_by_drag(host, delta, corner, window)
            }
            LayoutEvent::MoveWindowRequested { window, direction } => {
                let node = self.state.store.lookup_by_window(window);
                match node.and_then(|n| self.state.shift_or_get_focus(n, direction, true, false, false)) {
                    Some(_) => self.state.workspace_of_window(window),
                    None => {
                        debug!(%window, ?direction, "window cannot move that way");
                        None
                    }
                }
            }
            LayoutEvent::SplitRatioRequested { window, ratio, exact } => self
                .state
                .alter_split_ratio(window, ratio, exact)
                .then(|| self.state.workspace_of_window(window))
                .flatten(),
        };
        if let Some(workspace) = workspace {
            response.hints = self.render_hints(host, workspace);
        }
        response
    }

    /// Moves `window` one step in the direction named by `direction`
    /// (`l`, `r`, `u`, `d` or the long names). Unknown directions are ignored.
    pub fn move_window_to(
        &mut self,
        host: &impl HostAdapter,
        window: WindowId,
        direction: &str,
    ) -> EventResponse {
        match Direction::from_str(direction) {
            Ok(direction) => {
                self.handle_event(host, LayoutEvent::MoveWindowRequested { window, direction })
            }
            Err(_) => {
                debug!(direction, "ignoring unknown direction");
                EventResponse::default()
            }
        }
    }

    /// Parses and runs a dispatcher line. Bad input is logged and ignored.
    pub fn layout_message(
        &mut self,
        host: &impl HostAdapter,
        command: &str,
        argument: &str,
    ) -> EventResponse {
        match LayoutCommand::parse(command, argument) {
            Ok(cmd) => self.handle_command(host, cmd),
            Err(err) => {
                debug!(%err, "ignoring layout message");
                EventResponse::default()
            }
        }
    }

    pub fn handle_command(&mut self, host: &impl HostAdapter, command: LayoutCommand) -> EventResponse {
        info!(?command);
        let mut response = EventResponse::default();
        let Some(workspace) = self.active_workspace(host) else {
            debug!("no focused workspace");
            return response;
        };
        let mut touched = vec![workspace];

        match command {
            LayoutCommand::MakeGroup { shape, ephemerality } => {
                if let Some(node) = self.window_for_action(host, workspace) {
                    let state = &mut self.state;
                    match shape {
                        GroupShape::Horizontal => {
                            state.make_group_on(node, Orientation::Horizontal, LayoutKind::Split, ephemerality)
                        }
                        GroupShape::Vertical => {
                            state.make_group_on(node, Orientation::Vertical, LayoutKind::Split, ephemerality)
                        }
                        GroupShape::Opposite => state.make_opposite_group_on(node, ephemerality),
                        GroupShape::Tab => {
                            state.make_group_on(node, Orientation::Horizontal, LayoutKind::Tabbed, ephemerality)
                        }
                    };
                }
            }
            LayoutCommand::ChangeGroup(change) => {
                let group = self
                    .window_for_action(host, workspace)
                    .and_then(|_| self.state.focused_group(workspace));
                if let Some(group) = group {
                    let state = &mut self.state;
                    match change {
                        GroupChange::Horizontal => state.change_group_on(group, Orientation::Horizontal),
                        GroupChange::Vertical => state.change_group_on(group, Orientation::Vertical),
                        GroupChange::Tab => state.tab_group_on(group),
                        GroupChange::Untab => state.untab_group_on(group),
                        GroupChange::ToggleTab => state.toggle_tab_group_on(group),
                        GroupChange::Opposite => state.change_group_to_opposite_on(group),
                    };
                }
            }
            LayoutCommand::SetEphemeral(ephemeral) => {
                if let Some(group) = self.state.focused_group(workspace) {
                    self.state.change_group_ephemerality_on(group, ephemeral);
                }
            }
            LayoutCommand::MoveFocus { direction, visible, layers } => {
                if let Some(target) = self.shift_focus(host, workspace, direction, visible, layers) {
                    touched.extend(self.state.workspace_of_window(target));
                    response.focus_window = Some(target);
                }
            }
            LayoutCommand::MoveWindow { direction, once, visible } => {
                if let Some(node) = self.window_for_action(host, workspace) {
                    if self.state.shift_or_get_focus(node, direction, true, once, visible).is_none() {
                        if let Some(target) = self.monitor_workspace_towards(host, workspace, direction) {
                            response.move_windows = self.move_to_workspace(workspace, target, true);
                            touched.push(target);
                        }
                    }
                }
            }
            LayoutCommand::ChangeFocus(shift) => {
                self.state.change_focus(workspace, shift);
            }
            LayoutCommand::FocusTab { target, priority, wrap } => {
                let wrap = wrap.unwrap_or(self.state.settings.focus.wrap_tab_scroll);
                let cursor = host.cursor_position();
                if let Some(node) = self.state.focus_tab(workspace, target, priority, wrap, cursor) {
                    let tab = self
                        .state
                        .tab_group_of(node)
                        .and_then(|group| {
                            self.state.store.ancestors(node).find(|&n| self.state.store.parent(n) == Some(group))
                        })
                        .unwrap_or(node);
                    response.raise_windows = self.state.store.windows_under(tab);
                }
            }
            LayoutCommand::ToggleFocusLayer => {
                response.focus_window = self.state.toggle_focus_layer(workspace);
            }
            LayoutCommand::ClearFocusOverride => {
                if let Some(window) = host.focused_window() {
                    self.state.clear_focus_override(window);
                }
            }
            LayoutCommand::KillActive => {
                response.close_windows = self.state.kill_focused_node(workspace);
            }
            LayoutCommand::MoveToWorkspace { workspace: target, follow } => {
                if host.workspace_exists(target) {
                    response.move_windows = self.move_to_workspace(workspace, target, follow);
                    touched.push(target);
                } else {
                    debug!(%target, "no such workspace");
                }
            }
            LayoutCommand::Expand { option, fullscreen } => {
                let fullscreen = fullscreen.unwrap_or(self.state.settings.focus.expand_fullscreen);
                self.state.expand(workspace, option, fullscreen);
            }
            LayoutCommand::ResizeActive(delta) => {
                let node = self.state.store.workspace_focused_node(workspace, false, true);
                let screen = host
                    .monitor_of_workspace(workspace)
                    .and_then(|m| host.monitor_frame(m));
                if let (Some(node), Some(screen)) = (node, screen) {
                    let size = self.state.store.get(node).map(|n| n.geometry.size).unwrap_or_default();
                    let pixels = delta.to_pixel_delta(
                        (size.width, size.height),
                        (screen.size.width, screen.size.height),
                    );
                    self.state.resize_node(node, pixels, ResizeCorner::BottomRight);
                }
            }
            LayoutCommand::SetSwallow(option) => {
                self.state.set_node_swallow(workspace, option);
            }
            LayoutCommand::SplitRatio { ratio, exact } => {
                if let Some(node) = self.window_for_action(host, workspace) {
                    self.state.alter_node_ratio(node, ratio, exact);
                }
            }
            LayoutCommand::DebugNodes => {
                info!("\n{}", self.draw_tree(workspace));
            }
        }

        if response.focus_window.is_none() {
            let focused = self.state.focused_window(workspace);
            if focused.is_some() && focused != host.focused_window() {
                response.focus_window = focused;
            }
        }
        touched.dedup();
        for workspace in touched {
            response.hints.extend(self.render_hints(host, workspace));
        }
        response
    }

    /// Node commands operate on, unless a fullscreen window owns the workspace.
    fn window_for_action(&self, host: &impl HostAdapter, workspace: WorkspaceId) -> Option<NodeId> {
        if host.workspace_has_fullscreen(workspace) {
            debug!(%workspace, "workspace has a fullscreen window");
            return None;
        }
        self.state.store.workspace_focused_node(workspace, false, false)
    }

    fn active_workspace(&self, host: &impl HostAdapter) -> Option<WorkspaceId> {
        let window = host.focused_window()?;
        self.state.workspace_of_window(window).or_else(|| host.workspace_of_window(window))
    }

    fn monitor_workspace_towards(
        &self,
        host: &impl HostAdapter,
        workspace: WorkspaceId,
        direction: Direction,
    ) -> Option<WorkspaceId> {
        let monitor = host.monitor_of_workspace(workspace)?;
        let next = host.monitor_in_direction(monitor, direction)?;
        host.monitor_workspace(next)
    }

    /// Directional focus. Falls through to the neighbouring monitor when the
    /// tree has nothing in that direction. Returns the window to focus.
    ///
    /// Focus on a layer outside `layers` first jumps to the other layer
    /// instead of moving.
    fn shift_focus(
        &mut self,
        host: &impl HostAdapter,
        workspace: WorkspaceId,
        direction: Direction,
        visible: bool,
        layers: Layer,
    ) -> Option<WindowId> {
        let layers = if layers.is_empty() { Layer::all() } else { layers };
        let current = self.state.focused_layer(workspace);
        if current == Layer::FLOATING || !layers.contains(Layer::TILED) {
            if layers.contains(current) && !layers.contains(Layer::TILED) {
                return None;
            }
            return self.state.toggle_focus_layer(workspace);
        }
        let source = self.state.store.workspace_focused_node(workspace, false, true);
        let target =
            source.and_then(|s| self.state.shift_or_get_focus(s, direction, false, false, visible));
        match (source, target) {
            (Some(source), Some(target)) => {
                if let Some(window) = self.state.store.window(target) {
                    self.state.overrides.set(window, direction.opposite(), source);
                }
                self.state.store.select(target);
                self.state.settle(workspace);
                self.state.focused_window(workspace)
            }
            _ => {
                let other = self.monitor_workspace_towards(host, workspace, direction)?;
                debug!(%workspace, %other, ?direction, "focus crosses to next monitor");
                self.state.focused_window(other)
            }
        }
    }

    fn move_to_workspace(
        &mut self,
        origin: WorkspaceId,
        target: WorkspaceId,
        follow: bool,
    ) -> Vec<(WindowId, WorkspaceId)> {
        let Some(node) = self.state.store.workspace_focused_node(origin, false, true) else {
            return Vec::new();
        };
        let windows = self.state.store.windows_under(node);
        if self.state.move_node_to_workspace(origin, target, follow).is_none() {
            return Vec::new();
        }
        windows.into_iter().map(|w| (w, target)).collect()
    }

    fn resize_by_drag(
        &mut self,
        host: &impl HostAdapter,
        delta: Point,
        corner: Option<ResizeCorner>,
        window: Option<WindowId>,
    ) -> Option<WorkspaceId> {
        let node = match window {
            Some(window) => self.state.store.lookup_by_window(window)?,
            None => {
                let workspace = self.active_workspace(host)?;
                self.state.store.workspace_focused_node(workspace, false, true)?
            }
        };
        let corner = corner.unwrap_or_else(|| {
            let center = self.state.store.get(node).map(|n| n.geometry.center()).unwrap_or_default();
            ResizeCorner::from_cursor_position(host.cursor_position(), center)
        });
        self.state.resize_node(node, delta, corner);
        self.state.store.workspace_of(node)
    }

    /// Window to focus after something on `workspace` went away.
    pub fn next_window_candidate(&self, workspace: WorkspaceId) -> Option<WindowId> {
        self.state.focused_window(workspace)
    }

    pub fn render_hints(&mut self, host: &impl HostAdapter, workspace: WorkspaceId) -> Vec<RenderHint> {
        let Some(monitor) = host.monitor_of_workspace(workspace) else { return Vec::new() };
        if host.monitor_workspace(monitor) != Some(workspace) {
            return Vec::new();
        }
        let Some(frame) = host.monitor_frame(monitor) else {
            warn!(%monitor, "monitor has no frame");
            return Vec::new();
        };
        self.state.recalculate_workspace(workspace, frame)
    }

    pub fn draw_tree(&self, workspace: WorkspaceId) -> String {
        let Some(root) = self.state.store.workspace_root(workspace) else {
            return format!("workspace {workspace}: empty\n");
        };
        let tree = self.get_ascii_tree(root);
        let mut out = String::new();
        if let Err(err) = ascii_tree::write_tree(&mut out, &tree) {
            warn!(%err, "failed to draw tree");
        }
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let store = &self.state.store;
        let Some(n) = store.get(node) else { return ascii_tree::Tree::Leaf(vec![format!("{node:?} (dead)")]) };
        let status = match n.parent.and_then(|p| store.group(p)) {
            None => "",
            Some(parent) if parent.focused_child == Some(node) => "☒ ",
            Some(_) => "☐ ",
        };
        let expand = match n.expand {
            ExpandState::None => String::new(),
            other => format!(" {other:?}"),
        };
        let desc = match &n.data {
            NodeData::Window(window) => format!("{status}window {window} {:.3}{expand}", n.ratio),
            NodeData::Group(group) => {
                let shape = match group.kind {
                    LayoutKind::Split => format!("{:?}", group.axis),
                    LayoutKind::Tabbed => format!("Tabbed({:?})", group.axis),
                };
                let focus = if group.group_focused { " [focused]" } else { "" };
                let swallow = if group.swallow { " [swallow]" } else { "" };
                format!(
                    "{status}{shape} {:?} {:.3}{expand}{focus}{swallow}",
                    group.ephemerality, n.ratio
                )
            }
        };
        let children: Vec<_> = store.children(node).iter().map(|&c| self.get_ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::{TabFocus, TabFocusMousePriority};
    use crate::sys::geometry::Rect;
    use crate::sys::headless::HeadlessHost;

    const WS: WorkspaceId = WorkspaceId(1);
    const SCREEN: Rect = Rect::new(0.0, 0.0, 1000.0, 800.0);

    struct Harness {
        host: HeadlessHost,
        engine: LayoutEngine,
    }

    impl Harness {
        fn new() -> Self { Self::with_settings(Settings::default()) }

        fn with_settings(settings: Settings) -> Self {
            Self {
                host: HeadlessHost::with_monitor(SCREEN, WS),
                engine: LayoutEngine::new(&settings),
            }
        }

        fn open(&mut self, window: u64, workspace: WorkspaceId) -> EventResponse {
            self.host.open_window(WindowId(window), workspace);
            let response = self.engine.handle_event(
                &self.host,
                LayoutEvent::WindowCreated { window: WindowId(window), workspace, floating: false },
            );
            self.host.apply(&response);
            response
        }

        fn close(&mut self, window: u64) -> EventResponse {
            self.host.close_window(WindowId(window));
            let response = self.engine.handle_event(&self.host, LayoutEvent::WindowRemoved(WindowId(window)));
            self.host.apply(&response);
            response
        }

        fn msg(&mut self, command: &str, argument: &str) -> EventResponse {
            let response = self.engine.layout_message(&self.host, command, argument);
            self.host.apply(&response);
            response
        }

        fn root(&self, workspace: WorkspaceId) -> Option<NodeId> {
            self.engine.state().store.workspace_root(workspace)
        }

        fn node(&self, window: u64) -> NodeId {
            self.engine.state().store.lookup_by_window(WindowId(window)).unwrap()
        }

        fn ratios(&self, group: NodeId) -> Vec<f64> {
            let store = &self.engine.state().store;
            store.children(group).iter().map(|&c| store.get(c).unwrap().ratio).collect()
        }
    }

    #[test]
    fn scenario_a_second_window_forms_horizontal_split() {
        let mut h = Harness::new();
        h.open(1, WS);
        assert_eq!(h.root(WS), Some(h.node(1)));

        let response = h.open(2, WS);
        let root = h.root(WS).unwrap();
        let group = h.engine.state().store.group(root).unwrap();
        assert_eq!(group.axis, Orientation::Horizontal);
        assert_eq!(group.kind, LayoutKind::Split);
        assert_eq!(group.children, vec![h.node(1), h.node(2)]);
        assert_eq!(h.ratios(root), vec![0.5, 0.5]);
        assert_eq!(response.focus_window, Some(WindowId(2)));
        assert_eq!(response.hints.len(), 2);
    }

    #[test]
    fn scenario_b_shift_once_past_edge_returns_none() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        let before = h.engine.draw_tree(WS);
        let b = h.node(2);
        let result = h.engine.state_mut().shift_or_get_focus(b, Direction::Right, true, true, false);
        assert_eq!(result, None);
        assert_eq!(h.engine.draw_tree(WS), before);
    }

    #[test]
    fn scenario_c_corner_drag_only_touches_horizontal_axis() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        let response = h.engine.handle_event(
            &h.host,
            LayoutEvent::ResizeRequested {
                delta: Point::new(50.0, 0.0),
                corner: Some(ResizeCorner::BottomRight),
                window: Some(WindowId(1)),
            },
        );
        let root = h.root(WS).unwrap();
        let ratios = h.ratios(root);
        assert!(ratios[0] > 0.5);
        assert!((ratios[0] - 0.55).abs() < 1e-9);
        assert!((ratios.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(response.hints[0].frame, Rect::new(0.0, 0.0, 550.0, 800.0));
        assert_eq!(response.hints[0].frame.size.height, SCREEN.size.height);
    }

    #[test]
    fn scenario_d_blacklisted_workspace_is_not_autotiled() {
        let mut settings = Settings::default();
        settings.autotile.enable = true;
        settings.autotile.workspaces = "not:2".into();
        let mut h = Harness::with_settings(settings);

        h.open(1, WorkspaceId(2));
        assert_eq!(h.root(WorkspaceId(2)), Some(h.node(1)));

        h.open(2, WS);
        let root = h.root(WS).unwrap();
        assert_eq!(h.engine.state().store.children(root), &[h.node(2)]);
    }

    #[test]
    fn boundary_commands_make_group_and_move_window() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        h.msg("makegroup", "v");
        let b = h.node(2);
        let group = h.engine.state().store.parent(b).unwrap();
        assert_ne!(Some(group), h.root(WS));
        assert_eq!(h.engine.state().store.group(group).unwrap().axis, Orientation::Vertical);

        h.open(3, WS);
        assert_eq!(h.engine.state().store.parent(h.node(3)), Some(group));

        h.msg("movewindow", "l");
        let root = h.root(WS).unwrap();
        assert_eq!(h.engine.state().store.children(root), &[h.node(1), h.node(3), group]);
    }

    #[test]
    fn unknown_messages_are_no_ops() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        let before = h.engine.draw_tree(WS);
        assert_eq!(h.msg("teleport", "x"), EventResponse::default());
        assert_eq!(h.msg("movewindow", "sideways"), EventResponse::default());
        assert_eq!(h.engine.draw_tree(WS), before);
    }

    #[test]
    fn focus_records_override_back_to_source() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        h.msg("makegroup", "v");
        h.open(3, WS);
        // 1 | (2 / 3), focus on 3
        let response = h.msg("movefocus", "l");
        assert_eq!(response.focus_window, Some(WindowId(1)));
        let response = h.msg("movefocus", "r");
        assert_eq!(response.focus_window, Some(WindowId(3)));
        let overrides = &h.engine.state().overrides;
        assert_eq!(overrides.target(WindowId(1), Direction::Right), Some(h.node(3)));
    }

    #[test]
    fn focus_escalates_to_adjacent_monitor() {
        let mut h = Harness::new();
        h.host.add_monitor(MonitorId(1), Rect::new(1000.0, 0.0, 1000.0, 800.0), WorkspaceId(2));
        h.open(5, WorkspaceId(2));
        h.open(1, WS);
        let response = h.msg("movefocus", "r");
        assert_eq!(response.focus_window, Some(WindowId(5)));
        assert_eq!(h.msg("movefocus", "u").focus_window, None);
    }

    #[test]
    fn override_to_window_moved_away_falls_through_to_monitor() {
        let mut h = Harness::new();
        h.host.add_monitor(MonitorId(1), Rect::new(1000.0, 0.0, 1000.0, 800.0), WorkspaceId(2));
        h.open(5, WorkspaceId(2));
        h.open(1, WS);
        h.open(2, WS);
        h.open(3, WS);
        assert_eq!(h.msg("movefocus", "l").focus_window, Some(WindowId(2)));
        assert_eq!(h.msg("movefocus", "r").focus_window, Some(WindowId(3)));
        assert_eq!(h.engine.state().overrides.target(WindowId(2), Direction::Right), Some(h.node(3)));

        h.msg("movetoworkspace", "2");
        h.host.focus(Some(WindowId(2)));
        h.engine.handle_event(&h.host, LayoutEvent::WindowFocused(WindowId(2)));
        let other_focus = h.engine.state().focused_window(WorkspaceId(2));
        assert!(other_focus.is_some());

        let response = h.msg("movefocus", "r");
        assert_eq!(response.focus_window, other_focus);
        assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(2)));
        assert_eq!(h.engine.state().focused_window(WorkspaceId(2)), other_focus);
    }

    #[test]
    fn move_window_off_the_edge_goes_to_next_monitor() {
        let mut h = Harness::new();
        h.host.add_monitor(MonitorId(1), Rect::new(1000.0, 0.0, 1000.0, 800.0), WorkspaceId(2));
        h.open(1, WS);
        h.open(2, WS);
        let response = h.msg("movewindow", "r once");
        assert_eq!(response.move_windows, vec![(WindowId(2), WorkspaceId(2))]);
        assert_eq!(h.root(WorkspaceId(2)), Some(h.node(2)));
        assert_eq!(h.root(WS), Some(h.node(1)));
        assert_eq!(h.host.workspace_of_window(WindowId(2)), Some(WorkspaceId(2)));
    }

    #[test]
    fn fullscreen_workspace_blocks_grouping() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        h.host.set_fullscreen(WS, true);
        let before = h.engine.draw_tree(WS);
        h.msg("makegroup", "v");
        h.msg("changegroup", "tab");
        assert_eq!(h.engine.draw_tree(WS), before);
    }

    #[test]
    fn focus_tab_by_index_ignores_pointer() {
        let mut h = Harness::new();
        for w in 1..=4 {
            h.open(w, WS);
        }
        h.msg("changegroup", "tab");
        for (cursor, priority) in [
            (Point::new(10.0, 5.0), TabFocusMousePriority::Ignore),
            (Point::new(900.0, 5.0), TabFocusMousePriority::Prioritize),
            (Point::new(600.0, 400.0), TabFocusMousePriority::Require),
        ] {
            h.host.set_cursor(cursor);
            let response = h.engine.handle_command(
                &h.host,
                LayoutCommand::FocusTab { target: TabFocus::Index(2), priority, wrap: None },
            );
            h.host.apply(&response);
            assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(3)));
        }
        let visible: Vec<_> =
            h.engine.render_hints(&h.host, WS).into_iter().filter(|r| r.visible).map(|r| r.window).collect();
        assert_eq!(visible, vec![WindowId(3)]);
    }

    #[test]
    fn focus_tab_with_pointer() {
        let mut h = Harness::new();
        for w in 1..=4 {
            h.open(w, WS);
        }
        h.msg("changegroup", "tab");
        h.host.set_cursor(Point::new(300.0, 5.0));
        let response = h.msg("focustab", "mouse require_hovered");
        assert_eq!(response.focus_window, Some(WindowId(2)));
        assert_eq!(response.raise_windows, vec![WindowId(2)]);

        h.host.set_cursor(Point::new(300.0, 500.0));
        assert_eq!(h.msg("focustab", "mouse require_hovered").focus_window, None);
        assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(2)));

        h.msg("focustab", "l");
        assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(1)));
        h.msg("focustab", "l nowrap");
        assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(1)));
        h.msg("focustab", "l wrap");
        assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(4)));
        h.msg("focustab", "index:9");
        assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(4)));
    }

    #[test]
    fn kill_active_asks_host_to_close() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        let response = h.msg("killactive", "");
        assert_eq!(response.close_windows, vec![WindowId(2)]);
        assert!(h.engine.state().is_window_tiled(WindowId(2)));
        let response = h.close(2);
        assert_eq!(response.focus_window, Some(WindowId(1)));
    }

    #[test]
    fn host_fullscreen_request_covers_monitor() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        let response = h.engine.handle_event(
            &h.host,
            LayoutEvent::FullscreenRequested { window: WindowId(1), mode: FullscreenMode::Fullscreen, enable: true },
        );
        assert_eq!(response.hints[0].frame, SCREEN);
        assert!(response.hints[0].fullscreen);
        assert!(!response.hints[1].visible);
    }

    #[test]
    fn floating_windows_stay_out_of_the_tree() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.host.open_window(WindowId(9), WS);
        let response = h.engine.handle_event(
            &h.host,
            LayoutEvent::WindowCreated { window: WindowId(9), workspace: WS, floating: true },
        );
        h.host.apply(&response);
        assert!(!h.engine.state().is_window_tiled(WindowId(9)));
        assert_eq!(h.msg("togglefocuslayer", "").focus_window, Some(WindowId(1)));
        assert_eq!(h.msg("togglefocuslayer", "").focus_window, Some(WindowId(9)));
        assert_eq!(h.engine.state().window_layer(WindowId(9)), Some(Layer::FLOATING));

        assert_eq!(h.msg("movefocus", "l floating").focus_window, None);
        assert_eq!(h.msg("movefocus", "l tiled").focus_window, Some(WindowId(1)));
        assert_eq!(h.msg("movefocus", "r floating").focus_window, Some(WindowId(9)));
        assert_eq!(h.msg("movefocus", "r").focus_window, Some(WindowId(1)));

        h.close(9);
        assert_eq!(h.engine.state().focused_window(WS), Some(WindowId(1)));
    }

    #[test]
    fn draw_tree_marks_focus() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        let drawn = h.engine.draw_tree(WS);
        assert!(drawn.contains("Horizontal Ephemeral"));
        assert!(drawn.contains("☒ window 0x2"));
        assert!(drawn.contains("☐ window 0x1"));
        assert_eq!(h.engine.draw_tree(WorkspaceId(7)), "workspace 7: empty\n");
    }

    #[test]
    fn move_window_to_shifts_by_direction_name() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        h.open(3, WS);
        let response = h.engine.move_window_to(&h.host, WindowId(1), "r");
        let root = h.root(WS).unwrap();
        assert_eq!(h.engine.state().store.children(root), &[h.node(2), h.node(1), h.node(3)]);
        assert_eq!(response.hints.len(), 3);

        let before = h.engine.draw_tree(WS);
        assert_eq!(h.engine.move_window_to(&h.host, WindowId(1), "sideways"), EventResponse::default());
        assert!(h.engine.move_window_to(&h.host, WindowId(3), "right").hints.is_empty());
        assert!(h.engine.move_window_to(&h.host, WindowId(8), "l").hints.is_empty());
        assert_eq!(h.engine.draw_tree(WS), before);
    }

    #[test]
    fn swallowing_group_collects_new_windows() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        h.msg("makegroup", "v");
        h.open(3, WS);
        let group = h.engine.state().store.parent(h.node(2)).unwrap();
        assert_eq!(h.engine.state().store.children(group), &[h.node(2), h.node(3)]);

        h.host.focus(Some(WindowId(2)));
        h.engine.handle_event(&h.host, LayoutEvent::WindowFocused(WindowId(2)));
        h.msg("setswallow", "true");
        h.msg("makegroup", "h");
        let inner = h.engine.state().store.parent(h.node(2)).unwrap();
        assert_ne!(inner, group);

        h.open(4, WS);
        assert_eq!(h.engine.state().store.parent(h.node(4)), Some(group));
        assert_eq!(h.engine.state().store.children(inner), &[h.node(2)]);
        assert!(h.engine.draw_tree(WS).contains("[swallow]"));
    }

    #[test]
    fn split_ratio_from_host_and_dispatcher() {
        let mut h = Harness::new();
        h.open(1, WS);
        h.open(2, WS);
        let response = h.engine.handle_event(
            &h.host,
            LayoutEvent::SplitRatioRequested { window: WindowId(1), ratio: 0.3, exact: true },
        );
        assert_eq!(response.hints.len(), 2);
        assert!((response.hints[0].frame.size.width - 300.0).abs() < 1e-6);

        h.msg("splitratio", "0.1");
        let ratios = h.ratios(h.root(WS).unwrap());
        assert!((ratios[0] - 0.2).abs() < 1e-9);
        assert!((ratios[1] - 0.8).abs() < 1e-9);
    }

    /// Small deterministic generator so randomized sequences replay exactly.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: u64) -> u64 { self.next() % n }
    }

    fn check_tree(h: &Harness, open: &[u64]) {
        let store = &h.engine.state().store;
        let mut reachable = Vec::new();
        for workspace in store.workspaces() {
            let root = store.workspace_root(workspace).unwrap();
            assert_eq!(store.parent(root), None);
            for node in store.descendants(root) {
                let n = store.get(node).unwrap();
                assert_eq!(n.workspace, workspace);
                if let Some(window) = n.window() {
                    reachable.push(window.0);
                    continue;
                }
                let group = n.group().unwrap();
                assert!(!group.children.is_empty(), "empty group survived");
                let total: f64 = group.children.iter().map(|&c| store.get(c).unwrap().ratio).sum();
                assert!((total - 1.0).abs() < 1e-6, "ratios sum to {total}");
                assert!(group.children.iter().all(|&c| store.get(c).unwrap().ratio > 0.0));
                assert_eq!(group.kind.is_tabbed(), group.tab_group.is_some());
                for &c in &group.children {
                    assert_eq!(store.parent(c), Some(node));
                }
            }
        }
        reachable.sort_unstable();
        let mut expected = open.to_vec();
        expected.sort_unstable();
        assert_eq!(reachable, expected, "every window reachable from exactly one root");
        let rooted: usize =
            store.workspaces().filter_map(|ws| store.workspace_root(ws)).map(|r| store.descendants(r).len()).sum();
        assert_eq!(store.len(), rooted, "no orphaned nodes");
    }

    #[test]
    fn insert_remove_sequences_leave_no_lone_ephemeral_child() {
        let mut settings = Settings::default();
        settings.autotile.enable = true;
        settings.autotile.workspaces = "2".into();
        let mut rng = XorShift(0xdeadbeef);
        let mut h = Harness::with_settings(settings);
        let mut open: Vec<u64> = Vec::new();
        for next in 1..300 {
            if open.is_empty() || rng.below(3) > 0 {
                h.open(next, WorkspaceId(1 + rng.below(2) as i32));
                open.push(next);
            } else {
                let window = open.remove(rng.below(open.len() as u64) as usize);
                h.close(window);
            }
            check_tree(&h, &open);
            let store = &h.engine.state().store;
            for ws in store.workspaces() {
                for node in store.descendants(store.workspace_root(ws).unwrap()) {
                    if let Some(group) = store.group(node) {
                        assert!(
                            !(group.ephemerality.collapses() && group.children.len() == 1),
                            "collapsing group {node:?} kept a single child"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn randomized_operations_keep_tree_consistent() {
        for seed in [0x9e3779b97f4a7c15_u64, 42, 7777, 123456789] {
            let mut rng = XorShift(seed);
            let mut h = Harness::new();
            h.host.add_monitor(MonitorId(1), Rect::new(1000.0, 0.0, 1000.0, 800.0), WorkspaceId(2));
            let mut open: Vec<u64> = Vec::new();
            let mut next_window = 1;
            let directions = ["l", "r", "u", "d"];
            for _ in 0..400 {
                match rng.below(12) {
                    0..=2 => {
                        let ws = WorkspaceId(1 + rng.below(2) as i32);
                        h.open(next_window, ws);
                        open.push(next_window);
                        next_window += 1;
                    }
                    3 if !open.is_empty() => {
                        let window = open.remove(rng.below(open.len() as u64) as usize);
                        h.close(window);
                    }
                    4 => {
                        let dir = directions[rng.below(4) as usize];
                        let once = if rng.below(2) == 0 { "once" } else { "" };
                        h.msg("movewindow", &format!("{dir} {once}"));
                    }
                    5 => {
                        let dir = directions[rng.below(4) as usize];
                        h.msg("movefocus", dir);
                    }
                    6 => {
                        let shape = ["h", "v", "opp", "tab"][rng.below(4) as usize];
                        let eph = ["ephemeral", "standard", "force_ephemeral"][rng.below(3) as usize];
                        h.msg("makegroup", &format!("{shape} {eph}"));
                    }
                    7 => {
                        let change = ["h", "v", "tab", "untab", "toggletab", "opposite"][rng.below(6) as usize];
                        h.msg("changegroup", change);
                    }
                    8 => {
                        let dx = rng.below(200) as f64 - 100.0;
                        let dy = rng.below(200) as f64 - 100.0;
                        h.msg("resizeactive", &format!("{dx} {dy}"));
                    }
                    9 => {
                        let focus = ["raise", "lower", "top", "bottom"][rng.below(4) as usize];
                        h.msg("changefocus", focus);
                    }
                    10 => {
                        let ratio = rng.below(100) as f64 / 100.0;
                        let exact = if rng.below(2) == 0 { "exact" } else { "" };
                        h.msg("splitratio", &format!("{exact} {ratio}"));
                    }
                    _ => {
                        h.msg("setswallow", "toggle");
                    }
                }
                check_tree(&h, &open);
            }
            for window in open.drain(..) {
                h.close(window);
            }
            assert!(h.engine.state().store.is_empty());
            assert!(h.engine.state().tabs.is_empty());
        }
    }
}
