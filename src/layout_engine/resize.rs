use serde::{Deserialize, Serialize};
use strum::EnumString;
use tracing::{debug, trace};

use super::state::LayoutState;
use super::{LayoutKind, Orientation};
use crate::model::tree::NodeId;
use crate::sys::geometry::Point;
use crate::sys::host::WindowId;

/// Corner of a tiled window that a drag or `resizeactive` moves. The two
/// edges meeting at it are the ones that give or take space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResizeCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl ResizeCorner {
    pub fn affects_left(&self) -> bool { matches!(self, Self::TopLeft | Self::BottomLeft) }

    pub fn affects_right(&self) -> bool { matches!(self, Self::TopRight | Self::BottomRight) }

    pub fn affects_top(&self) -> bool { matches!(self, Self::TopLeft | Self::TopRight) }

    pub fn affects_bottom(&self) -> bool { matches!(self, Self::BottomLeft | Self::BottomRight) }

    /// Whether the dragged edge on `axis` is the far (right or bottom) one.
    fn far_edge(&self, axis: Orientation) -> bool {
        match axis {
            Orientation::Horizontal => self.affects_right(),
            Orientation::Vertical => self.affects_bottom(),
        }
    }

    /// Quadrant of the window frame the pointer is in when a drag starts
    /// without an explicit corner.
    pub fn from_cursor_position(cursor: Point, window_center: Point) -> Self {
        match (cursor.x < window_center.x, cursor.y < window_center.y) {
            (true, true) => Self::TopLeft,
            (false, true) => Self::TopRight,
            (true, false) => Self::BottomLeft,
            (false, false) => Self::BottomRight,
        }
    }
}

/// How the two numbers of `resizeactive` are read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Change the focused node's size by this much.
    #[default]
    Relative,
    /// `resizeactive exact`: the size the focused node should end up at.
    Exact,
}

/// One axis of a `resizeactive` argument: `40` is pixels, `-10%` a share.
/// Relative percentages scale the node, exact ones the monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResizeValue {
    Pixels(f64),
    Percent(f64),
}

impl ResizeValue {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok().map(|pct| Self::Percent(pct / 100.0)),
            None => raw.parse().ok().map(Self::Pixels),
        }
    }

    /// Pixels a node of extent `current` grows by on this axis.
    fn growth(self, mode: ResizeMode, current: f64, screen: f64) -> f64 {
        let target = match (mode, self) {
            (ResizeMode::Relative, Self::Pixels(px)) => current + px,
            (ResizeMode::Relative, Self::Percent(pct)) => current * (1.0 + pct),
            (ResizeMode::Exact, Self::Pixels(px)) => px,
            (ResizeMode::Exact, Self::Percent(pct)) => screen * pct,
        };
        target - current
    }
}

/// Parsed `resizeactive` request, turned into a pixel drag on the focused
/// node's bottom-right corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResizeDelta {
    pub x: ResizeValue,
    pub y: ResizeValue,
    #[serde(default)]
    pub mode: ResizeMode,
}

impl Default for ResizeDelta {
    fn default() -> Self { Self::relative(ResizeValue::Pixels(0.0), ResizeValue::Pixels(0.0)) }
}

impl ResizeDelta {
    pub fn relative(x: ResizeValue, y: ResizeValue) -> Self {
        Self { x, y, mode: ResizeMode::Relative }
    }

    pub fn exact(x: ResizeValue, y: ResizeValue) -> Self { Self { x, y, mode: ResizeMode::Exact } }

    /// Pixel growth on each axis for a node of `current` size inside `screen`.
    pub fn to_pixel_delta(&self, current: (f64, f64), screen: (f64, f64)) -> Point {
        Point::new(
            self.x.growth(self.mode, current.0, screen.0),
            self.y.growth(self.mode, current.1, screen.1),
        )
    }
}

impl LayoutState {
    /// Applies a drag of `delta` pixels on `corner` of `node`.
    ///
    /// Each axis is handled by the nearest split ancestor along that axis with
    /// more than one child. Space moves between the child containing `node`
    /// and its neighbour on the dragged edge (or the other side when there is
    /// none), never leaving either below the configured minimum share.
    /// Returns whether any ratio changed.
    pub fn resize_node(&mut self, node: NodeId, delta: Point, corner: ResizeCorner) -> bool {
        let Some(workspace) = self.store.workspace_of(node) else { return false };
        let mut changed = false;
        for axis in [Orientation::Horizontal, Orientation::Vertical] {
            let amount = delta.along(axis);
            if amount == 0.0 {
                continue;
            }
            // Pulling the far edge outward grows the node; pulling the near
            // edge outward means moving it towards negative coordinates.
            let grow = if corner.far_edge(axis) { amount } else { -amount };
            changed |= self.resize_along(node, axis, grow, corner.far_edge(axis));
        }
        if changed {
            self.settle(workspace);
        }
        changed
    }

    pub fn alter_split_ratio(&mut self, window: WindowId, ratio: f64, exact: bool) -> bool {
        match self.store.lookup_by_window(window) {
            Some(node) => self.alter_node_ratio(node, ratio, exact),
            None => false,
        }
    }

    /// Sets (`exact`) or shifts by `ratio` the share `node` takes in the
    /// nearest split group with more than one child. The other children are
    /// rescaled to fill the rest. Returns whether anything changed.
    pub fn alter_node_ratio(&mut self, node: NodeId, ratio: f64, exact: bool) -> bool {
        if !ratio.is_finite() {
            return false;
        }
        let Some(workspace) = self.store.workspace_of(node) else { return false };
        let split = self.store.ancestors(node).find_map(|child| {
            let parent = self.store.parent(child)?;
            let group = self.store.group(parent)?;
            (group.kind == LayoutKind::Split && group.children.len() > 1).then_some((child, parent))
        });
        let Some((child, parent)) = split else {
            trace!(?node, "no split group to take space from");
            return false;
        };

        let min_ratio = self.settings.resize.min_ratio;
        let siblings = self.store.children(parent).to_vec();
        let others = (siblings.len() - 1) as f64;
        let own = self.store.get(child).map_or(0.0, |n| n.ratio);
        let ceiling = (1.0 - min_ratio * others).max(min_ratio);
        let target = if exact { ratio } else { own + ratio }.clamp(min_ratio, ceiling);
        if (target - own).abs() < 1e-9 {
            return false;
        }
        let rest = 1.0 - own;
        for sibling in siblings {
            let Some(n) = self.store.get_mut(sibling) else { continue };
            n.ratio = if sibling == child {
                target
            } else if rest > 0.0 {
                n.ratio * (1.0 - target) / rest
            } else {
                (1.0 - target) / others
            };
        }
        self.store.normalize(parent);
        self.settle(workspace);
        debug!(?node, ?parent, ratio = target, "altered split ratio");
        true
    }

    fn resize_along(&mut self, node: NodeId, axis: Orientation, grow: f64, far_edge: bool) -> bool {
        let min_ratio = self.settings.resize.min_ratio;
        let mut child = node;
        while let Some(parent) = self.store.parent(child) {
            let Some(group) = self.store.group(parent) else { return false };
            if group.kind != LayoutKind::Split || group.axis != axis || group.children.len() < 2 {
                child = parent;
                continue;
            }
            let Some(index) = group.position(child) else { return false };
            let neighbour = match (far_edge, index) {
                (true, i) if i + 1 < group.children.len() => group.children[i + 1],
                (true, i) => group.children[i - 1],
                (false, 0) => group.children[1],
                (false, i) => group.children[i - 1],
            };
            let extent = self.store.get(parent).map_or(0.0, |p| p.geometry.extent(axis));
            if extent <= 0.0 {
                debug!(?parent, "group has no geometry yet, skipping resize");
                return false;
            }

            let own = self.store.get(child).map_or(0.0, |n| n.ratio);
            let other = self.store.get(neighbour).map_or(0.0, |n| n.ratio);
            let shift = (grow / extent).clamp(-(own - min_ratio).max(0.0), (other - min_ratio).max(0.0));
            if shift == 0.0 {
                return false;
            }
            if let Some(n) = self.store.get_mut(child) {
                n.ratio = own + shift;
            }
            if let Some(n) = self.store.get_mut(neighbour) {
                n.ratio = other - shift;
            }
            self.store.normalize(parent);
            trace!(?parent, ?axis, shift, "resized");
            return true;
        }
        false
    }
}
