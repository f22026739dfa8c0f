pub mod arrange;
pub mod autotile;
pub mod command;
pub mod engine;
pub mod focus;
mod graph;
pub mod groups;
pub mod navigation;
pub mod resize;
pub mod state;
pub mod tab_group;

pub use arrange::RenderHint;
pub use autotile::{Autotile, WorkspacePattern};
pub use command::{CommandError, GroupChange, GroupShape, LayoutCommand};
pub use engine::{EventResponse, FullscreenMode, LayoutEngine, LayoutEvent};
pub use focus::{ExpandFullscreenOption, ExpandOption, FocusShift};
pub use graph::{
    Direction, Ephemerality, ExpandState, Layer, LayoutKind, Orientation, SetSwallowOption,
};
pub use navigation::{FocusOverride, FocusOverrides};
pub use resize::{ResizeCorner, ResizeDelta, ResizeMode, ResizeValue};
pub use state::{FloatingLayer, LayoutState};
pub use tab_group::{TabFocus, TabFocusMousePriority, TabGroup, TabGroupId, TabGroupManager};
