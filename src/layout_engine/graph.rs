use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::EnumString;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[strum(serialize = "h", serialize = "horizontal")]
    Horizontal,
    #[strum(serialize = "v", serialize = "vertical")]
    Vertical,
}

impl Orientation {
    pub fn opposite(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[strum(serialize = "l", serialize = "left")]
    Left,
    #[strum(serialize = "u", serialize = "up")]
    Up,
    #[strum(serialize = "d", serialize = "down")]
    Down,
    #[strum(serialize = "r", serialize = "right")]
    Right,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Right and Down move towards the end of a group's child list.
    pub fn is_positive(self) -> bool { matches!(self, Direction::Right | Direction::Down) }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// How a group presents its children. The split axis is tracked separately so
/// that a tabbed group can return to the split it came from.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Split,
    Tabbed,
}

impl LayoutKind {
    pub fn is_tabbed(self) -> bool { matches!(self, LayoutKind::Tabbed) }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Ephemerality {
    #[default]
    Standard,
    Ephemeral,
    ForceEphemeral,
}

impl Ephemerality {
    /// Whether a group with this setting dissolves once it is down to one child.
    pub fn collapses(self) -> bool { !matches!(self, Ephemerality::Standard) }
}

/// Argument of `setswallow`, applied to the group containing the focused node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum SetSwallowOption {
    #[strum(serialize = "false", serialize = "noswallow")]
    NoSwallow,
    #[strum(serialize = "true", serialize = "swallow")]
    Swallow,
    #[strum(serialize = "toggle")]
    Toggle,
}

impl SetSwallowOption {
    pub fn apply(self, current: bool) -> bool {
        match self {
            SetSwallowOption::NoSwallow => false,
            SetSwallowOption::Swallow => true,
            SetSwallowOption::Toggle => !current,
        }
    }
}

bitflags! {
    /// Which layers a window lives on, or which a focus query may land on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Layer: u8 {
        const TILED = 1 << 0;
        const FLOATING = 1 << 1;
    }
}

/// How far a node is drawn beyond the slot its parent gives it.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandState {
    #[default]
    None,
    /// Covers the rectangle of the ancestor this many levels up.
    Expanded(u32),
    /// Covers the whole tiling area of the workspace.
    Maximized,
    /// Covers the whole monitor.
    Fullscreen,
}

impl ExpandState {
    pub fn is_expanded(self) -> bool { !matches!(self, ExpandState::None) }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_log::test;

    use super::*;

    #[test]
    fn directions_parse_short_and_long_names() {
        assert_eq!(Direction::from_str("l"), Ok(Direction::Left));
        assert_eq!(Direction::from_str("down"), Ok(Direction::Down));
        assert!(Direction::from_str("x").is_err());
    }

    #[test]
    fn direction_polarity_and_axis() {
        assert!(Direction::Right.is_positive());
        assert!(!Direction::Up.is_positive());
        assert_eq!(Direction::Up.orientation(), Orientation::Vertical);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }

    #[test]
    fn only_standard_groups_survive_with_one_child() {
        assert!(!Ephemerality::Standard.collapses());
        assert!(Ephemerality::Ephemeral.collapses());
        assert!(Ephemerality::ForceEphemeral.collapses());
        assert_eq!(Ephemerality::from_str("force_ephemeral"), Ok(Ephemerality::ForceEphemeral));
    }

    #[test]
    fn swallow_options() {
        assert_eq!(SetSwallowOption::from_str("true"), Ok(SetSwallowOption::Swallow));
        assert_eq!(SetSwallowOption::from_str("false"), Ok(SetSwallowOption::NoSwallow));
        assert!(SetSwallowOption::Toggle.apply(false));
        assert!(!SetSwallowOption::Toggle.apply(true));
        assert!(SetSwallowOption::Swallow.apply(true));
    }
}
