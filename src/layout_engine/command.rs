//! Parsing of the line based dispatcher commands hosts forward to the layout.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

use super::focus::{ExpandFullscreenOption, ExpandOption, FocusShift};
use super::resize::{ResizeDelta, ResizeValue};
use super::tab_group::{TabFocus, TabFocusMousePriority};
use super::{Direction, Ephemerality, Layer, SetSwallowOption};
use crate::sys::host::WorkspaceId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown layout command `{0}`")]
    UnknownCommand(String),
    #[error("invalid argument `{argument}` for `{command}`")]
    InvalidArgument { command: String, argument: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum GroupShape {
    #[strum(serialize = "h", serialize = "horizontal")]
    Horizontal,
    #[strum(serialize = "v", serialize = "vertical")]
    Vertical,
    #[strum(serialize = "opp", serialize = "opposite")]
    Opposite,
    #[strum(serialize = "tab", serialize = "tabbed")]
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum GroupChange {
    #[strum(serialize = "h", serialize = "horizontal")]
    Horizontal,
    #[strum(serialize = "v", serialize = "vertical")]
    Vertical,
    #[strum(serialize = "tab")]
    Tab,
    #[strum(serialize = "untab")]
    Untab,
    #[strum(serialize = "toggletab")]
    ToggleTab,
    #[strum(serialize = "opposite")]
    Opposite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    MakeGroup { shape: GroupShape, ephemerality: Ephemerality },
    ChangeGroup(GroupChange),
    SetEphemeral(bool),
    MoveFocus {
        direction: Direction,
        visible: bool,
        /// Layers focus may land on. Empty means any.
        #[serde(skip)]
        layers: Layer,
    },
    MoveWindow { direction: Direction, once: bool, visible: bool },
    ChangeFocus(FocusShift),
    FocusTab {
        target: TabFocus,
        priority: TabFocusMousePriority,
        /// Falls back to the configured default when absent.
        wrap: Option<bool>,
    },
    ToggleFocusLayer,
    ClearFocusOverride,
    KillActive,
    MoveToWorkspace { workspace: WorkspaceId, follow: bool },
    Expand { option: ExpandOption, fullscreen: Option<ExpandFullscreenOption> },
    ResizeActive(ResizeDelta),
    SetSwallow(SetSwallowOption),
    /// Share of the focused window in its split group, or a change to it.
    SplitRatio { ratio: f64, exact: bool },
    DebugNodes,
}

struct Args<'a> {
    command: &'a str,
    tokens: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn new(command: &'a str, raw: &'a str) -> Self {
        let tokens = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        Self { command, tokens }
    }

    fn invalid(&self, argument: &str) -> CommandError {
        CommandError::InvalidArgument {
            command: self.command.to_string(),
            argument: argument.to_string(),
        }
    }

    fn first(&self) -> Result<&'a str, CommandError> {
        self.tokens.first().copied().ok_or_else(|| self.invalid(""))
    }

    fn parse_first<T: FromStr>(&self) -> Result<T, CommandError> {
        let first = self.first()?;
        first.parse().map_err(|_| self.invalid(first))
    }

    /// Checks the optional flags after the first token against `allowed`.
    fn flags(&self, allowed: &[&str]) -> Result<Vec<&'a str>, CommandError> {
        let rest = self.tokens.get(1..).unwrap_or_default();
        match rest.iter().find(|t| !allowed.contains(*t)) {
            Some(bad) => Err(self.invalid(bad)),
            None => Ok(rest.to_vec()),
        }
    }
}

impl LayoutCommand {
    /// Parses a dispatcher name and its argument string.
    pub fn parse(name: &str, argument: &str) -> Result<Self, CommandError> {
        let args = Args::new(name, argument);
        let command = match name {
            "makegroup" => {
                let shape = args.parse_first()?;
                let flags = args.flags(&["ephemeral", "force_ephemeral", "standard"])?;
                let ephemerality = flags
                    .last()
                    .map(|f| Ephemerality::from_str(f))
                    .transpose()
                    .map_err(|_| args.invalid(argument))?
                    .unwrap_or_default();
                LayoutCommand::MakeGroup { shape, ephemerality }
            }
            "changegroup" => LayoutCommand::ChangeGroup(args.parse_first()?),
            "setephemeral" => LayoutCommand::SetEphemeral(args.parse_first()?),
            "movefocus" => {
                let direction = args.parse_first()?;
                let flags = args.flags(&["visible", "tiled", "floating"])?;
                let mut layers = Layer::empty();
                layers.set(Layer::TILED, flags.contains(&"tiled"));
                layers.set(Layer::FLOATING, flags.contains(&"floating"));
                LayoutCommand::MoveFocus { direction, visible: flags.contains(&"visible"), layers }
            }
            "movewindow" => {
                let direction = args.parse_first()?;
                let flags = args.flags(&["once", "visible"])?;
                LayoutCommand::MoveWindow {
                    direction,
                    once: flags.contains(&"once"),
                    visible: flags.contains(&"visible"),
                }
            }
            "changefocus" => LayoutCommand::ChangeFocus(args.parse_first()?),
            "focustab" => Self::parse_focus_tab(&args)?,
            "togglefocuslayer" => LayoutCommand::ToggleFocusLayer,
            "clearfocusoverride" => LayoutCommand::ClearFocusOverride,
            "killactive" => LayoutCommand::KillActive,
            "movetoworkspace" => {
                let workspace = WorkspaceId(args.parse_first()?);
                let flags = args.flags(&["follow"])?;
                LayoutCommand::MoveToWorkspace { workspace, follow: !flags.is_empty() }
            }
            "expand" => {
                let option = args.parse_first()?;
                let flags = args.flags(&[
                    "maximize_only",
                    "intermediate_maximize",
                    "maximize_intermediate",
                    "fullscreen_expand",
                    "maximize_as_fullscreen",
                ])?;
                let fullscreen = flags.last().and_then(|f| f.parse().ok());
                LayoutCommand::Expand { option, fullscreen }
            }
            "resizeactive" => Self::parse_resize(&args)?,
            "setswallow" => LayoutCommand::SetSwallow(args.parse_first()?),
            "splitratio" => {
                let (raw, exact) = match args.tokens.as_slice() {
                    ["exact", raw] => (*raw, true),
                    [raw] => (*raw, false),
                    _ => return Err(args.invalid(argument)),
                };
                let ratio: f64 = raw.parse().map_err(|_| args.invalid(raw))?;
                LayoutCommand::SplitRatio { ratio, exact }
            }
            "debugnodes" => LayoutCommand::DebugNodes,
            _ => return Err(CommandError::UnknownCommand(name.to_string())),
        };
        Ok(command)
    }

    fn parse_focus_tab(args: &Args<'_>) -> Result<Self, CommandError> {
        let first = args.first()?;
        let target = match first {
            "l" | "left" => TabFocus::Left,
            "r" | "right" => TabFocus::Right,
            "mouse" => TabFocus::MouseLocation,
            _ => {
                // Tab indices on the command line start at 1.
                let index: usize = first
                    .strip_prefix("index:")
                    .and_then(|n| n.parse().ok())
                    .filter(|&n| n > 0)
                    .ok_or_else(|| args.invalid(first))?;
                TabFocus::Index(index - 1)
            }
        };
        let flags = args.flags(&["prioritize_hovered", "require_hovered", "wrap", "nowrap"])?;
        let priority = flags
            .iter()
            .find_map(|f| TabFocusMousePriority::from_str(f).ok())
            .unwrap_or_default();
        let wrap = flags.iter().rev().find_map(|f| match *f {
            "wrap" => Some(true),
            "nowrap" => Some(false),
            _ => None,
        });
        Ok(LayoutCommand::FocusTab { target, priority, wrap })
    }

    fn parse_resize(args: &Args<'_>) -> Result<Self, CommandError> {
        let (x, y, exact) = match args.tokens.as_slice() {
            ["exact", x, y] => (x, y, true),
            [x, y] => (x, y, false),
            _ => return Err(args.invalid(&args.tokens.join(" "))),
        };
        let x = ResizeValue::parse(x).ok_or_else(|| args.invalid(x))?;
        let y = ResizeValue::parse(y).ok_or_else(|| args.invalid(y))?;
        Ok(LayoutCommand::ResizeActive(if exact {
            ResizeDelta::exact(x, y)
        } else {
            ResizeDelta::relative(x, y)
        }))
    }
}
