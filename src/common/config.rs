use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout_engine::ExpandFullscreenOption;

/// Location of the user configuration, if the platform has a config directory.
pub fn config_file() -> Option<PathBuf> { dirs::config_dir().map(|dir| dir.join("grove.toml")) }

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Gap configuration for window spacing
    #[serde(default)]
    pub gaps: GapSettings,
    /// Drop all gaps while a workspace shows a single tiled window
    #[serde(default)]
    pub no_gaps_when_only: bool,
    #[serde(default)]
    pub tabs: TabSettings,
    #[serde(default)]
    pub autotile: AutotileSettings,
    #[serde(default)]
    pub resize: ResizeSettings,
    #[serde(default)]
    pub focus: FocusSettings,
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Outer gaps (space between windows and screen edges)
    #[serde(default)]
    pub outer: OuterGaps,
    /// Inner gaps (space between windows)
    #[serde(default)]
    pub inner: InnerGaps,
}

/// Outer gap configuration (space between windows and screen edges)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

/// Inner gap configuration (space between windows)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    #[serde(default)]
    pub horizontal: f64,
    #[serde(default)]
    pub vertical: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TabSettings {
    /// Height of the tab bar drawn above a tabbed group
    #[serde(default = "default_tab_height")]
    pub height: f64,
    /// Space between the tab bar and the windows below it
    #[serde(default = "default_tab_padding")]
    pub padding: f64,
    /// Place the bar at the top of the group instead of the bottom
    #[serde(default = "yes")]
    pub from_top: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AutotileSettings {
    #[serde(default)]
    pub enable: bool,
    /// Groups created by autotiling dissolve when a single window remains
    #[serde(default = "yes")]
    pub ephemeral_groups: bool,
    /// `all`, a list such as `1,3,5-8`, or `not:<list>` to exclude workspaces
    #[serde(default = "default_autotile_workspaces")]
    pub workspaces: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResizeSettings {
    /// Smallest share of its group a resize may leave any child with
    #[serde(default = "default_min_ratio")]
    pub min_ratio: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct FocusSettings {
    /// Wrap around when scrolling past the first or last tab
    #[serde(default = "yes")]
    pub wrap_tab_scroll: bool,
    /// What `expand` does once the node already covers the whole workspace
    #[serde(default)]
    pub expand_fullscreen: ExpandFullscreenOption,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            height: default_tab_height(),
            padding: default_tab_padding(),
            from_top: true,
        }
    }
}

impl Default for AutotileSettings {
    fn default() -> Self {
        Self {
            enable: false,
            ephemeral_groups: true,
            workspaces: default_autotile_workspaces(),
        }
    }
}

impl Default for ResizeSettings {
    fn default() -> Self { Self { min_ratio: default_min_ratio() } }
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            wrap_tab_scroll: true,
            expand_fullscreen: ExpandFullscreenOption::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.gaps.validate());
        issues.extend(self.tabs.validate());
        issues.extend(self.resize.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.gaps.auto_fix_values() + self.tabs.auto_fix_values() + self.resize.auto_fix_values()
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.outer.validate());
        issues.extend(self.inner.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.outer.auto_fix_values() + self.inner.auto_fix_values()
    }
}

impl OuterGaps {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, value) in
            [("top", self.top), ("left", self.left), ("bottom", self.bottom), ("right", self.right)]
        {
            if value < 0.0 {
                issues.push(format!("outer.{name} gap must be non-negative, got {value}"));
            }
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        for value in [&mut self.top, &mut self.left, &mut self.bottom, &mut self.right] {
            if *value < 0.0 {
                *value = 0.0;
                fixes += 1;
            }
        }
        fixes
    }
}

impl InnerGaps {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.horizontal < 0.0 {
            issues.push(format!(
                "inner.horizontal gap must be non-negative, got {}",
                self.horizontal
            ));
        }
        if self.vertical < 0.0 {
            issues.push(format!(
                "inner.vertical gap must be non-negative, got {}",
                self.vertical
            ));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.horizontal < 0.0 {
            self.horizontal = 0.0;
            fixes += 1;
        }
        if self.vertical < 0.0 {
            self.vertical = 0.0;
            fixes += 1;
        }
        fixes
    }
}

impl TabSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.height < 0.0 {
            issues.push(format!("tabs.height must be non-negative, got {}", self.height));
        }
        if self.padding < 0.0 {
            issues.push(format!("tabs.padding must be non-negative, got {}", self.padding));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.height < 0.0 {
            self.height = default_tab_height();
            fixes += 1;
        }
        if self.padding < 0.0 {
            self.padding = default_tab_padding();
            fixes += 1;
        }
        fixes
    }
}

impl ResizeSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(0.0..0.5).contains(&self.min_ratio) {
            issues.push(format!(
                "resize.min_ratio must be in [0, 0.5), got {}",
                self.min_ratio
            ));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        if (0.0..0.5).contains(&self.min_ratio) {
            return 0;
        }
        self.min_ratio = default_min_ratio();
        1
    }
}

fn yes() -> bool { true }

fn default_tab_height() -> f64 { 15.0 }

fn default_tab_padding() -> f64 { 5.0 }

fn default_min_ratio() -> f64 { 0.05 }

fn default_autotile_workspaces() -> String { "all".to_string() }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../grove.default.toml"))
            .expect("bundled default config must parse")
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile { settings: self.settings.clone() };
        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        Ok(Config { settings: c.settings })
    }
}
