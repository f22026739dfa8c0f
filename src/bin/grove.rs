//! Replays a layout script against an in-memory host and prints the result.
//!
//! Script lines:
//!
//! ```text
//! monitor <id> <x> <y> <width> <height> <workspace>
//! show <monitor> <workspace>
//! open <window> <workspace>
//! float <window> <workspace>
//! close <window>
//! focus <window>
//! cursor <x> <y>
//! fullscreen <window> on|off [maximized]
//! drag <dx> <dy> [corner]
//! move <window> <direction>
//! ratio <window> <value> [exact]
//! dispatch <command> [argument...]
//! tree
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use grove_wm::common::config::{Config, config_file};
use grove_wm::common::log;
use grove_wm::layout_engine::{
    EventResponse, FullscreenMode, LayoutEngine, LayoutEvent, RenderHint, ResizeCorner,
};
use grove_wm::sys::geometry::{Point, Rect};
use grove_wm::sys::headless::HeadlessHost;
use grove_wm::sys::host::{HostAdapter, MonitorId, WindowId, WorkspaceId};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Replay a layout script against a headless host")]
struct Cli {
    /// Script to replay
    script: Option<PathBuf>,
    /// Config file; defaults to grove.toml in the user config directory
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the final frames as JSON instead of trees
    #[arg(long)]
    json: bool,
    /// Check the config and exit
    #[arg(long)]
    validate: bool,
}

#[derive(Serialize)]
struct WorkspaceDump {
    workspace: WorkspaceId,
    monitor: MonitorId,
    windows: Vec<RenderHint>,
}

struct Replay {
    host: HeadlessHost,
    engine: LayoutEngine,
}

impl Replay {
    fn apply(&mut self, response: EventResponse) {
        for window in self.host.apply(&response) {
            // A compositor would ask the client to close; here it just goes.
            self.host.close_window(window);
            let response = self.engine.handle_event(&self.host, LayoutEvent::WindowRemoved(window));
            self.host.apply(&response);
        }
    }

    fn event(&mut self, event: LayoutEvent) {
        let response = self.engine.handle_event(&self.host, event);
        self.apply(response);
    }

    fn run_line(&mut self, line: &str) -> anyhow::Result<()> {
        let mut words = line.split_whitespace();
        let Some(op) = words.next() else { return Ok(()) };
        let args: Vec<&str> = words.collect();
        match (op, args.as_slice()) {
            ("monitor", [id, x, y, w, h, ws]) => {
                let frame = Rect::new(num(x)?, num(y)?, num(w)?, num(h)?);
                let monitor = MonitorId(num(id)?);
                self.host.add_monitor(monitor, frame, WorkspaceId(num(ws)?));
                self.event(LayoutEvent::RecalculateMonitor(monitor));
            }
            ("show", [monitor, ws]) => {
                let monitor = MonitorId(num(monitor)?);
                self.host.show_workspace(monitor, WorkspaceId(num(ws)?));
                self.event(LayoutEvent::RecalculateMonitor(monitor));
            }
            ("open" | "float", [window, ws]) => {
                let (window, workspace) = (WindowId(num(window)?), WorkspaceId(num(ws)?));
                self.host.open_window(window, workspace);
                self.event(LayoutEvent::WindowCreated { window, workspace, floating: op == "float" });
            }
            ("close", [window]) => {
                let window = WindowId(num(window)?);
                self.host.close_window(window);
                self.event(LayoutEvent::WindowRemoved(window));
            }
            ("focus", [window]) => {
                let window = WindowId(num(window)?);
                self.host.focus(Some(window));
                self.event(LayoutEvent::WindowFocused(window));
            }
            ("cursor", [x, y]) => self.host.set_cursor(Point::new(num(x)?, num(y)?)),
            ("fullscreen", [window, state, rest @ ..]) => {
                let window = WindowId(num(window)?);
                let enable = match *state {
                    "on" => true,
                    "off" => false,
                    other => bail!("expected on or off, got `{other}`"),
                };
                let mode = match rest {
                    ["maximized"] => FullscreenMode::Maximized,
                    [] => FullscreenMode::Fullscreen,
                    _ => bail!("unexpected arguments {rest:?}"),
                };
                if let Some(workspace) = self.host.workspace_of_window(window) {
                    self.host.set_fullscreen(workspace, enable && mode == FullscreenMode::Fullscreen);
                }
                self.event(LayoutEvent::FullscreenRequested { window, mode, enable });
            }
            ("drag", [dx, dy, rest @ ..]) => {
                let corner = match rest {
                    [] => None,
                    [corner] => Some(
                        ResizeCorner::from_str(corner)
                            .map_err(|_| anyhow!("unknown corner `{corner}`"))?,
                    ),
                    _ => bail!("unexpected arguments {rest:?}"),
                };
                self.event(LayoutEvent::ResizeRequested {
                    delta: Point::new(num(dx)?, num(dy)?),
                    corner,
                    window: None,
                });
            }
            ("move", [window, direction]) => {
                let response = self.engine.move_window_to(&self.host, WindowId(num(window)?), direction);
                self.apply(response);
            }
            ("ratio", [window, value, rest @ ..]) => {
                let exact = match rest {
                    [] => false,
                    ["exact"] => true,
                    _ => bail!("unexpected arguments {rest:?}"),
                };
                self.event(LayoutEvent::SplitRatioRequested {
                    window: WindowId(num(window)?),
                    ratio: num(value)?,
                    exact,
                });
            }
            ("dispatch", [command, argument @ ..]) => {
                let response = self.engine.layout_message(&self.host, command, &argument.join(" "));
                self.apply(response);
            }
            ("tree", []) => {
                for workspace in self.engine.state().store.workspaces().collect::<Vec<_>>() {
                    println!("{}", self.engine.draw_tree(workspace));
                }
            }
            _ => bail!("cannot parse `{line}`"),
        }
        Ok(())
    }

    fn dump(&mut self) -> Vec<WorkspaceDump> {
        let shown: Vec<_> = self.host.monitors().map(|(id, m)| (id, m.workspace)).collect();
        shown
            .into_iter()
            .map(|(monitor, workspace)| WorkspaceDump {
                workspace,
                monitor,
                windows: self.engine.render_hints(&self.host, workspace),
            })
            .collect()
    }
}

fn num<T: FromStr>(raw: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().with_context(|| format!("bad number `{raw}`"))
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path.or_else(config_file).filter(|p| p.exists()) else {
        return Ok(Config::default());
    };
    Config::read(&path)
}

fn main() -> anyhow::Result<()> {
    let opt = Cli::parse();
    log::init_logging();

    let mut config = load_config(opt.config)?;
    if opt.validate {
        let issues = config.validate();
        for issue in &issues {
            println!("{issue}");
        }
        if !issues.is_empty() {
            bail!("{} config issue(s)", issues.len());
        }
        return Ok(());
    }
    let fixed = config.auto_fix_values();
    if fixed > 0 {
        info!(fixed, "replaced invalid config values with defaults");
    }

    let Some(path) = opt.script else { bail!("no script given") };
    let script =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let mut replay = Replay {
        host: HeadlessHost::new(),
        engine: LayoutEngine::new(&config.settings),
    };
    replay.engine.on_enable();

    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        debug!(number = number + 1, line, "replaying");
        replay.run_line(line).with_context(|| format!("line {}", number + 1))?;
    }

    let dump = replay.dump();
    if opt.json {
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }
    for entry in dump {
        print!("{}", replay.engine.draw_tree(entry.workspace));
        for hint in entry.windows {
            let f = hint.frame;
            let mut flags = String::new();
            if !hint.visible {
                flags.push_str(" hidden");
            }
            if hint.selected {
                flags.push_str(" selected");
            }
            if hint.fullscreen {
                flags.push_str(" fullscreen");
            }
            println!(
                "  {} {}x{} @ {},{}{flags}",
                hint.window, f.size.width, f.size.height, f.origin.x, f.origin.y
            );
        }
    }
    Ok(())
}
