//! [`WindowHost`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`,
//! avoiding any shell command invocation or third-party crate for socket
//! discovery.

use crate::config::GuardianConfig;
use crate::event::{MonitorInfo, WindowId, WindowInfo};
use crate::geometry::Rect;
use crate::traits::WindowHost;
use log::warn;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Hyprland-backed window host.
///
/// All communication happens over Hyprland's IPC socket
/// (`$XDG_RUNTIME_DIR/hypr/<instance>/.socket.sock`).  No child processes
/// are spawned.
pub struct HyprlandHost {
    config: GuardianConfig,
}

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandHostError(String);

impl HyprlandHost {
    /// Create a new handle that classifies special windows per `config`.
    ///
    /// No connection is opened eagerly; each method call opens a short-lived
    /// IPC request.
    pub fn new(config: GuardianConfig) -> Self {
        Self { config }
    }
}

//  Direct Hyprland IPC helpers

/// Resolve the Hyprland command socket path.
///
/// Hyprland ≥ 0.40 stores its sockets at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
fn socket_path() -> Result<PathBuf, HyprlandHostError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandHostError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandHostError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket.sock",
        runtime_dir, his
    )))
}

/// Send a raw command to the Hyprland command socket and return the
/// response as a string.
fn ipc_request(command: &str) -> Result<String, HyprlandHostError> {
    let path = socket_path()?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandHostError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandHostError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandHostError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandHostError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and return the raw JSON string.
fn ipc_json(data_command: &str) -> Result<String, HyprlandHostError> {
    ipc_request(&format!("j/{}", data_command))
}

/// Send a dispatch command and check for `"ok"`.
fn ipc_dispatch(args: &str) -> Result<(), HyprlandHostError> {
    let response = ipc_request(&format!("/dispatch {}", args))?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandHostError(format!("dispatch error: {}", response)))
    }
}

//  Minimal serde structs for the JSON we care about

/// Subset of the JSON object returned by `j/monitors`.
#[derive(Deserialize)]
struct MonitorJson {
    id: i64,
    name: String,
    width: i32,
    height: i32,
    x: i32,
    y: i32,
    #[serde(default = "unit_scale")]
    scale: f64,
    #[serde(default)]
    transform: i32,
}

fn unit_scale() -> f64 {
    1.0
}

/// Subset of `j/clients[].workspace`.
#[derive(Deserialize)]
struct WorkspaceRefJson {
    name: String,
}

/// Subset of the JSON object returned by `j/clients`.
#[derive(Deserialize)]
struct ClientJson {
    address: String,
    at: [i32; 2],
    size: [i32; 2],
    workspace: WorkspaceRefJson,
    monitor: i64,
    #[serde(default)]
    class: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    pinned: bool,
}

impl MonitorJson {
    /// Area in the logical coordinate space windows live in.
    ///
    /// `width`/`height` are the mode in physical pixels; rotated monitors
    /// (odd transforms) swap the axes before scaling.
    fn logical_geometry(&self) -> Rect {
        let (w, h) = if self.transform % 2 == 1 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        Rect::new(
            self.x,
            self.y,
            (w as f64 / scale).round() as i32,
            (h as f64 / scale).round() as i32,
        )
    }
}

fn parse_monitors(json: &str) -> Result<Vec<MonitorInfo>, HyprlandHostError> {
    let monitors: Vec<MonitorJson> =
        serde_json::from_str(json).map_err(|e| HyprlandHostError(format!("parse: {}", e)))?;
    Ok(monitors
        .into_iter()
        .map(|m| MonitorInfo {
            id: m.id,
            geometry: m.logical_geometry(),
            name: m.name,
        })
        .collect())
}

fn parse_clients(
    json: &str,
    monitors: &[MonitorInfo],
    config: &GuardianConfig,
) -> Result<Vec<WindowInfo>, HyprlandHostError> {
    let clients: Vec<ClientJson> =
        serde_json::from_str(json).map_err(|e| HyprlandHostError(format!("parse: {}", e)))?;
    Ok(clients
        .into_iter()
        .filter_map(|c| {
            let info = window_info(c, monitors, config);
            if info.is_none() {
                warn!("skipping client with unparsable address");
            }
            info
        })
        .collect())
}

/// Convert a client into a [`WindowInfo`], classifying it against `config`.
fn window_info(c: ClientJson, monitors: &[MonitorInfo], config: &GuardianConfig) -> Option<WindowInfo> {
    let id = WindowId::parse(&c.address)?;
    let special = (config.ignore_special_workspaces && c.workspace.name.starts_with("special:"))
        || (config.ignore_pinned && c.pinned)
        || config.ignores_class(&c.class);
    let monitor = monitors
        .iter()
        .find(|m| m.id == c.monitor)
        .map(|m| m.name.clone());
    Some(WindowInfo {
        id,
        class: c.class,
        title: c.title,
        monitor,
        geometry: Rect::new(c.at[0], c.at[1], c.size[0], c.size[1]),
        special,
    })
}

//  WindowHost implementation

impl WindowHost for HyprlandHost {
    type Error = HyprlandHostError;

    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error> {
        let monitors = self.monitors()?;
        parse_clients(&ipc_json("clients")?, &monitors, &self.config)
    }

    fn window(&self, id: &WindowId) -> Result<Option<WindowInfo>, Self::Error> {
        Ok(self.windows()?.into_iter().find(|w| &w.id == id))
    }

    fn monitors(&self) -> Result<Vec<MonitorInfo>, Self::Error> {
        parse_monitors(&ipc_json("monitors")?)
    }

    fn set_geometry(&self, id: &WindowId, geometry: Rect) -> Result<(), Self::Error> {
        let address = id.address();
        ipc_dispatch(&format!(
            "movewindowpixel exact {} {},address:{}",
            geometry.x, geometry.y, address
        ))?;
        ipc_dispatch(&format!(
            "resizewindowpixel exact {} {},address:{}",
            geometry.width, geometry.height, address
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONITORS: &str = r#"[
        {"id": 0, "name": "eDP-1", "width": 2880, "height": 1800, "x": 0, "y": 0,
         "scale": 2.0, "transform": 0, "focused": true},
        {"id": 1, "name": "DP-2", "width": 2560, "height": 1440, "x": 1440, "y": 0,
         "scale": 1.0, "transform": 1}
    ]"#;

    fn client(address: &str, workspace: &str, class: &str, pinned: bool) -> String {
        format!(
            r#"{{"address": "{}", "mapped": true, "at": [1500, 40], "size": [800, 600],
                "workspace": {{"id": 3, "name": "{}"}}, "floating": true, "monitor": 1,
                "class": "{}", "title": "t", "pinned": {}, "fullscreen": 0}}"#,
            address, workspace, class, pinned
        )
    }

    #[test]
    fn monitors_use_logical_size() {
        let monitors = parse_monitors(MONITORS).unwrap();
        assert_eq!(monitors[0].geometry, Rect::new(0, 0, 1440, 900));
        // Portrait: axes swapped.
        assert_eq!(monitors[1].geometry, Rect::new(1440, 0, 1440, 2560));
    }

    #[test]
    fn monitors_without_scale_default_to_one() {
        let json = r#"[{"id": 0, "name": "HDMI-A-1", "width": 1920, "height": 1080, "x": 0, "y": 0}]"#;
        let monitors = parse_monitors(json).unwrap();
        assert_eq!(monitors[0].geometry, Rect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn clients_resolve_monitor_and_geometry() {
        let monitors = parse_monitors(MONITORS).unwrap();
        let json = format!("[{}]", client("0x55D0C8A1", "3", "kitty", false));
        let windows = parse_clients(&json, &monitors, &GuardianConfig::default()).unwrap();
        assert_eq!(windows.len(), 1);
        let w = &windows[0];
        assert_eq!(w.id, WindowId::parse("55d0c8a1").unwrap());
        assert_eq!(w.monitor.as_deref(), Some("DP-2"));
        assert_eq!(w.geometry, Rect::new(1500, 40, 800, 600));
        assert!(!w.special);
    }

    #[test]
    fn unknown_monitor_id_is_none() {
        let json = format!("[{}]", client("0xa", "3", "kitty", false));
        let windows = parse_clients(&json, &[], &GuardianConfig::default()).unwrap();
        assert_eq!(windows[0].monitor, None);
    }

    #[test]
    fn special_classification_follows_config() {
        let monitors = parse_monitors(MONITORS).unwrap();
        let json = format!(
            "[{},{},{},{}]",
            client("0x1", "special:scratch", "kitty", false),
            client("0x2", "3", "kitty", true),
            client("0x3", "3", "Waybar", false),
            client("0x4", "3", "firefox", false),
        );
        let config = GuardianConfig {
            ignore_classes: vec!["waybar".into()],
            ..GuardianConfig::default()
        };
        let windows = parse_clients(&json, &monitors, &config).unwrap();
        let special: Vec<bool> = windows.iter().map(|w| w.special).collect();
        assert_eq!(special, vec![true, true, true, false]);

        let lenient = GuardianConfig {
            ignore_classes: Vec::new(),
            ignore_pinned: false,
            ignore_special_workspaces: false,
        };
        let windows = parse_clients(&json, &monitors, &lenient).unwrap();
        assert!(windows.iter().all(|w| !w.special));
    }

    #[test]
    fn only_special_prefixed_workspaces_are_scratchpads() {
        let json = format!(
            "[{},{}]",
            client("0x1", "special:term", "kitty", false),
            client("0x2", "specialists", "kitty", false),
        );
        let windows = parse_clients(&json, &[], &GuardianConfig::default()).unwrap();
        assert!(windows[0].special);
        assert!(!windows[1].special);
    }

    #[test]
    fn clients_with_bad_address_are_skipped() {
        let json = format!(
            "[{},{}]",
            client("nonsense", "3", "kitty", false),
            client("0xb", "3", "kitty", false)
        );
        let windows = parse_clients(&json, &[], &GuardianConfig::default()).unwrap();
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_monitors("not json").is_err());
        assert!(parse_clients("{}", &[], &GuardianConfig::default()).is_err());
    }
}
