//! Translates Hyprland's event stream into hyprstay [`Event`]s.
//!
//! Hyprland writes one `EVENT>>DATA\n` line per notification to its event
//! socket (`socket2`) at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`.
//!
//! | Hyprland event                         | Payload                    | Emitted as                   |
//! |----------------------------------------|----------------------------|------------------------------|
//! | `openwindow`                           | `ADDR,WS,CLASS,TITLE`      | [`Event::WindowAdded`]       |
//! | `closewindow`                          | `ADDR`                     | [`Event::WindowRemoved`]     |
//! | `movewindow` / `movewindowv2`          | `ADDR,WS[,WSNAME]`         | [`Event::WindowGeometryChanged`] |
//! | `changefloatingmode`                   | `ADDR,FLOATING`            | [`Event::WindowGeometryChanged`] |
//! | `fullscreen`                           | `0` / `1`                  | [`Event::LayoutChanged`]     |
//! | `monitoradded[v2]` / `monitorremoved[v2]` | monitor name or id      | resize pair, see below       |
//!
//! Every window event is followed by [`Event::LayoutChanged`]: Hyprland
//! re-tiles the neighbours of a window that opens, closes or moves and
//! reports none of them.
//!
//! Hyprland has no "about to resize" notification.  On the first monitor
//! event [`HyprlandEventSource`] emits [`Event::WorkspaceAboutToResize`]
//! right away and [`Event::WorkspaceResized`] once
//! [`EventsConfig::settle_ms`] has passed.  Further monitor events inside
//! that window (Hyprland sends both the v1 and v2 flavour, and docks often
//! unplug several outputs at once) are folded into the pending resize.

use crate::config::EventsConfig;
use crate::event::{Event, WindowId};
use crate::traits::EventSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// What a single socket2 line means to the guardian.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Notification {
    Window(Event),
    Layout,
    MonitorChanged,
}

/// An [`EventSource`] that listens to Hyprland's raw IPC event socket.
///
/// The socket is connected up front so that the caller can enumerate
/// existing windows afterwards without missing one opened in between.
pub struct HyprlandEventSource {
    stream: Option<UnixStream>,
    config: EventsConfig,
}

impl HyprlandEventSource {
    /// Connect to the event socket of the running Hyprland instance.
    pub fn connect(config: EventsConfig) -> Result<Self, HyprlandEventError> {
        let path = socket2_path()?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandEventError(format!("connect to {}: {}", path.display(), e)))?;
        info!("event source connected to {}", path.display());
        Ok(Self::from_stream(stream, config))
    }

    /// Wrap an already connected event stream.
    pub fn from_stream(stream: UnixStream, config: EventsConfig) -> Self {
        Self {
            stream: Some(stream),
            config,
        }
    }
}

/// Tracks whether a `WorkspaceResized` is already scheduled.
///
/// Shared between the socket reader and the settle timer; the lock is held
/// while sending so the two resize events can never interleave with a
/// competing pair.
#[derive(Clone, Default)]
struct PendingResize(Arc<Mutex<bool>>);

impl PendingResize {
    /// Begin a resize unless one is pending.  Returns `true` if this call
    /// started it.
    fn begin(&self, sink: &mpsc::Sender<Event>) -> bool {
        let mut pending = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if *pending {
            return false;
        }
        *pending = true;
        let _ = sink.send(Event::WorkspaceAboutToResize);
        true
    }

    fn finish(&self, sink: &mpsc::Sender<Event>) {
        let mut pending = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *pending = false;
        let _ = sink.send(Event::WorkspaceResized);
    }
}

/// Resolve the Hyprland event socket path.
///
/// Hyprland stores its sockets at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`.
fn socket2_path() -> Result<PathBuf, HyprlandEventError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandEventError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandEventError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket2.sock",
        runtime_dir, his
    )))
}

/// Parse a single event line from socket2.
///
/// Lines have the form `EVENT>>DATA\n`.
fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    let sep = line.find(">>")?;
    Some((&line[..sep], &line[sep + 2..]))
}

/// The window address is always the first comma-separated field.
fn leading_window_id(data: &str) -> Option<WindowId> {
    data.split(',').next().and_then(WindowId::parse)
}

fn translate(event: &str, data: &str) -> Option<Notification> {
    let window_event: fn(WindowId) -> Event = match event {
        "openwindow" => Event::WindowAdded,
        "closewindow" => Event::WindowRemoved,
        "movewindow" | "movewindowv2" | "changefloatingmode" => Event::WindowGeometryChanged,
        "fullscreen" => return Some(Notification::Layout),
        "monitoradded" | "monitoraddedv2" | "monitorremoved" | "monitorremovedv2" => {
            return Some(Notification::MonitorChanged)
        }
        _ => return None,
    };
    match leading_window_id(data) {
        Some(id) => Some(Notification::Window(window_event(id))),
        None => {
            warn!("{} event with bad address: {:?}", event, data);
            None
        }
    }
}

/// Process a single event and potentially emit events.
fn handle_event(
    event: &str,
    data: &str,
    pending: &PendingResize,
    settle: Duration,
    sink: &mpsc::Sender<Event>,
) {
    match translate(event, data) {
        Some(Notification::Window(e)) => {
            debug!("{}>>{} -> {:?}", event, data, e);
            let _ = sink.send(e);
            let _ = sink.send(Event::LayoutChanged);
        }
        Some(Notification::Layout) => {
            let _ = sink.send(Event::LayoutChanged);
        }
        Some(Notification::MonitorChanged) => {
            if pending.begin(sink) {
                info!("{} {}, relocating in {:?}", event, data, settle);
                let pending = pending.clone();
                let sink = sink.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(settle);
                    pending.finish(&sink);
                });
            } else {
                debug!("{} {} folded into pending resize", event, data);
            }
        }
        None => {}
    }
}

impl EventSource for HyprlandEventSource {
    type Error = HyprlandEventError;

    /// Start translating events from the connected socket.
    ///
    /// This method **blocks** forever (until the socket is closed or an
    /// error occurs).  Run it on a dedicated thread.  It can only run once.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| HyprlandEventError("event stream already consumed".into()))?;
        let reader = BufReader::new(stream);
        let pending = PendingResize::default();
        let settle = Duration::from_millis(self.config.settle_ms);

        for line in reader.lines() {
            match line {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => {
                    if let Some((event, data)) = parse_event_line(&line) {
                        handle_event(event, data, &pending, settle, &sink);
                    }
                }
                Err(e) => {
                    error!("socket2 read error: {}", e);
                    return Err(HyprlandEventError(format!("read error: {}", e)));
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

/// Error from the Hyprland event source.
#[derive(Debug, thiserror::Error)]
#[error("hyprland event error: {0}")]
pub struct HyprlandEventError(String);

//  Tests
