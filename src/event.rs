//! Events and types used throughout hyprstay.
//!
//! This module defines the vocabulary that all components share:
//! [`Event`] describes every notification the guardian reacts to, and
//! [`WindowId`] / [`MonitorInfo`] / [`WindowInfo`] provide the supporting
//! data types.
//!
//! Window ids are accepted with or without the `0x` prefix because
//! Hyprland itself is inconsistent: `j/clients` reports `0x55d0c8a1`,
//! while the event socket sends `55d0c8a1`.

use crate::geometry::Rect;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Stable identity of a window for as long as it exists.
///
/// Always stored in canonical form: lowercase hex digits without the `0x`
/// prefix.  [`Display`](fmt::Display) adds the prefix back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowId(String);

impl WindowId {
    /// Parse an address such as `"0x55D0C8A1"` or `"55d0c8a1"`.
    ///
    /// Returns `None` for an empty string or anything that is not hex.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(digits.to_ascii_lowercase()))
    }

    /// The address in the `0x…` form the Hyprland dispatchers expect.
    pub fn address(&self) -> String {
        format!("0x{}", self.0)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

impl Serialize for WindowId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.address())
    }
}

impl<'de> Deserialize<'de> for WindowId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        WindowId::parse(&s).ok_or_else(|| DeError::custom(format!("invalid window address: {:?}", s)))
    }
}

/// Every notification the [`GeometryGuardian`](crate::guardian::GeometryGuardian)
/// reacts to.
///
/// Events are produced by [`EventSource`](crate::traits::EventSource)
/// implementations and consumed by the guardian on a single thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A window appeared and should be tracked unless it is special.
    WindowAdded(WindowId),

    /// A window was destroyed.  Its cached geometry is dropped.
    WindowRemoved(WindowId),

    /// The window's position or size may have changed.
    ///
    /// The event carries no geometry; the guardian asks the host for the
    /// current rectangle, so a stale or duplicated event is harmless.
    WindowGeometryChanged(WindowId),

    /// The compositor may have re-laid out any number of windows without
    /// reporting each one (tiling after a window opens or closes).  Every
    /// tracked window is refreshed from one snapshot.
    LayoutChanged,

    /// The set of monitors is about to change.  Geometry changes seen
    /// from now on until [`WorkspaceResized`](Event::WorkspaceResized)
    /// are not cached.
    WorkspaceAboutToResize,

    /// The set of monitors has changed.  Windows whose last known
    /// geometry no longer lands on their monitor are put back.
    WorkspaceResized,
}

impl Event {
    /// Whether the event opens or closes a resize.  Only the source that
    /// observes monitor changes may emit these.
    pub fn is_resize(&self) -> bool {
        matches!(self, Event::WorkspaceAboutToResize | Event::WorkspaceResized)
    }
}

/// Static information about a monitor known to the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    /// Compositor-assigned numeric id.
    pub id: i64,
    /// Connector name (e.g. `"DP-1"`).
    pub name: String,
    /// Area covered on the virtual desktop.
    pub geometry: Rect,
}

impl MonitorInfo {
    /// Whether the point lies on this monitor.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.geometry.contains(x, y)
    }
}

/// A window as currently seen by the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    /// Application class (Wayland app-id or X11 WM_CLASS).
    pub class: String,
    pub title: String,
    /// Name of the monitor the window is assigned to, if any.
    pub monitor: Option<String>,
    /// Current frame geometry.
    pub geometry: Rect,
    /// Docks, overlays, scratchpads and other windows that must never be
    /// relocated.
    pub special: bool,
}

/// Return the name of the first monitor in `monitors` containing the point.
pub fn monitor_at(monitors: &[MonitorInfo], x: i32, y: i32) -> Option<&str> {
    monitors
        .iter()
        .find(|m| m.contains(x, y))
        .map(|m| m.name.as_str())
}
