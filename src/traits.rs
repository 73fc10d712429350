//! Core traits that decouple hyprstay from any specific compositor or
//! transport mechanism.
//!
//! Every concrete backend (Hyprland, a Unix-socket listener, a test harness,
//! …) implements one of these traits.  The
//! [`GeometryGuardian`](crate::guardian::GeometryGuardian) only depends on
//! these abstractions.

use crate::event::{Event, MonitorInfo, WindowId, WindowInfo};
use crate::geometry::Rect;
use std::sync::mpsc;

/// Abstraction over the compositor whose windows are being guarded.
///
/// An implementation might talk to Hyprland via IPC, or it might be an
/// in-memory stub used in tests.
pub trait WindowHost {
    /// The error type produced by this host.
    type Error: std::error::Error + Send + 'static;

    /// Return every window that currently exists, special ones included.
    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error>;

    /// Return a single window, or `None` if it no longer exists.
    fn window(&self, id: &WindowId) -> Result<Option<WindowInfo>, Self::Error>;

    /// Return the monitors that are currently connected and enabled.
    ///
    /// Callers that need several point lookups take one snapshot and
    /// resolve points with [`monitor_at`](crate::event::monitor_at).
    fn monitors(&self) -> Result<Vec<MonitorInfo>, Self::Error>;

    /// Move and resize the window to `geometry`.
    ///
    /// The host may report the change back as a
    /// [`WindowGeometryChanged`](Event::WindowGeometryChanged) event at any
    /// later point.
    fn set_geometry(&self, id: &WindowId, geometry: Rect) -> Result<(), Self::Error>;
}

//  Event Source

/// A source of [`Event`]s.
///
/// Implementations listen on some transport (Hyprland's event socket, a
/// Unix socket, an in-memory channel, …) and forward translated events
/// into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Events must be sent in the order the transport delivered them.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Event`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error>;
}
