//! The policy that keeps windows where they were when monitors come and go.
//!
//! [`GeometryGuardian`] owns a cache of the last geometry each window had
//! while the monitor layout was stable.  When the layout changes it puts
//! back every window whose remembered center no longer lands on the monitor
//! the window is assigned to.
//!
//! # Suppression
//!
//! Between [`Event::WorkspaceAboutToResize`] and [`Event::WorkspaceResized`]
//! geometry changes are not cached.  Those changes come from the compositor
//! shuffling windows off a vanishing monitor, or from the guardian's own
//! corrective writes, and caching them would overwrite the rectangle the
//! relocation pass is about to restore.

use crate::event::{monitor_at, Event, MonitorInfo, WindowId, WindowInfo};
use crate::geometry::Rect;
use crate::traits::WindowHost;
use log::{debug, info, warn};
use std::collections::HashMap;

/// Possible errors from the guardian.
#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    /// The host could not be queried at all.
    #[error("window host error: {0}")]
    Host(String),
}

/// Tracks last known window geometry and restores it after monitor changes.
///
/// The guardian is generic over any [`WindowHost`], making it completely
/// independent of Hyprland or any other concrete backend.  All handlers
/// take `&mut self`, so the owner must deliver events from a single thread.
///
/// # Typical usage
///
/// ```ignore
/// let mut guardian = GeometryGuardian::new(HyprlandHost::new(config));
/// guardian.start()?;
/// for event in rx {
///     guardian.handle(event)?;
/// }
/// ```
pub struct GeometryGuardian<H: WindowHost> {
    host: H,
    last_geometry: HashMap<WindowId, Rect>,
    suppressed: bool,
}

impl<H: WindowHost> GeometryGuardian<H> {
    /// Create a guardian with an empty cache.
    ///
    /// Call [`start`](Self::start) to pick up windows that already exist.
    pub fn new(host: H) -> Self {
        Self {
            host,
            last_geometry: HashMap::new(),
            suppressed: false,
        }
    }

    /// Seed the cache from every window that exists right now.
    ///
    /// Returns the number of windows being tracked afterwards.
    pub fn start(&mut self) -> Result<usize, GuardianError> {
        let windows = self.host.windows().map_err(host_error)?;
        for window in &windows {
            self.track(window);
        }
        info!(
            "tracking {} of {} existing window(s)",
            self.last_geometry.len(),
            windows.len()
        );
        Ok(self.last_geometry.len())
    }

    /// Dispatch a single event to its handler.
    pub fn handle(&mut self, event: Event) -> Result<(), GuardianError> {
        debug!("handling {:?}", event);
        match event {
            Event::WindowAdded(id) => self.on_window_added(&id),
            Event::WindowRemoved(id) => {
                self.on_window_removed(&id);
                Ok(())
            }
            Event::WindowGeometryChanged(id) => self.on_window_geometry_changed(&id),
            Event::LayoutChanged => self.on_layout_changed(),
            Event::WorkspaceAboutToResize => {
                self.on_workspace_about_to_resize();
                Ok(())
            }
            Event::WorkspaceResized => self.on_workspace_resized(),
        }
    }

    /// Start tracking a new window unless it is special.
    ///
    /// Seeding happens even while suppressed: a window that appears in the
    /// middle of a resize has no earlier geometry to protect.
    pub fn on_window_added(&mut self, id: &WindowId) -> Result<(), GuardianError> {
        match self.host.window(id).map_err(host_error)? {
            Some(window) => self.track(&window),
            None => debug!("window {} vanished before it could be tracked", id),
        }
        Ok(())
    }

    /// Forget a destroyed window.
    pub fn on_window_removed(&mut self, id: &WindowId) {
        if self.last_geometry.remove(id).is_some() {
            debug!("window {} closed, dropped from cache", id);
        }
    }

    /// Record the window's current geometry, unless suppressed or untracked.
    pub fn on_window_geometry_changed(&mut self, id: &WindowId) -> Result<(), GuardianError> {
        if self.suppressed {
            debug!("ignoring geometry change of {} during resize", id);
            return Ok(());
        }
        if !self.last_geometry.contains_key(id) {
            return Ok(());
        }
        if let Some(window) = self.host.window(id).map_err(host_error)? {
            debug!("window {} now at {}", id, window.geometry);
            self.last_geometry.insert(window.id, window.geometry);
        }
        Ok(())
    }

    /// Refresh every tracked window from one snapshot, unless suppressed.
    ///
    /// Tiling compositors resize neighbours when a window opens, closes or
    /// moves without reporting each of them.
    pub fn on_layout_changed(&mut self) -> Result<(), GuardianError> {
        if self.suppressed {
            debug!("ignoring layout change during resize");
            return Ok(());
        }
        let windows = self.host.windows().map_err(host_error)?;
        for window in windows {
            if let Some(cached) = self.last_geometry.get_mut(&window.id) {
                *cached = window.geometry;
            }
        }
        Ok(())
    }

    /// Stop caching geometry changes until the resize has been handled.
    pub fn on_workspace_about_to_resize(&mut self) {
        debug!("workspace about to resize, suppressing geometry updates");
        self.suppressed = true;
    }

    /// Restore misplaced windows, then resume caching geometry changes.
    ///
    /// Suppression is lifted even if the host cannot be queried.
    pub fn on_workspace_resized(&mut self) -> Result<(), GuardianError> {
        let result = self.relocate_all();
        self.suppressed = false;
        let restored = result?;
        info!("workspace resized, restored {} window(s)", restored);
        Ok(())
    }

    /// Last cached geometry of a window, if it is being tracked.
    pub fn last_geometry(&self, id: &WindowId) -> Option<Rect> {
        self.last_geometry.get(id).copied()
    }

    /// Number of windows being tracked.
    pub fn tracked(&self) -> usize {
        self.last_geometry.len()
    }

    /// Whether geometry updates are currently being ignored.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Shared reference to the underlying host.
    pub fn host(&self) -> &H {
        &self.host
    }

    //  Internals

    fn track(&mut self, window: &WindowInfo) {
        if window.special {
            debug!("not tracking special window {} ({})", window.id, window.class);
            return;
        }
        debug!("tracking {} ({}) at {}", window.id, window.class, window.geometry);
        self.last_geometry.insert(window.id.clone(), window.geometry);
    }

    /// Walk all windows and restore those that need it.  Returns the number
    /// of corrective writes.  A failure on one window never stops the pass.
    ///
    /// Monitors are read once, so every window is judged against the same
    /// layout even if another hotplug lands mid-pass.
    fn relocate_all(&self) -> Result<usize, GuardianError> {
        let monitors = self.host.monitors().map_err(host_error)?;
        let windows = self.host.windows().map_err(host_error)?;
        let mut restored = 0;
        for window in windows.iter().filter(|w| !w.special) {
            let Some(last) = self.last_geometry(&window.id) else {
                continue;
            };
            match self.relocate(window, last, &monitors) {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(e) => warn!("could not restore {}: {}", window.id, e),
            }
        }
        Ok(restored)
    }

    fn relocate(
        &self,
        window: &WindowInfo,
        last: Rect,
        monitors: &[MonitorInfo],
    ) -> Result<bool, H::Error> {
        let (cx, cy) = last.center();
        let found = monitor_at(monitors, cx, cy);
        if !needs_restore(found, window.monitor.as_deref()) {
            return Ok(false);
        }
        debug!(
            "restoring {} to {} (center on {:?}, assigned to {:?})",
            window.id, last, found, window.monitor
        );
        self.host.set_geometry(&window.id, last)?;
        Ok(true)
    }
}

/// A window is restored when its remembered center is off every monitor, or
/// on a monitor other than the one it is assigned to now.
fn needs_restore(found: Option<&str>, current: Option<&str>) -> bool {
    match found {
        Some(monitor) => current != Some(monitor),
        None => true,
    }
}

fn host_error<E: std::error::Error>(e: E) -> GuardianError {
    GuardianError::Host(e.to_string())
}

//  Tests
