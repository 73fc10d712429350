//! Hyprland-specific implementations.
//!
//! This module provides concrete backends for the
//! [`WindowHost`](crate::traits::WindowHost) and
//! [`EventSource`](crate::traits::EventSource) traits, powered by
//! Hyprland's IPC sockets.
//!
//! Nothing outside this module should reference Hyprland directly.

pub mod events;
pub mod host;
