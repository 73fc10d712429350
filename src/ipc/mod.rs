//! IPC listener that accepts events over a Unix socket.
//!
//! Compositor plugins and scripts can connect to the socket and send
//! newline-delimited JSON events, e.g. geometry changes Hyprland does not
//! report on its own event socket.

pub mod listener;
