//! **hyprstay** — keeps windows where they were when monitors come and go.
//!
//! When a monitor is unplugged the compositor piles its windows onto
//! whatever output is left.  hyprstay remembers the last geometry every
//! window had while the monitor layout was stable and, once the layout
//! changes, puts back each window whose remembered center is no longer on
//! the monitor it ended up on.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::WindowHost`] — abstracts window queries and geometry writes
//!   so the policy is not coupled to any specific compositor.
//! * [`traits::EventSource`] — abstracts the transport that delivers
//!   notifications (Hyprland's event socket, a Unix socket, …) so the main
//!   loop is not coupled to any specific IPC mechanism.
//!
//! The policy itself is [`guardian::GeometryGuardian`].  Concrete
//! implementations live in [`hyprland`] (Hyprland IPC) and [`ipc`]
//! (Unix-socket event listener).

pub mod config;
pub mod event;
pub mod geometry;
pub mod guardian;
pub mod hyprland;
pub mod ipc;
pub mod traits;
