//! Unix socket through which external tools inject window events.
//!
//! Hyprland does not report every geometry change on its event socket
//! (a floating window dragged with the mouse produces nothing), so a
//! compositor plugin or script can report them here instead.
//!
//! # Wire format
//!
//! One JSON-encoded [`Event`] per line:
//!
//! ```json
//! {"WindowAdded":"0x55d0c8a1"}
//! {"WindowGeometryChanged":"55d0c8a1"}
//! {"WindowRemoved":"0x55d0c8a1"}
//! "LayoutChanged"
//! ```
//!
//! `WorkspaceAboutToResize` and `WorkspaceResized` are rejected: the resize
//! window is owned by the Hyprland event source, and an injected pair would
//! lift geometry suppression while Hyprland is still evacuating a monitor.

use crate::event::Event;
use crate::traits::EventSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// An [`EventSource`] fed by clients of a Unix stream socket.
///
/// The socket is bound by [`bind`](Self::bind), so clients can connect as
/// soon as it returns.  Clients are served one after another.
pub struct InjectionListener {
    listener: UnixListener,
    path: PathBuf,
}

/// Errors produced by the injection listener.
#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    #[error("socket {path}: {source}")]
    Bind {
        path: String,
        source: std::io::Error,
    },
}

/// Why a client line was not forwarded.
#[derive(Debug, thiserror::Error)]
enum RejectedLine {
    #[error("not an event: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0:?} can only come from the compositor")]
    Resize(Event),
}

impl InjectionListener {
    /// Bind the socket at `path`, replacing a stale one left by a previous
    /// run.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, InjectionError> {
        let path = path.as_ref().to_path_buf();
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).map_err(|source| InjectionError::Bind {
            path: path.display().to_string(),
            source,
        })?;
        info!("accepting injected events on {}", path.display());
        Ok(Self { listener, path })
    }
}

impl Drop for InjectionListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Parse one client line into an event the guardian may receive from
/// outside.
fn accept_line(text: &str) -> Result<Event, RejectedLine> {
    let event: Event = serde_json::from_str(text)?;
    if event.is_resize() {
        return Err(RejectedLine::Resize(event));
    }
    Ok(event)
}

/// Forward every acceptable line of one client.  Returns `false` once the
/// sink has gone away.
fn serve_client(stream: UnixStream, sink: &mpsc::Sender<Event>) -> bool {
    for line in BufReader::new(stream).lines() {
        let text = match line {
            Ok(text) => text,
            Err(e) => {
                warn!("client read error: {}", e);
                break;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        match accept_line(&text) {
            Ok(event) => {
                debug!("injected {:?}", event);
                if sink.send(event).is_err() {
                    return false;
                }
            }
            Err(e) => error!("rejected {:?}: {}", text, e),
        }
    }
    true
}

impl EventSource for InjectionListener {
    type Error = InjectionError;

    /// Serve clients until the sink is closed.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    if !serve_client(stream, &sink) {
                        info!("sink closed, no longer accepting injected events");
                        return Ok(());
                    }
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::WindowId;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "hyprstay-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    fn spawn_listener(path: &Path) -> mpsc::Receiver<Event> {
        let mut listener = InjectionListener::bind(path).expect("bind");
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = listener.run(tx);
        });
        rx
    }

    fn send_lines(path: &Path, lines: &[&str]) {
        let mut stream = UnixStream::connect(path).expect("connect");
        for line in lines {
            writeln!(stream, "{}", line).unwrap();
        }
        stream.shutdown(std::net::Shutdown::Write).unwrap();
    }

    fn next(rx: &mpsc::Receiver<Event>) -> Event {
        rx.recv_timeout(Duration::from_secs(5)).expect("event")
    }

    fn beef() -> WindowId {
        WindowId::parse("beef").unwrap()
    }

    #[test]
    fn window_events_are_forwarded_in_order() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        send_lines(
            &path,
            &[
                r#"{"WindowAdded":"0xbeef"}"#,
                "",
                r#"{"WindowGeometryChanged":"beef"}"#,
                r#""LayoutChanged""#,
                r#"{"WindowRemoved":"0xBEEF"}"#,
            ],
        );

        assert_eq!(next(&rx), Event::WindowAdded(beef()));
        assert_eq!(next(&rx), Event::WindowGeometryChanged(beef()));
        assert_eq!(next(&rx), Event::LayoutChanged);
        assert_eq!(next(&rx), Event::WindowRemoved(beef()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn injected_resize_pair_is_dropped() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        send_lines(
            &path,
            &[
                r#""WorkspaceAboutToResize""#,
                r#""WorkspaceResized""#,
                r#"{"WindowGeometryChanged":"beef"}"#,
            ],
        );

        assert_eq!(next(&rx), Event::WindowGeometryChanged(beef()));
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_lines_do_not_end_the_connection() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        send_lines(
            &path,
            &[
                "not json at all",
                r#"{"WindowRemoved":"zzz"}"#,
                r#"{"WindowRemoved":"0xbeef"}"#,
            ],
        );

        assert_eq!(next(&rx), Event::WindowRemoved(beef()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn clients_are_served_one_after_another() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        send_lines(&path, &[r#"{"WindowAdded":"a"}"#]);
        send_lines(&path, &[r#"{"WindowAdded":"b"}"#]);

        assert_eq!(next(&rx), Event::WindowAdded(WindowId::parse("a").unwrap()));
        assert_eq!(next(&rx), Event::WindowAdded(WindowId::parse("b").unwrap()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn accept_line_classifies() {
        assert!(matches!(accept_line("{"), Err(RejectedLine::Json(_))));
        assert!(matches!(
            accept_line(r#""WorkspaceResized""#),
            Err(RejectedLine::Resize(Event::WorkspaceResized))
        ));
        assert_eq!(accept_line(r#""LayoutChanged""#).unwrap(), Event::LayoutChanged);
    }

    #[test]
    fn dropping_the_listener_removes_the_socket_file() {
        let path = tmp_socket_path();
        let listener = InjectionListener::bind(&path).unwrap();
        assert!(path.exists());
        drop(listener);
        assert!(!path.exists());
    }
}
