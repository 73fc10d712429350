//! Entry point for the **hyprstay** daemon.
//!
//! Spawns all [`EventSource`](hyprstay::traits::EventSource)s on background
//! threads and feeds every event to a single
//! [`GeometryGuardian`](hyprstay::guardian::GeometryGuardian) on the main
//! thread.

use hyprstay::config::Config;
use hyprstay::event::Event;
use hyprstay::guardian::GeometryGuardian;
use hyprstay::hyprland::events::HyprlandEventSource;
use hyprstay::hyprland::host::HyprlandHost;
use hyprstay::ipc::listener::InjectionListener;
use hyprstay::traits::{EventSource, WindowHost};
use log::{error, info};
use std::sync::mpsc;

/// Default socket path for the event listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/hyprstay.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyprstay`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("hyprstay")
}

/// Try to load the config from `$XDG_CONFIG_HOME/hyprstay/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

/// Value of `--socket <path>`, if given.
fn socket_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--socket" {
            return args.next();
        }
    }
    None
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();
    let socket_path = socket_arg().unwrap_or_else(default_socket_path);

    // Subscribe before enumerating: a window opened in between then shows
    // up as a queued WindowAdded instead of being missed.
    let hyprland_events = match HyprlandEventSource::connect(config.events.clone()) {
        Ok(source) => source,
        Err(e) => {
            error!("failed to connect to hyprland: {}", e);
            std::process::exit(1);
        }
    };
    let injected_events = match InjectionListener::bind(&socket_path) {
        Ok(source) => source,
        Err(e) => {
            error!("failed to open injection socket: {}", e);
            std::process::exit(1);
        }
    };
    let (tx, rx) = mpsc::channel::<Event>();
    spawn_event_sources(tx, hyprland_events, injected_events);

    let mut guardian = GeometryGuardian::new(HyprlandHost::new(config.guardian.clone()));
    if let Err(e) = guardian.start() {
        error!("failed to enumerate windows: {}", e);
        std::process::exit(1);
    }

    run_event_loop(guardian, rx);
}

//  Event loop

fn run_event_loop<H: WindowHost>(mut guardian: GeometryGuardian<H>, rx: mpsc::Receiver<Event>) {
    info!("hyprstay running");
    for event in rx {
        if let Err(e) = guardian.handle(event) {
            error!("event error: {}", e);
        }
    }
    info!("all event sources closed, exiting");
}

//  Helpers

fn spawn_event_sources(
    tx: mpsc::Sender<Event>,
    mut hyprland_events: HyprlandEventSource,
    mut injected_events: InjectionListener,
) {
    {
        let tx = tx.clone();
        std::thread::spawn(move || {
            if let Err(e) = hyprland_events.run(tx) {
                error!("hyprland event source error: {}", e);
            }
        });
    }

    // Compositor plugins report geometry changes Hyprland does not emit on
    // socket2 (e.g. floating windows dragged with the mouse) here.
    {
        let tx = tx.clone();
        std::thread::spawn(move || {
            if let Err(e) = injected_events.run(tx) {
                error!("injection listener error: {}", e);
            }
        });
    }

    drop(tx);
}
