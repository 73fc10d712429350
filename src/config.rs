//! Application configuration.
//!
//! The configuration is loaded from
//! `$XDG_CONFIG_HOME/hyprstay/config.json`.  The top-level schema is split
//! into sections so the file can be extended later without breaking
//! backward compatibility.
//!
//! # Example
//!
//! ```json
//! {
//!   "guardian": {
//!     "ignore_classes": ["waybar", "rofi"],
//!     "ignore_pinned": true,
//!     "ignore_special_workspaces": true
//!   },
//!   "events": { "settle_ms": 250 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
///
/// Every field is optional — a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which windows count as special and are never tracked.
    #[serde(default)]
    pub guardian: GuardianConfig,

    /// Hyprland event translation settings.
    #[serde(default)]
    pub events: EventsConfig,
}

/// Classification of special windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianConfig {
    /// Window classes that are never tracked (docks, launchers, overlays).
    /// Compared case-insensitively.
    pub ignore_classes: Vec<String>,
    /// Treat pinned windows as special.  Default: `true`.
    pub ignore_pinned: bool,
    /// Treat windows on `special:` workspaces (scratchpads) as special.
    /// Default: `true`.
    pub ignore_special_workspaces: bool,
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            ignore_classes: Vec::new(),
            ignore_pinned: true,
            ignore_special_workspaces: true,
        }
    }
}

impl GuardianConfig {
    /// Whether windows of `class` are ignored.
    pub fn ignores_class(&self, class: &str) -> bool {
        self.ignore_classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }
}

/// Hyprland event translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// How long after a monitor is added or removed the relocation pass
    /// runs (ms).  Hyprland moves windows off a removed monitor on its own;
    /// this gives those moves time to land while geometry caching is
    /// suppressed.  Default: `250`.
    pub settle_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { settle_ms: 250 }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "guardian": {
                "ignore_classes": ["waybar", "Rofi"],
                "ignore_pinned": false,
                "ignore_special_workspaces": false
            },
            "events": { "settle_ms": 500 }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.guardian.ignore_classes, vec!["waybar", "Rofi"]);
        assert!(!cfg.guardian.ignore_pinned);
        assert!(!cfg.guardian.ignore_special_workspaces);
        assert_eq!(cfg.events.settle_ms, 500);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert!(cfg.guardian.ignore_classes.is_empty());
        assert!(cfg.guardian.ignore_pinned);
        assert!(cfg.guardian.ignore_special_workspaces);
        assert_eq!(cfg.events.settle_ms, EventsConfig::default().settle_ms);
    }

    #[test]
    fn deserialize_partial_guardian() {
        let json = r#"{ "guardian": { "ignore_classes": ["waybar"] } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.guardian.ignore_classes, vec!["waybar"]);
        assert!(cfg.guardian.ignore_pinned);
    }

    #[test]
    fn ignored_classes_match_case_insensitively() {
        let cfg = GuardianConfig {
            ignore_classes: vec!["Waybar".into()],
            ..GuardianConfig::default()
        };
        assert!(cfg.ignores_class("waybar"));
        assert!(!cfg.ignores_class("kitty"));
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "events": {}, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("hyprstay-test-does-not-exist.json");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("config error: failed to read"));
    }
}
