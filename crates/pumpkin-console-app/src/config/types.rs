//! Configuration types for Pumpkin Console
//!
//! Defines `Settings` and its sections as read from `console.toml`.

use std::path::PathBuf;

use pumpkin_console_core::{LogLevel, DEFAULT_ENABLED_LEVELS, DEFAULT_TPS_HEALTHY_THRESHOLD};
use pumpkin_console_server::DEFAULT_STOP_COMMAND;
use serde::{Deserialize, Serialize};

/// Global console settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// How the server is started
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Shared library exporting the `pumpkin_*` entry points
    #[serde(default)]
    pub library_path: Option<PathBuf>,

    /// Server executable, used when no library is configured
    #[serde(default)]
    pub command: Option<PathBuf>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Server data root; defaults to the directory holding `console.toml`
    #[serde(default)]
    pub config_dir: Option<PathBuf>,

    /// Sent to a server process on stop
    #[serde(default = "default_stop_command")]
    pub stop_command: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            library_path: None,
            command: None,
            args: Vec::new(),
            config_dir: None,
            stop_command: default_stop_command(),
        }
    }
}

fn default_stop_command() -> String {
    DEFAULT_STOP_COMMAND.to_string()
}

/// Console view behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConsoleSettings {
    /// Levels visible on startup
    #[serde(default = "default_enabled_levels")]
    pub enabled_levels: Vec<LogLevel>,

    /// Distance from the bottom (in scroll units) still counted as pinned
    #[serde(default = "default_autoscroll_threshold")]
    pub autoscroll_threshold: f64,

    /// Replay the server's log history into a freshly attached console
    #[serde(default = "default_true")]
    pub history_replay: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled_levels: default_enabled_levels(),
            autoscroll_threshold: default_autoscroll_threshold(),
            history_replay: true,
        }
    }
}

fn default_enabled_levels() -> Vec<LogLevel> {
    DEFAULT_ENABLED_LEVELS.to_vec()
}

fn default_autoscroll_threshold() -> f64 {
    40.0
}

fn default_true() -> bool {
    true
}

/// Metrics polling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricsSettings {
    /// Poll interval; 0 disables polling
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_tps_healthy_threshold")]
    pub tps_healthy_threshold: f32,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            tps_healthy_threshold: default_tps_healthy_threshold(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_tps_healthy_threshold() -> f32 {
    DEFAULT_TPS_HEALTHY_THRESHOLD
}
