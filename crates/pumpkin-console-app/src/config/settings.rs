//! Settings loading from `console.toml`

use std::path::{Path, PathBuf};

use pumpkin_console_core::prelude::*;

use super::types::Settings;

/// Settings file name inside the server config directory
pub const CONFIG_FILENAME: &str = "console.toml";

/// Path of the settings file for a config directory
pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILENAME)
}

/// Load settings from `<config_dir>/console.toml`
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(config_dir: &Path) -> Settings {
    let config_path = settings_path(config_dir);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Write a commented default `console.toml` if none exists
pub fn init_config_file(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)
            .with_context(|| format!("creating config dir {}", config_dir.display()))?;
    }

    let config_path = settings_path(config_dir);
    if config_path.exists() {
        return Ok(());
    }

    let default_content = r#"# Pumpkin Console Configuration

[server]
# library_path = "./libpumpkin.so"
# command = "./pumpkin"
# args = []
stop_command = "stop"

[console]
enabled_levels = ["INFO", "WARN", "ERROR", "DEBUG"]
autoscroll_threshold = 40.0
history_replay = true

[metrics]
poll_interval_ms = 1000
tps_healthy_threshold = 18.0
"#;

    std::fs::write(&config_path, default_content)
        .with_context(|| format!("writing {}", config_path.display()))?;
    info!("Created default config at {:?}", config_path);

    Ok(())
}
