//! Configuration file parsing for Pumpkin Console
//!
//! Settings live in `<config_dir>/console.toml` next to the server's own
//! configuration files.

pub mod settings;
pub mod types;

pub use settings::{init_config_file, load_settings, settings_path, CONFIG_FILENAME};
pub use types::*;
