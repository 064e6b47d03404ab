//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, ResultExt};

/// Environment variable controlling the diagnostic log filter
pub const LOG_ENV_VAR: &str = "PUMPKIN_CONSOLE_LOG";

/// Filter used when `PUMPKIN_CONSOLE_LOG` is unset or invalid
const DEFAULT_FILTER: &str = "warn,pumpkin_console=info";

/// Daily files are named `pumpkin-console.log.YYYY-MM-DD`
const LOG_FILE_PREFIX: &str = "pumpkin-console.log";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/pumpkin-console/logs/`, never to
/// stdout, so the console stream stays clean. The filter is controlled by
/// the `PUMPKIN_CONSOLE_LOG` environment variable.
///
/// # Examples
/// ```bash
/// PUMPKIN_CONSOLE_LOG=debug pumpkin-console --library ./libpumpkin.so
/// PUMPKIN_CONSOLE_LOG=pumpkin_console_app=trace pumpkin-console --server-cmd ./pumpkin
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                // Server log callbacks arrive on native and pipe reader threads
                .with_thread_names(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_dir = %log_dir.display(),
        "Pumpkin Console diagnostics started"
    );

    Ok(())
}

/// Directory holding the rolling diagnostic logs
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pumpkin-console")
        .join("logs")
}
