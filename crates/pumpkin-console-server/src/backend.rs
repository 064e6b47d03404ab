//! The server boundary consumed by the console

use std::path::Path;
use std::sync::Arc;

/// Receives one raw line per call, from any thread
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Exit code reported when a run ended normally
pub const EXIT_OK: i32 = 0;

/// A Pumpkin server the console can drive.
///
/// `run_from_config_dir` blocks for the whole server lifetime and must be
/// called off the consumer context. Everything else is fire-and-forget and
/// safe to call from any thread while a run is in progress.
pub trait ServerBackend: Send + Sync {
    /// Install the log sink. Replaces any previously registered sink.
    fn register_logger(&self, callback: LogCallback);

    /// Run the server with `config_dir` as its data root; returns the exit code
    fn run_from_config_dir(&self, config_dir: &Path) -> i32;

    fn request_stop(&self);

    fn inject_command(&self, command: &str);

    /// JSON array of online players, if the backend can answer
    fn players_json(&self) -> Option<String>;

    /// JSON metrics object, if the backend can answer
    fn metrics_json(&self) -> Option<String>;

    /// JSON array of completion candidates for `input`
    fn completions_json(&self, input: &str) -> Option<String>;
}

/// Human-readable reason for a non-zero exit code, when one is known.
///
/// Negative codes come from the native library's entry point; 126/127
/// follow the shell convention for a server executable that could not be
/// started.
pub fn describe_exit_code(code: i32) -> Option<&'static str> {
    match code {
        -1 => Some("no config directory was provided"),
        -2 => Some("config directory path is not valid UTF-8"),
        -6 => Some("failed to create the server runtime"),
        -999 => Some("the server panicked"),
        126 => Some("server executable could not be started"),
        127 => Some("server executable was not found"),
        _ => None,
    }
}
