//! Test utilities for server backends
//!
//! [`FakeServer`] is an in-memory [`ServerBackend`]: `run_from_config_dir`
//! blocks until [`ServerBackend::request_stop`] is called, and tests drive the
//! log stream with [`FakeServer::emit`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::backend::{LogCallback, ServerBackend};

#[derive(Default)]
struct FakeState {
    callback: Option<LogCallback>,
    running: bool,
    stop_requested: bool,
    runs: Vec<PathBuf>,
    commands: Vec<String>,
    completion_inputs: Vec<String>,
}

/// Scriptable in-memory server
pub struct FakeServer {
    state: Mutex<FakeState>,
    changed: Condvar,
    exit_code: i32,
    players: Option<String>,
    metrics: Option<String>,
    completions: Option<String>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            changed: Condvar::new(),
            exit_code: 0,
            players: None,
            metrics: None,
            completions: None,
        }
    }

    /// Code returned when a run is stopped
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_players_json(mut self, json: impl Into<String>) -> Self {
        self.players = Some(json.into());
        self
    }

    pub fn with_metrics_json(mut self, json: impl Into<String>) -> Self {
        self.metrics = Some(json.into());
        self
    }

    pub fn with_completions_json(mut self, json: impl Into<String>) -> Self {
        self.completions = Some(json.into());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a line through the registered logger, as the server would.
    ///
    /// Returns false when no logger is registered.
    pub fn emit(&self, line: &str) -> bool {
        let callback = self.lock().callback.clone();
        match callback {
            Some(callback) => {
                callback(line);
                true
            }
            None => false,
        }
    }

    pub fn has_logger(&self) -> bool {
        self.lock().callback.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Block until a run has started
    pub fn wait_until_running(&self) {
        let guard = self.lock();
        let _guard = self
            .changed
            .wait_while(guard, |state| !state.running)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Config directories of every run so far
    pub fn runs(&self) -> Vec<PathBuf> {
        self.lock().runs.clone()
    }

    /// Commands injected so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn completion_inputs(&self) -> Vec<String> {
        self.lock().completion_inputs.clone()
    }
}

impl ServerBackend for FakeServer {
    fn register_logger(&self, callback: LogCallback) {
        self.lock().callback = Some(callback);
    }

    fn run_from_config_dir(&self, config_dir: &Path) -> i32 {
        {
            let mut state = self.lock();
            state.runs.push(config_dir.to_path_buf());
            state.running = true;
            state.stop_requested = false;
        }
        self.changed.notify_all();

        let guard = self.lock();
        let mut state = self
            .changed
            .wait_while(guard, |state| !state.stop_requested)
            .unwrap_or_else(PoisonError::into_inner);
        state.running = false;
        drop(state);
        self.changed.notify_all();

        self.exit_code
    }

    fn request_stop(&self) {
        self.lock().stop_requested = true;
        self.changed.notify_all();
    }

    fn inject_command(&self, command: &str) {
        self.lock().commands.push(command.to_string());
    }

    fn players_json(&self) -> Option<String> {
        self.players.clone()
    }

    fn metrics_json(&self) -> Option<String> {
        self.metrics.clone()
    }

    fn completions_json(&self, input: &str) -> Option<String> {
        self.lock().completion_inputs.push(input.to_string());
        self.completions.clone()
    }
}
