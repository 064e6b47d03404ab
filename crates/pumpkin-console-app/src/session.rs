//! Server session - lifecycle and queries for one server backend

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pumpkin_console_core::prelude::*;
use pumpkin_console_core::{
    decode_completions, decode_metrics, decode_players, CommandSuggestion, PlayerInfo,
    ServerMetrics,
};
use pumpkin_console_server::ServerBackend;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ingest::LogHistory;
use crate::message::Message;

/// Owns the backend and tracks whether a blocking run is in flight
pub struct ServerSession {
    backend: Arc<dyn ServerBackend>,
    config_dir: PathBuf,
    running: Arc<AtomicBool>,
    history: LogHistory,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSession")
            .field("config_dir", &self.config_dir)
            .field("running", &self.is_running())
            .field("history_lines", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl ServerSession {
    pub fn new(backend: Arc<dyn ServerBackend>, config_dir: PathBuf, history: LogHistory) -> Self {
        Self {
            backend,
            config_dir,
            running: Arc::new(AtomicBool::new(false)),
            history,
            task: None,
        }
    }

    pub fn backend(&self) -> &Arc<dyn ServerBackend> {
        &self.backend
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the server on the blocking pool.
    ///
    /// When the run returns, `Message::ServerStopped { code }` is sent on
    /// `msg_tx`. Must be called from within a tokio runtime.
    pub fn start(&mut self, msg_tx: mpsc::Sender<Message>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        let backend = Arc::clone(&self.backend);
        let running = Arc::clone(&self.running);
        let config_dir = self.config_dir.clone();

        info!("Starting server in {}", config_dir.display());
        self.task = Some(tokio::task::spawn_blocking(move || {
            let code = backend.run_from_config_dir(&config_dir);
            running.store(false, Ordering::SeqCst);
            debug!("Server run returned {}", code);

            if msg_tx.blocking_send(Message::ServerStopped { code }).is_err() {
                warn!("Engine gone before server exit code {} was delivered", code);
            }
        }));

        Ok(())
    }

    /// Ask the server to stop; the exit arrives as `Message::ServerStopped`
    pub fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::ServerNotRunning);
        }
        info!("Requesting server stop");
        self.backend.request_stop();
        Ok(())
    }

    /// Forward a console command.
    ///
    /// Whitespace-only input is ignored and returns `Ok(false)`.
    pub fn send_command(&self, command: &str) -> Result<bool> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(false);
        }
        if !self.is_running() {
            return Err(Error::ServerNotRunning);
        }

        debug!("Injecting command: {}", command);
        self.backend.inject_command(command);
        Ok(true)
    }

    /// Online players; empty when the backend has no answer or sent bad JSON
    pub fn players(&self) -> Vec<PlayerInfo> {
        let Some(json) = self.backend.players_json() else {
            return Vec::new();
        };
        decode_players(&json).unwrap_or_else(|e| {
            warn!("Failed to decode players: {}", e);
            Vec::new()
        })
    }

    pub fn metrics(&self) -> Option<ServerMetrics> {
        let json = self.backend.metrics_json()?;
        decode_metrics(&json).unwrap_or_else(|e| {
            warn!("Failed to decode metrics: {}", e);
            None
        })
    }

    /// Completion candidates for the text typed so far
    pub fn completions(&self, input: &str) -> Vec<CommandSuggestion> {
        let Some(json) = self.backend.completions_json(input) else {
            return Vec::new();
        };
        decode_completions(&json).unwrap_or_else(|e| {
            warn!("Failed to decode completions for {:?}: {}", input, e);
            Vec::new()
        })
    }

    pub fn history(&self) -> &LogHistory {
        &self.history
    }

    /// Every raw line received this session, joined with `\n`
    pub fn history_text(&self) -> String {
        self.history.text()
    }

    /// Hand over the run task, if one was started
    pub(crate) fn take_task(&mut self) -> Option<JoinHandle<()>> {
        self.task.take()
    }
}

/// Replace the word being typed (text after the last space) with `chosen`.
///
/// ```
/// use pumpkin_console_app::session::apply_completion;
///
/// assert_eq!(apply_completion("gamemode cr", "creative"), "gamemode creative");
/// assert_eq!(apply_completion("gam", "gamemode"), "gamemode");
/// ```
pub fn apply_completion(current: &str, chosen: &str) -> String {
    match current.rfind(' ') {
        Some(idx) => format!("{}{}", &current[..=idx], chosen),
        None => chosen.to_string(),
    }
}
