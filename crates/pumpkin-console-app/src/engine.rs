//! Engine - console orchestration shared by every frontend
//!
//! The Engine owns the console store, the auto-scroll controller, the server
//! session, the message channel and the shutdown signal. Frontends feed it
//! [`Message`]s and render from the [`EngineEvent`] broadcast.
//!
//! All store mutation happens in [`Engine::process_message`], on whichever
//! task drives the engine. Server log lines reach it through the ingestion
//! queue, which is drained before every message so entries keep their
//! arrival order relative to lifecycle notices.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pumpkin_console_core::prelude::*;
use pumpkin_console_core::{FilterState, LogEntry, LogLevel, ServerMetrics};
use pumpkin_console_server::{describe_exit_code, ServerBackend};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::auto_scroll::AutoScrollController;
use crate::config::Settings;
use crate::console::{AppendOutcome, ConsoleState};
use crate::engine_event::EngineEvent;
use crate::ingest::{IngestionQueue, LogHistory, LogSink};
use crate::message::Message;
use crate::session::ServerSession;
use crate::signals;

/// Message and event channel capacity
const CHANNEL_CAPACITY: usize = 256;

/// How long shutdown waits for a running server to exit
const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Orchestration engine for Pumpkin Console.
pub struct Engine {
    /// Every received entry plus the filtered projection
    pub console: ConsoleState,

    pub auto_scroll: AutoScrollController,

    pub session: ServerSession,

    /// Most recent metrics snapshot, if the server reported one
    pub metrics: Option<ServerMetrics>,

    /// Sender half of the message channel.
    /// Clone this to give to input sources (signal handler, stdin reader).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Sender for the shutdown signal. Send `true` to stop background tasks.
    pub shutdown_tx: watch::Sender<bool>,

    pub shutdown_rx: watch::Receiver<bool>,

    pub settings: Settings,

    queue: IngestionQueue,

    event_tx: broadcast::Sender<EngineEvent>,

    /// Quit was requested while the server was still running
    quit_pending: bool,

    should_quit: bool,

    metrics_task: Option<JoinHandle<()>>,
}

impl Engine {
    /// Create an Engine around a server backend.
    ///
    /// - Builds the console store with the configured level filter
    /// - Creates the message channel and shutdown signal
    /// - Registers the log sink with the backend
    /// - Spawns the signal handler and the metrics poll task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(settings: Settings, backend: Arc<dyn ServerBackend>, config_dir: PathBuf) -> Self {
        let filter = FilterState::with_levels(settings.console.enabled_levels.iter().copied());
        let console = ConsoleState::with_filter(filter);
        let auto_scroll = AutoScrollController::new(settings.console.autoscroll_threshold);

        let (msg_tx, msg_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        let queue = IngestionQueue::new();
        let history = LogHistory::new();
        let sink = LogSink::new(queue.clone(), msg_tx.clone(), history.clone());
        backend.register_logger(sink.into_callback());

        let session = ServerSession::new(backend, config_dir, history);

        signals::spawn_signal_handler(msg_tx.clone());

        let metrics_task = Self::spawn_metrics_poll(
            settings.metrics.poll_interval_ms,
            msg_tx.clone(),
            shutdown_rx.clone(),
        );

        Self {
            console,
            auto_scroll,
            session,
            metrics: None,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            settings,
            queue,
            event_tx,
            quit_pending: false,
            should_quit: false,
            metrics_task,
        }
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Get a clone of the shutdown receiver for background tasks.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// The ingestion queue fed by the server's log sink
    pub fn ingestion_queue(&self) -> &IngestionQueue {
        &self.queue
    }

    /// Process a single message.
    ///
    /// Pending log entries are drained first, so anything the server logged
    /// before this message was sent lands in the store ahead of its effects.
    pub fn process_message(&mut self, msg: Message) {
        self.drain_logs();

        match msg {
            Message::DrainLogs => {}

            Message::ReplayHistory => self.replay_history(),

            Message::ApplyFilter => {
                self.console.apply_filter();
                self.emit_visible_reset();
            }
            Message::SetSearch(query) => {
                if self.console.set_search(&query) {
                    self.emit_visible_reset();
                }
            }
            Message::ToggleLevel(level) => {
                let enabled = self.console.toggle_level(level);
                debug!("Level {} now {}", level, if enabled { "on" } else { "off" });
                self.emit_visible_reset();
            }
            Message::SetLevelEnabled { level, enabled } => {
                if self.console.set_level_enabled(level, enabled) {
                    self.emit_visible_reset();
                }
            }

            Message::DeleteEntries(ids) => {
                if self.console.delete(&ids) > 0 {
                    self.emit_visible_reset();
                }
            }
            Message::ClearLogs => {
                self.console.clear();
                self.emit_visible_reset();
            }

            Message::Scroll(event) => self.auto_scroll.on_user_scroll(event),
            Message::ResumeAutoScroll => {
                self.auto_scroll.resume();
                self.emit(EngineEvent::ScrollToEnd);
            }

            Message::StartServer => self.start_server(),
            Message::StopServer => {
                if let Err(e) = self.session.stop() {
                    warn!("Stop ignored: {}", e);
                }
            }
            Message::SendCommand(command) => match self.session.send_command(&command) {
                Ok(true) => {}
                Ok(false) => trace!("Ignoring empty command"),
                Err(e) => {
                    warn!("Command not sent: {}", e);
                    self.append_system(LogLevel::Warn, "[System] Server is not running.");
                }
            },
            Message::ServerStopped { code } => self.on_server_stopped(code),
            Message::RefreshMetrics => self.refresh_metrics(),

            Message::Quit => self.request_quit(),
        }
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Move every pending entry from the ingestion queue into the store.
    ///
    /// Emits `LogReceived` per entry in arrival order, then at most one
    /// `ScrollToEnd` for the batch.
    pub fn drain_logs(&mut self) -> AppendOutcome {
        let batch: Vec<Arc<LogEntry>> = self.queue.drain().into_iter().map(Arc::new).collect();
        if batch.is_empty() {
            return AppendOutcome::default();
        }

        let outcome = self.console.append_batch(batch.iter().cloned());
        for entry in batch {
            let visible = self.console.filter().matches(&entry);
            self.emit(EngineEvent::LogReceived { entry, visible });
        }

        trace!(
            "Drained {} entries ({} visible)",
            outcome.appended,
            outcome.visible
        );

        if outcome.any_visible() && self.auto_scroll.on_visible_appended().is_some() {
            self.emit(EngineEvent::ScrollToEnd);
        }
        outcome
    }

    /// Stop background tasks, wait for the server and flush remaining logs.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);

        if let Some(task) = self.metrics_task.take() {
            task.abort();
        }

        if let Some(task) = self.session.take_task() {
            if self.session.is_running() {
                if let Err(e) = self.session.stop() {
                    debug!("Server already stopping: {}", e);
                }
            }
            self.await_server_exit(task).await;
        }

        self.drain_logs();
        self.emit(EngineEvent::Shutdown);
    }

    fn start_server(&mut self) {
        match self.session.start(self.msg_tx.clone()) {
            Ok(()) => {
                self.metrics = None;
                self.emit(EngineEvent::ServerStarted);
            }
            Err(e) => warn!("Start ignored: {}", e),
        }
    }

    fn on_server_stopped(&mut self, code: i32) {
        info!("Server stopped with exit code {}", code);
        // The run task has finished or is about to
        drop(self.session.take_task());

        self.append_system(
            LogLevel::Info,
            format!("[System] Server stopped with exit code {}.", code),
        );
        if let Some(reason) = describe_exit_code(code) {
            self.append_system(LogLevel::Error, format!("[System] {}.", reason));
        }
        self.emit(EngineEvent::ServerStopped { code });

        if self.quit_pending {
            self.should_quit = true;
        }
    }

    fn refresh_metrics(&mut self) {
        if !self.session.is_running() {
            return;
        }
        if let Some(metrics) = self.session.metrics() {
            self.metrics = Some(metrics);
            self.emit(EngineEvent::MetricsUpdated(metrics));
        }
    }

    fn request_quit(&mut self) {
        if self.session.is_running() && !self.quit_pending {
            info!("Quit requested, stopping server first");
            self.quit_pending = true;
            if let Err(e) = self.session.stop() {
                warn!("Failed to request stop: {}", e);
                self.should_quit = true;
            }
        } else {
            self.should_quit = true;
        }
    }

    fn replay_history(&mut self) {
        if !self.settings.console.history_replay {
            debug!("History replay disabled");
            return;
        }
        let count = self
            .console
            .replace_with_history(&self.session.history_text());
        debug!("Replayed {} history lines", count);
        self.emit_visible_reset();
    }

    /// Append a console-side notice and emit it like a server line
    fn append_system(&mut self, level: LogLevel, message: impl Into<String>) {
        let entry = Arc::new(LogEntry::system(level, message));
        let visible = self.console.append(Arc::clone(&entry));
        self.emit(EngineEvent::LogReceived { entry, visible });
        if visible && self.auto_scroll.on_visible_appended().is_some() {
            self.emit(EngineEvent::ScrollToEnd);
        }
    }

    fn emit_visible_reset(&self) {
        let count = self.console.visible().len();
        self.emit(EngineEvent::VisibleReset { count });
        if self.auto_scroll.on_filter_applied(count).is_some() {
            self.emit(EngineEvent::ScrollToEnd);
        }
    }

    /// Emit a single EngineEvent to all subscribers.
    ///
    /// send() returns Err only if there are no receivers.
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Wait for the run task while still servicing `ServerStopped`, which the
    /// task sends on the message channel before it finishes.
    async fn await_server_exit(&mut self, mut task: JoinHandle<()>) {
        enum Step {
            Finished,
            TimedOut,
            Received(Message),
        }

        let deadline = tokio::time::sleep(SERVER_STOP_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            let step = tokio::select! {
                result = &mut task => {
                    if let Err(e) = result {
                        warn!("Server task panicked: {}", e);
                    }
                    Step::Finished
                }
                _ = &mut deadline => Step::TimedOut,
                Some(msg) = self.msg_rx.recv() => Step::Received(msg),
            };

            match step {
                Step::Finished => break,
                Step::TimedOut => {
                    warn!("Server did not stop within {:?}", SERVER_STOP_TIMEOUT);
                    return;
                }
                Step::Received(msg @ Message::ServerStopped { .. }) => self.process_message(msg),
                Step::Received(msg) => trace!("Dropping {:?} during shutdown", msg),
            }
        }

        while let Ok(msg) = self.msg_rx.try_recv() {
            if let Message::ServerStopped { .. } = msg {
                self.process_message(msg);
            }
        }
    }

    fn spawn_metrics_poll(
        interval_ms: u64,
        msg_tx: mpsc::Sender<Message>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        if interval_ms == 0 {
            return None;
        }

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        // Skip a tick rather than pile up behind a busy loop
                        if msg_tx.try_send(Message::RefreshMetrics).is_err() && msg_tx.is_closed() {
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        }))
    }
}
