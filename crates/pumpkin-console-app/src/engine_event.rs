//! Domain events emitted by the Engine for external consumers
//!
//! Frontends (the headless runner, a future UI) subscribe with
//! `Engine::subscribe()` and render from these events alone.

use std::sync::Arc;

use pumpkin_console_core::{LogEntry, ServerMetrics};

#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────
    /// An entry was appended to the store, in arrival order
    LogReceived {
        entry: Arc<LogEntry>,
        /// Whether it passed the current filter
        visible: bool,
    },

    /// The visible projection was rebuilt (filter change, delete, replay)
    VisibleReset { count: usize },

    /// The view should jump to the newest visible entry
    ScrollToEnd,

    // ─────────────────────────────────────────────────────────
    // Server Lifecycle
    // ─────────────────────────────────────────────────────────
    ServerStarted,

    ServerStopped { code: i32 },

    MetricsUpdated(ServerMetrics),

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LogReceived { .. } => "log_received",
            Self::VisibleReset { .. } => "visible_reset",
            Self::ScrollToEnd => "scroll_to_end",
            Self::ServerStarted => "server_started",
            Self::ServerStopped { .. } => "server_stopped",
            Self::MetricsUpdated(_) => "metrics_updated",
            Self::Shutdown => "shutdown",
        }
    }
}
