//! Message types for the engine loop (TEA pattern)

use pumpkin_console_core::LogLevel;

use crate::auto_scroll::ScrollEvent;

/// All inputs the engine reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Log Ingestion
    // ─────────────────────────────────────────────────────────
    /// Pending entries are waiting in the ingestion queue
    DrainLogs,

    /// Reload the console from the session's raw log history
    ReplayHistory,

    // ─────────────────────────────────────────────────────────
    // Filtering
    // ─────────────────────────────────────────────────────────
    /// Rebuild the visible projection
    ApplyFilter,
    SetSearch(String),
    ToggleLevel(LogLevel),
    SetLevelEnabled {
        level: LogLevel,
        enabled: bool,
    },

    // ─────────────────────────────────────────────────────────
    // Store Editing
    // ─────────────────────────────────────────────────────────
    DeleteEntries(Vec<u64>),
    ClearLogs,

    // ─────────────────────────────────────────────────────────
    // Scrolling
    // ─────────────────────────────────────────────────────────
    Scroll(ScrollEvent),
    ResumeAutoScroll,

    // ─────────────────────────────────────────────────────────
    // Server Control
    // ─────────────────────────────────────────────────────────
    StartServer,
    StopServer,
    SendCommand(String),
    /// The blocking server run returned
    ServerStopped {
        code: i32,
    },
    /// Poll the server for a metrics snapshot
    RefreshMetrics,

    /// Stop the server if needed and leave the loop
    Quit,
}
