//! # pumpkin-console-app - Console Orchestration
//!
//! Consumer side of the log pipeline: the cross-thread ingestion queue, the
//! console store with its filtered projection, follow-the-tail scrolling,
//! settings, and the [`Engine`] that ties them to a server backend.
//!
//! Depends on [`pumpkin_console_core`] for domain types and
//! [`pumpkin_console_server`] for the server boundary.
//!
//! ## Public API
//!
//! - [`Engine`] - Owns the store and session; processes [`Message`]s, emits [`EngineEvent`]s
//! - [`IngestionQueue`] / [`LogSink`] - Producer-side parse and enqueue, consumer-side drain
//! - [`ConsoleState`] - The "all" store plus the visible projection
//! - [`AutoScrollController`] - Pinned/unpinned follow state
//! - [`ServerSession`] - Start/stop/command/query over a [`ServerBackend`](pumpkin_console_server::ServerBackend)
//! - [`config`] - `console.toml` settings

pub mod auto_scroll;
pub mod config;
pub mod console;
pub mod engine;
pub mod engine_event;
pub mod ingest;
pub mod message;
pub mod session;
pub mod signals;

pub use auto_scroll::{AutoScrollController, ScrollCommand, ScrollEvent, ScrollState};
pub use config::{load_settings, Settings};
pub use console::{AppendOutcome, ConsoleState};
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use ingest::{IngestionQueue, LogHistory, LogSink};
pub use message::Message;
pub use session::{apply_completion, ServerSession};
