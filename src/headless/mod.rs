//! Headless mode - console output without a UI
//!
//! Prints the visible projection of the console and server lifecycle changes
//! to stdout, either as NDJSON events for scripts or as plain text lines for
//! a terminal.
//!
//! # Event Format
//!
//! In NDJSON mode each line is one event with an "event" field:
//!
//! ```json
//! {"event":"server_started","config_dir":"/srv/pumpkin","timestamp":1704700001000}
//! {"event":"log","id":3,"level":"INFO","time":"12:00:01","message":"Done (2.1s)!","links":[],"timestamp":1704700002000}
//! {"event":"server_stopped","code":0,"reason":null,"timestamp":1704700003000}
//! ```

pub mod runner;

use std::io::{self, Write};

use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use tracing::error;

use pumpkin_console_core::{CommandSuggestion, LogEntry, PlayerInfo, ServerMetrics};

/// How headless output is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One JSON event per line
    #[default]
    Ndjson,
    /// Human-readable lines
    Plain,
}

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    ServerStarted {
        config_dir: String,
        timestamp: i64,
    },

    ServerStopped {
        code: i32,
        reason: Option<String>,
        timestamp: i64,
    },

    /// A console entry that passed the filter
    Log {
        id: u64,
        level: String,
        /// Entry time as `HH:MM:SS`
        time: String,
        /// Text with escape sequences removed
        message: String,
        /// Hyperlink targets carried by the entry's segments
        links: Vec<String>,
        timestamp: i64,
    },

    Metrics {
        tps: f32,
        mspt: f32,
        tick_count: i64,
        loaded_chunks: u64,
        player_count: u64,
        healthy: bool,
        timestamp: i64,
    },

    Players {
        players: Vec<PlayerInfo>,
        timestamp: i64,
    },

    Completions {
        input: String,
        suggestions: Vec<CommandSuggestion>,
        timestamp: i64,
    },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Write this event to stdout in the given format
    pub fn emit(&self, format: OutputFormat) {
        let line = match format {
            OutputFormat::Ndjson => match serde_json::to_string(self) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize headless event: {}", e);
                    return;
                }
            },
            OutputFormat::Plain => self.render_plain(),
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        // Flush to ensure immediate output
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Terminal rendering of the event
    pub fn render_plain(&self) -> String {
        match self {
            Self::ServerStarted { config_dir, .. } => {
                format!("-- server started in {}", config_dir)
            }
            Self::ServerStopped { code, reason, .. } => match reason {
                Some(reason) => format!("-- server stopped (exit code {}: {})", code, reason),
                None => format!("-- server stopped (exit code {})", code),
            },
            Self::Log {
                level,
                time,
                message,
                ..
            } => format!("{} [{}] {}", time, level, message),
            Self::Metrics {
                tps,
                mspt,
                player_count,
                loaded_chunks,
                healthy,
                ..
            } => format!(
                "-- tps {:.1}{} | mspt {:.2}ms | players {} | chunks {}",
                tps,
                if *healthy { "" } else { " (lagging)" },
                mspt,
                player_count,
                loaded_chunks
            ),
            Self::Players { players, .. } if players.is_empty() => {
                "-- no players online".to_string()
            }
            Self::Players { players, .. } => {
                let names: Vec<String> = players
                    .iter()
                    .map(|p| format!("{} ({})", p.username, p.formatted_position()))
                    .collect();
                format!("-- {} online: {}", players.len(), names.join(", "))
            }
            Self::Completions {
                input, suggestions, ..
            } => {
                let texts: Vec<&str> = suggestions.iter().map(|s| s.text.as_str()).collect();
                format!("-- completions for {:?}: {}", input, texts.join(" "))
            }
            Self::Error { message, fatal, .. } => {
                if *fatal {
                    format!("!! fatal: {}", message)
                } else {
                    format!("!! {}", message)
                }
            }
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn server_started(config_dir: &std::path::Path) -> Self {
        Self::ServerStarted {
            config_dir: config_dir.display().to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn server_stopped(code: i32, reason: Option<&str>) -> Self {
        Self::ServerStopped {
            code,
            reason: reason.map(str::to_string),
            timestamp: Self::now(),
        }
    }

    pub fn log(entry: &LogEntry) -> Self {
        Self::Log {
            id: entry.id,
            level: entry.level.as_str().to_string(),
            time: entry.formatted_time(),
            message: entry.plain_text(),
            links: entry
                .segments
                .iter()
                .filter_map(|s| s.hyperlink.clone())
                .collect(),
            timestamp: Self::now(),
        }
    }

    pub fn metrics(metrics: &ServerMetrics, healthy_threshold: f32) -> Self {
        Self::Metrics {
            tps: metrics.tps,
            mspt: metrics.mspt,
            tick_count: metrics.tick_count,
            loaded_chunks: metrics.loaded_chunks,
            player_count: metrics.player_count,
            healthy: metrics.is_tps_healthy_at(healthy_threshold),
            timestamp: Self::now(),
        }
    }

    pub fn players(players: Vec<PlayerInfo>) -> Self {
        Self::Players {
            players,
            timestamp: Self::now(),
        }
    }

    pub fn completions(input: &str, suggestions: Vec<CommandSuggestion>) -> Self {
        Self::Completions {
            input: input.to_string(),
            suggestions,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }
}
