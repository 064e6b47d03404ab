//! # pumpkin-console-core - Core Domain Types
//!
//! Foundation crate for Pumpkin Console. Provides log entry types, the ANSI
//! tokenizer and style accumulator, the console line parser, filtering, link
//! classification, server JSON models and error handling.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, regex, url, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`LogEntry`] - A parsed console line with level, timestamp and styled segments
//! - [`LogLevel`] - Severity tag (TRACE, DEBUG, INFO, WARN, ERROR, FATAL)
//! - [`LogSegment`] - A styled run of text with optional hyperlink and tooltip
//!
//! ### Parsing (`ansi`, `style`, `parser`)
//! - [`tokenize()`] - Split a raw line into literal, SGR and OSC 8 tokens
//! - [`AnsiStyle`] - `Copy` style snapshot built from SGR codes
//! - [`parse_line()`] / [`LineParser`] - Raw line to [`LogEntry`]
//!
//! ### Filtering (`filter`)
//! - [`FilterState`] - Enabled level set plus case-insensitive search query
//!
//! ### Links (`links`)
//! - [`LinkAction`] - What activating a segment's hyperlink should do
//!
//! ### Server Models (`models`)
//! - [`PlayerInfo`], [`ServerMetrics`], [`CommandSuggestion`]
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with fatal classification and context layers
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use pumpkin_console_core::prelude::*;
//! ```

pub mod ansi;
pub mod error;
pub mod filter;
pub mod links;
pub mod logging;
pub mod models;
pub mod parser;
pub mod style;
pub mod types;

/// Prelude for common imports used throughout all Pumpkin Console crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use ansi::{contains_ansi_codes, strip_ansi_codes, tokenize, AnsiToken};
pub use error::{Error, Result, ResultExt};
pub use filter::{FilterState, DEFAULT_ENABLED_LEVELS};
pub use links::LinkAction;
pub use models::{
    decode_completions, decode_metrics, decode_players, CommandSuggestion, PlayerInfo,
    ServerMetrics, Vec3, DEFAULT_TPS_HEALTHY_THRESHOLD,
};
pub use parser::{parse_line, LineParser, LinkStack};
pub use style::{AnsiStyle, Rgb};
pub use types::{LogEntry, LogLevel, LogSegment, UnknownLevel};
