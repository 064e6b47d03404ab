//! Core domain type definitions

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::style::AnsiStyle;

/// Counter for generating unique log entry IDs
static LOG_ENTRY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Log severity levels as tagged by the server (`[INFO]`, `[WARN]`, ...)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    /// Lines without a recognizable tag default here
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Every level, in ascending severity
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    /// The upper-case tag text; this is what search matches against
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Whether this level counts toward the error badge
    pub fn is_error(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a level tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level: {}", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    /// Case-insensitive parse of a level tag
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

impl TryFrom<String> for LogLevel {
    type Error = UnknownLevel;

    fn try_from(value: String) -> Result<Self, UnknownLevel> {
        value.parse()
    }
}

/// A styled run of text within a log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSegment {
    pub text: String,
    /// Snapshot of the style at emit time
    pub style: AnsiStyle,
    /// A URI or an `mc:` pseudo-action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl LogSegment {
    /// Create an unlinked segment
    pub fn plain(text: impl Into<String>, style: AnsiStyle) -> Self {
        Self {
            text: text.into(),
            style,
            hyperlink: None,
            tooltip: None,
        }
    }

    /// Create a segment linked to `target`
    pub fn linked(text: impl Into<String>, style: AnsiStyle, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style,
            hyperlink: Some(target.into()),
            tooltip: None,
        }
    }

    pub fn is_link(&self) -> bool {
        self.hyperlink.is_some()
    }
}

/// A single parsed console line
///
/// Created once by the line parser and never mutated afterwards; the console
/// store shares entries between its collections.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Unique ID for this entry (for selection, copy and delete)
    pub id: u64,
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    /// The original raw line, escape sequences included
    pub message: String,
    pub segments: Vec<LogSegment>,
}

impl LogEntry {
    /// Create an entry with a fresh ID
    pub fn new(
        timestamp: DateTime<Local>,
        level: LogLevel,
        message: impl Into<String>,
        segments: Vec<LogSegment>,
    ) -> Self {
        Self {
            id: LOG_ENTRY_COUNTER.fetch_add(1, Ordering::Relaxed),
            timestamp,
            level,
            message: message.into(),
            segments,
        }
    }

    /// Create an unstyled entry stamped now, used for console-side notices
    pub fn system(level: LogLevel, message: impl Into<String>) -> Self {
        let message = message.into();
        let segments = vec![LogSegment::plain(message.clone(), AnsiStyle::default())];
        Self::new(Local::now(), level, message, segments)
    }

    /// Text of all segments without styling, or the raw message when the
    /// entry has no segments
    pub fn plain_text(&self) -> String {
        if self.segments.is_empty() {
            return self.message.clone();
        }
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Format timestamp for display
    pub fn formatted_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// Clipboard line: `HH:MM:SS [LEVEL] message`
    pub fn copy_line(&self) -> String {
        format!("{} [{}] {}", self.formatted_time(), self.level, self.message)
    }

    pub fn is_error(&self) -> bool {
        self.level.is_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_level_parse_case_insensitive() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("Fatal".parse::<LogLevel>(), Ok(LogLevel::Fatal));
        assert_eq!(" TRACE ".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("WARNING".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_display_matches_tag() {
        for level in LogLevel::ALL {
            assert_eq!(level.to_string(), level.as_str());
            assert_eq!(level.as_str().parse::<LogLevel>(), Ok(level));
        }
    }

    #[test]
    fn test_level_default_is_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_error_levels() {
        assert!(LogLevel::Error.is_error());
        assert!(LogLevel::Fatal.is_error());
        assert!(!LogLevel::Warn.is_error());
    }

    #[test]
    fn test_entry_ids_unique() {
        let a = LogEntry::system(LogLevel::Info, "a");
        let b = LogEntry::system(LogLevel::Info, "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_copy_line_format() {
        let ts = Local.with_ymd_and_hms(2024, 5, 1, 14, 2, 33).unwrap();
        let entry = LogEntry::new(ts, LogLevel::Warn, "disk low", vec![]);
        assert_eq!(entry.copy_line(), "14:02:33 [WARN] disk low");
    }

    #[test]
    fn test_plain_text_falls_back_to_message() {
        let ts = Local::now();
        let entry = LogEntry::new(ts, LogLevel::Info, "raw", vec![]);
        assert_eq!(entry.plain_text(), "raw");

        let entry = LogEntry::new(
            ts,
            LogLevel::Info,
            "\x1b[1mab\x1b[0m",
            vec![
                LogSegment::plain("a", AnsiStyle::default()),
                LogSegment::plain("b", AnsiStyle::default()),
            ],
        );
        assert_eq!(entry.plain_text(), "ab");
    }

    #[test]
    fn test_level_serializes_uppercase() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"WARN\"");
    }

    #[test]
    fn test_level_deserializes_any_case() {
        let levels: Vec<LogLevel> = serde_json::from_str(r#"["info", "Fatal", "TRACE"]"#).unwrap();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Fatal, LogLevel::Trace]);
        assert!(serde_json::from_str::<LogLevel>("\"verbose\"").is_err());
    }
}
