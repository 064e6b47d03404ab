//! Level and search filtering of log entries

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::types::{LogEntry, LogLevel};

/// Levels shown when no configuration overrides them.
///
/// FATAL and TRACE start hidden; both can be enabled from settings or the
/// CLI like any other level.
pub const DEFAULT_ENABLED_LEVELS: [LogLevel; 4] = [
    LogLevel::Info,
    LogLevel::Warn,
    LogLevel::Error,
    LogLevel::Debug,
];

/// Combined level and search filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    enabled_levels: BTreeSet<LogLevel>,
    /// Trimmed, lower-cased query; empty matches everything
    query: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::with_levels(DEFAULT_ENABLED_LEVELS)
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter showing exactly `levels`, with no search query
    pub fn with_levels(levels: impl IntoIterator<Item = LogLevel>) -> Self {
        Self {
            enabled_levels: levels.into_iter().collect(),
            query: String::new(),
        }
    }

    /// Check if a log entry passes both the level set and the query
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if !self.enabled_levels.contains(&entry.level) {
            return false;
        }

        if self.query.is_empty() {
            return true;
        }

        entry.message.to_lowercase().contains(&self.query)
            || entry.level.as_str().to_lowercase().contains(&self.query)
    }

    /// Rebuild the visible projection from the full store, preserving order.
    pub fn recompute(&self, all: &[Arc<LogEntry>]) -> Vec<Arc<LogEntry>> {
        all.iter()
            .filter(|entry| self.matches(entry))
            .cloned()
            .collect()
    }

    /// Flip a level's membership; returns whether it is now enabled
    pub fn toggle_level(&mut self, level: LogLevel) -> bool {
        if self.enabled_levels.remove(&level) {
            false
        } else {
            self.enabled_levels.insert(level);
            true
        }
    }

    /// Enable or disable a level; returns whether the set changed
    pub fn set_level_enabled(&mut self, level: LogLevel, enabled: bool) -> bool {
        if enabled {
            self.enabled_levels.insert(level)
        } else {
            self.enabled_levels.remove(&level)
        }
    }

    pub fn is_level_enabled(&self, level: LogLevel) -> bool {
        self.enabled_levels.contains(&level)
    }

    pub fn enabled_levels(&self) -> &BTreeSet<LogLevel> {
        &self.enabled_levels
    }

    /// Set the search query; returns whether the effective query changed
    pub fn set_query(&mut self, query: &str) -> bool {
        let normalized = query.trim().to_lowercase();
        if normalized == self.query {
            return false;
        }
        self.query = normalized;
        true
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether this filter hides anything a default filter would show
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }
}
