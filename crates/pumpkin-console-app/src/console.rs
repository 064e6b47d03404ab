//! Console store: every received entry plus the filtered projection
//!
//! `all` is append-only apart from explicit user deletes and history replay.
//! `visible` is always what [`FilterState::recompute`] would produce from
//! `all`; appends keep it in step incrementally.

use std::collections::HashSet;
use std::sync::Arc;

use pumpkin_console_core::{parse_line, FilterState, LogEntry, LogLevel};

/// Result of appending a drained batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Entries added to `all`
    pub appended: usize,
    /// Of those, entries that passed the filter
    pub visible: usize,
}

impl AppendOutcome {
    pub fn any_visible(&self) -> bool {
        self.visible > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    all: Vec<Arc<LogEntry>>,
    visible: Vec<Arc<LogEntry>>,
    filter: FilterState,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: FilterState) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn all(&self) -> &[Arc<LogEntry>] {
        &self.all
    }

    pub fn visible(&self) -> &[Arc<LogEntry>] {
        &self.visible
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Append one entry; returns whether it is visible
    pub fn append(&mut self, entry: impl Into<Arc<LogEntry>>) -> bool {
        let entry = entry.into();
        let passes = self.filter.matches(&entry);
        if passes {
            self.visible.push(Arc::clone(&entry));
        }
        self.all.push(entry);
        passes
    }

    /// Append a drained batch in order
    pub fn append_batch<E>(&mut self, entries: impl IntoIterator<Item = E>) -> AppendOutcome
    where
        E: Into<Arc<LogEntry>>,
    {
        let mut outcome = AppendOutcome::default();
        for entry in entries {
            outcome.appended += 1;
            if self.append(entry) {
                outcome.visible += 1;
            }
        }
        outcome
    }

    /// Rebuild `visible` from `all` under the current filter
    pub fn apply_filter(&mut self) {
        self.visible = self.filter.recompute(&self.all);
    }

    /// Set the search query; recomputes only when the effective query changed
    pub fn set_search(&mut self, query: &str) -> bool {
        let changed = self.filter.set_query(query);
        if changed {
            self.apply_filter();
        }
        changed
    }

    /// Flip a level and recompute; returns whether it is now enabled
    pub fn toggle_level(&mut self, level: LogLevel) -> bool {
        let enabled = self.filter.toggle_level(level);
        self.apply_filter();
        enabled
    }

    pub fn set_level_enabled(&mut self, level: LogLevel, enabled: bool) -> bool {
        let changed = self.filter.set_level_enabled(level, enabled);
        if changed {
            self.apply_filter();
        }
        changed
    }

    /// Remove entries by id; returns how many were removed
    pub fn delete(&mut self, ids: &[u64]) -> usize {
        let ids: HashSet<u64> = ids.iter().copied().collect();
        let before = self.all.len();
        self.all.retain(|entry| !ids.contains(&entry.id));
        let removed = before - self.all.len();
        if removed > 0 {
            self.apply_filter();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.all.clear();
        self.visible.clear();
    }

    /// Reset both collections from a block of raw history text.
    ///
    /// Lines are split on CR/LF and empty lines are dropped.
    pub fn replace_with_history(&mut self, text: &str) -> usize {
        self.all = text
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .map(|line| Arc::new(parse_line(line)))
            .collect();
        self.apply_filter();
        self.all.len()
    }

    /// Clipboard text for the given ids, in store order
    pub fn copy_text(&self, ids: &[u64]) -> String {
        let ids: HashSet<u64> = ids.iter().copied().collect();
        self.all
            .iter()
            .filter(|entry| ids.contains(&entry.id))
            .map(|entry| entry.copy_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of ERROR and FATAL entries received, visible or not
    pub fn error_count(&self) -> usize {
        self.all.iter().filter(|entry| entry.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
