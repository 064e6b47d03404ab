//! Follow-the-tail behaviour for the console view
//!
//! The view reports scroll positions; the controller answers whether the
//! view should jump to the newest entry.

/// Default distance from the bottom still treated as "at the bottom"
pub const DEFAULT_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    /// Following new entries
    #[default]
    Pinned,
    /// The user scrolled away
    Unpinned,
}

/// A scroll position report from the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub offset: f64,
    pub scrollable_height: f64,
    /// Part of an ongoing gesture or animation
    pub is_intermediate: bool,
}

impl ScrollEvent {
    pub fn new(offset: f64, scrollable_height: f64, is_intermediate: bool) -> Self {
        Self {
            offset,
            scrollable_height,
            is_intermediate,
        }
    }

    pub fn distance_from_bottom(&self) -> f64 {
        self.scrollable_height - self.offset
    }
}

/// Instruction back to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    ScrollToEnd,
}

#[derive(Debug, Clone)]
pub struct AutoScrollController {
    state: ScrollState,
    threshold: f64,
    /// Swallow the next scroll event (the one our own jump produces)
    suppress_next: bool,
}

impl Default for AutoScrollController {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl AutoScrollController {
    pub fn new(threshold: f64) -> Self {
        Self {
            state: ScrollState::Pinned,
            threshold,
            suppress_next: false,
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn is_pinned(&self) -> bool {
        self.state == ScrollState::Pinned
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// A visible entry was appended
    pub fn on_visible_appended(&self) -> Option<ScrollCommand> {
        self.is_pinned().then_some(ScrollCommand::ScrollToEnd)
    }

    /// The user (or the view) scrolled
    pub fn on_user_scroll(&mut self, event: ScrollEvent) {
        if self.suppress_next {
            self.suppress_next = false;
            return;
        }

        if event.distance_from_bottom() <= self.threshold {
            self.state = ScrollState::Pinned;
        } else if !event.is_intermediate {
            self.state = ScrollState::Unpinned;
        }
    }

    /// Jump back to the newest entry and follow again
    pub fn resume(&mut self) -> ScrollCommand {
        self.state = ScrollState::Pinned;
        self.suppress_next = true;
        ScrollCommand::ScrollToEnd
    }

    /// The visible projection was rebuilt
    pub fn on_filter_applied(&self, visible_len: usize) -> Option<ScrollCommand> {
        (self.is_pinned() && visible_len > 0).then_some(ScrollCommand::ScrollToEnd)
    }

    /// Whether a "jump to latest" affordance should be offered
    pub fn show_resume_hint(&self) -> bool {
        self.state == ScrollState::Unpinned
    }
}
