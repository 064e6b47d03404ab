//! Console line parser
//!
//! Turns one raw server line into a [`LogEntry`]:
//!
//! 1. A clean copy (escapes stripped) is scanned for the level tag and an
//!    optional `HH:MM:SS` timestamp ahead of it.
//! 2. A visual copy drops a leading level tag but keeps every escape
//!    sequence and any text in front of a non-leading tag.
//! 3. The visual copy is tokenized and walked with a style accumulator and a
//!    hyperlink stack, producing styled [`LogSegment`]s. Text outside any
//!    OSC 8 link is scanned for bare `http(s)://` URLs.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use regex::Regex;

use crate::ansi::{contains_ansi_codes, strip_ansi_codes, tokenize, AnsiToken};
use crate::style::AnsiStyle;
use crate::types::{LogEntry, LogLevel, LogSegment};

/// Prefix marking a link-stack entry as a tooltip annotation
pub const TOOLTIP_PREFIX: &str = "tooltip:";

/// First bracketed level tag anywhere in the clean line
static LEVEL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(INFO|WARN|ERROR|FATAL|DEBUG|TRACE)\]").expect("level tag regex is valid")
});

/// `HH:MM:SS` at the start of the text before the level tag
static LEADING_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{2}):(\d{2}):(\d{2})\b").expect("timestamp regex is valid")
});

/// Level tag at the start of the visual line, after any SGR codes.
///
/// Capture group 1 holds the SGR codes, which are kept.
static LEADING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\x1b\[[0-9;]*m)*)\s*\[(?i:INFO|WARN|ERROR|FATAL|DEBUG|TRACE)\]\s*")
        .expect("leading tag regex is valid")
});

/// Bare URLs in unlinked text
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url regex is valid"));

/// Level and timestamp extracted from a line's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMetadata {
    pub level: Option<LogLevel>,
    pub time: Option<NaiveTime>,
}

/// Scan the clean (escape-free) text for a level tag and a timestamp ahead of it.
///
/// A timestamp is only recognised on lines that carry a level tag.
pub fn extract_metadata(clean: &str) -> LineMetadata {
    let Some(caps) = LEVEL_TAG.captures(clean) else {
        return LineMetadata {
            level: None,
            time: None,
        };
    };
    let level = caps.get(1).and_then(|m| m.as_str().parse().ok());
    let before_tag = caps.get(0).map_or("", |tag| &clean[..tag.start()]);

    let time = LEADING_TIME.captures(before_tag).and_then(|caps| {
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        NaiveTime::from_hms_opt(field(1)?, field(2)?, field(3)?)
    });

    LineMetadata { level, time }
}

/// Remove a leading level tag, keeping escape sequences.
pub fn strip_leading_tag(raw: &str) -> String {
    LEADING_TAG.replace(raw, "${1}").into_owned()
}

/// Stack of open OSC 8 link targets
///
/// Producers are not expected to nest links, but nesting and unbalanced
/// closes are tolerated: a close on an empty stack is a no-op.
#[derive(Debug, Default, Clone)]
pub struct LinkStack {
    entries: Vec<String>,
}

impl LinkStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an OSC 8 URI: non-empty opens, empty closes
    pub fn apply(&mut self, uri: &str) {
        if uri.is_empty() {
            self.entries.pop();
        } else {
            self.entries.push(uri.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve the effective `(target, tooltip)`, most recent entry first.
    pub fn resolve(&self) -> (Option<String>, Option<String>) {
        let mut target = None;
        let mut tooltip = None;

        for entry in self.entries.iter().rev() {
            match strip_prefix_ignore_case(entry, TOOLTIP_PREFIX) {
                Some(text) => {
                    if tooltip.is_none() {
                        tooltip = Some(text.to_string());
                    }
                }
                None => {
                    if target.is_none() {
                        target = Some(entry.clone());
                    }
                }
            }
        }

        (target, tooltip)
    }
}

/// ASCII case-insensitive `strip_prefix`
pub(crate) fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Build segments from the visual line.
fn build_segments(visual: &str) -> Vec<LogSegment> {
    let mut segments = Vec::new();
    let mut style = AnsiStyle::default();
    let mut links = LinkStack::new();

    for token in tokenize(visual) {
        match token {
            AnsiToken::Literal(text) => push_text(&mut segments, text, style, &links),
            AnsiToken::Sgr { params, .. } => style.apply_sgr(params),
            AnsiToken::Hyperlink { uri, .. } => links.apply(uri),
        }
    }

    segments
}

/// Emit segments for a literal run under the current style and links.
fn push_text(segments: &mut Vec<LogSegment>, text: &str, style: AnsiStyle, links: &LinkStack) {
    if text.is_empty() {
        return;
    }

    if !links.is_empty() {
        let (hyperlink, tooltip) = links.resolve();
        segments.push(LogSegment {
            text: text.to_string(),
            style,
            hyperlink,
            tooltip,
        });
        return;
    }

    let mut last = 0;
    for m in BARE_URL.find_iter(text) {
        if m.start() > last {
            segments.push(LogSegment::plain(&text[last..m.start()], style));
        }
        segments.push(LogSegment::linked(m.as_str(), style, m.as_str()));
        last = m.end();
    }

    if last < text.len() {
        segments.push(LogSegment::plain(&text[last..], style));
    }
}

/// Combine a parsed wall-clock time with today's local date.
fn today_at(time: NaiveTime) -> Option<DateTime<Local>> {
    let naive = Local::now().date_naive().and_time(time);
    Local.from_local_datetime(&naive).earliest()
}

/// Parse one raw console line.
///
/// # Examples
///
/// ```
/// use pumpkin_console_core::{parse_line, LogLevel};
///
/// let entry = parse_line("[WARN] disk low");
/// assert_eq!(entry.level, LogLevel::Warn);
/// assert_eq!(entry.plain_text(), "disk low");
/// ```
pub fn parse_line(raw: &str) -> LogEntry {
    let clean = if contains_ansi_codes(raw) {
        Cow::Owned(strip_ansi_codes(raw))
    } else {
        Cow::Borrowed(raw)
    };
    let metadata = extract_metadata(&clean);

    let timestamp = metadata.time.and_then(today_at).unwrap_or_else(Local::now);
    let level = metadata.level.unwrap_or_default();

    let visual = strip_leading_tag(raw);
    let segments = build_segments(&visual);

    LogEntry::new(timestamp, level, raw, segments)
}

/// Injectable handle around [`parse_line`]
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a line delivered by the server, trimming its line terminator
    pub fn parse(&self, raw: &str) -> LogEntry {
        parse_line(raw.trim_end_matches(['\r', '\n']))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Rgb;
    use chrono::Timelike;

    #[test]
    fn test_plain_line_defaults() {
        let entry = parse_line("Server started on 0.0.0.0:25565");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.segments.len(), 1);
        assert_eq!(entry.segments[0].text, "Server started on 0.0.0.0:25565");
        assert!(entry.segments[0].style.is_plain());
        assert_eq!(entry.segments[0].hyperlink, None);
        assert_eq!(entry.message, "Server started on 0.0.0.0:25565");
    }

    #[test]
    fn test_level_and_timestamp_extraction() {
        let entry = parse_line("14:02:33 [WARN] disk low");
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(
            (
                entry.timestamp.hour(),
                entry.timestamp.minute(),
                entry.timestamp.second()
            ),
            (14, 2, 33)
        );
        assert_eq!(entry.timestamp.date_naive(), Local::now().date_naive());
        assert_eq!(entry.plain_text(), "14:02:33 [WARN] disk low");
    }

    #[test]
    fn test_time_text_is_kept_in_rendering() {
        let entry = parse_line("\x1b[90m12:00:01\x1b[0m [INFO] x");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.timestamp.second(), 1);
        assert!(entry.plain_text().contains("12:00:01"));
    }

    #[test]
    fn test_level_is_case_insensitive() {
        assert_eq!(parse_line("[error] boom").level, LogLevel::Error);
        assert_eq!(parse_line("[Debug] chunk").level, LogLevel::Debug);
    }

    #[test]
    fn test_first_level_tag_wins() {
        let entry = parse_line("[INFO] [pumpkin::net] player said [ERROR]");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.plain_text(), "[pumpkin::net] player said [ERROR]");
    }

    #[test]
    fn test_non_leading_tag_is_detected_but_kept() {
        let entry = parse_line("prefix [FATAL] crash");
        assert_eq!(entry.level, LogLevel::Fatal);
        assert_eq!(entry.plain_text(), "prefix [FATAL] crash");
    }

    #[test]
    fn test_warning_word_is_not_a_tag() {
        assert_eq!(parse_line("[WARNING] nope").level, LogLevel::Info);
    }

    #[test]
    fn test_invalid_time_uses_capture_time() {
        let before = Local::now();
        let entry = parse_line("99:99:99 [INFO] odd clock");
        assert!(entry.timestamp >= before);
        assert_eq!(entry.plain_text(), "99:99:99 [INFO] odd clock");
    }

    #[test]
    fn test_time_after_tag_is_ignored() {
        let meta = extract_metadata("[INFO] 12:00:01 tick");
        assert_eq!(meta.level, Some(LogLevel::Info));
        assert_eq!(meta.time, None);
    }

    #[test]
    fn test_colored_tag_stripped_keeping_codes() {
        let entry = parse_line("\x1b[32m[INFO]\x1b[0m \x1b[1mReady\x1b[0m");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.plain_text(), " Ready");
        let ready = entry
            .segments
            .iter()
            .find(|s| s.text == "Ready")
            .expect("ready segment");
        assert!(ready.style.bold);
        assert_eq!(ready.style.foreground, None);
    }

    #[test]
    fn test_leading_codes_style_the_message() {
        let entry = parse_line("\x1b[33m[WARN] slow tick");
        assert_eq!(entry.segments.len(), 1);
        assert_eq!(entry.segments[0].text, "slow tick");
        assert_eq!(entry.segments[0].style.foreground, Some(Rgb::new(218, 165, 32)));
    }

    #[test]
    fn test_osc8_hyperlink_segment() {
        let entry = parse_line("\x1b]8;;https://example.com\x1b\\click here\x1b]8;;\x1b\\");
        assert_eq!(entry.segments.len(), 1);
        assert_eq!(entry.segments[0].text, "click here");
        assert_eq!(
            entry.segments[0].hyperlink.as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_bare_url_auto_linking() {
        let entry = parse_line("see http://x.test/y for info");
        let parts: Vec<(&str, Option<&str>)> = entry
            .segments
            .iter()
            .map(|s| (s.text.as_str(), s.hyperlink.as_deref()))
            .collect();
        assert_eq!(
            parts,
            vec![
                ("see ", None),
                ("http://x.test/y", Some("http://x.test/y")),
                (" for info", None),
            ]
        );
    }

    #[test]
    fn test_url_inside_osc8_not_split() {
        let entry =
            parse_line("\x1b]8;;mc:copy_to_clipboard:x\x1b\\copy https://a.test now\x1b]8;;\x1b\\");
        assert_eq!(entry.segments.len(), 1);
        assert_eq!(
            entry.segments[0].hyperlink.as_deref(),
            Some("mc:copy_to_clipboard:x")
        );
    }

    #[test]
    fn test_truecolor_segment() {
        let entry = parse_line("\x1b[38;2;10;20;30mhi");
        assert_eq!(entry.segments.len(), 1);
        assert_eq!(entry.segments[0].text, "hi");
        assert_eq!(entry.segments[0].style.foreground, Some(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn test_segments_are_style_snapshots() {
        let entry = parse_line("\x1b[1mbold\x1b[0m plain \x1b[31mred");
        assert_eq!(entry.segments.len(), 3);
        assert!(entry.segments[0].style.bold);
        assert!(entry.segments[1].style.is_plain());
        assert_eq!(entry.segments[2].style.foreground, Some(Rgb::new(255, 0, 0)));
        assert!(!entry.segments[2].style.bold);
    }

    #[test]
    fn test_style_does_not_carry_across_lines() {
        let _ = parse_line("\x1b[1;31mopen bold red");
        let entry = parse_line("next line");
        assert!(entry.segments[0].style.is_plain());
    }

    #[test]
    fn test_tooltip_annotation() {
        let line = "\x1b]8;;tooltip:Steve joined\x1b\\\x1b]8;;mc:suggest_command:/msg Steve \x1b\\Steve\x1b]8;;\x1b\\\x1b]8;;\x1b\\";
        let entry = parse_line(line);
        assert_eq!(entry.segments.len(), 1);
        let seg = &entry.segments[0];
        assert_eq!(seg.text, "Steve");
        assert_eq!(seg.hyperlink.as_deref(), Some("mc:suggest_command:/msg Steve "));
        assert_eq!(seg.tooltip.as_deref(), Some("Steve joined"));
    }

    #[test]
    fn test_unbalanced_close_is_noop() {
        let entry = parse_line("\x1b]8;;\x1b\\text\x1b]8;;\x1b\\ more");
        assert_eq!(entry.plain_text(), "text more");
        assert!(entry.segments.iter().all(|s| s.hyperlink.is_none()));
    }

    #[test]
    fn test_malformed_sequences_kept_as_text() {
        let entry = parse_line("a\x1b[9Xb\x1b]8;;never closed");
        assert_eq!(entry.plain_text(), "a\x1b[9Xb\x1b]8;;never closed");
    }

    #[test]
    fn test_malformed_sgr_param_skipped() {
        let entry = parse_line("\x1b[1;;4mtext");
        assert!(entry.segments[0].style.bold);
        assert!(entry.segments[0].style.underline);
    }

    #[test]
    fn test_empty_line() {
        let entry = parse_line("");
        assert!(entry.segments.is_empty());
        assert_eq!(entry.plain_text(), "");
        assert_eq!(entry.level, LogLevel::Info);
    }

    #[test]
    fn test_link_stack_resolution_most_recent_first() {
        let mut links = LinkStack::new();
        links.apply("https://outer.test");
        links.apply("TOOLTIP:hover");
        links.apply("https://inner.test");
        let (target, tooltip) = links.resolve();
        assert_eq!(target.as_deref(), Some("https://inner.test"));
        assert_eq!(tooltip.as_deref(), Some("hover"));

        links.apply("");
        links.apply("");
        links.apply("");
        links.apply("");
        assert!(links.is_empty());
    }

    #[test]
    fn test_line_parser_trims_terminators() {
        let entry = LineParser::new().parse("[INFO] done\r\n");
        assert_eq!(entry.message, "[INFO] done");
        assert_eq!(entry.plain_text(), "done");
    }

    #[test]
    fn test_extract_metadata_without_tag() {
        let meta = extract_metadata("12:00:01 just text");
        assert_eq!(meta.level, None);
        assert_eq!(meta.time, None);
    }
}
