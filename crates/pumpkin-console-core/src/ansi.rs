//! ANSI escape code handling utilities
//!
//! The server's console writer colors its output with SGR sequences and wraps
//! clickable chat components in OSC 8 hyperlinks. This module splits a raw
//! line into literal text and those two escape kinds, and provides a cheap
//! regex-based stripper for the "clean" copy used by metadata detection.
//!
//! Tokenization never fails: any ESC byte that does not start a recognized
//! sequence stays in the surrounding literal text.

use regex::Regex;
use std::sync::LazyLock;

const ESC: u8 = 0x1b;

/// Regex pattern for escape sequences removed from the clean copy.
///
/// Covers:
/// - CSI sequences with any final byte (colors, cursor movement, erase)
/// - OSC 8 hyperlinks terminated by ST (`ESC \`)
static ANSI_ESCAPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \x1b\[[^@-~]*[@-~]          # CSI sequences
        | \x1b\]8;.*?\x1b\\         # OSC 8 hyperlinks
        ",
    )
    .expect("ANSI regex pattern is valid")
});

/// A contiguous slice of a raw log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiToken<'a> {
    /// Plain text, including any unrecognized escape bytes
    Literal(&'a str),
    /// `ESC [ <params> m`
    Sgr {
        /// The full sequence as it appeared in the input
        raw: &'a str,
        /// The `;`-separated parameter list (may be empty)
        params: &'a str,
    },
    /// `ESC ] 8 ; <params> ; <uri> ESC \`
    Hyperlink {
        /// The full sequence as it appeared in the input
        raw: &'a str,
        /// Link target; empty closes the current link
        uri: &'a str,
    },
}

impl<'a> AnsiToken<'a> {
    /// The exact input text this token covers
    pub fn as_str(&self) -> &'a str {
        match self {
            AnsiToken::Literal(text) => text,
            AnsiToken::Sgr { raw, .. } | AnsiToken::Hyperlink { raw, .. } => raw,
        }
    }

    /// Whether this token is an escape sequence rather than text
    pub fn is_escape(&self) -> bool {
        !matches!(self, AnsiToken::Literal(_))
    }
}

/// Split a raw line into literal, SGR and OSC 8 tokens.
///
/// Tokens are contiguous and exhaustive; adjacent literal text is merged into
/// a single `Literal`.
///
/// # Examples
///
/// ```
/// use pumpkin_console_core::ansi::{tokenize, AnsiToken};
///
/// let tokens = tokenize("\x1b[31mred\x1b[0m");
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[1], AnsiToken::Literal("red"));
/// ```
pub fn tokenize(line: &str) -> Vec<AnsiToken<'_>> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != ESC {
            i += 1;
            continue;
        }

        let matched = match_sgr(line, i).or_else(|| match_osc8(line, i));
        match matched {
            Some((token, end)) => {
                if literal_start < i {
                    tokens.push(AnsiToken::Literal(&line[literal_start..i]));
                }
                tokens.push(token);
                i = end;
                literal_start = end;
            }
            None => i += 1,
        }
    }

    if literal_start < bytes.len() {
        tokens.push(AnsiToken::Literal(&line[literal_start..]));
    }

    tokens
}

/// Match `ESC [ [0-9;]* m` starting at `start` (which holds ESC).
fn match_sgr(line: &str, start: usize) -> Option<(AnsiToken<'_>, usize)> {
    let bytes = line.as_bytes();
    if bytes.get(start + 1) != Some(&b'[') {
        return None;
    }

    let params_start = start + 2;
    let mut j = params_start;
    while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b';') {
        j += 1;
    }

    if bytes.get(j) != Some(&b'm') {
        return None;
    }

    let end = j + 1;
    Some((
        AnsiToken::Sgr {
            raw: &line[start..end],
            params: &line[params_start..j],
        },
        end,
    ))
}

/// Match `ESC ] 8 ; ... ESC \` starting at `start` (which holds ESC).
///
/// The content up to the first `;` is the OSC 8 parameter list; the rest is
/// the URI. Content without a `;` is taken as the URI whole.
fn match_osc8(line: &str, start: usize) -> Option<(AnsiToken<'_>, usize)> {
    const OPEN: &str = "\x1b]8;";
    const TERMINATOR: &str = "\x1b\\";

    if !line[start..].starts_with(OPEN) {
        return None;
    }

    let content_start = start + OPEN.len();
    let terminator = line[content_start..].find(TERMINATOR)?;
    let content_end = content_start + terminator;
    let end = content_end + TERMINATOR.len();

    let content = &line[content_start..content_end];
    let uri = match content.find(';') {
        Some(semi) => &content[semi + 1..],
        None => content,
    };

    Some((
        AnsiToken::Hyperlink {
            raw: &line[start..end],
            uri,
        },
        end,
    ))
}

/// Strip CSI and OSC 8 escape sequences from a string.
///
/// # Examples
///
/// ```
/// use pumpkin_console_core::ansi::strip_ansi_codes;
///
/// assert_eq!(strip_ansi_codes("\x1b[31mred text\x1b[0m"), "red text");
/// assert_eq!(
///     strip_ansi_codes("\x1b]8;;https://example.com\x1b\\Link\x1b]8;;\x1b\\"),
///     "Link"
/// );
/// ```
pub fn strip_ansi_codes(input: &str) -> String {
    ANSI_ESCAPE_PATTERN.replace_all(input, "").into_owned()
}

/// Check if a string contains escape sequences removed by [`strip_ansi_codes`].
pub fn contains_ansi_codes(input: &str) -> bool {
    ANSI_ESCAPE_PATTERN.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rebuild(tokens: &[AnsiToken<'_>]) -> String {
        tokens.iter().map(|t| t.as_str()).collect()
    }

    #[test]
    fn test_plain_text_is_single_literal() {
        let tokens = tokenize("Done (1.2s)! For help, type \"help\"");
        assert_eq!(
            tokens,
            vec![AnsiToken::Literal("Done (1.2s)! For help, type \"help\"")]
        );
    }

    #[test]
    fn test_empty_line_has_no_tokens() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_sgr_tokens() {
        let tokens = tokenize("\x1b[1;31mError\x1b[0m rest");
        assert_eq!(
            tokens,
            vec![
                AnsiToken::Sgr {
                    raw: "\x1b[1;31m",
                    params: "1;31"
                },
                AnsiToken::Literal("Error"),
                AnsiToken::Sgr {
                    raw: "\x1b[0m",
                    params: "0"
                },
                AnsiToken::Literal(" rest"),
            ]
        );
    }

    #[test]
    fn test_empty_sgr_params() {
        let tokens = tokenize("\x1b[mtext");
        assert_eq!(
            tokens[0],
            AnsiToken::Sgr {
                raw: "\x1b[m",
                params: ""
            }
        );
    }

    #[test]
    fn test_hyperlink_open_and_close() {
        let line = "\x1b]8;;https://example.com\x1b\\click here\x1b]8;;\x1b\\";
        let tokens = tokenize(line);
        assert_eq!(tokens.len(), 3);
        assert!(matches!(
            tokens[0],
            AnsiToken::Hyperlink {
                uri: "https://example.com",
                ..
            }
        ));
        assert_eq!(tokens[1], AnsiToken::Literal("click here"));
        assert!(matches!(tokens[2], AnsiToken::Hyperlink { uri: "", .. }));
    }

    #[test]
    fn test_hyperlink_with_params() {
        let tokens = tokenize("\x1b]8;id=42;mc:run_command:/help\x1b\\help\x1b]8;;\x1b\\");
        assert!(matches!(
            tokens[0],
            AnsiToken::Hyperlink {
                uri: "mc:run_command:/help",
                ..
            }
        ));
    }

    #[test]
    fn test_hyperlink_without_separator_uses_whole_content() {
        let tokens = tokenize("\x1b]8;https://x.test\x1b\\x");
        assert!(matches!(
            tokens[0],
            AnsiToken::Hyperlink {
                uri: "https://x.test",
                ..
            }
        ));
    }

    #[test]
    fn test_unterminated_osc_is_literal() {
        let line = "\x1b]8;;https://example.com no terminator";
        assert_eq!(tokenize(line), vec![AnsiToken::Literal(line)]);
    }

    #[test]
    fn test_non_sgr_csi_is_literal() {
        let line = "\x1b[2Jcleared";
        assert_eq!(tokenize(line), vec![AnsiToken::Literal(line)]);
    }

    #[test]
    fn test_lone_escape_is_literal() {
        let tokens = tokenize("a\x1bb\x1b");
        assert_eq!(tokens, vec![AnsiToken::Literal("a\x1bb\x1b")]);
    }

    #[test]
    fn test_literal_merges_around_unknown_escape() {
        let tokens = tokenize("x\x1b[?25ly\x1b[32mz");
        assert_eq!(tokens[0], AnsiToken::Literal("x\x1b[?25ly"));
        assert!(tokens[1].is_escape());
        assert_eq!(tokens[2], AnsiToken::Literal("z"));
    }

    #[test]
    fn test_unicode_text_preserved() {
        let line = "\x1b[33m⚠ Zombie → Spieler\x1b[0m";
        let tokens = tokenize(line);
        assert_eq!(tokens[1], AnsiToken::Literal("⚠ Zombie → Spieler"));
        assert_eq!(rebuild(&tokens), line);
    }

    #[test]
    fn test_strip_simple_color_codes() {
        assert_eq!(strip_ansi_codes("\x1b[31mred text\x1b[0m"), "red text");
    }

    #[test]
    fn test_strip_cursor_codes() {
        assert_eq!(strip_ansi_codes("\x1b[2Jclear\x1b[Hmove"), "clearmove");
    }

    #[test]
    fn test_strip_rgb_color_codes() {
        assert_eq!(
            strip_ansi_codes("\x1b[38;2;255;100;50mRGB color\x1b[0m"),
            "RGB color"
        );
    }

    #[test]
    fn test_strip_hyperlinks() {
        let input = "see \x1b]8;;mc:suggest_command:/tp\x1b\\here\x1b]8;;\x1b\\ now";
        assert_eq!(strip_ansi_codes(input), "see here now");
    }

    #[test]
    fn test_contains_ansi_codes() {
        assert!(contains_ansi_codes("\x1b[31mred\x1b[0m"));
        assert!(contains_ansi_codes("\x1b]8;;x\x1b\\y\x1b]8;;\x1b\\"));
        assert!(!contains_ansi_codes("plain text"));
        assert!(!contains_ansi_codes(""));
    }

    fn line_strategy() -> impl Strategy<Value = String> {
        let fragment = prop_oneof![
            "[a-zA-Z0-9 :\\[\\]./]{0,12}",
            Just("\x1b".to_string()),
            Just("\x1b[".to_string()),
            Just("\x1b[0m".to_string()),
            Just("\x1b[1;38;2;10;20;30m".to_string()),
            Just("\x1b[;x".to_string()),
            Just("\x1b]8;;https://a.test\x1b\\".to_string()),
            Just("\x1b]8;;\x1b\\".to_string()),
            Just("\x1b]8;;".to_string()),
            Just("\x1b\\".to_string()),
            Just("é→".to_string()),
        ];
        prop::collection::vec(fragment, 0..16).prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn prop_tokens_rebuild_input(line in line_strategy()) {
            let tokens = tokenize(&line);
            prop_assert_eq!(rebuild(&tokens), line);
        }

        #[test]
        fn prop_arbitrary_strings_rebuild(line in any::<String>()) {
            let tokens = tokenize(&line);
            prop_assert_eq!(rebuild(&tokens), line);
        }

        #[test]
        fn prop_no_adjacent_literals(line in line_strategy()) {
            let tokens = tokenize(&line);
            for pair in tokens.windows(2) {
                prop_assert!(pair[0].is_escape() || pair[1].is_escape());
            }
        }
    }
}
