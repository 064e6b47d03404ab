//! Classification of segment hyperlink targets
//!
//! Chat components from the server arrive as OSC 8 links whose target is
//! either a real URI or an `mc:` pseudo-action. A host decides what a click
//! does from the [`LinkAction`].

use std::path::PathBuf;

use url::Url;

use crate::parser::strip_prefix_ignore_case;

const RUN_COMMAND: &str = "mc:run_command:";
const SUGGEST_COMMAND: &str = "mc:suggest_command:";
const CHANGE_PAGE: &str = "mc:change_page:";
const COPY_TO_CLIPBOARD: &str = "mc:copy_to_clipboard:";

/// What activating a link should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// `http://` or `https://`
    OpenUrl(Url),
    /// `file://`
    OpenFile(PathBuf),
    /// Execute immediately as a server command
    RunCommand(String),
    /// Place into the command input without sending
    SuggestCommand(String),
    ChangePage(String),
    CopyToClipboard(String),
    /// Anything else, kept verbatim
    Unknown(String),
}

impl LinkAction {
    /// Classify a hyperlink target.
    ///
    /// `mc:` prefixes match ASCII case-insensitively. Command payloads lose
    /// one leading `/`.
    pub fn parse(target: &str) -> Self {
        if let Some(cmd) = strip_prefix_ignore_case(target, RUN_COMMAND) {
            return LinkAction::RunCommand(strip_slash(cmd));
        }
        if let Some(cmd) = strip_prefix_ignore_case(target, SUGGEST_COMMAND) {
            return LinkAction::SuggestCommand(strip_slash(cmd));
        }
        if let Some(page) = strip_prefix_ignore_case(target, CHANGE_PAGE) {
            return LinkAction::ChangePage(page.to_string());
        }
        if let Some(value) = strip_prefix_ignore_case(target, COPY_TO_CLIPBOARD) {
            return LinkAction::CopyToClipboard(value.to_string());
        }

        match Url::parse(target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => LinkAction::OpenUrl(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => LinkAction::OpenFile(path),
                Err(()) => LinkAction::Unknown(target.to_string()),
            },
            _ => LinkAction::Unknown(target.to_string()),
        }
    }

    /// Whether activating this link sends something to the server
    pub fn is_command(&self) -> bool {
        matches!(self, LinkAction::RunCommand(_))
    }
}

/// Commands are sent without their leading slashes
fn strip_slash(cmd: &str) -> String {
    cmd.trim_start_matches('/').to_string()
}
