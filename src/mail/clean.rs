//! Body cleanup before text is handed to the model.
//!
//! Marketing mail is full of invisible characters and layout whitespace that
//! only cost tokens.

use std::sync::LazyLock;

use regex::Regex;

static INVISIBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{200b}\u{200c}\u{200d}\u{2060}\u{034f}\u{00ad}]").unwrap());

static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[ \u{00a0}\u{2003}]{5,}").unwrap());

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s+$").unwrap());

/// Normalize an email body for classification.
pub fn clean_email_text(text: &str) -> String {
    let text = INVISIBLE.replace_all(text, "");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "");
    text.trim().to_string()
}
