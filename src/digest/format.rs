//! Rendering of classification results and packing into webhook messages.

use std::borrow::Cow;

use crate::ai::{Category, ClassificationResult, Importance};
use crate::constants::{
    DIGEST_CONTINUED_HEADER, DIGEST_HEADER, DIGEST_SOFT_LIMIT, MAX_SENDER_CHARS, MAX_SUBJECT_CHARS,
    MAX_SUMMARY_CHARS, WEBHOOK_HARD_LIMIT,
};

const STAR: &str = ":star:";

/// The fields of one digest line; absent values render as placeholders.
#[derive(Debug, Clone, Default)]
pub struct DigestEntry<'a> {
    pub subject: &'a str,
    pub sender: &'a str,
    pub category: Option<Category>,
    pub importance: Option<Importance>,
    pub summary: Option<&'a str>,
}

impl<'a> From<&'a ClassificationResult> for DigestEntry<'a> {
    fn from(result: &'a ClassificationResult) -> Self {
        Self {
            subject: &result.subject,
            sender: &result.sender,
            category: Some(result.output.category),
            importance: Some(result.output.importance),
            summary: Some(&result.output.summary),
        }
    }
}

/// Length as the webhook counts it (Unicode scalar values).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Render the block for the entry at 1-based `position`.
///
/// Every line is newline-terminated and the block ends with a blank line, so
/// blocks concatenate without separators.
pub fn render_block(position: usize, entry: &DigestEntry) -> String {
    let category = entry.category.map_or("N/A", |c| c.as_str());
    let stars = entry
        .importance
        .map_or_else(|| "?".to_string(), |i| STAR.repeat(usize::from(i.get())));
    let summary = entry
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("(No summary)");

    format!(
        "**{}. [{}] {}**\nSubject: {}\nSender: `{}`\n> {}\n\n",
        position,
        category,
        stars,
        single_line(entry.subject, MAX_SUBJECT_CHARS),
        single_line(entry.sender, MAX_SENDER_CHARS).replace('`', "'"),
        single_line(summary, MAX_SUMMARY_CHARS),
    )
}

/// Render every result, numbering from 1 in input order.
pub fn render_blocks(results: &[ClassificationResult]) -> Vec<String> {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| render_block(i + 1, &DigestEntry::from(result)))
        .collect()
}

/// Pack rendered blocks into messages under the soft limit.
///
/// Blocks are never split and keep their order. The first message carries
/// [`DIGEST_HEADER`], every later one [`DIGEST_CONTINUED_HEADER`].
pub fn pack_blocks<I>(blocks: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut messages = Vec::new();
    let mut current = String::from(DIGEST_HEADER);
    let mut current_len = char_len(DIGEST_HEADER);
    let mut has_content = false;

    for block in blocks {
        let block_len = char_len(&block);

        if current_len + block_len > DIGEST_SOFT_LIMIT {
            if has_content {
                debug_assert!(current_len <= WEBHOOK_HARD_LIMIT);
                messages.push(std::mem::take(&mut current));
            }
            current = String::from(DIGEST_CONTINUED_HEADER);
            current_len = char_len(DIGEST_CONTINUED_HEADER);
        }

        current.push_str(&block);
        current_len += block_len;
        has_content = true;
    }

    if has_content {
        debug_assert!(current_len <= WEBHOOK_HARD_LIMIT);
        messages.push(current);
    }

    messages
}

/// Flatten line breaks and clip to `max` characters.
fn single_line(text: &str, max: usize) -> Cow<'_, str> {
    let text: Cow<str> = if text.contains(['\r', '\n']) {
        Cow::Owned(text.split_whitespace().collect::<Vec<_>>().join(" "))
    } else {
        Cow::Borrowed(text)
    };

    if char_len(&text) <= max {
        return text;
    }

    let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    Cow::Owned(clipped)
}
