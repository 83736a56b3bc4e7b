//! Recovery of the JSON object from free-form model output.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::types::ClassificationOutput;

/// First fenced block holding a JSON object, with or without a `json` tag.
static FENCED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

#[derive(Debug, Error)]
#[error("model output is not a classification object: {source}")]
pub struct ParseError {
    #[source]
    source: serde_json::Error,
    /// Text that was handed to the JSON decoder
    pub candidate: String,
}

/// Extract the JSON payload: the fenced block if there is one, otherwise the
/// whole trimmed text.
pub fn extract_json(text: &str) -> &str {
    FENCED_OBJECT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| text.trim(), |m| m.as_str())
}

/// Parse the raw content of a completion into a [`ClassificationOutput`].
pub fn parse_model_output(text: &str) -> Result<ClassificationOutput, ParseError> {
    let candidate = extract_json(text);
    serde_json::from_str(candidate).map_err(|source| ParseError {
        source,
        candidate: candidate.to_string(),
    })
}
