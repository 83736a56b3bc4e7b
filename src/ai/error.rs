//! Error types for classification calls.

use thiserror::Error;

use crate::retry::Retryable;

/// The HTTP exchange itself failed (connect, TLS, timeout, body read).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Why a single classification attempt failed.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    /// The endpoint answered 429
    #[error("rate limited by the classification endpoint")]
    RateLimited,

    /// Missing `choices`, undecodable body, or model output that is not the
    /// expected JSON object
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Network failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Every failure is retried; a malformed answer is treated like a network
/// error since the next completion may well be valid.
impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::RateLimited
            | AttemptError::MalformedResponse(_)
            | AttemptError::Transport(_) => true,
        }
    }
}

/// Terminal failure for one email after the retry budget is spent.
#[derive(Debug, Clone, Error)]
#[error("classification of {email_id} failed after {attempts} attempts: {last}")]
pub struct ClassificationError {
    pub email_id: String,
    pub attempts: u32,
    pub last: AttemptError,
}
