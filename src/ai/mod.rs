//! Email classification through the OpenRouter API
//!
//! Each email is summarized, assigned a category and rated for importance by
//! a chat model. Calls are retried with exponential backoff on rate limits,
//! network failures and unusable answers alike.

mod classifier;
mod client;
mod error;
mod parse;
mod prompts;
mod types;

pub use classifier::{Classifier, EmailClassifier};
pub use client::OpenRouterClient;
pub use error::ClassificationError;
#[cfg(test)]
pub use error::AttemptError;
pub use types::{Category, ClassificationOutput, ClassificationResult, Importance};
