//! Mailbox access: where the unread emails of a run come from.

pub mod clean;
pub mod imap;
pub mod mock;
pub mod parser;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use imap::ImapMailbox;
pub use mock::{MockClassifier, MockMailbox};
pub use types::EmailRecord;

/// A source of unread emails.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Unread emails received within the last `lookback_hours`, newest first.
    async fn fetch_recent(&self, lookback_hours: u64) -> Result<Vec<EmailRecord>>;
}
