use serde::{Deserialize, Serialize};

/// One unread email, reduced to what the classifier needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Stable identifier (Message-ID, or the IMAP UID when absent)
    pub id: String,
    pub subject: String,
    /// Sender as displayed, e.g. `Registrar <registrar@example.edu>`
    pub sender: String,
    /// Cleaned plain-text body
    pub body: String,
}

impl EmailRecord {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            sender: sender.into(),
            body: body.into(),
        }
    }
}
