//! Canned mailbox and classifier for offline runs (`maildigest mock`).

use anyhow::Result;
use async_trait::async_trait;

use crate::ai::{
    Category, ClassificationError, ClassificationOutput, ClassificationResult, EmailClassifier,
    Importance,
};

use super::MailSource;
use super::types::EmailRecord;

/// Mailbox that always returns the same two emails.
pub struct MockMailbox;

#[async_trait]
impl MailSource for MockMailbox {
    async fn fetch_recent(&self, _lookback_hours: u64) -> Result<Vec<EmailRecord>> {
        Ok(vec![
            EmailRecord::new(
                "001",
                "NTU Course Schedule Update",
                "registrar@ntu.edu.tw",
                "Dear student, your class schedule for Fall 2025 is now available...",
            ),
            EmailRecord::new(
                "002",
                "50% off on your Uber Eats order!",
                "uber@marketing.com",
                "Get 50% off your next order before Aug 10...",
            ),
        ])
    }
}

/// Classifier that answers without calling a model.
pub struct MockClassifier;

#[async_trait]
impl EmailClassifier for MockClassifier {
    async fn classify(&self, email: &EmailRecord) -> Result<ClassificationResult, ClassificationError> {
        let academic = email.subject.contains("NTU");
        let output = ClassificationOutput {
            summary: "This is a mock summary of the email.".to_string(),
            category: if academic { Category::Academic } else { Category::Ads },
            importance: Importance::MEDIUM,
            reason: if academic {
                "Academic info is important.".to_string()
            } else {
                "Just a coupon for you!".to_string()
            },
        };
        Ok(ClassificationResult::new(email, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_classifier_follows_subject() {
        let emails = MockMailbox.fetch_recent(6).await.unwrap();
        assert_eq!(emails.len(), 2);

        let first = MockClassifier.classify(&emails[0]).await.unwrap();
        let second = MockClassifier.classify(&emails[1]).await.unwrap();
        assert_eq!(first.output.category, Category::Academic);
        assert_eq!(second.output.category, Category::Ads);
        assert_eq!(second.id, "002");
        assert_eq!(second.sender, "uber@marketing.com");
    }
}
