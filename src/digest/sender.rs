//! Delivery of digest messages to a chat webhook.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::ai::ClassificationResult;
use crate::config::WebhookConfig;
use crate::constants::WEBHOOK_SUCCESS_STATUS;

use super::format::{pack_blocks, render_blocks};

/// Failure to deliver one message. Never aborts the remaining sends.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The webhook answered with something other than 204
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be completed
    #[error("webhook request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Transport(err.to_string())
    }
}

/// HTTP answer of a webhook post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

/// Destination for digest messages.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn post(&self, content: &str) -> Result<WebhookResponse, DeliveryError>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Discord-compatible webhook (`{"content": ...}`, 204 on success).
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl WebhookSink for DiscordWebhook {
    async fn post(&self, content: &str) -> Result<WebhookResponse, DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(WebhookResponse { status, body })
    }
}

/// A message that could not be delivered.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    /// 1-based position of the message in the digest
    pub message: usize,
    pub error: DeliveryError,
}

/// Outcome of one digest delivery.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.delivered == self.attempted
    }
}

/// Formats classification results and posts them to the configured sink.
pub struct DigestSender {
    sink: Option<Box<dyn WebhookSink>>,
}

impl DigestSender {
    pub fn new(sink: Option<Box<dyn WebhookSink>>) -> Self {
        Self { sink }
    }

    /// A sender for the configured webhook; without a URL every digest is skipped.
    pub fn from_config(config: &WebhookConfig) -> Result<Self> {
        let sink = match &config.url {
            Some(url) => {
                let webhook = DiscordWebhook::new(url.clone(), Duration::from_secs(config.timeout_secs))?;
                Some(Box::new(webhook) as Box<dyn WebhookSink>)
            }
            None => None,
        };
        Ok(Self::new(sink))
    }

    /// The messages a digest of `results` consists of, without sending them.
    pub fn preview(&self, results: &[ClassificationResult]) -> Vec<String> {
        pack_blocks(render_blocks(results))
    }

    /// Render, pack and deliver `results` in order.
    pub async fn send_digest(&self, results: &[ClassificationResult]) -> DeliveryReport {
        let Some(sink) = &self.sink else {
            tracing::warn!("[Webhook] No webhook URL configured, digest skipped.");
            return DeliveryReport::default();
        };

        if results.is_empty() {
            tracing::info!("[Webhook] No summary to send.");
            return DeliveryReport::default();
        }

        tracing::info!("[Webhook] Sending {} summaries.", results.len());

        let messages = self.preview(results);
        let total = messages.len();
        let mut report = DeliveryReport {
            attempted: total,
            ..Default::default()
        };

        for (index, message) in messages.iter().enumerate() {
            let position = index + 1;
            let outcome = match sink.post(message).await {
                Ok(response) if response.status == WEBHOOK_SUCCESS_STATUS => Ok(()),
                Ok(response) => Err(DeliveryError::Status {
                    status: response.status,
                    body: response.body,
                }),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::info!("[Webhook] Message {}/{} sent successfully.", position, total);
                }
                Err(error) => {
                    tracing::error!("[Webhook] Message {}/{} failed: {}", position, total, error);
                    report.failures.push(DeliveryFailure {
                        message: position,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            "[Webhook] Completed: {}/{} messages sent successfully.",
            report.delivered,
            report.attempted
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::ai::{Category, ClassificationOutput, Importance};
    use crate::constants::DIGEST_HEADER;

    /// Sink that records every post and answers from a per-call script.
    #[derive(Clone, Default)]
    struct RecordingSink {
        posts: Arc<Mutex<Vec<String>>>,
        fail_transport_on: Option<usize>,
        status_on: Option<(usize, u16)>,
    }

    #[async_trait]
    impl WebhookSink for RecordingSink {
        async fn post(&self, content: &str) -> Result<WebhookResponse, DeliveryError> {
            let call = {
                let mut posts = self.posts.lock().unwrap();
                posts.push(content.to_string());
                posts.len()
            };
            if self.fail_transport_on == Some(call) {
                return Err(DeliveryError::Transport("connection refused".to_string()));
            }
            let status = match self.status_on {
                Some((n, status)) if n == call => status,
                _ => 204,
            };
            Ok(WebhookResponse {
                status,
                body: String::new(),
            })
        }
    }

    fn results(count: usize) -> Vec<ClassificationResult> {
        (1..=count)
            .map(|n| ClassificationResult {
                id: n.to_string(),
                subject: format!("Subject {}", n),
                sender: "sender@example.com".to_string(),
                output: ClassificationOutput {
                    summary: "s".repeat(150),
                    category: Category::Career,
                    importance: Importance::HIGH,
                    reason: "r".to_string(),
                },
            })
            .collect()
    }

    fn sender(sink: &RecordingSink) -> DigestSender {
        DigestSender::new(Some(Box::new(sink.clone())))
    }

    #[tokio::test]
    async fn test_empty_results_make_no_calls() {
        let sink = RecordingSink::default();
        let report = sender(&sink).send_digest(&[]).await;

        assert_eq!(report.attempted, 0);
        assert_eq!(report.delivered, 0);
        assert!(sink.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_sink_skips_delivery() {
        let report = DigestSender::new(None).send_digest(&results(3)).await;
        assert_eq!(report.attempted, 0);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_stop_later_messages() {
        let sink = RecordingSink {
            fail_transport_on: Some(2),
            ..Default::default()
        };
        let sender = sender(&sink);
        // ~240 chars per block, eight blocks per message
        let results = results(20);
        assert_eq!(sender.preview(&results).len(), 3);

        let report = sender.send_digest(&results).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert!(!report.is_complete());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].message, 2);
        assert!(matches!(report.failures[0].error, DeliveryError::Transport(_)));
        assert_eq!(sink.posts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_only_204_counts_as_delivered() {
        let sink = RecordingSink {
            status_on: Some((1, 200)),
            ..Default::default()
        };
        let report = sender(&sink).send_digest(&results(2)).await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 0);
        assert!(matches!(
            report.failures[0].error,
            DeliveryError::Status { status: 200, .. }
        ));
    }

    #[tokio::test]
    async fn test_messages_are_sent_in_order() {
        let sink = RecordingSink::default();
        let report = sender(&sink).send_digest(&results(20)).await;

        assert!(report.is_complete());
        let posts = sink.posts.lock().unwrap();
        assert!(posts[0].starts_with(DIGEST_HEADER));
        assert!(posts[0].contains("**1. [Career] :star::star::star:**"));
        assert!(posts[2].contains("**20. "));
    }
}
