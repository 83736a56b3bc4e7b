//! One digest run: fetch, classify, deliver.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::ai::{ClassificationResult, EmailClassifier};
use crate::digest::{DeliveryReport, DigestSender};
use crate::mail::MailSource;

/// Counts of one run, for the final log line.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub fetched: usize,
    pub classified: usize,
    pub failed: usize,
    pub delivery: DeliveryReport,
}

/// Fetch and classify emails; failures of single emails are logged and skipped.
///
/// Returns `None` when the mailbox could not be read.
pub async fn collect_results(
    source: &dyn MailSource,
    classifier: &dyn EmailClassifier,
    lookback_hours: u64,
) -> Option<(usize, Vec<ClassificationResult>)> {
    let emails = match source.fetch_recent(lookback_hours).await {
        Ok(emails) => emails,
        Err(e) => {
            tracing::error!("[Agent] Fatal error: {:#}", e);
            return None;
        }
    };

    tracing::info!("[Agent] Fetched {} emails", emails.len());

    let mut results = Vec::with_capacity(emails.len());
    for email in &emails {
        tracing::info!("[Agent] Processing: {}", email.subject);
        match classifier.classify(email).await {
            Ok(result) => {
                tracing::info!("[Agent] Reason: {}", result.output.reason);
                results.push(result);
            }
            Err(e) => {
                tracing::error!("[Agent] Failed to process email {}: {}", email.id, e);
            }
        }
    }

    Some((emails.len(), results))
}

/// Run the whole pipeline once. Never fails; problems end up in the log.
pub async fn run_once(
    source: &dyn MailSource,
    classifier: &dyn EmailClassifier,
    sender: &DigestSender,
    lookback_hours: u64,
) -> RunSummary {
    tracing::info!("[Agent] Starting mail summarizer agent...");

    let Some((fetched, results)) = collect_results(source, classifier, lookback_hours).await else {
        tracing::info!("[Agent] Done.");
        return RunSummary::default();
    };

    let delivery = sender.send_digest(&results).await;

    let summary = RunSummary {
        fetched,
        classified: results.len(),
        failed: fetched - results.len(),
        delivery,
    };
    tracing::info!(
        fetched = summary.fetched,
        classified = summary.classified,
        failed = summary.failed,
        delivered = summary.delivery.delivered,
        "[Agent] Done."
    );
    if !summary.delivery.is_complete() {
        for failure in &summary.delivery.failures {
            tracing::warn!("[Agent] Digest message {} was not delivered: {}", failure.message, failure.error);
        }
    }
    summary
}

/// Start `run` every `period` until `shutdown` resolves.
///
/// Runs start on a fixed cadence, the first one immediately, so consecutive
/// lookback windows line up regardless of how long a run takes. `shutdown` is
/// polled during runs as well as between them; a run in progress is dropped.
/// `period` must be non-zero.
pub async fn watch<F, Fut, S>(period: Duration, mut run: F, shutdown: S) -> std::io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    S: Future<Output = std::io::Result<()>>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut shutdown => return result,
        }

        tokio::select! {
            _ = run() => {}
            result = &mut shutdown => {
                tracing::info!("[Agent] Interrupted during a run");
                return result;
            }
        }
    }
}
