//! Bounded exponential backoff for calls to unreliable remote services.
//!
//! The decision whether to try again is a pure function of the attempt
//! number and the error ([`RetryPolicy::decide`]); [`with_retry`] only drives
//! the loop and sleeps between attempts.

use std::future::Future;
use std::time::Duration;

use crate::constants::{DEFAULT_BASE_DELAY_SECS, DEFAULT_MAX_RETRIES};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubles for every retry after that
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(DEFAULT_BASE_DELAY_SECS),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    RetryAfter(Duration),
    GiveUp,
}

/// Returned when every attempt failed (or the error was not retryable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<E> {
    /// Number of calls that were made
    pub attempts: u32,
    /// Error of the final call
    pub last: E,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total number of calls the policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `attempt` (0-indexed): `base_delay * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Decide what follows failed attempt `attempt` (0-indexed).
    pub fn decide<E: Retryable>(&self, attempt: u32, error: &E) -> Decision {
        if error.is_retryable() && attempt < self.max_retries {
            Decision::RetryAfter(self.delay_for(attempt))
        } else {
            Decision::GiveUp
        }
    }
}

/// Execute an async operation under `policy`.
///
/// Returns the result of the first successful attempt. When the policy gives
/// up, the final error is returned together with the number of calls made.
///
/// # Example
/// ```ignore
/// let result = with_retry(&policy, |attempt| async move {
///     some_fallible_operation(attempt).await
/// }).await;
/// ```
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!("Succeeded after {} attempts", attempt + 1);
                }
                return Ok(result);
            }
            Err(e) => match policy.decide(attempt, &e) {
                Decision::RetryAfter(delay) => {
                    tracing::warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt + 1,
                        policy.max_attempts(),
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Decision::GiveUp => {
                    return Err(Exhausted {
                        attempts: attempt + 1,
                        last: e,
                    });
                }
            },
        }
    }
}
