//! Application-wide constants for tuning and configuration
//!
//! Centralizes magic numbers to make them discoverable and configurable.

// === Classification ===

/// OpenRouter chat completions endpoint.
pub const DEFAULT_AI_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model used when none is configured.
pub const DEFAULT_AI_MODEL: &str = "openai/gpt-4o-mini";

/// Additional classification attempts after the first one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubled for every further retry.
pub const DEFAULT_BASE_DELAY_SECS: u64 = 1;

/// Request timeout for the classification endpoint in seconds.
/// Completions for long emails can take a while.
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

/// HTTP status the classification endpoint uses for rate limiting.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

// === Digest ===

/// Hard message length limit of the chat webhook, in characters.
pub const WEBHOOK_HARD_LIMIT: usize = 2000;

/// Packing threshold, kept below [`WEBHOOK_HARD_LIMIT`] for headroom.
pub const DIGEST_SOFT_LIMIT: usize = 1950;

/// Header of the first digest message.
pub const DIGEST_HEADER: &str = "**Email Summary**\n";

/// Header of every message after a split.
pub const DIGEST_CONTINUED_HEADER: &str = "**Email Summary (continued)**\n";

/// Status code the webhook returns for an accepted message.
pub const WEBHOOK_SUCCESS_STATUS: u16 = 204;

/// Request timeout for webhook deliveries in seconds.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 15;

/// Field limits applied while rendering, in characters.
/// Together they keep a single block well under [`DIGEST_SOFT_LIMIT`].
pub const MAX_SUBJECT_CHARS: usize = 300;
pub const MAX_SENDER_CHARS: usize = 200;
pub const MAX_SUMMARY_CHARS: usize = 1000;

// === Mailbox ===

/// Default IMAP-over-TLS port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// How far back to look for unread mail, in hours.
/// Also the interval between runs in watch mode.
pub const DEFAULT_LOOKBACK_HOURS: u64 = 6;

/// Upper bound on emails processed per run.
pub const DEFAULT_MAX_EMAILS: usize = 50;
