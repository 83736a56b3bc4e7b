use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AI_ENDPOINT, DEFAULT_AI_MODEL, DEFAULT_AI_TIMEOUT_SECS, DEFAULT_BASE_DELAY_SECS,
    DEFAULT_IMAP_PORT, DEFAULT_LOOKBACK_HOURS, DEFAULT_MAX_EMAILS, DEFAULT_MAX_RETRIES,
    DEFAULT_WEBHOOK_TIMEOUT_SECS,
};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Classification endpoint (OpenRouter)
    #[serde(default)]
    pub ai: AiConfig,
    /// Chat webhook receiving the digest
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Mailbox to read unread mail from
    #[serde(default)]
    pub mailbox: MailboxConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the config was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// OpenRouter API key
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_ai_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            endpoint: default_ai_endpoint(),
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
            request_timeout_secs: default_ai_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.base_delay_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Discord webhook URL; the digest is skipped when unset
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    /// Account or app password
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Size of the window for unread mail; also the watch interval
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u64,
    #[serde(default = "default_max_emails")]
    pub max_emails: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: default_imap_port(),
            username: None,
            password: None,
            folder: default_folder(),
            lookback_hours: default_lookback_hours(),
            max_emails: default_max_emails(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `maildigest.log` in the data directory
    #[serde(default = "default_log_file")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_ai_model() -> String {
    DEFAULT_AI_MODEL.to_string()
}

fn default_ai_endpoint() -> String {
    DEFAULT_AI_ENDPOINT.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay_secs() -> u64 {
    DEFAULT_BASE_DELAY_SECS
}

fn default_ai_timeout_secs() -> u64 {
    DEFAULT_AI_TIMEOUT_SECS
}

fn default_webhook_timeout_secs() -> u64 {
    DEFAULT_WEBHOOK_TIMEOUT_SECS
}

fn default_imap_port() -> u16 {
    DEFAULT_IMAP_PORT
}

fn default_folder() -> String {
    "INBOX".to_string()
}

fn default_lookback_hours() -> u64 {
    DEFAULT_LOOKBACK_HOURS
}

fn default_max_emails() -> usize {
    DEFAULT_MAX_EMAILS
}

/// Managed container platforms (Cloud Run sets `K_SERVICE`) collect stderr;
/// a log file there is pointless.
fn default_log_file() -> bool {
    std::env::var_os("K_SERVICE").is_none()
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("maildigest");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dir = dirs::data_local_dir()
            .context("Could not find data directory")?
            .join("maildigest");
        Ok(dir)
    }

    /// Load the config file (optional) and apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?, |key| std::env::var(key).ok())
    }

    /// Read `path` when it exists, apply overrides from `lookup`, validate.
    pub fn load_from<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let mut config = Self::from_file(path)?;
            config.source = Some(path.to_path_buf());
            config
        } else {
            Config::default()
        };

        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the run loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.mailbox.lookback_hours > 0,
            "INTERVAL_IN_HOUR / [mailbox].lookback_hours must be at least 1"
        );
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENROUTER_API_KEY") {
            self.ai.api_key = Some(v);
        }
        if let Some(v) = get("MODEL_NAME") {
            self.ai.model = v;
        }
        if let Some(v) = get("MAILDIGEST_MAX_RETRIES") {
            self.ai.max_retries = parse_override("MAILDIGEST_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("MAILDIGEST_BASE_DELAY_SECS") {
            self.ai.base_delay_secs = parse_override("MAILDIGEST_BASE_DELAY_SECS", &v)?;
        }
        if let Some(v) = get("DISCORD_WEBHOOK_URL") {
            self.webhook.url = Some(v);
        }
        if let Some(v) = get("IMAP_SERVER") {
            self.mailbox.server = Some(v);
        }
        if let Some(v) = get("IMAP_PORT") {
            self.mailbox.port = parse_override("IMAP_PORT", &v)?;
        }
        if let Some(v) = get("IMAP_USERNAME") {
            self.mailbox.username = Some(v);
        }
        if let Some(v) = get("IMAP_PASSWORD") {
            self.mailbox.password = Some(v);
        }
        if let Some(v) = get("IMAP_FOLDER") {
            self.mailbox.folder = v;
        }
        if let Some(v) = get("INTERVAL_IN_HOUR") {
            self.mailbox.lookback_hours = parse_override("INTERVAL_IN_HOUR", &v)?;
        }
        if let Some(v) = get("MAX_EMAILS") {
            self.mailbox.max_emails = parse_override("MAX_EMAILS", &v)?;
        }

        Ok(())
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}
