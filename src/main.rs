mod agent;
mod ai;
mod config;
mod constants;
mod digest;
mod mail;
mod retry;

use std::env;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::{Classifier, ClassificationResult, OpenRouterClient};
use crate::config::Config;
use crate::digest::DigestSender;
use crate::mail::{ImapMailbox, MockClassifier, MockMailbox};

fn setup_logging(config: &Config) {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,maildigest=info"));

    let log_file = config
        .logging
        .file
        .then(|| Config::data_dir().ok())
        .flatten()
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("maildigest.log"))
                .ok()
        });

    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

fn print_usage() {
    eprintln!(
        r#"maildigest - Summarize unread email into a chat digest

Usage: maildigest [command]

Commands:
    (none), run     Classify unread mail and post the digest once
    run --dry-run   Classify unread mail and print the digest instead
    watch           Run repeatedly, every INTERVAL_IN_HOUR hours
    mock            Offline run with canned emails, digest printed
    help            Show this help message

Configuration file: ~/.config/maildigest/config.toml
Environment: OPENROUTER_API_KEY, MODEL_NAME, DISCORD_WEBHOOK_URL,
             IMAP_SERVER, IMAP_USERNAME, IMAP_PASSWORD, INTERVAL_IN_HOUR
"#
    );
}

fn print_digest(messages: &[String]) {
    for message in messages {
        println!("{}", message);
    }
}

/// Everything a real run needs, built once from the config.
struct Pipeline {
    source: ImapMailbox,
    classifier: Classifier<OpenRouterClient>,
    sender: DigestSender,
    lookback_hours: u64,
}

impl Pipeline {
    fn from_config(config: &Config) -> Result<Self> {
        let transport = OpenRouterClient::from_config(&config.ai)?;
        Ok(Self {
            source: ImapMailbox::from_config(&config.mailbox)?,
            classifier: Classifier::new(transport, config.ai.model.clone(), config.ai.retry_policy()),
            sender: DigestSender::from_config(&config.webhook)?,
            lookback_hours: config.mailbox.lookback_hours,
        })
    }

    async fn run(&self) {
        agent::run_once(&self.source, &self.classifier, &self.sender, self.lookback_hours).await;
    }

    async fn dry_run(&self) {
        let results: Vec<ClassificationResult> =
            agent::collect_results(&self.source, &self.classifier, self.lookback_hours)
                .await
                .map(|(_, results)| results)
                .unwrap_or_default();
        print_digest(&self.sender.preview(&results));
    }
}

async fn run_watch(pipeline: &Pipeline) -> Result<()> {
    let period = Duration::from_secs(pipeline.lookback_hours.saturating_mul(3600));
    anyhow::ensure!(!period.is_zero(), "Watch interval must be at least one hour");
    tracing::info!("Watching mailbox, one run every {} hours", pipeline.lookback_hours);

    agent::watch(period, move || pipeline.run(), tokio::signal::ctrl_c()).await?;
    tracing::info!("Shutting down");
    Ok(())
}

async fn run_mock() {
    let sender = DigestSender::new(None);
    let results = agent::collect_results(&MockMailbox, &MockClassifier, 0)
        .await
        .map(|(_, results)| results)
        .unwrap_or_default();
    print_digest(&sender.preview(&results));
    tracing::info!("[Agent] Done.");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str());

    if matches!(command, Some("help") | Some("--help") | Some("-h")) {
        print_usage();
        return Ok(());
    }

    let config = Config::load()?;
    setup_logging(&config);
    match &config.source {
        Some(path) => tracing::debug!("Loaded config from {}", path.display()),
        None => tracing::debug!("No config file found, using defaults and environment"),
    }

    match (command, args.get(2).map(|s| s.as_str())) {
        (None, _) | (Some("run"), None) => Pipeline::from_config(&config)?.run().await,
        (Some("run"), Some("--dry-run")) => Pipeline::from_config(&config)?.dry_run().await,
        (Some("watch"), _) => run_watch(&Pipeline::from_config(&config)?).await?,
        (Some("mock") | Some("--mock"), _) => run_mock().await,
        _ => {
            eprintln!("Unknown command: {}", args[1..].join(" "));
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
