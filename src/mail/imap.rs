//! IMAP mailbox source: unread mail from the configured folder.
//!
//! The folder is opened read-only and bodies are fetched with `BODY.PEEK[]`,
//! so a run never changes the `\Seen` state of the mailbox.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{self, pki_types::ServerName};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::config::MailboxConfig;

use super::MailSource;
use super::parser::{ParsedEmail, parse_message};
use super::types::EmailRecord;

type ImapSession = async_imap::Session<Compat<TlsStream<TcpStream>>>;

pub struct ImapMailbox {
    server: String,
    port: u16,
    username: String,
    password: String,
    folder: String,
    max_emails: usize,
}

impl ImapMailbox {
    pub fn from_config(config: &MailboxConfig) -> Result<Self> {
        let server = config
            .server
            .clone()
            .context("No IMAP server configured (set IMAP_SERVER or [mailbox].server)")?;
        let username = config
            .username
            .clone()
            .context("No IMAP username configured (set IMAP_USERNAME or [mailbox].username)")?;
        let password = config
            .password
            .clone()
            .context("No IMAP password configured (set IMAP_PASSWORD or [mailbox].password)")?;

        Ok(Self {
            server,
            port: config.port,
            username,
            password,
            folder: config.folder.clone(),
            max_emails: config.max_emails,
        })
    }

    async fn connect(&self) -> Result<ImapSession> {
        let addr = format!("{}:{}", self.server, self.port);

        let tcp = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("Failed to connect to {}", addr))?;

        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));

        let server_name = ServerName::try_from(self.server.clone())
            .with_context(|| format!("Invalid IMAP server name: {}", self.server))?;
        let tls_stream = connector
            .connect(server_name, tcp)
            .await
            .context("TLS handshake failed")?;

        // async-imap speaks futures-io
        let client = async_imap::Client::new(tls_stream.compat());

        let session = client
            .login(&self.username, &self.password)
            .await
            .map_err(|e| anyhow::anyhow!("Login failed: {:?}", e.0))?;

        tracing::info!("Connected to IMAP server {}", self.server);
        Ok(session)
    }

    async fn fetch_unseen(
        &self,
        session: &mut ImapSession,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<(u32, ParsedEmail)>> {
        session
            .examine(&self.folder)
            .await
            .with_context(|| format!("Failed to open folder '{}'", self.folder))?;

        let query = search_query(cutoff);
        let mut uids: Vec<u32> = session
            .uid_search(&query)
            .await
            .with_context(|| format!("UID SEARCH {} failed", query))?
            .into_iter()
            .collect();

        if uids.is_empty() {
            return Ok(Vec::new());
        }
        uids.sort_unstable();

        let sequence = uids
            .iter()
            .map(|uid| uid.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut messages = session
            .uid_fetch(&sequence, "(UID BODY.PEEK[])")
            .await
            .context("Failed to fetch messages")?;

        let mut parsed = Vec::with_capacity(uids.len());
        while let Some(result) = messages.next().await {
            let fetch = result.context("Failed to fetch message")?;
            let (Some(uid), Some(raw)) = (fetch.uid, fetch.body()) else {
                continue;
            };
            match parse_message(&uid.to_string(), raw) {
                Some(email) => parsed.push((uid, email)),
                None => tracing::warn!("Skipping unparseable message UID {}", uid),
            }
        }

        Ok(parsed)
    }
}

#[async_trait]
impl MailSource for ImapMailbox {
    async fn fetch_recent(&self, lookback_hours: u64) -> Result<Vec<EmailRecord>> {
        let window = i64::try_from(lookback_hours)
            .ok()
            .and_then(Duration::try_hours)
            .context("Lookback window too large")?;
        let cutoff = Utc::now() - window;

        let mut session = self.connect().await?;
        let fetched = self.fetch_unseen(&mut session, cutoff).await;
        session.logout().await.ok();

        let fetched = fetched?;
        tracing::debug!("{} unseen messages since {}", fetched.len(), cutoff.date_naive());

        Ok(select_recent(fetched, cutoff, self.max_emails))
    }
}

/// IMAP `SINCE` only has day granularity and is evaluated in the server's
/// local time zone, so the search starts a day early. The exact window is
/// applied afterwards by [`select_recent`].
fn search_query(cutoff: DateTime<Utc>) -> String {
    let since = cutoff - Duration::days(1);
    format!("UNSEEN SINCE {}", since.format("%d-%b-%Y"))
}

/// Keep messages inside the window, newest first, at most `max` of them.
/// Messages without a usable `Date` header are kept.
fn select_recent(
    mut fetched: Vec<(u32, ParsedEmail)>,
    cutoff: DateTime<Utc>,
    max: usize,
) -> Vec<EmailRecord> {
    fetched.retain(|(_, email)| email.date.is_none_or(|date| date >= cutoff));
    fetched.sort_by(|(uid_a, a), (uid_b, b)| b.date.cmp(&a.date).then_with(|| uid_b.cmp(uid_a)));
    fetched.truncate(max);
    fetched.into_iter().map(|(_, email)| email.record).collect()
}
