//! OpenRouter API client

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

use super::error::{AttemptError, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Raw HTTP answer of the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub status: u16,
    pub body: String,
}

/// One HTTP exchange with a chat completion endpoint.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

/// OpenRouter API client for chat completions
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    pub fn new(api_key: String, endpoint: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("No OpenRouter API key configured (set OPENROUTER_API_KEY or [ai].api_key)")?;

        Self::new(
            api_key,
            config.endpoint.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl ChatTransport for OpenRouterClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/maildigest")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ChatReply { status, body })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the text of the first choice out of a reply.
///
/// The status code is only consulted for rate limiting; every other failure
/// shows up as a body without `choices`.
pub fn extract_content(reply: &ChatReply) -> Result<String, AttemptError> {
    if reply.status == crate::constants::STATUS_TOO_MANY_REQUESTS {
        return Err(AttemptError::RateLimited);
    }

    let response: ChatResponse = serde_json::from_str(&reply.body).map_err(|e| {
        AttemptError::MalformedResponse(format!("undecodable body (HTTP {}): {}", reply.status, e))
    })?;

    let Some(choices) = response.choices else {
        return Err(AttemptError::MalformedResponse(format!(
            "OpenRouter error: {}",
            describe_error(response.error.as_ref())
        )));
    };

    choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AttemptError::MalformedResponse("No response content from AI".to_string()))
}

fn describe_error(error: Option<&serde_json::Value>) -> String {
    match error {
        None => "Unknown error".to_string(),
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(value) => value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> ChatReply {
        ChatReply {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(extract_content(&reply(200, body)).unwrap(), "hello");
    }

    #[test]
    fn test_rate_limit_wins_over_body() {
        let body = r#"{"error":{"message":"slow down","code":429}}"#;
        assert!(matches!(
            extract_content(&reply(429, body)),
            Err(AttemptError::RateLimited)
        ));
        assert!(matches!(
            extract_content(&reply(429, "<html>Too Many Requests</html>")),
            Err(AttemptError::RateLimited)
        ));
    }

    #[test]
    fn test_error_body_is_malformed() {
        let body = r#"{"error":{"message":"No auth credentials found","code":401}}"#;
        match extract_content(&reply(401, body)) {
            Err(AttemptError::MalformedResponse(msg)) => {
                assert_eq!(msg, "OpenRouter error: No auth credentials found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_choices_without_error_field() {
        match extract_content(&reply(200, "{}")) {
            Err(AttemptError::MalformedResponse(msg)) => {
                assert_eq!(msg, "OpenRouter error: Unknown error");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        assert!(matches!(
            extract_content(&reply(502, "Bad Gateway")),
            Err(AttemptError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_content(&reply(200, r#"{"choices":[]}"#)),
            Err(AttemptError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_request_serializes_to_openrouter_shape() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "m",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }
}
