//! Email classification with retry.

use async_trait::async_trait;

use crate::mail::EmailRecord;
use crate::retry::{Exhausted, RetryPolicy, with_retry};

use super::client::{ChatMessage, ChatRequest, ChatTransport, extract_content};
use super::error::{AttemptError, ClassificationError};
use super::parse::parse_model_output;
use super::prompts;
use super::types::{ClassificationOutput, ClassificationResult};

/// Anything that can turn an email into a [`ClassificationResult`].
#[async_trait]
pub trait EmailClassifier: Send + Sync {
    async fn classify(&self, email: &EmailRecord) -> Result<ClassificationResult, ClassificationError>;
}

/// Classifier backed by a chat completion endpoint.
pub struct Classifier<T> {
    transport: T,
    model: String,
    policy: RetryPolicy,
}

impl<T: ChatTransport> Classifier<T> {
    pub fn new(transport: T, model: String, policy: RetryPolicy) -> Self {
        Self {
            transport,
            model,
            policy,
        }
    }

    fn build_request(&self, email: &EmailRecord) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompts::CLASSIFY_SYSTEM),
                ChatMessage::user(prompts::classification_prompt(email)),
            ],
        }
    }

    /// A single call: request, interpret the reply, parse the model output.
    async fn attempt(&self, request: &ChatRequest) -> Result<ClassificationOutput, AttemptError> {
        let reply = self.transport.send(request).await?;
        let content = extract_content(&reply)?;

        parse_model_output(&content).map_err(|e| {
            tracing::debug!(raw = %e.candidate, "Model output is not valid JSON");
            AttemptError::MalformedResponse(e.to_string())
        })
    }
}

#[async_trait]
impl<T: ChatTransport> EmailClassifier for Classifier<T> {
    async fn classify(&self, email: &EmailRecord) -> Result<ClassificationResult, ClassificationError> {
        let request = self.build_request(email);
        let request = &request;

        match with_retry(&self.policy, |_| self.attempt(request)).await {
            Ok(output) => Ok(ClassificationResult::new(email, output)),
            Err(Exhausted { attempts, last }) => Err(ClassificationError {
                email_id: email.id.clone(),
                attempts,
                last,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    use crate::ai::client::ChatReply;
    use crate::ai::error::TransportError;
    use crate::ai::types::{Category, Importance};

    const GOOD_CONTENT: &str =
        "```json\n{\"summary\":\"Schedule posted\",\"category\":\"Academic\",\"importance\":2,\"reason\":\"Plan ahead\"}\n```";

    /// Transport that replays scripted outcomes and records call times.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<ChatReply, TransportError>>>,
        fallback: Result<ChatReply, TransportError>,
        calls: Mutex<Vec<(Instant, ChatRequest)>>,
    }

    impl ScriptedTransport {
        fn new(
            script: Vec<Result<ChatReply, TransportError>>,
            fallback: Result<ChatReply, TransportError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((Instant::now(), request.clone()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn ok_reply(content: &str) -> Result<ChatReply, TransportError> {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        Ok(ChatReply {
            status: 200,
            body: body.to_string(),
        })
    }

    fn rate_limited() -> Result<ChatReply, TransportError> {
        Ok(ChatReply {
            status: 429,
            body: r#"{"error":{"message":"Rate limit exceeded","code":429}}"#.to_string(),
        })
    }

    fn email() -> EmailRecord {
        EmailRecord::new(
            "abc",
            "Course Schedule Update",
            "registrar@example.edu",
            "Your class schedule is now available.",
        )
    }

    fn classifier(transport: ScriptedTransport) -> Classifier<ScriptedTransport> {
        Classifier::new(
            transport,
            "test/model".to_string(),
            RetryPolicy::new(3, Duration::from_secs(1)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let classifier = classifier(ScriptedTransport::new(vec![], ok_reply(GOOD_CONTENT)));

        let result = classifier.classify(&email()).await.unwrap();

        assert_eq!(result.id, "abc");
        assert_eq!(result.subject, "Course Schedule Update");
        assert_eq!(result.sender, "registrar@example.edu");
        assert_eq!(result.output.category, Category::Academic);
        assert_eq!(result.output.importance, Importance::MEDIUM);

        let calls = classifier.transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let request = &calls[0].1;
        assert_eq!(request.model, "test/model");
        assert_eq!(request.messages[0], ChatMessage::system(prompts::CLASSIFY_SYSTEM));
        assert!(request.messages[1].content.contains("Subject: Course Schedule Update"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_exhausts_with_backoff() {
        let classifier = classifier(ScriptedTransport::new(vec![], rate_limited()));
        let start = Instant::now();

        let err = classifier.classify(&email()).await.unwrap_err();

        assert_eq!(err.email_id, "abc");
        assert_eq!(err.attempts, 4);
        assert!(matches!(err.last, AttemptError::RateLimited));

        let offsets: Vec<Duration> = classifier
            .transport
            .call_times()
            .into_iter()
            .map(|t| t - start)
            .collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(7),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_from_mixed_failures() {
        let script = vec![
            Err(TransportError::new("connection reset")),
            rate_limited(),
            ok_reply("Sorry, I cannot help with that."),
            ok_reply(GOOD_CONTENT),
        ];
        let classifier = classifier(ScriptedTransport::new(script, rate_limited()));

        let result = classifier.classify(&email()).await.unwrap();

        assert_eq!(result.output.summary, "Schedule posted");
        assert_eq!(classifier.transport.call_times().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_output_is_retried_then_fatal() {
        let classifier = classifier(ScriptedTransport::new(vec![], ok_reply("not json")));

        let err = classifier.classify(&email()).await.unwrap_err();

        assert_eq!(err.attempts, 4);
        assert!(matches!(err.last, AttemptError::MalformedResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_body_is_retried() {
        let error_body = Ok(ChatReply {
            status: 401,
            body: r#"{"error":{"message":"No auth credentials found","code":401}}"#.to_string(),
        });
        let classifier = classifier(ScriptedTransport::new(vec![error_body], ok_reply(GOOD_CONTENT)));

        assert!(classifier.classify(&email()).await.is_ok());
        assert_eq!(classifier.transport.call_times().len(), 2);
    }
}
