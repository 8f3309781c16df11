//! Retry/backoff orchestration over a completion backend.
//!
//! One call to [`UpstreamClient::complete`] runs the whole upstream leg of
//! a chat request: up to three attempts under a single total deadline,
//! exponential backoff between attempts, and sanitization of the winning
//! reply. The deadline preempts everything — an in-flight attempt and a
//! backoff wait alike end immediately when it fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use skyra_core::backend::{CompletionBackend, CompletionRequest};
use skyra_core::chat::ChatResponse;
use skyra_core::error::UpstreamError;

use crate::sanitize::Sanitizer;

/// Total deadline for one completion, attempts and backoff included.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Retries after the initial attempt.
const DEFAULT_RETRIES: u32 = 2;
/// Backoff before retry n is `base × 2^(n-1)`.
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(200);

/// Drives a [`CompletionBackend`] with deadline, retries, and sanitization.
pub struct UpstreamClient {
    backend: Arc<dyn CompletionBackend>,
    sanitizer: Sanitizer,
    timeout: Duration,
    retries: u32,
    backoff_base: Duration,
}

impl UpstreamClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            sanitizer: Sanitizer::new(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Override the total deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Override the backoff base.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Run the completion to a final outcome.
    ///
    /// Retryable failures (upstream 5xx, transport errors) are retried
    /// with growing backoff until the attempts or the deadline run out;
    /// upstream 4xx ends the loop at once. The successful reply comes back
    /// already sanitized.
    pub async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<ChatResponse, UpstreamError> {
        let deadline = Instant::now() + self.timeout;
        let mut last_error: Option<UpstreamError> = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                let backoff = self.backoff_base * (1u32 << (attempt - 1));
                debug!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "backing off before retry"
                );
                if timeout_at(deadline, sleep(backoff)).await.is_err() {
                    return Err(UpstreamError::DeadlineExceeded);
                }
            }

            match timeout_at(deadline, self.backend.complete(request.clone())).await {
                Err(_) => return Err(UpstreamError::DeadlineExceeded),
                Ok(Ok(completion)) => {
                    return Ok(ChatResponse {
                        reply: self.sanitizer.sanitize(&completion.text),
                        model: completion.model,
                        usage: completion.usage,
                    });
                }
                Ok(Err(error)) => {
                    if !error.is_retryable() {
                        warn!(backend = self.backend.name(), error = %error, "upstream failed, not retrying");
                        return Err(error);
                    }
                    warn!(
                        backend = self.backend.name(),
                        attempt,
                        error = %error,
                        "upstream attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| UpstreamError::Network("no upstream attempt was made".into()));
        Err(UpstreamError::RetriesExhausted(Box::new(last)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skyra_core::backend::Completion;
    use skyra_core::chat::{ChatMessage, Usage};
    use std::sync::Mutex;

    /// A mock backend that returns scripted outcomes in sequence.
    struct ScriptedBackend {
        outcomes: Mutex<Vec<Result<Completion, UpstreamError>>>,
        call_count: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<Result<Completion, UpstreamError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Completion, UpstreamError> {
            let mut count = self.call_count.lock().unwrap();
            let outcomes = self.outcomes.lock().unwrap();
            if *count >= outcomes.len() {
                panic!("ScriptedBackend exhausted: call #{}", *count);
            }
            let outcome = outcomes[*count].clone();
            *count += 1;
            outcome
        }
    }

    /// A backend that never answers before the deadline.
    struct StalledBackend;

    #[async_trait]
    impl CompletionBackend for StalledBackend {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Completion, UpstreamError> {
            sleep(Duration::from_secs(3600)).await;
            unreachable!("deadline should have fired")
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "skyra-mini".into(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 512,
            temperature: 0.2,
        }
    }

    fn completion(text: &str) -> Completion {
        Completion {
            text: text.into(),
            model: "skyra-mini".into(),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        }
    }

    fn server_error() -> UpstreamError {
        UpstreamError::ApiStatus {
            status_code: 500,
            message: "boom".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn two_failures_then_success() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(server_error()),
            Err(server_error()),
            Ok(completion("The answer is 4.")),
        ]));
        let client = UpstreamClient::new(backend.clone());

        let start = Instant::now();
        let response = client.complete(request()).await.unwrap();

        assert_eq!(response.reply, "The answer is 4.");
        assert_eq!(backend.calls(), 3);
        // 200ms before attempt 1, 400ms before attempt 2.
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn client_side_status_fails_immediately() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(UpstreamError::ApiStatus {
            status_code: 422,
            message: "bad request".into(),
        })]));
        let client = UpstreamClient::new(backend.clone());

        let start = Instant::now();
        let err = client.complete(request()).await.unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::ApiStatus {
                status_code: 422,
                ..
            }
        ));
        assert_eq!(backend.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_last_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(server_error()),
            Err(UpstreamError::Network("connection reset".into())),
            Err(UpstreamError::ApiStatus {
                status_code: 503,
                message: "overloaded".into(),
            }),
        ]));
        let client = UpstreamClient::new(backend.clone());

        let err = client.complete(request()).await.unwrap_err();

        assert_eq!(backend.calls(), 3);
        match err {
            UpstreamError::RetriesExhausted(last) => {
                assert!(matches!(
                    *last,
                    UpstreamError::ApiStatus {
                        status_code: 503,
                        ..
                    }
                ));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_preempts_backoff_wait() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
        ]));
        let client = UpstreamClient::new(backend.clone())
            .with_timeout(Duration::from_millis(300))
            .with_backoff_base(Duration::from_millis(250));

        let start = Instant::now();
        let err = client.complete(request()).await.unwrap_err();

        assert!(matches!(err, UpstreamError::DeadlineExceeded));
        // Attempt 0 fails, 250ms backoff, attempt 1 fails, then the 500ms
        // backoff runs into the 300ms deadline.
        assert_eq!(backend.calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_preempts_stalled_attempt() {
        let client =
            UpstreamClient::new(Arc::new(StalledBackend)).with_timeout(Duration::from_secs(1));

        let start = Instant::now();
        let err = client.complete(request()).await.unwrap_err();

        assert!(matches!(err, UpstreamError::DeadlineExceeded));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_reply_is_sanitized() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(completion(
            "<think>internal</think>The answer is 4.\n\nThe answer is 4.",
        ))]));
        let client = UpstreamClient::new(backend);

        let response = client.complete(request()).await.unwrap();
        assert_eq!(response.reply, "The answer is 4.");
        assert_eq!(response.model, "skyra-mini");
        assert_eq!(response.usage.total_tokens, 15);
    }
}
