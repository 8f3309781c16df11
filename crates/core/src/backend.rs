//! CompletionBackend trait — the abstraction over the upstream service.
//!
//! A backend knows how to send one completion request and return the raw
//! assistant text. Retry, backoff, deadline enforcement, and sanitization
//! live above this seam so they can be exercised against mock backends.

use async_trait::async_trait;

use crate::chat::{ChatMessage, Usage};
use crate::error::UpstreamError;

/// One fully resolved upstream completion request.
///
/// Defaults for omitted client fields are applied before this is built; a
/// backend sends it as-is.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// The raw result of a single successful completion attempt.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Unsanitized assistant text.
    pub text: String,

    /// Model name as reported by the upstream.
    pub model: String,

    /// Token accounting; zeroed when the upstream omits it.
    pub usage: Usage,
}

/// Abstraction over the upstream completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Issue a single completion attempt.
    ///
    /// One call is one attempt: no retries, no deadline handling. The
    /// caller cancels by dropping the future.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, UpstreamError>;
}
