//! Chat request and response domain types.
//!
//! These are the value objects that flow through one gateway call:
//! client sends a `ChatRequest` → validation → upstream completion →
//! sanitized `ChatResponse` back to the client.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hard ceiling on `max_tokens`; larger values are clamped, not rejected.
pub const MAX_MAX_TOKENS: i64 = 4096;

/// A single message in a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent this message ("user", "assistant", "system", ...).
    pub role: String,

    /// The text content.
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// An inbound chat request, decoded strictly: unknown fields are an error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    /// Model override; falls back to the configured default when omitted.
    #[serde(default)]
    pub model: Option<String>,

    /// The conversation messages, order-significant.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature in [0, 2].
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Maximum tokens to generate; must be positive, clamped to
    /// [`MAX_MAX_TOKENS`] when larger.
    #[serde(default)]
    pub max_tokens: Option<i64>,
}

impl ChatRequest {
    /// Validate field constraints and clamp `max_tokens`.
    ///
    /// All checks are local — no I/O happens here, and nothing upstream is
    /// engaged until validation has passed.
    pub fn validate(&mut self) -> std::result::Result<(), ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::MissingMessages);
        }

        for (i, message) in self.messages.iter().enumerate() {
            if message.role.trim().is_empty() || message.content.trim().is_empty() {
                return Err(ValidationError::BlankMessage { index: i });
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ValidationError::TemperatureOutOfRange);
            }
        }

        if let Some(max_tokens) = self.max_tokens {
            if max_tokens <= 0 {
                return Err(ValidationError::NonPositiveMaxTokens);
            }
            if max_tokens > MAX_MAX_TOKENS {
                self.max_tokens = Some(MAX_MAX_TOKENS);
            }
        }

        Ok(())
    }
}

/// Token accounting reported by the upstream service.
///
/// All fields default to zero when the upstream omits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

/// The gateway's response to a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The sanitized assistant reply.
    pub reply: String,

    /// The model that produced the reply, as reported by the upstream.
    pub model: String,

    /// Upstream token accounting.
    pub usage: Usage,
}
