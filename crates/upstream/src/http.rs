//! OpenAI-compatible HTTP completion backend.
//!
//! Speaks the `/chat/completions` wire format: works with vLLM, Ollama,
//! llama.cpp, and any other endpoint exposing the same shape. The endpoint
//! URL is used verbatim — no path is appended.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use skyra_core::backend::{Completion, CompletionBackend, CompletionRequest};
use skyra_core::chat::{ChatMessage, Usage};
use skyra_core::error::UpstreamError;

/// Cap on how much of an upstream error body is kept for logs and errors.
const MAX_ERROR_BODY_BYTES: usize = 512;

/// A completion backend talking to one HTTP endpoint.
pub struct HttpCompletionBackend {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpCompletionBackend {
    /// Create a backend for `endpoint`, optionally authenticating with a
    /// bearer credential.
    ///
    /// The `reqwest` client is built once and reused; per-call deadlines
    /// are imposed by the caller, so only a connect timeout is set here.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("failed to create HTTP client");

        Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, UpstreamError> {
        let body = ApiRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %request.model, endpoint = %self.endpoint, "sending completion request");

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut message = body.trim().to_string();
            if message.len() > MAX_ERROR_BODY_BYTES {
                let mut end = MAX_ERROR_BODY_BYTES;
                while !message.is_char_boundary(end) {
                    end -= 1;
                }
                message.truncate(end);
            }
            warn!(status = status.as_u16(), body = %message, "model endpoint returned error");
            return Err(UpstreamError::ApiStatus {
                status_code: status.as_u16(),
                message,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|_| UpstreamError::InvalidResponse("invalid model response".into()))?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            UpstreamError::InvalidResponse("model response missing choices".into())
        })?;

        Ok(Completion {
            text: choice.message.content,
            model: api_response.model,
            usage: api_response.usage.unwrap_or_default(),
        })
    }
}

// --- Wire types (internal) ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_wire_shape() {
        let messages = vec![ChatMessage::user("hi")];
        let body = ApiRequest {
            model: "skyra-mini",
            messages: &messages,
            max_tokens: 512,
            temperature: 0.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "skyra-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["temperature"], 0.2);
    }

    #[test]
    fn parses_completion_response() {
        let data = r#"{
            "model": "skyra-mini",
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.model, "skyra-mini");
        assert_eq!(parsed.choices[0].message.content, "hello");
        assert_eq!(parsed.usage.unwrap().total_tokens, 10);
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let data = r#"{"model": "m", "choices": [{"message": {"content": "x"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.usage.unwrap_or_default(), Usage::default());
    }

    #[test]
    fn empty_choices_parse_but_are_rejected_later() {
        let data = r#"{"model": "m", "choices": []}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
