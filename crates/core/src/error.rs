//! Error types for the skyra gateway domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! collects them for the request pipeline.

use thiserror::Error;

/// The top-level error type for one gateway call.
#[derive(Debug, Error)]
pub enum Error {
    // --- Client errors (4xx, surfaced immediately, never retried) ---
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limit exceeded")]
    RateLimited,

    // --- Upstream errors (retried, then surfaced as a gateway failure) ---
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    // --- Configuration errors (503, never retried) ---
    #[error("configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A chat request that failed strict decoding or field validation.
///
/// The `Display` text of each variant is the exact body returned to the
/// caller with the 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid JSON body")]
    InvalidJson,

    #[error("messages is required")]
    MissingMessages,

    #[error("messages[{index}] requires role and content")]
    BlankMessage { index: usize },

    #[error("temperature must be between 0 and 2")]
    TemperatureOutOfRange,

    #[error("max_tokens must be greater than zero")]
    NonPositiveMaxTokens,
}

/// A failure talking to the upstream completion service.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("model endpoint returned {status_code}: {message}")]
    ApiStatus { status_code: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("retries exhausted: {0}")]
    RetriesExhausted(Box<UpstreamError>),
}

impl UpstreamError {
    /// Whether another attempt may succeed.
    ///
    /// Server-side upstream failures (status ≥ 500), transport failures,
    /// and unparseable responses are retryable. Upstream 4xx means the
    /// request itself is bad as sent; the deadline is final by definition.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::ApiStatus { status_code, .. } => *status_code >= 500,
            UpstreamError::Network(_) | UpstreamError::InvalidResponse(_) => true,
            UpstreamError::DeadlineExceeded | UpstreamError::RetriesExhausted(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_text_is_caller_facing() {
        assert_eq!(
            ValidationError::BlankMessage { index: 2 }.to_string(),
            "messages[2] requires role and content"
        );
        assert_eq!(ValidationError::InvalidJson.to_string(), "invalid JSON body");
    }

    #[test]
    fn server_side_status_is_retryable() {
        let err = UpstreamError::ApiStatus {
            status_code: 503,
            message: "overloaded".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn client_side_status_is_not_retryable() {
        for status_code in [400, 401, 403, 404, 422, 429] {
            let err = UpstreamError::ApiStatus {
                status_code,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "status {status_code}");
        }
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(UpstreamError::Network("connection reset".into()).is_retryable());
        assert!(UpstreamError::InvalidResponse("truncated".into()).is_retryable());
    }

    #[test]
    fn deadline_is_final() {
        assert!(!UpstreamError::DeadlineExceeded.is_retryable());
    }

    #[test]
    fn upstream_error_displays_status() {
        let err = Error::Upstream(UpstreamError::ApiStatus {
            status_code: 502,
            message: "bad gateway".into(),
        });
        assert!(err.to_string().contains("502"));
    }
}
