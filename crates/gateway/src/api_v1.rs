//! HTTP API v1 — the versioned gateway surface.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`  — validate, call the upstream with retry, answer JSON
//! - `POST /v1/voice` — placeholder; accepts JSON, no pipeline behind it yet
//!
//! Admission (rate limiting, then auth) happens in the middleware stack
//! before any handler here runs.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::post,
};
use tracing::error;

use skyra_core::backend::CompletionRequest;
use skyra_core::chat::{ChatRequest, ChatResponse};
use skyra_core::error::{Error, UpstreamError};

use crate::{SharedState, validate};

/// Temperature used when the client does not set one.
const DEFAULT_TEMPERATURE: f64 = 0.2;
/// Completion cap used when the client does not set one.
const DEFAULT_MAX_TOKENS: u32 = 512;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/voice", post(voice_handler))
        .with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = require_json(&headers) {
        return response;
    }

    let request = match validate::decode_chat_request(&body) {
        Ok(request) => request,
        Err(err) => return error_response(&Error::Validation(err)),
    };

    match generate_chat_response(&state, request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            error!(error = %err, "chat generation failed");
            error_response(&err)
        }
    }
}

/// Placeholder endpoint: the request is admitted and size-checked like any
/// other versioned call, but no voice pipeline exists behind it yet.
async fn voice_handler(headers: HeaderMap, _body: Bytes) -> Response {
    if let Err(response) = require_json(&headers) {
        return response;
    }

    "voice endpoint".into_response()
}

// ── Pipeline ──────────────────────────────────────────────────────────────

/// Resolve config and drive the upstream call for one validated request.
async fn generate_chat_response(
    state: &SharedState,
    request: ChatRequest,
) -> Result<ChatResponse, Error> {
    let Some(upstream) = &state.upstream else {
        return Err(Error::Config {
            message: "missing SKYRA_MODEL_ENDPOINT".into(),
        });
    };

    let model = request
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .or(state.config.model_name.as_deref())
        .ok_or_else(|| Error::Config {
            message: "missing model name".into(),
        })?
        .to_string();

    let completion_request = CompletionRequest {
        model,
        messages: request.messages,
        max_tokens: request
            .max_tokens
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
    };

    Ok(upstream.complete(completion_request).await?)
}

// ── Error mapping ─────────────────────────────────────────────────────────

/// Map a pipeline error to the caller-visible status and short text body.
///
/// Upstream statuses are never forwarded verbatim: an upstream 401/403/429
/// lands in the same 502 class as any other upstream failure, so the
/// gateway's own auth and rate-limit semantics stay unambiguous.
pub(crate) fn error_response(error: &Error) -> Response {
    match error {
        Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        Error::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized").into_response(),
        Error::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "60")],
            "rate limit exceeded",
        )
            .into_response(),
        Error::Config { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
        }
        Error::Upstream(UpstreamError::DeadlineExceeded) => {
            (StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout").into_response()
        }
        Error::Upstream(_) => (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response(),
        Error::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

/// Reject anything that is not `application/json`.
///
/// Wrong methods never reach the handlers — the router answers 405 itself.
fn require_json(headers: &HeaderMap) -> Result<(), Response> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if !content_type.starts_with("application/json") {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "content-type must be application/json",
        )
            .into_response());
    }
    Ok(())
}
