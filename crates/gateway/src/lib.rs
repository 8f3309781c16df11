//! HTTP API gateway for skyra.
//!
//! Sits between external clients and the upstream completion service:
//! access logging, panic isolation, per-client rate limiting, API-key
//! authentication, strict validation, and resilient upstream invocation.
//!
//! Built on Axum. Layer order, outermost first: trace → access log →
//! panic boundary → rate limit → (route) → auth on `/v1` only. Rate
//! limiting runs before auth so unauthenticated floods are still
//! throttled per source key.

pub mod api_v1;
pub mod limiter;
pub mod validate;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use subtle::ConstantTimeEq;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use skyra_config::AppConfig;
use skyra_core::error::Error;
use skyra_upstream::{HttpCompletionBackend, UpstreamClient};

use limiter::RateLimiter;

/// Maximum accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;
/// Requests admitted per client key per window.
const RATE_LIMIT_MAX_REQUESTS: u32 = 30;
/// Fixed rate-limit window length.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub limiter: RateLimiter,
    /// `None` until `SKYRA_MODEL_ENDPOINT` is configured; chat answers 503.
    pub upstream: Option<Arc<UpstreamClient>>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build state from configuration, wiring the HTTP backend when an
    /// upstream endpoint is configured.
    pub fn new(config: AppConfig) -> Self {
        let upstream = config.model_endpoint.as_ref().map(|endpoint| {
            let backend =
                HttpCompletionBackend::new(endpoint.clone(), config.model_api_key.clone());
            Arc::new(UpstreamClient::new(Arc::new(backend)))
        });
        Self::with_upstream(config, upstream)
    }

    /// Build state with an explicit upstream client. Tests inject mock
    /// backends through this.
    pub fn with_upstream(config: AppConfig, upstream: Option<Arc<UpstreamClient>>) -> Self {
        Self {
            config,
            limiter: RateLimiter::new(RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW),
            upstream,
        }
    }
}

/// Build the full gateway router.
pub fn build_router(state: SharedState) -> Router {
    let v1 = api_v1::v1_router(state.clone())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state,
            rate_limit_middleware,
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(access_log_middleware))
        .layer(TraceLayer::new_for_http())
}

// ── Middleware ────────────────────────────────────────────────────────────

/// One structured log line per request.
async fn access_log_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = std::time::Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

/// Outermost fault boundary: a panicking handler becomes a logged,
/// detail-free 500 instead of a dropped connection.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(panic = %detail, "request handling panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
}

/// Fixed-window rate limiting on versioned paths, keyed by client identity.
///
/// Runs before auth so credential-less floods are throttled too.
async fn rate_limit_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    if !req.uri().path().starts_with("/v1/") {
        return next.run(req).await;
    }

    let key = client_key(&req);
    if !state.limiter.admit(&key) {
        warn!(client = %key, "rate limit exceeded");
        return api_v1::error_response(&Error::RateLimited);
    }

    next.run(req).await
}

/// API-key authentication on versioned paths.
///
/// An unset secret fails closed with 503 — distinguishable from hostile
/// traffic, which gets 401. The comparison is constant-time.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        warn!("SKYRA_API_KEY is not set, refusing versioned API request");
        return (StatusCode::SERVICE_UNAVAILABLE, "server not configured").into_response();
    };

    let presented = extract_credential(req.headers());
    if presented.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
        warn!(path = %req.uri().path(), "unauthorized request");
        return api_v1::error_response(&Error::Unauthorized);
    }

    next.run(req).await
}

/// Pull the presented credential from `Authorization: Bearer` (preferred)
/// or `X-API-Key`.
fn extract_credential(headers: &HeaderMap) -> String {
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        let auth = auth.trim();
        if auth.len() > 7 && auth[..7].eq_ignore_ascii_case("bearer ") {
            return auth[7..].trim().to_string();
        }
    }

    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Derive the rate-limit key for a request: trusted proxy header first,
/// then the first forwarded-for entry, then the socket address.
fn client_key(req: &Request) -> String {
    if let Some(ip) = req
        .headers()
        .get("cf-connecting-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return ip.to_string();
    }

    if let Some(first) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> &'static str {
    "ok"
}
