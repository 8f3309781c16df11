//! Configuration loading for the skyra gateway.
//!
//! All settings come from `SKYRA_*` environment variables. Values are
//! trimmed; empty values count as unset. Missing upstream settings are not
//! a startup failure — the gateway answers 503 on versioned paths until
//! they are provided, so operators can distinguish misconfiguration from
//! hostile traffic.

use tracing::warn;

/// Gateway process configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub addr: String,

    /// Shared secret clients must present on `/v1/` paths.
    /// Unset fails closed with 503.
    pub api_key: Option<String>,

    /// Full URL of the upstream completion endpoint.
    pub model_endpoint: Option<String>,

    /// Default model name when the request does not name one.
    pub model_name: Option<String>,

    /// Optional bearer credential forwarded to the upstream endpoint.
    pub model_api_key: Option<String>,
}

fn default_addr() -> String {
    "127.0.0.1:8080".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            api_key: None,
            model_endpoint: None,
            model_name: None,
            model_api_key: None,
        }
    }
}

/// Redact a secret for Debug output.
fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("addr", &self.addr)
            .field("api_key", &redact(&self.api_key))
            .field("model_endpoint", &self.model_endpoint)
            .field("model_name", &self.model_name)
            .field("model_api_key", &redact(&self.model_api_key))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        if config.api_key.is_none() {
            warn!("SKYRA_API_KEY is not set — versioned API paths will answer 503");
        }
        if config.model_endpoint.is_none() {
            warn!("SKYRA_MODEL_ENDPOINT is not set — chat requests will answer 503");
        }
        config
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Tests pass a closure over a map instead of mutating process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            addr: get("SKYRA_ADDR").unwrap_or_else(default_addr),
            api_key: get("SKYRA_API_KEY"),
            model_endpoint: get("SKYRA_MODEL_ENDPOINT"),
            model_name: get("SKYRA_MODEL_NAME"),
            model_api_key: get("SKYRA_MODEL_API_KEY"),
        }
    }
}
