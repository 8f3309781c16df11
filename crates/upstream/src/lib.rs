//! # Skyra Upstream
//!
//! Client for the upstream completion service:
//!
//! - [`HttpCompletionBackend`] speaks the OpenAI-compatible completions
//!   wire format over `reqwest`.
//! - [`UpstreamClient`] drives a backend under a total deadline with
//!   bounded retries and exponential backoff.
//! - [`Sanitizer`] strips reasoning markup and collapses duplicated output
//!   before a reply leaves the gateway.

pub mod client;
pub mod http;
pub mod sanitize;

pub use client::UpstreamClient;
pub use http::HttpCompletionBackend;
pub use sanitize::Sanitizer;
