//! # Skyra Core
//!
//! Domain types, validation, and error definitions for the skyra gateway.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that the other crates implement against.
//!
//! The upstream completion service is abstracted as a trait here
//! ([`CompletionBackend`]) so the retry orchestrator and the HTTP handlers
//! can be tested against mock backends.

pub mod backend;
pub mod chat;
pub mod error;

// Re-export key types at crate root for ergonomics
pub use backend::{Completion, CompletionBackend, CompletionRequest};
pub use chat::{ChatMessage, ChatRequest, ChatResponse, Usage};
pub use error::{Error, Result, UpstreamError, ValidationError};
