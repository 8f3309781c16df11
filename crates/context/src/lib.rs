//! # Skyra Context
//!
//! Deterministic compression of retrieved context fragments into a
//! bounded-size prompt block, injected ahead of a model call by the prompt
//! assembly layer.
//!
//! The engine holds no mutable state: identical inputs always produce
//! identical outputs, and one shared [`Engine`] is safe to use from any
//! number of concurrent callers.

pub mod engine;
pub mod token;

pub use engine::{Chunk, CompressionResult, Engine, Options};
pub use token::estimate_tokens;
