//! Strict decoding of inbound chat requests.
//!
//! Decoding is strict end to end: unknown fields, trailing JSON values,
//! and type mismatches are all rejected as an invalid body before field
//! validation runs. Everything here is local — the upstream is not engaged
//! until a request has fully passed.

use skyra_core::chat::ChatRequest;
use skyra_core::error::ValidationError;

/// Decode and validate a chat request body.
pub fn decode_chat_request(body: &[u8]) -> Result<ChatRequest, ValidationError> {
    let mut request: ChatRequest =
        serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;
    request.validate()?;
    Ok(request)
}
