//! Assistant output sanitization.
//!
//! Two ordered steps: strip reasoning-block markup, then collapse
//! exact-duplicate output. The duplicate check is a narrow heuristic for a
//! known upstream failure mode (the model repeating its full answer
//! verbatim); it checks exactly two patterns and is deliberately not a
//! general deduplication pass.

use regex_lite::Regex;

/// Cleans raw assistant text before it reaches the client.
pub struct Sanitizer {
    think_block: Regex,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self {
            think_block: Regex::new(r"(?s)<think>.*?</think>")
                .expect("think block pattern is valid"),
        }
    }

    /// Strip reasoning markup, then collapse duplicated output.
    pub fn sanitize(&self, raw: &str) -> String {
        let stripped = self.think_block.replace_all(raw, "");
        // A truncated reasoning block can leave a close marker with no
        // opener; strip those too.
        let stripped = stripped.replace("</think>", "");
        collapse_repeated(stripped.trim()).to_string()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse text that is an exact duplicate of itself.
///
/// Checks two patterns, in order: the halves around the first blank line,
/// then the two equal-length halves of even-length text. Each half is
/// trimmed independently before comparison. Anything else passes through.
fn collapse_repeated(text: &str) -> &str {
    if text.is_empty() {
        return text;
    }

    if let Some(idx) = text.find("\n\n") {
        if idx > 0 {
            let left = text[..idx].trim();
            let right = text[idx + 2..].trim();
            if !left.is_empty() && left == right {
                return left;
            }
        }
    }

    // Byte-level halving; only meaningful when the midpoint is a char
    // boundary, which also guards the slice below.
    if text.len() % 2 == 0 && text.is_char_boundary(text.len() / 2) {
        let half = text.len() / 2;
        let left = text[..half].trim();
        let right = text[half..].trim();
        if !left.is_empty() && left == right {
            return left;
        }
    }

    text
}
