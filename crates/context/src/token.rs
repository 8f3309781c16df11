//! Token estimation utilities.
//!
//! Uses a word-based heuristic: English text averages ~1.35 BPE tokens per
//! word, plus one token of per-fragment overhead. Cheap enough to run on
//! every candidate chunk while budgeting, and accurate enough that the
//! assembled block lands inside the real prompt budget.

/// Estimate the token count for a whitespace-separated string.
///
/// Empty text costs nothing; otherwise `round(words × 1.35) + 1`.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0;
    }
    (words as f64 * 1.35).round() as usize + 1
}
