//! Character-based token estimation.
//!
//! Estimates token counts from character length (4 chars ≈ 1 token). This
//! is an approximation used to stay under provider limits; the provider's
//! own too-large rejection remains authoritative.

/// Characters per token used for estimation.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a text blob. Pure and deterministic.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count().div_ceil(CHARS_PER_TOKEN)) as u64
}
