//! Boundary-preserving splitting of oversized prompt inputs.
//!
//! Splits text into chunks whose estimated token counts stay under a
//! per-call ceiling. Chunk boundaries fall on speaker-turn breaks (blank
//! lines) or sentence ends; a pathological single piece over the ceiling
//! is force-split at the nearest whitespace. Every chunk keeps its
//! original bytes, separators included, so concatenating the chunks in
//! order reproduces the input exactly.

use crate::tokens::{CHARS_PER_TOKEN, estimate_tokens};

/// One token-bounded slice of an oversized input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the chunk sequence, starting at 0.
    pub index: usize,
    /// Chunk text, byte-identical to its slice of the input.
    pub text: String,
    /// Estimated token count of `text`.
    pub estimated_tokens: u64,
    /// Whether this is the last chunk.
    pub is_final: bool,
}

/// Split `text` into ordered chunks of at most `ceiling_tokens` estimated
/// tokens each. Returns an empty vec for empty input.
pub fn split(text: &str, ceiling_tokens: u64) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }
    let ceiling = ceiling_tokens.max(1);
    let max_chars = (ceiling as usize) * CHARS_PER_TOKEN;

    // Boundary pieces, then force-split any piece that alone exceeds the
    // ceiling so the packer only ever sees packable pieces.
    let mut pieces: Vec<&str> = Vec::new();
    for piece in boundary_pieces(text) {
        if piece.chars().count() > max_chars {
            pieces.extend(force_split(piece, max_chars));
        } else {
            pieces.push(piece);
        }
    }

    // Greedy packing: add pieces while the accumulated estimate stays
    // under the ceiling, then close the chunk.
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    for piece in pieces {
        let piece_chars = piece.chars().count();
        let would_be = (current_chars + piece_chars).div_ceil(CHARS_PER_TOKEN) as u64;
        if !current.is_empty() && would_be > ceiling {
            chunks.push(close_chunk(chunks.len(), std::mem::take(&mut current)));
            current_chars = 0;
        }
        current.push_str(piece);
        current_chars += piece_chars;
    }
    if !current.is_empty() {
        chunks.push(close_chunk(chunks.len(), current));
    }

    if let Some(last) = chunks.last_mut() {
        last.is_final = true;
    }
    chunks
}

fn close_chunk(index: usize, text: String) -> Chunk {
    let estimated_tokens = estimate_tokens(&text);
    Chunk {
        index,
        text,
        estimated_tokens,
        is_final: false,
    }
}

/// Cut `text` into consecutive slices ending at speaker-turn breaks
/// (runs of two or more newlines) or sentence ends (`.?!` followed by
/// whitespace). The slices cover the input exactly.
fn boundary_pieces(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut cuts: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] == b'\n' {
                    j += 1;
                }
                if j - i >= 2 {
                    cuts.push(j);
                }
                i = j;
            }
            b'.' | b'?' | b'!' => {
                if i + 1 < bytes.len() && bytes[i + 1].is_ascii_whitespace() {
                    cuts.push(i + 1);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        if cut > start && cut < text.len() {
            pieces.push(&text[start..cut]);
            start = cut;
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Split a single over-ceiling piece into fragments of at most `max_chars`
/// characters, cutting after the nearest whitespace where one exists and
/// at a char boundary otherwise. Fragments concatenate back to `piece`.
fn force_split(piece: &str, max_chars: usize) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut rest = piece;
    loop {
        let byte_limit = match rest.char_indices().nth(max_chars) {
            Some((b, _)) => b,
            None => {
                fragments.push(rest);
                return fragments;
            }
        };
        // Prefer cutting just after the last whitespace inside the window
        // so no word is split.
        let cut = rest[..byte_limit]
            .rfind(char::is_whitespace)
            .map(|ws| ws + rest[ws..].chars().next().map_or(1, char::len_utf8))
            .filter(|&c| c > 0)
            .unwrap_or(byte_limit);
        fragments.push(&rest[..cut]);
        rest = &rest[cut..];
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn join(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn empty_input_no_chunks() {
        assert!(split("", 100).is_empty());
    }

    #[test]
    fn small_input_single_final_chunk() {
        let chunks = split("One sentence. Another one.", 1000);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_final);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(join(&chunks), "One sentence. Another one.");
    }

    #[test]
    fn splits_at_sentence_boundaries() {
        // 10 sentences of 20 chars each, ceiling 10 tokens = 40 chars.
        let text = "exactly twenty chs. ".repeat(10);
        let chunks = split(&text, 10);
        assert!(chunks.len() > 1);
        assert_eq!(join(&chunks), text);
        for c in &chunks {
            assert!(c.estimated_tokens <= 10, "chunk over ceiling: {}", c.estimated_tokens);
            // Boundary-aligned: every non-final chunk ends after a sentence.
            if !c.is_final {
                assert!(c.text.ends_with(". ") || c.text.ends_with('.'));
            }
        }
    }

    #[test]
    fn prefers_speaker_turn_breaks() {
        let text = "Dana: no punctuation here at all\n\nSam: same on this line\n\nDana: and here";
        let chunks = split(&text.repeat(1), 10);
        assert_eq!(join(&chunks), text);
        for c in chunks.iter().filter(|c| !c.is_final) {
            assert!(c.text.ends_with("\n\n"));
        }
    }

    #[test]
    fn force_splits_long_utterance_at_whitespace() {
        // One boundary-free piece of 100 words, ceiling 10 tokens = 40 chars.
        let text = "word ".repeat(100);
        let text = text.trim_end();
        let chunks = split(text, 10);
        assert_eq!(join(&chunks), text);
        for c in &chunks {
            assert!(c.estimated_tokens <= 10);
            // Never mid-word: each non-final chunk ends on whitespace.
            if !c.is_final {
                assert!(c.text.ends_with(' '));
            }
        }
    }

    #[test]
    fn force_splits_single_giant_word_at_char_boundary() {
        let text = "x".repeat(1000);
        let chunks = split(&text, 10);
        assert_eq!(join(&chunks), text);
        assert!(chunks.iter().all(|c| c.estimated_tokens <= 10));
        assert_eq!(chunks.len(), 25);
    }

    #[test]
    fn multibyte_text_never_panics() {
        let text = "différents mots ici — plus de texte à découper. ".repeat(40);
        let chunks = split(&text, 10);
        assert_eq!(join(&chunks), text);
        assert!(chunks.iter().all(|c| c.estimated_tokens <= 10));
    }

    #[test]
    fn indices_sequential_and_final_flag_last_only() {
        let text = "Sentence one. ".repeat(50);
        let chunks = split(&text, 10);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.is_final, i == chunks.len() - 1);
        }
    }

    #[test]
    fn fifty_thousand_tokens_with_thirty_thousand_ceiling_is_two_chunks() {
        // 200,000 chars ≈ 50,000 estimated tokens.
        let text = "word word word. ".repeat(12_500);
        assert_eq!(estimate_tokens(&text), 50_000);
        let chunks = split(&text, 30_000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].estimated_tokens <= 30_000);
        assert!(chunks[1].estimated_tokens <= 30_000);
        assert_eq!(join(&chunks), text);
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary_text(
            text in "[a-zA-Z0-9 .!?\n\u{e9}\u{2014}]{0,2000}",
            ceiling in 1u64..64,
        ) {
            let chunks = split(&text, ceiling);
            prop_assert_eq!(join(&chunks), text);
            for c in &chunks {
                prop_assert!(c.estimated_tokens <= ceiling.max(1));
            }
        }
    }
}
