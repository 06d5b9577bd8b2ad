//! Deterministic text chunking
//!
//! Pages are sliced into consecutive, non-overlapping windows of at most
//! `max_chars` characters. Windows are trimmed and blank windows dropped, so
//! the unit handed to the embedder is never empty. The iterator is lazy and
//! restartable, which keeps this a pure function over its input.

/// Lazy iterator over the chunks of a text.
///
/// Produced by [`chunk_text`]. Positions advance in whole windows, so chunk
/// boundaries never overlap and the untrimmed windows concatenate back to
/// the source text.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    max_chars: usize,
    pos: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.max_chars == 0 {
            return None;
        }

        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let window_bytes = rest
                .char_indices()
                .nth(self.max_chars)
                .map(|(idx, _)| idx)
                .unwrap_or(rest.len());

            let window = &rest[..window_bytes];
            self.pos += window_bytes;

            let trimmed = window.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }

        None
    }
}

/// Split `text` into trimmed windows of at most `max_chars` characters.
///
/// Empty and whitespace-only input yield an empty sequence.
pub fn chunk_text(text: &str, max_chars: usize) -> Chunks<'_> {
    Chunks {
        text,
        max_chars,
        pos: 0,
    }
}
