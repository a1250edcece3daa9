use serde::{Deserialize, Serialize};

use crate::{RepurposeError, StageResult};

pub mod relevance;

pub use relevance::{build_context, score, select_best, KeyTerms};

/// A bounded window of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Window contents
    pub text: String,

    /// Offset of the first character in the source, in chars
    pub start_offset: usize,

    /// Relevance score against the topic being drafted (unset until scored)
    pub score: Option<u32>,
}

impl Chunk {
    pub fn new(text: impl Into<String>, start_offset: usize) -> Self {
        Self {
            text: text.into(),
            start_offset,
            score: None,
        }
    }

    /// Length of the window in chars
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Offset one past the last character of the window
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.char_len()
    }
}

/// Lazy iterator over the windows of one source text.
///
/// Clone it before consuming to walk the same windows again.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    window_size: usize,
    step: usize,
    byte_pos: usize,
    char_pos: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.byte_pos..];
        if rest.is_empty() {
            return None;
        }

        let end = byte_offset_after(rest, self.window_size);
        let chunk = Chunk::new(&rest[..end], self.char_pos);

        self.byte_pos += byte_offset_after(rest, self.step);
        self.char_pos += self.step;

        Some(chunk)
    }
}

/// Split `text` into windows of `window_size` chars, each starting
/// `window_size - overlap` chars after the previous one.
pub fn split(text: &str, window_size: usize, overlap: usize) -> StageResult<Chunks<'_>> {
    if window_size == 0 || window_size <= overlap {
        return Err(RepurposeError::Config(format!(
            "window size ({}) must be greater than overlap ({})",
            window_size, overlap
        )));
    }

    Ok(Chunks {
        text,
        window_size,
        step: window_size - overlap,
        byte_pos: 0,
        char_pos: 0,
    })
}

/// Byte index just past the first `n` chars of `s`, clipped to `s.len()`
fn byte_offset_after(s: &str, n: usize) -> usize {
    s.char_indices()
        .nth(n)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(text: &str, window_size: usize, overlap: usize) {
        let chunks: Vec<Chunk> = split(text, window_size, overlap).unwrap().collect();
        let len = text.chars().count();

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].start_offset, 0);

        let mut covered_to = 0;
        for pair in chunks.windows(2) {
            assert!(pair[0].start_offset < pair[1].start_offset);
        }
        for chunk in &chunks {
            assert!(chunk.end_offset() <= len);
            assert!(chunk.start_offset <= covered_to, "gap before offset {}", chunk.start_offset);
            covered_to = covered_to.max(chunk.end_offset());
        }
        assert_eq!(covered_to, len);
    }

    #[test]
    fn test_split_covers_source() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        assert_covers(&text, 100, 20);
        assert_covers(&text, 7, 0);
        assert_covers(&text, 3, 2);
        assert_covers("short", 100, 10);
    }

    #[test]
    fn test_split_offsets_follow_step() {
        let chunks: Vec<Chunk> = split("abcdefghij", 4, 1).unwrap().collect();
        let offsets: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(offsets, vec![0, 3, 6, 9]);
        assert_eq!(chunks[0].text, "abcd");
        assert_eq!(chunks[2].text, "ghij");
        // Final window is clipped, never padded
        assert_eq!(chunks[3].text, "j");
    }

    #[test]
    fn test_split_multibyte_text() {
        let text = "héllo wörld ünïcode ✓✓✓";
        assert_covers(text, 5, 2);
        let chunks: Vec<Chunk> = split(text, 5, 2).unwrap().collect();
        assert_eq!(chunks[0].text, "héllo");
    }

    #[test]
    fn test_split_empty_text() {
        assert_eq!(split("", 10, 2).unwrap().count(), 0);
    }

    #[test]
    fn test_split_rejects_invalid_window() {
        assert!(matches!(split("text", 10, 10), Err(RepurposeError::Config(_))));
        assert!(matches!(split("text", 5, 8), Err(RepurposeError::Config(_))));
        assert!(matches!(split("text", 0, 0), Err(RepurposeError::Config(_))));
    }

    #[test]
    fn test_split_is_restartable() {
        let text = "one two three four five six seven";
        let chunks = split(text, 8, 3).unwrap();
        let first: Vec<Chunk> = chunks.clone().collect();
        let second: Vec<Chunk> = chunks.collect();
        assert_eq!(first, second);
    }
}
