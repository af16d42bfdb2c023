//! Overlapping word-window chunker.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChunkError {
    #[error("Invalid chunk config: overlap {overlap} must be smaller than chunk size {size}")]
    InvalidChunkConfig { size: usize, overlap: usize },
}

/// Windows of `size` words advancing by `size - overlap`. The step is always positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 || overlap >= size {
            return Err(ChunkError::InvalidChunkConfig { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Lazily chunks `text`. Whitespace-only input yields nothing; any other input
    /// yields at least one window and the last window may be shorter.
    pub fn chunk<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            words: text.split_whitespace().collect(),
            start: 0,
            size: self.size,
            step: self.size - self.overlap,
        }
    }
}

/// Single-pass iterator over the windows of one text.
pub struct Chunks<'a> {
    words: Vec<&'a str>,
    start: usize,
    size: usize,
    step: usize,
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.start >= self.words.len() {
            return None;
        }
        let end = (self.start + self.size).min(self.words.len());
        let window = self.words[self.start..end].join(" ");
        self.start += self.step;
        Some(window)
    }
}
