//! Fixed-window chunking with overlap.
//!
//! A document of `L` characters is covered by windows starting at
//! `0, stride, 2*stride, ...` where `stride = max_chunk_length - overlap_length`.
//! Every window is `max_chunk_length` long except possibly the last, which
//! ends exactly at `L`. Offsets count characters, never bytes, so a window
//! never splits a code point.

use std::iter::FusedIterator;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{chunk_id, Chunk, Document, CHUNK_INDEX_KEY, START_INDEX_KEY};

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Number of chunks [`Chunker::chunks`] yields for `doc`, without
    /// materialising them.
    pub fn count_chunks(&self, doc: &Document) -> usize {
        let len = doc.content.chars().count();
        let max = self.config.max_chunk_length;
        match len {
            0 => 0,
            l if l <= max => 1,
            l => (l - max).div_ceil(self.config.stride()) + 1,
        }
    }

    /// Lazily split `doc`. Empty text yields nothing; text no longer than
    /// the window yields exactly one chunk equal to the whole text.
    pub fn chunks<'a>(&self, doc: &'a Document) -> Chunks<'a> {
        Chunks {
            doc,
            text: &doc.content,
            max: self.config.max_chunk_length,
            stride: self.config.stride(),
            byte_start: 0,
            char_start: 0,
            seq: 0,
            done: doc.content.is_empty(),
        }
    }
}

/// Iterator returned by [`Chunker::chunks`].
pub struct Chunks<'a> {
    doc: &'a Document,
    text: &'a str,
    max: usize,
    stride: usize,
    byte_start: usize,
    char_start: usize,
    seq: usize,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }
        let rest = &self.text[self.byte_start..];
        let end = byte_offset_of_char(rest, self.max);
        let source = self.doc.source().to_string();

        let mut metadata = self.doc.metadata.clone();
        metadata.insert(START_INDEX_KEY.to_string(), self.char_start.to_string());
        metadata.insert(CHUNK_INDEX_KEY.to_string(), self.seq.to_string());

        let chunk = Chunk {
            id: chunk_id(&source, self.char_start, self.seq),
            content: rest[..end].to_string(),
            source,
            start_offset: self.char_start,
            seq: self.seq,
            metadata,
        };

        if end == rest.len() {
            self.done = true;
        } else {
            self.byte_start += byte_offset_of_char(rest, self.stride);
            self.char_start += self.stride;
        }
        self.seq += 1;
        Some(chunk)
    }
}

impl FusedIterator for Chunks<'_> {}

/// Byte offset of the `n`-th character, or `s.len()` when `s` is shorter.
fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}
