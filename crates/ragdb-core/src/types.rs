//! Domain types shared by the ingestion and query pipelines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ChunkId = String;
pub type Embedding = Vec<f32>;

/// Open, string-keyed metadata. `source` is always present on documents and
/// everything derived from them.
pub type Metadata = BTreeMap<String, String>;

pub const SOURCE_KEY: &str = "source";
pub const START_INDEX_KEY: &str = "start_index";
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Placeholder reported when a record somehow lacks a `source` key.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Raw text handed over by a document source, before chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), source.into());
        Self { content: content.into(), metadata }
    }

    /// Adds a structural attribute. The `source` key cannot be replaced.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != SOURCE_KEY {
            self.metadata.insert(key, value.into());
        }
        self
    }

    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map_or(UNKNOWN_SOURCE, String::as_str)
    }
}

/// A bounded window of a document's text.
///
/// - `id`: stable identifier derived from `(source, start_offset, seq)`
/// - `start_offset`: position of the first character within the document
/// - `seq`: position of the chunk within its document's chunk sequence
/// - `metadata`: the document's metadata plus `start_index` and `chunk_index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub source: String,
    pub start_offset: usize,
    pub seq: usize,
    pub metadata: Metadata,
}

impl Chunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Deterministic chunk identifier. Re-chunking identical content yields
/// identical ids, which makes ingestion an overwrite rather than an append.
pub fn chunk_id(source: &str, start_offset: usize, seq: usize) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(start_offset as u64).to_le_bytes());
    hasher.update(&(seq as u64).to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// What the vector store persists per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: ChunkId,
    pub vector: Embedding,
    pub content: String,
    pub metadata: Metadata,
}

impl IndexedRecord {
    pub fn from_chunk(chunk: Chunk, vector: Embedding) -> Self {
        Self { id: chunk.id, vector, content: chunk.content, metadata: chunk.metadata }
    }
}

/// A stored record matched by a similarity search.
///
/// `score` is cosine similarity: higher is always more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub content: String,
    pub metadata: Metadata,
    pub score: f32,
}

impl SearchHit {
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map_or(UNKNOWN_SOURCE, String::as_str)
    }
}

/// Outcome of retrieval for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Passages at or above the relevance threshold, best first.
    Relevant(Vec<SearchHit>),
    /// Nothing cleared the threshold. Not an error.
    NoRelevantInformation,
}

impl Retrieval {
    pub fn passages(&self) -> &[SearchHit] {
        match self {
            Self::Relevant(hits) => hits,
            Self::NoRelevantInformation => &[],
        }
    }
}

/// A grounded answer and the sources of the passages it was built from,
/// in retrieval order with duplicates kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<String>,
}

/// Terminal result of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestReport {
    Ingested { documents: usize, chunks: usize },
    NoDocuments,
}

impl IngestReport {
    pub fn chunks(&self) -> usize {
        match self {
            Self::Ingested { chunks, .. } => *chunks,
            Self::NoDocuments => 0,
        }
    }
}
