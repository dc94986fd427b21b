use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Document, Embedding, IndexedRecord, SearchHit};

/// Maps text to fixed-dimension vectors.
///
/// `embed_batch` must be observably equivalent to calling `embed` per item:
/// the same text yields the same vector regardless of batch position.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `local:all-MiniLM-L6-v2:d384`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }
}

/// Persistent `id -> (vector, text, metadata)` index with cosine search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Fixed dimensionality of the collection.
    fn dim(&self) -> usize;

    /// Insert or replace records by id. A batch of N is equivalent to N
    /// sequential single upserts.
    async fn upsert(&self, records: Vec<IndexedRecord>) -> Result<()>;

    /// At most `k` hits ordered by descending score, ties by ascending id.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    async fn count(&self) -> Result<usize>;

    /// Hook for index maintenance after bulk writes. Returns whether an
    /// index was (re)built.
    async fn refresh_index(&self) -> Result<bool> {
        Ok(false)
    }
}

/// A generative model invoked with a fully assembled prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Produces the raw documents of a corpus.
pub trait DocumentSource: Send + Sync {
    fn describe(&self) -> String;
    fn load(&self) -> Result<Vec<Document>>;
}

/// Rejects a vector whose length disagrees with `expected`.
pub fn ensure_dim(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, actual: vector.len() })
    }
}
