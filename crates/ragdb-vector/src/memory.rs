use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use ragdb_core::traits::{ensure_dim, VectorStore};
use ragdb_core::types::{ChunkId, IndexedRecord, SearchHit};
use ragdb_core::{Error, Result};

use crate::sort_hits;

/// In-memory vector store for development and testing.
///
/// Brute-force cosine similarity over every record. Contents are lost when
/// the store is dropped.
pub struct MemoryStore {
    dim: usize,
    records: RwLock<BTreeMap<ChunkId, IndexedRecord>>,
}

impl MemoryStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, records: RwLock::new(BTreeMap::new()) }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn upsert(&self, records: Vec<IndexedRecord>) -> Result<()> {
        if self.dim == 0 {
            return Err(Error::InvalidConfig("vector dimensionality must be positive".to_string()));
        }
        for r in &records {
            ensure_dim(self.dim, &r.vector)?;
        }
        let mut map = self.records.write().await;
        for r in records {
            map.insert(r.id.clone(), r);
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        ensure_dim(self.dim, query)?;
        let map = self.records.read().await;
        let mut hits: Vec<SearchHit> = map
            .values()
            .map(|r| SearchHit {
                id: r.id.clone(),
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                score: cosine_similarity(query, &r.vector),
            })
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction; 0 when
/// either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
