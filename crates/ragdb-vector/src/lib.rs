//! Vector store backends: LanceDB on disk and an in-memory map.

pub mod index;
pub mod lance;
pub mod memory;
pub mod schema;
pub mod table;

pub use lance::LanceStore;
pub use memory::{cosine_similarity, MemoryStore};

use std::cmp::Ordering;
use std::sync::Arc;

use ragdb_core::config::{StoreBackend, StoreConfig};
use ragdb_core::traits::VectorStore;
use ragdb_core::types::SearchHit;
use ragdb_core::Result;

/// Descending score; equal scores by ascending id so results are stable.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Open the backend selected by `config.backend`.
pub async fn open_store(config: &StoreConfig, dim: usize) -> Result<Arc<dyn VectorStore>> {
    match config.backend {
        StoreBackend::Lance => Ok(Arc::new(LanceStore::open(config, dim).await?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new(dim))),
    }
}
