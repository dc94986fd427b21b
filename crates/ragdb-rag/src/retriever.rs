use std::sync::Arc;

use tracing::{debug, warn};

use ragdb_core::config::RetrievalConfig;
use ragdb_core::traits::{Embedder, VectorStore};
use ragdb_core::types::Retrieval;
use ragdb_core::Result;
use ragdb_vector::sort_hits;

use crate::embedding::embed_one;

/// Embeds a question, fetches the `k` nearest chunks and drops those scoring
/// below the relevance threshold.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, config: RetrievalConfig) -> Self {
        Self { embedder, store, config }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Retrieval> {
        let query = embed_one(&self.embedder, question).await?;
        let mut hits = self.store.search(&query, self.config.k).await?;
        let raw = hits.len();
        hits.retain(|h| h.score >= self.config.relevance_threshold);
        sort_hits(&mut hits);
        hits.truncate(self.config.k);

        for h in &hits {
            debug!(id = %h.id, score = h.score, source = %h.source(), "retrieved");
        }
        if hits.is_empty() {
            warn!(raw, threshold = self.config.relevance_threshold, "no results above relevance threshold");
            return Ok(Retrieval::NoRelevantInformation);
        }
        Ok(Retrieval::Relevant(hits))
    }
}
