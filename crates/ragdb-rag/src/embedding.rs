use std::sync::Arc;

use ragdb_core::traits::Embedder;
use ragdb_core::types::Embedding;
use ragdb_core::{Error, Result};
use ragdb_embed::check_embeddings;

/// Run a blocking batch embed off the async executor and verify its output.
pub async fn embed_texts(embedder: &Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Embedding>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let count = texts.len();
    let dim = embedder.dim();
    let worker = Arc::clone(embedder);
    let vectors = tokio::task::spawn_blocking(move || worker.embed_batch(&texts))
        .await
        .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))??;
    check_embeddings(dim, count, vectors)
}

pub async fn embed_one(embedder: &Arc<dyn Embedder>, text: &str) -> Result<Embedding> {
    embed_texts(embedder, vec![text.to_string()])
        .await?
        .pop()
        .ok_or_else(|| Error::Embedding("no embedding returned".to_string()))
}
