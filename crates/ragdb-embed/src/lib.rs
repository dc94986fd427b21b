//! Embedding providers.
//!
//! `EmbeddingModel` runs a sentence-transformers BERT encoder locally via
//! candle; `FakeEmbedder` is a deterministic stand-in. Set
//! `APP_USE_FAKE_EMBEDDINGS=1` to force the fake regardless of config.

mod device;
mod fake;
mod model;
mod pool;
mod tokenize;

pub use device::select_device;
pub use fake::FakeEmbedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

use ragdb_core::config::{EmbeddingBackend, EmbeddingConfig};
use ragdb_core::traits::Embedder;
use ragdb_core::types::Embedding;
use ragdb_core::{Error, Result};
use tracing::info;

pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let force_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if force_fake || config.backend == EmbeddingBackend::Fake {
        info!(dim = config.dim, "using fake embedder");
        return Ok(Box::new(FakeEmbedder::new(config.dim)));
    }
    let model = EmbeddingModel::load(config).map_err(|e| Error::Embedding(format!("{e:#}")))?;
    Ok(Box::new(model))
}

/// Validate a provider's output for a batch of `expected_count` inputs:
/// right count, right dimensionality, finite values.
pub fn check_embeddings(dim: usize, expected_count: usize, vectors: Vec<Embedding>) -> Result<Vec<Embedding>> {
    if vectors.len() != expected_count {
        return Err(Error::Embedding(format!(
            "provider returned {} vectors for {} inputs",
            vectors.len(),
            expected_count
        )));
    }
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(Error::Embedding(format!("vector {i} has dimension {}, expected {dim}", v.len())));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(Error::Embedding(format!("vector {i} contains non-finite values")));
        }
    }
    Ok(vectors)
}
