//! Process-wide components, built once before any request is served.

use std::sync::Arc;

use tracing::info;

use ragdb_core::chunker::Chunker;
use ragdb_core::config::RagConfig;
use ragdb_core::traits::{Embedder, LanguageModel, VectorStore};
use ragdb_core::{Error, Result};
use ragdb_embed::get_default_embedder;
use ragdb_llm::OpenAiCompatibleClient;
use ragdb_vector::open_store;

use crate::ingest::IngestionPipeline;
use crate::retriever::Retriever;
use crate::synthesizer::AnswerSynthesizer;

/// Immutable after construction and shared by every request.
pub struct RagContext {
    config: RagConfig,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LanguageModel>,
}

impl RagContext {
    /// Build every dependency from settings. Any failure is an
    /// [`Error::Initialization`] naming the component.
    pub async fn initialize(config: RagConfig) -> Result<Self> {
        config.validate().map_err(|e| Error::initialization("configuration", e))?;

        let embedding_config = config.embedding.clone();
        let embedder: Arc<dyn Embedder> = tokio::task::spawn_blocking(move || get_default_embedder(&embedding_config))
            .await
            .map_err(|e| Error::initialization("embedding model", Error::Embedding(e.to_string())))?
            .map_err(|e| Error::initialization("embedding model", e))?
            .into();

        let store = open_store(&config.store, embedder.dim())
            .await
            .map_err(|e| Error::initialization("vector store", e))?;

        let llm: Arc<dyn LanguageModel> = Arc::new(
            OpenAiCompatibleClient::from_config(&config.generation)
                .map_err(|e| Error::initialization("language model", e))?,
        );

        Self::from_parts(config, embedder, store, llm)
    }

    /// Assemble from already-built components. The embedder and store must
    /// agree on dimensionality.
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunking).map_err(|e| Error::initialization("chunker", e))?;
        if embedder.dim() != store.dim() {
            return Err(Error::initialization(
                "vector store",
                Error::DimensionMismatch { expected: store.dim(), actual: embedder.dim() },
            ));
        }
        info!(
            embedder = %embedder.model_id(),
            dim = embedder.dim(),
            llm = %llm.model_id(),
            collection = %config.store.collection,
            "rag context ready"
        );
        Ok(Self { config, chunker, embedder, store, llm })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn ingestion_pipeline(&self) -> IngestionPipeline {
        IngestionPipeline::new(self.chunker, Arc::clone(&self.embedder), Arc::clone(&self.store), self.config.ingest)
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(Arc::clone(&self.embedder), Arc::clone(&self.store), self.config.retrieval)
    }

    pub fn synthesizer(&self) -> AnswerSynthesizer {
        AnswerSynthesizer::new(Arc::clone(&self.llm))
    }
}
