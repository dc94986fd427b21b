#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragdb_core::config::RagConfig;
use ragdb_core::traits::{Embedder, LanguageModel, VectorStore};
use ragdb_core::types::{Embedding, IndexedRecord, Metadata, SearchHit, SOURCE_KEY};
use ragdb_core::{Error, Result};
use ragdb_embed::FakeEmbedder;
use ragdb_rag::{RagContext, RagService};
use ragdb_vector::MemoryStore;

pub const DIM: usize = 64;

pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.ingest.show_progress = false;
    config.embedding.dim = DIM;
    config
}

/// Records every prompt and answers with a fixed text, or fails on demand.
pub struct StubModel {
    pub reply: String,
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: reply.to_string(), fail: false, prompts: Mutex::new(Vec::new()) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { reply: String::new(), fail: true, prompts: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    fn model_id(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(Error::Generation("model unreachable".to_string()));
        }
        Ok(self.reply.clone())
    }
}

/// Returns preset hits regardless of the query, ignoring `k`'s ordering
/// guarantees so the retriever's own ordering is exercised.
pub struct FixedScoreStore {
    pub hits: Vec<SearchHit>,
}

pub fn hit(id: &str, source: &str, content: &str, score: f32) -> SearchHit {
    let mut metadata = Metadata::new();
    metadata.insert(SOURCE_KEY.to_string(), source.to_string());
    SearchHit { id: id.to_string(), content: content.to_string(), metadata, score }
}

#[async_trait]
impl VectorStore for FixedScoreStore {
    fn dim(&self) -> usize {
        DIM
    }

    async fn upsert(&self, _records: Vec<IndexedRecord>) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        Ok(self.hits.iter().take(k).cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.hits.len())
    }
}

/// Accepts `healthy_batches` upserts, then reports the store unreachable.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub healthy_batches: usize,
    pub calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(healthy_batches: usize) -> Self {
        Self { inner: MemoryStore::new(DIM), healthy_batches, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl VectorStore for FlakyStore {
    fn dim(&self) -> usize {
        DIM
    }

    async fn upsert(&self, records: Vec<IndexedRecord>) -> Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy_batches {
            return Err(Error::StoreUnavailable("connection refused".to_string()));
        }
        self.inner.upsert(records).await
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.inner.search(query, k).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

/// Produces vectors of the wrong length.
pub struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn model_id(&self) -> &str {
        "broken"
    }

    fn dim(&self) -> usize {
        DIM
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|_| vec![0.5; DIM - 1]).collect())
    }
}

pub fn service_with(config: RagConfig, store: Arc<dyn VectorStore>, llm: Arc<dyn LanguageModel>) -> RagService {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(DIM));
    RagService::new(RagContext::from_parts(config, embedder, store, llm).expect("context"))
}

pub fn memory_service(llm: Arc<dyn LanguageModel>) -> (RagService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(DIM));
    (service_with(test_config(), store.clone(), llm), store)
}

pub fn text_of_len(len: usize, seed: &str) -> String {
    let words = [seed, "alpha", "bravo", "charlie", "delta", "echo"];
    let mut out = String::new();
    let mut i = 0;
    while out.chars().count() < len {
        out.push_str(words[i % words.len()]);
        out.push(' ');
        i += 1;
    }
    out.chars().take(len).collect()
}
