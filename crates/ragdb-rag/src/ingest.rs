//! Document → chunk → embedding → store.
//!
//! Chunks from all documents are grouped into fixed-size batches; each batch
//! is embedded in one call and upserted in one call. Any failure aborts the
//! remaining batches. Batches already upserted stay, which is safe because
//! chunk ids are deterministic and re-running overwrites them.

use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, instrument};

use ragdb_core::chunker::Chunker;
use ragdb_core::config::IngestConfig;
use ragdb_core::traits::{DocumentSource, Embedder, VectorStore};
use ragdb_core::types::{Chunk, Document, IndexedRecord, IngestReport};
use ragdb_core::Result;

use crate::embedding::embed_texts;

pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    show_progress: bool,
}

impl IngestionPipeline {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, config: IngestConfig) -> Self {
        Self {
            chunker,
            embedder,
            store,
            batch_size: config.batch_size.max(1),
            show_progress: config.show_progress,
        }
    }

    /// Load everything `source` provides and ingest it.
    pub async fn run(&self, source: &dyn DocumentSource) -> Result<IngestReport> {
        info!(source = %source.describe(), "starting ingestion");
        let documents = source.load()?;
        self.ingest_documents(&documents).await
    }

    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn ingest_documents(&self, documents: &[Document]) -> Result<IngestReport> {
        if documents.is_empty() {
            info!("no documents found");
            return Ok(IngestReport::NoDocuments);
        }
        let start = Instant::now();
        let total: usize = documents.iter().map(|d| self.chunker.count_chunks(d)).sum();
        let pb = self.progress_bar(total);

        let mut batch: Vec<Chunk> = Vec::with_capacity(self.batch_size);
        let mut ingested = 0usize;
        let mut batch_no = 0usize;
        for chunk in documents.iter().flat_map(|d| self.chunker.chunks(d)) {
            batch.push(chunk);
            if batch.len() == self.batch_size {
                batch_no += 1;
                ingested += self.flush(std::mem::take(&mut batch), batch_no).await?;
                pb.set_position(ingested as u64);
            }
        }
        if !batch.is_empty() {
            batch_no += 1;
            ingested += self.flush(batch, batch_no).await?;
            pb.set_position(ingested as u64);
        }
        pb.finish_and_clear();

        if self.store.refresh_index().await? {
            info!("vector index rebuilt");
        }
        info!(documents = documents.len(), chunks = ingested, batches = batch_no, elapsed = ?start.elapsed(), "ingestion complete");
        Ok(IngestReport::Ingested { documents: documents.len(), chunks: ingested })
    }

    async fn flush(&self, batch: Vec<Chunk>, batch_no: usize) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embed_texts(&self.embedder, texts).await?;
        let records: Vec<IndexedRecord> = batch
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedRecord::from_chunk(chunk, vector))
            .collect();
        let n = records.len();
        self.store.upsert(records).await?;
        debug!(batch = batch_no, chunks = n, "batch upserted");
        Ok(n)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}
