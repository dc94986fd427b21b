mod common;

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use common::*;
use ragdb_core::chunker::Chunker;
use ragdb_core::config::{ChunkingConfig, IngestConfig};
use ragdb_core::loader::DirectoryLoader;
use ragdb_core::traits::{Embedder, VectorStore};
use ragdb_core::types::{Document, IngestReport};
use ragdb_core::Error;
use ragdb_embed::FakeEmbedder;
use ragdb_rag::service::NO_DOCUMENTS_MESSAGE;
use ragdb_rag::IngestionPipeline;
use ragdb_vector::MemoryStore;
use tempfile::TempDir;

fn corpus_of_three() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    for name in ["one", "two", "three"] {
        fs::write(tmp.path().join(format!("{name}.txt")), text_of_len(2500, name)).expect("write");
    }
    tmp
}

fn pipeline(store: Arc<dyn VectorStore>, batch_size: usize) -> IngestionPipeline {
    let chunker = Chunker::new(ChunkingConfig::default()).expect("chunker");
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(DIM));
    IngestionPipeline::new(chunker, embedder, store, IngestConfig { batch_size, show_progress: false })
}

#[tokio::test]
async fn three_documents_of_2500_chars_make_nine_chunks() {
    let tmp = corpus_of_three();
    let (service, store) = memory_service(StubModel::replying("unused"));

    let loader = DirectoryLoader::new(tmp.path());
    let response = service.ingest_from(&loader).await.expect("ingest");

    assert_eq!(response.report, IngestReport::Ingested { documents: 3, chunks: 9 });
    assert_eq!(response.message, "Successfully ingested 9 chunks into my-rag-collection");
    assert_eq!(store.count().await.expect("count"), 9);
}

#[tokio::test]
async fn reingesting_the_same_corpus_does_not_grow_the_store() {
    let tmp = corpus_of_three();
    let (service, store) = memory_service(StubModel::replying("unused"));
    let loader = DirectoryLoader::new(tmp.path());

    service.ingest_from(&loader).await.expect("first");
    service.ingest_from(&loader).await.expect("second");
    assert_eq!(store.count().await.expect("count"), 9);
}

#[tokio::test]
async fn configured_directory_is_the_default_source() {
    let tmp = corpus_of_three();
    let mut config = test_config();
    config.documents.dir = tmp.path().to_string_lossy().to_string();
    let store = Arc::new(MemoryStore::new(DIM));
    let service = service_with(config, store.clone(), StubModel::replying("unused"));

    let response = service.ingest().await.expect("ingest");
    assert_eq!(response.report.chunks(), 9);
}

#[tokio::test]
async fn empty_corpus_reports_no_documents() {
    let tmp = TempDir::new().expect("tmp");
    let (service, store) = memory_service(StubModel::replying("unused"));

    let response = service.ingest_from(&DirectoryLoader::new(tmp.path())).await.expect("ingest");
    assert_eq!(response.report, IngestReport::NoDocuments);
    assert_eq!(response.message, NO_DOCUMENTS_MESSAGE);
    assert_eq!(store.count().await.expect("count"), 0);

    let json = serde_json::to_value(&response).expect("json");
    assert_eq!(json["status"], "no_documents");
}

#[tokio::test]
async fn missing_corpus_directory_is_an_error() {
    let tmp = TempDir::new().expect("tmp");
    let (service, _store) = memory_service(StubModel::replying("unused"));
    let err = service.ingest_from(&DirectoryLoader::new(tmp.path().join("absent"))).await.unwrap_err();
    assert!(matches!(err, Error::DocumentSource(_)));
}

#[tokio::test]
async fn batch_size_does_not_change_the_index() {
    let docs: Vec<Document> = (0..4).map(|i| Document::new(text_of_len(1800 + i * 300, "x"), format!("d{i}.txt"))).collect();

    let mut contents = Vec::new();
    for batch_size in [1, 3, 100] {
        let store = Arc::new(MemoryStore::new(DIM));
        let report = pipeline(store.clone(), batch_size).ingest_documents(&docs).await.expect("ingest");
        let hits = store.search(&FakeEmbedder::new(DIM).embed("x alpha").expect("q"), 1000).await.expect("search");
        let ids: BTreeSet<String> = hits.into_iter().map(|h| h.id).collect();
        contents.push((report.chunks(), ids));
    }
    assert!(contents.windows(2).all(|w| w[0] == w[1]), "identical across batch sizes");
}

#[tokio::test]
async fn store_failure_aborts_remaining_batches() {
    let docs = vec![Document::new(text_of_len(5000, "f"), "big.txt")];
    let store = Arc::new(FlakyStore::new(2));

    let err = pipeline(store.clone(), 1).ingest_documents(&docs).await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert_eq!(store.calls.load(std::sync::atomic::Ordering::SeqCst), 3, "no batch after the failing one");
    assert_eq!(store.count().await.expect("count"), 2, "completed batches remain");
}

#[tokio::test]
async fn malformed_embeddings_abort_ingestion() {
    let chunker = Chunker::new(ChunkingConfig::default()).expect("chunker");
    let store = Arc::new(MemoryStore::new(DIM));
    let pipeline = IngestionPipeline::new(
        chunker,
        Arc::new(BrokenEmbedder),
        store.clone(),
        IngestConfig { batch_size: 10, show_progress: false },
    );
    let err = pipeline.ingest_documents(&[Document::new("some text", "a.txt")]).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
    assert_eq!(store.count().await.expect("count"), 0);
}

#[tokio::test]
async fn stored_records_keep_source_and_offsets() {
    let docs = vec![Document::new(text_of_len(2500, "meta"), "notes/meta.txt").with_attribute("category", "notes")];
    let store = Arc::new(MemoryStore::new(DIM));
    pipeline(store.clone(), 100).ingest_documents(&docs).await.expect("ingest");

    let hits = store.search(&FakeEmbedder::new(DIM).embed("meta alpha").expect("q"), 10).await.expect("search");
    let mut offsets: Vec<String> = hits.iter().map(|h| h.metadata["start_index"].clone()).collect();
    offsets.sort_by_key(|o| o.parse::<usize>().unwrap_or_default());
    assert_eq!(offsets, vec!["0", "900", "1800"]);
    assert!(hits.iter().all(|h| h.source() == "notes/meta.txt" && h.metadata["category"] == "notes"));
}
