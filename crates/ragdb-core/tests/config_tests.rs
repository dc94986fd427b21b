use std::fs;

use figment::{providers::Serialized, Figment};
use ragdb_core::config::{
    resolve_with_base, Config, EmbeddingBackend, LogFormat, RagConfig, StoreBackend,
};
use tempfile::TempDir;

#[test]
fn defaults_match_documented_values() {
    let config = RagConfig::default();
    assert_eq!(config.chunking.max_chunk_length, 1000);
    assert_eq!(config.chunking.overlap_length, 100);
    assert_eq!(config.ingest.batch_size, 100);
    assert_eq!(config.retrieval.k, 3);
    assert!((config.retrieval.relevance_threshold - 0.2).abs() < f32::EPSILON);
    assert_eq!(config.store.collection, "my-rag-collection");
    assert_eq!(config.store.backend, StoreBackend::Lance);
    assert_eq!(config.embedding.backend, EmbeddingBackend::Local);
    assert_eq!(config.generation.model, "gemini-2.5-flash");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    config.validate().expect("defaults are valid");
}

#[test]
fn base_toml_and_environment_file_are_merged() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(
        tmp.path().join("config.toml"),
        r#"
[retrieval]
k = 5

[chunking]
max_chunk_length = 400
overlap_length = 40

[store]
backend = "memory"
uri = "indexes/lancedb"
"#,
    )
    .expect("write config");
    fs::write(tmp.path().join("config.test.toml"), "[retrieval]\nrelevance_threshold = 0.5\n").expect("write overlay");

    let config = Config::load_from(tmp.path(), "test").expect("load");
    let rag = config.rag_config().expect("settings");

    assert_eq!(rag.retrieval.k, 5);
    assert!((rag.retrieval.relevance_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(rag.chunking.max_chunk_length, 400);
    assert_eq!(rag.ingest.batch_size, 100, "untouched sections keep defaults");
    assert_eq!(rag.store.backend, StoreBackend::Memory);
    assert_eq!(rag.store.uri, tmp.path().join("indexes/lancedb").to_string_lossy());
    assert_eq!(rag.documents.dir, tmp.path().join("data/books").to_string_lossy());

    let k: usize = config.get("retrieval.k").expect("raw key");
    assert_eq!(k, 5);
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let tmp = TempDir::new().expect("tmp");
    let rag = Config::load_from(tmp.path(), "prod").expect("load").rag_config().expect("settings");
    assert_eq!(rag.retrieval.k, 3);
}

#[test]
fn invalid_chunking_is_rejected() {
    let mut bad = RagConfig::default();
    bad.chunking.overlap_length = 1000;
    let config = Config::from_figment(Figment::from(Serialized::defaults(bad)), ".".into());
    let err = config.rag_config().unwrap_err();
    assert!(err.to_string().contains("overlap_length"), "{err}");
}

#[test]
fn zero_k_and_zero_batch_are_rejected() {
    let mut bad = RagConfig::default();
    bad.retrieval.k = 0;
    assert!(bad.validate().is_err());

    let mut bad = RagConfig::default();
    bad.ingest.batch_size = 0;
    assert!(bad.validate().is_err());
}

#[test]
fn remote_store_uri_is_left_alone() {
    let mut settings = RagConfig::default();
    settings.store.uri = "db://my-project".to_string();
    let config = Config::from_figment(Figment::from(Serialized::defaults(settings)), "/srv/app".into());
    assert_eq!(config.rag_config().expect("settings").store.uri, "db://my-project");
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = std::path::Path::new("/srv/app");
    assert_eq!(resolve_with_base(base, "data"), base.join("data"));
    assert_eq!(resolve_with_base(base, "/abs/data"), std::path::PathBuf::from("/abs/data"));
}

#[test]
fn explicit_api_key_wins() {
    let mut settings = RagConfig::default();
    settings.generation.api_key = Some("from-config".to_string());
    settings.generation.api_key_env = "RAGDB_TEST_UNSET_KEY_VAR".to_string();
    assert_eq!(settings.generation.resolve_api_key().as_deref(), Some("from-config"));

    settings.generation.api_key = None;
    assert_eq!(settings.generation.resolve_api_key(), None);
}
