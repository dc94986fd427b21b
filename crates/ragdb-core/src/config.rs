//! Configuration loader, typed settings, and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are separated by `__` in env vars (`APP_RETRIEVAL__K=5`).
//! Every typed section carries its documented defaults, so an empty config
//! file yields a working setup.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current working directory, picking the env overlay from `RUST_ENV`.
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment, base_dir: dir.to_path_buf() })
    }

    /// Build directly from a figment, e.g. one assembled in a test.
    pub fn from_figment(figment: Figment, base_dir: PathBuf) -> Self {
        Self { figment, base_dir }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the typed settings, resolving relative paths
    /// against the directory the config was loaded from.
    pub fn rag_config(&self) -> anyhow::Result<RagConfig> {
        let mut config: RagConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        config.documents.dir = resolve_with_base(&self.base_dir, &config.documents.dir)
            .to_string_lossy()
            .into_owned();
        if !config.store.uri.contains("://") {
            config.store.uri = resolve_with_base(&self.base_dir, &config.store.uri)
                .to_string_lossy()
                .into_owned();
        }
        if let Some(dir) = config.embedding.model_dir.take() {
            config.embedding.model_dir =
                Some(resolve_with_base(&self.base_dir, dir).to_string_lossy().into_owned());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// All settings consumed by the pipelines, passed explicitly to each
/// component at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub documents: DocumentsConfig,
    pub chunking: ChunkingConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub generation: GenerationConfig,
    pub logging: LogConfig,
}

impl RagConfig {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.ingest.validate()?;
        self.retrieval.validate()?;
        if self.store.collection.trim().is_empty() {
            return Err(Error::InvalidConfig("store.collection must not be empty".to_string()));
        }
        if self.embedding.backend == EmbeddingBackend::Fake && self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub dir: String,
    /// File extensions to load, without the dot. Empty means every file.
    pub extensions: Vec<String>,
    pub recursive: bool,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self { dir: "data/books".to_string(), extensions: Vec::new(), recursive: true }
    }
}

/// Window size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chunk_length: usize,
    pub overlap_length: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chunk_length: 1000, overlap_length: 100 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_length == 0 {
            return Err(Error::InvalidConfig("chunking.max_chunk_length must be positive".to_string()));
        }
        // otherwise the window never advances
        if self.overlap_length >= self.max_chunk_length {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap_length ({}) must be smaller than max_chunk_length ({})",
                self.overlap_length, self.max_chunk_length
            )));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.max_chunk_length - self.overlap_length
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Chunks per embed+upsert round trip. Throughput only.
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 100, show_progress: true }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("ingest.batch_size must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    /// Hits scoring below this are dropped; a hit exactly at it is kept.
    pub relevance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: 3, relevance_threshold: 0.2 }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be positive".to_string()));
        }
        if !self.relevance_threshold.is_finite() {
            return Err(Error::InvalidConfig("retrieval.relevance_threshold must be finite".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Local,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: String,
    /// Directory holding `tokenizer.json`, `config.json` and the weights.
    pub model_dir: Option<String>,
    pub max_len: usize,
    /// Dimensionality of the fake backend.
    pub dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Local,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_dir: None,
            max_len: 256,
            dim: 384,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Lance,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Local directory or remote URI of the LanceDB database.
    pub uri: String,
    pub collection: String,
    /// Build an ANN index once the collection holds this many rows.
    pub index_min_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Lance,
            uri: "data/lancedb".to_string(),
            collection: "my-rag-collection".to_string(),
            index_min_rows: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    /// Base of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    /// Env var consulted when `api_key` is unset.
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| env::var(&self.api_key_env).ok().filter(|k| !k.is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
