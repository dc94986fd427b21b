//! Ingestion and query pipelines over the embedding, store and language
//! model components.

mod embedding;

pub mod context;
pub mod ingest;
pub mod retriever;
pub mod service;
pub mod synthesizer;

pub use context::RagContext;
pub use ingest::IngestionPipeline;
pub use retriever::Retriever;
pub use service::{ErrorBody, IngestResponse, RagService};
pub use synthesizer::{AnswerSynthesizer, NO_ANSWER};
