//! Request boundary for the two external operations.
//!
//! Pipeline errors pass through unchanged; [`ErrorBody`] is the rendering
//! used by callers that report failures to a client.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use ragdb_core::loader::DirectoryLoader;
use ragdb_core::traits::DocumentSource;
use ragdb_core::types::{Answer, IngestReport};
use ragdb_core::{Error, Result};

use crate::context::RagContext;

pub const NO_DOCUMENTS_MESSAGE: &str = "No new documents found.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: IngestReport,
}

impl IngestResponse {
    fn new(report: IngestReport, collection: &str) -> Self {
        let message = match report {
            IngestReport::Ingested { chunks, .. } => format!("Successfully ingested {chunks} chunks into {collection}"),
            IngestReport::NoDocuments => NO_DOCUMENTS_MESSAGE.to_string(),
        };
        Self { message, report }
    }
}

/// Generic internal-error response with the original cause attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

impl From<&Error> for ErrorBody {
    fn from(e: &Error) -> Self {
        Self { error: "internal error".to_string(), detail: e.to_string() }
    }
}

/// Cheap to clone; clones share one [`RagContext`].
#[derive(Clone)]
pub struct RagService {
    context: Arc<RagContext>,
}

impl RagService {
    pub fn new(context: RagContext) -> Self {
        Self { context: Arc::new(context) }
    }

    pub fn context(&self) -> &RagContext {
        &self.context
    }

    /// Ingest the configured document directory.
    pub async fn ingest(&self) -> Result<IngestResponse> {
        let loader = DirectoryLoader::from_config(&self.context.config().documents);
        self.ingest_from(&loader).await
    }

    #[instrument(skip_all, fields(source = %source.describe()))]
    pub async fn ingest_from(&self, source: &dyn DocumentSource) -> Result<IngestResponse> {
        let result = self.context.ingestion_pipeline().run(source).await;
        match result {
            Ok(report) => {
                let response = IngestResponse::new(report, &self.context.config().store.collection);
                info!(message = %response.message, "ingest finished");
                Ok(response)
            }
            Err(e) => {
                error!(error = %e, "ingest failed");
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn query(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }
        let result = async {
            let retrieval = self.context.retriever().retrieve(question).await?;
            self.context.synthesizer().synthesize(question, retrieval).await
        }
        .await;
        if let Err(e) = &result {
            error!(error = %e, "query failed");
        }
        result
    }
}
