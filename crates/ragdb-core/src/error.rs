use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Embedding backend unreachable or produced malformed output.
    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// Vector length disagrees with the collection's fixed dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("generation error: {0}")]
    Generation(String),

    /// A dependency failed to come up at startup.
    #[error("failed to initialize {component}: {source}")]
    Initialization {
        component: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("document source error: {0}")]
    DocumentSource(String),
}

impl Error {
    pub fn initialization(component: &'static str, source: Error) -> Self {
        Self::Initialization { component, source: Box::new(source) }
    }

    /// Configuration-level failures that no request can recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. } | Self::Initialization { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
