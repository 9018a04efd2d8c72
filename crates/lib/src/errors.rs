use thiserror::Error;

/// Errors surfaced by the storage providers (object store, key-value
/// stores, vector store).
///
/// Callers rely on the variants to pick a retry policy: only
/// [`StoreError::Throttled`] warrants a backoff-and-retry; everything else
/// propagates immediately.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object or record not found: {0}")]
    NotFound(String),

    #[error("The service is throttling requests: {0}")]
    Throttled(String),

    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Database error: {0}")]
    Database(#[from] turso::Error),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether a bounded retry with exponential backoff is appropriate.
    pub fn is_throttle(&self) -> bool {
        matches!(self, StoreError::Throttled(_))
    }
}

/// Errors produced while generating vector embeddings.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to send request to the embeddings API: {0}")]
    Request(reqwest::Error),

    #[error("Failed to deserialize the embeddings API response: {0}")]
    Deserialization(reqwest::Error),

    #[error("The embeddings API is throttling requests: {0}")]
    Throttled(String),

    #[error("The embeddings API returned an error: {0}")]
    Api(String),
}

/// Configuration problems are fail-fast: they are surfaced to the operator
/// and never retried automatically.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}
