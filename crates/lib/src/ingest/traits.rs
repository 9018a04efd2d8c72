use crate::errors::StoreError;
use crate::types::{SourceInfo, TextUnit};
use async_trait::async_trait;
use thiserror::Error;

/// A generic error type for all extractor plugins.
///
/// Each plugin is responsible for mapping its specific errors (zip failures,
/// malformed CSV, a dead transcription job) into these standardized
/// variants, so the embedding worker can apply a uniform retry policy
/// without knowing any format internals.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The declared content type cannot be handled at all. Terminal.
    #[error("Unsupported content: {0}")]
    Unsupported(String),

    /// Extraction ran to completion but produced nothing usable. Terminal.
    #[error("No usable content produced")]
    NoContent,

    /// Reading the source or an intermediate artifact failed. Retryable.
    #[error("Failed to fetch or read content from the source: {0}")]
    Fetch(String),

    /// An external processing stage (layout analysis, transcription,
    /// summarization) failed. Retryable.
    #[error("External processing failed: {0}")]
    Pipeline(String),

    /// Required configuration is missing; surfaced to the operator rather
    /// than retried automatically.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source bytes could not be parsed. Retryable, since malformed
    /// uploads are usually replaced with a fixed fingerprint.
    #[error("Failed to parse the content from the source: {0}")]
    Parse(String),

    /// A storage provider failed mid-extraction. Retryable.
    #[error("Storage error during extraction: {0}")]
    Storage(#[from] StoreError),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ExtractError {
    /// Terminal failures may be recorded as ingested-with-zero-chunks;
    /// everything else must leave the cache entry untouched so the file is
    /// retried on the next trigger.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExtractError::Unsupported(_) | ExtractError::NoContent)
    }
}

/// A generic trait that defines the contract for a content-type extractor.
///
/// Any crate that handles a new source format must implement this trait so
/// the embedding worker can treat all formats polymorphically. An extractor
/// is a pure adapter: raw source bytes in, normalized text units out, with
/// any embedded media represented as inline markers.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Normalizes raw source bytes into a sequence of text units.
    ///
    /// Returning an empty vector means the file genuinely contains no text,
    /// which the worker records as ingested-with-zero-chunks.
    async fn extract(
        &self,
        raw: &[u8],
        source: &SourceInfo,
    ) -> Result<Vec<TextUnit>, ExtractError>;
}
