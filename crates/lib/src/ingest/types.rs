//! Wire types for embedding tasks.

use serde::{Deserialize, Serialize};

/// Input for one embedding task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingJob {
    #[serde(rename = "FileURI")]
    pub file_uri: String,
    #[serde(rename = "ContentType")]
    pub content_type: String,
    #[serde(
        rename = "model_ref_key",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub model_ref_key: Option<String>,
}

/// The fixed failure-status vocabulary reported alongside the embedding
/// count. Absence means unqualified success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestStatus {
    /// The file is awaiting vector purge and must not be re-ingested.
    #[serde(rename = "SKIPPED_READYDELETE")]
    SkippedReadyDelete,
    /// Reading the object failed; retried on the next trigger.
    #[serde(rename = "ERROR_READING_FILE")]
    ErrorReadingFile,
    /// Filtered extraction and the raw-text fallback both came up empty.
    #[serde(rename = "NO_VALID_CHUNKS")]
    NoValidChunks,
    /// The raw-text fallback itself failed; retried on the next trigger.
    #[serde(rename = "RAW_TEXT_EXTRACTION_FAILED")]
    RawTextExtractionFailed,
    /// Video processing requires a media container and none is configured.
    #[serde(rename = "MISSING_MEDIA_BUCKET")]
    MissingMediaBucket,
    /// The video pipeline finished but produced no transcript chunks.
    #[serde(rename = "NO_VIDEO_CHUNKS")]
    NoVideoChunks,
    /// A stage of the video pipeline failed; retried on the next trigger.
    #[serde(rename = "VIDEO_PROCESSING_FAILED")]
    VideoProcessingFailed,
    /// Extraction succeeded but chunking yielded nothing.
    #[serde(rename = "NO_CHUNKS_TO_PROCESS")]
    NoChunksToProcess,
    /// No extractor is registered for the declared content type.
    #[serde(rename = "UNSUPPORTED_CONTENT_TYPE")]
    UnsupportedContentType,
}

/// Result of one embedding task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOutcome {
    #[serde(rename = "FileURI")]
    pub file_uri: String,
    #[serde(rename = "EmbeddingsGenerated")]
    pub embeddings_generated: usize,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IngestStatus>,
}

impl EmbeddingOutcome {
    pub fn succeeded(file_uri: &str, embeddings_generated: usize) -> Self {
        Self {
            file_uri: file_uri.to_string(),
            embeddings_generated,
            status: None,
        }
    }

    pub fn failed(file_uri: &str, status: IngestStatus) -> Self {
        Self {
            file_uri: file_uri.to_string(),
            embeddings_generated: 0,
            status: Some(status),
        }
    }
}
