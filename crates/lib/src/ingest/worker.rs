//! # Embedding Worker
//!
//! Runs one file through the full pipeline: read the object, extract text
//! with the plugin matching its content type, chunk it marker-safely, embed
//! the chunks, store the vectors, and stamp the cache entry as ingested.
//!
//! Each invocation is an independent unit of work with no shared in-process
//! state; files are processed in parallel by independent workers while the
//! stages within one file run strictly in sequence. Failure handling is
//! deliberate about which paths advance the ingestion timestamp: terminal
//! conditions are recorded as ingested-with-zero-chunks so they are not
//! retried forever, while transient ones leave the entry untouched for the
//! next trigger.

use crate::cache::UpdatedStatus;
use crate::chunking::chunk_units;
use crate::config::IngestConfig;
use crate::errors::{EmbeddingError, StoreError};
use crate::ingest::traits::{ExtractError, Extractor};
use crate::ingest::types::{EmbeddingJob, EmbeddingOutcome, IngestStatus};
use crate::providers::db::storage::CacheStore;
use crate::providers::embedding::{embed_with_backoff, Embedder};
use crate::providers::object_store::ObjectStore;
use crate::providers::vector::VectorStore;
use crate::types::{parse_object_uri, SourceInfo};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that abort an embedding task outright. Everything that maps to a
/// status in the outcome vocabulary is reported through
/// [`EmbeddingOutcome::status`] instead.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid file URI: {0}")]
    InvalidUri(String),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Embedding generation failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Registry mapping content types to their extractor plugins.
#[derive(Default)]
pub struct ExtractorSet {
    by_type: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one extractor for each of the given content types.
    pub fn register(&mut self, content_types: &[&str], extractor: Arc<dyn Extractor>) {
        for content_type in content_types {
            self.by_type
                .insert(content_type.to_string(), Arc::clone(&extractor));
        }
    }

    pub fn get(&self, content_type: &str) -> Option<&Arc<dyn Extractor>> {
        self.by_type.get(content_type)
    }
}

/// Service clients the worker needs, injected explicitly per invocation.
pub struct WorkerDeps<'a> {
    pub objects: &'a dyn ObjectStore,
    pub cache: &'a dyn CacheStore,
    pub vectors: &'a dyn VectorStore,
    pub embedder: &'a dyn Embedder,
    pub extractors: &'a ExtractorSet,
}

/// Runs one embedding task to completion.
///
/// Returns `Ok` with a status for every condition in the fixed outcome
/// vocabulary; `Err` is reserved for failures outside it (embedding or
/// vector-store errors on otherwise healthy input), which the caller
/// retries wholesale.
pub async fn run_embedding_job(
    job: &EmbeddingJob,
    deps: &WorkerDeps<'_>,
    config: &IngestConfig,
) -> Result<EmbeddingOutcome, WorkerError> {
    let file_uri = &job.file_uri;

    // A file awaiting vector purge must never be re-ingested. A failed
    // guard read only logs: processing normally is the safer default.
    match deps.cache.get(file_uri).await {
        Ok(Some(entry)) if entry.status == UpdatedStatus::ReadyDelete => {
            info!("File {file_uri} is marked READYDELETE, skipping embeddings generation");
            return Ok(EmbeddingOutcome::failed(
                file_uri,
                IngestStatus::SkippedReadyDelete,
            ));
        }
        Err(e) => warn!("Error checking file status in cache: {e}"),
        _ => {}
    }

    let (container, key) =
        parse_object_uri(file_uri).map_err(|e| WorkerError::InvalidUri(e.to_string()))?;
    let source = SourceInfo {
        container,
        key,
        content_type: job.content_type.clone(),
    };

    let raw = match deps.objects.get(&source.container, &source.key).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Could be a transient storage failure, so the entry stays
            // unstamped and the next trigger retries.
            error!("Failed to read file {file_uri} from storage: {e}");
            return Ok(EmbeddingOutcome::failed(
                file_uri,
                IngestStatus::ErrorReadingFile,
            ));
        }
    };

    let metadata = load_document_metadata(deps, &source, job).await;

    let Some(extractor) = deps.extractors.get(&job.content_type) else {
        // Unsupported types are filtered out upstream; when one slips
        // through anyway, record it ingested so it is not retried forever.
        debug!(
            "Unsupported content type: {} for {file_uri}",
            job.content_type
        );
        deps.cache
            .mark_ingested(file_uri, Utc::now().timestamp())
            .await?;
        return Ok(EmbeddingOutcome::failed(
            file_uri,
            IngestStatus::UnsupportedContentType,
        ));
    };

    let units = match extractor.extract(&raw, &source).await {
        Ok(units) => units,
        Err(err) => return finish_extraction_failure(job, deps, err).await,
    };

    let chunks = chunk_units(&units, file_uri, &config.chunking);
    if chunks.is_empty() {
        warn!(
            "No chunks to process for {file_uri}. The file may contain little to no text content."
        );
        deps.cache
            .mark_ingested(file_uri, Utc::now().timestamp())
            .await?;
        return Ok(EmbeddingOutcome::failed(
            file_uri,
            IngestStatus::NoChunksToProcess,
        ));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_with_backoff(deps.embedder, &texts).await?;
    let stored = deps.vectors.add(file_uri, &metadata, &chunks, &vectors).await?;

    deps.cache
        .mark_ingested(file_uri, Utc::now().timestamp())
        .await?;
    info!("Generated {stored} embeddings for {file_uri}");
    Ok(EmbeddingOutcome::succeeded(file_uri, stored))
}

/// Maps an extraction failure to the right outcome: terminal conditions are
/// stamped ingested with a descriptive status, everything else leaves the
/// entry alone so the next trigger retries.
async fn finish_extraction_failure(
    job: &EmbeddingJob,
    deps: &WorkerDeps<'_>,
    err: ExtractError,
) -> Result<EmbeddingOutcome, WorkerError> {
    let file_uri = &job.file_uri;
    let Some(status) = status_for_error(&job.content_type, &err) else {
        // Outside the outcome vocabulary: fail the task wholesale and let
        // the trigger retry it.
        return Err(err.into());
    };

    if marks_ingested(status) {
        warn!("Extraction for {file_uri} produced no usable content: {err}");
        deps.cache
            .mark_ingested(file_uri, Utc::now().timestamp())
            .await?;
    } else {
        error!("Extraction for {file_uri} failed: {err}");
    }
    Ok(EmbeddingOutcome::failed(file_uri, status))
}

fn status_for_error(content_type: &str, err: &ExtractError) -> Option<IngestStatus> {
    match (content_type, err) {
        ("application/pdf", ExtractError::NoContent) => Some(IngestStatus::NoValidChunks),
        ("application/pdf", _) => Some(IngestStatus::RawTextExtractionFailed),
        ("video/mp4", ExtractError::Config(_)) => Some(IngestStatus::MissingMediaBucket),
        ("video/mp4", ExtractError::NoContent) => Some(IngestStatus::NoVideoChunks),
        ("video/mp4", _) => Some(IngestStatus::VideoProcessingFailed),
        (_, ExtractError::Unsupported(_)) => Some(IngestStatus::UnsupportedContentType),
        (_, ExtractError::NoContent) => Some(IngestStatus::NoChunksToProcess),
        (_, ExtractError::Fetch(_)) => Some(IngestStatus::ErrorReadingFile),
        _ => None,
    }
}

/// Which statuses advance the ingestion timestamp. Only genuinely terminal
/// conditions do; an empty video-pipeline result stays retryable because it
/// usually signals a flaky external stage, not an empty video.
fn marks_ingested(status: IngestStatus) -> bool {
    matches!(
        status,
        IngestStatus::NoValidChunks
            | IngestStatus::NoChunksToProcess
            | IngestStatus::UnsupportedContentType
    )
}

/// Assembles the document-level metadata stored with every vector: the
/// optional `<key>.metadata.json` sidecar, merged with the source location,
/// a creation timestamp, and the embedding model identifier.
async fn load_document_metadata(
    deps: &WorkerDeps<'_>,
    source: &SourceInfo,
    job: &EmbeddingJob,
) -> Value {
    let mut metadata = load_sidecar_metadata(deps.objects, source).await;
    metadata.insert("source".to_string(), json!(job.file_uri));
    metadata.insert(
        "create_timestamp".to_string(),
        json!(Utc::now().timestamp_millis()),
    );
    metadata.insert(
        "embeddings_model_id".to_string(),
        json!(deps.embedder.model_id()),
    );
    Value::Object(metadata)
}

/// Loads `<key>.metadata.json` next to the object, if present. A missing or
/// malformed sidecar is treated as empty.
async fn load_sidecar_metadata(
    objects: &dyn ObjectStore,
    source: &SourceInfo,
) -> Map<String, Value> {
    let sidecar_key = format!("{}.metadata.json", source.key);
    match objects.get(&source.container, &sidecar_key).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => Map::new(),
    }
}
