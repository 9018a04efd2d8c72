//! # Embedding Worker Tests
//!
//! Drives `run_embedding_job` with in-memory providers and a stub extractor
//! to pin down which paths advance the ingestion stamp and which leave the
//! entry for a retry.

use anyhow::Result;
use async_trait::async_trait;
use docrag::cache::{CacheEntry, UpdatedStatus};
use docrag::config::IngestConfig;
use docrag::errors::EmbeddingError;
use docrag::ingest::worker::{run_embedding_job, ExtractorSet, WorkerDeps};
use docrag::ingest::{EmbeddingJob, ExtractError, Extractor, IngestStatus};
use docrag::providers::db::storage::CacheStore;
use docrag::providers::embedding::Embedder;
use docrag::providers::memory::{MemoryCacheStore, MemoryObjectStore, MemoryVectorStore};
use docrag::types::{SourceInfo, TextUnit};
use std::sync::Arc;

/// Passes the decoded bytes through as one unit, or fails on demand.
struct StubExtractor {
    error: Option<fn() -> ExtractError>,
}

impl StubExtractor {
    fn passthrough() -> Self {
        Self { error: None }
    }

    fn failing(error: fn() -> ExtractError) -> Self {
        Self { error: Some(error) }
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn extract(
        &self,
        raw: &[u8],
        _source: &SourceInfo,
    ) -> Result<Vec<TextUnit>, ExtractError> {
        if let Some(error) = self.error {
            return Err(error());
        }
        let text = String::from_utf8_lossy(raw).into_owned();
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TextUnit::from_text(text)])
    }
}

struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed-model"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(inputs.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

struct Fixture {
    objects: MemoryObjectStore,
    cache: MemoryCacheStore,
    vectors: MemoryVectorStore,
    embedder: FixedEmbedder,
    extractors: ExtractorSet,
}

impl Fixture {
    fn new(extractor: StubExtractor, content_type: &str) -> Self {
        let mut extractors = ExtractorSet::new();
        extractors.register(&[content_type], Arc::new(extractor));
        Self {
            objects: MemoryObjectStore::new(),
            cache: MemoryCacheStore::new(),
            vectors: MemoryVectorStore::new(),
            embedder: FixedEmbedder,
            extractors,
        }
    }

    fn deps(&self) -> WorkerDeps<'_> {
        WorkerDeps {
            objects: &self.objects,
            cache: &self.cache,
            vectors: &self.vectors,
            embedder: &self.embedder,
            extractors: &self.extractors,
        }
    }

    async fn seed_entry(&self, file_uri: &str, content_type: &str, status: UpdatedStatus) {
        self.cache
            .put(&CacheEntry {
                file_uri: file_uri.to_string(),
                content_type: content_type.to_string(),
                size: 1,
                etag: "etag".to_string(),
                updated_at: 1_700_000_000,
                status,
                ingested_at: None,
            })
            .await
            .expect("seed entry");
    }
}

fn job(file_uri: &str, content_type: &str) -> EmbeddingJob {
    EmbeddingJob {
        file_uri: file_uri.to_string(),
        content_type: content_type.to_string(),
        model_ref_key: None,
    }
}

#[tokio::test]
async fn test_happy_path_embeds_and_marks_ingested() -> Result<()> {
    let fixture = Fixture::new(StubExtractor::passthrough(), "text/plain");
    fixture
        .objects
        .insert_object("docs", "a.txt", b"some meaningful text", "text/plain");
    fixture
        .seed_entry("s3://docs/a.txt", "text/plain", UpdatedStatus::Updated)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/a.txt", "text/plain"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.embeddings_generated, 1);
    assert_eq!(outcome.status, None);
    assert_eq!(fixture.vectors.len(), 1);

    let entry = fixture.cache.get("s3://docs/a.txt").await?.expect("entry");
    assert_eq!(entry.status, UpdatedStatus::Ingested);
    assert!(entry.ingested_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_ready_delete_entry_is_skipped() -> Result<()> {
    let fixture = Fixture::new(StubExtractor::passthrough(), "text/plain");
    fixture
        .objects
        .insert_object("docs", "a.txt", b"text", "text/plain");
    fixture
        .seed_entry("s3://docs/a.txt", "text/plain", UpdatedStatus::ReadyDelete)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/a.txt", "text/plain"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.status, Some(IngestStatus::SkippedReadyDelete));
    assert_eq!(outcome.embeddings_generated, 0);
    assert!(fixture.vectors.is_empty());

    // Still READYDELETE, untouched for the purge sweep.
    let entry = fixture.cache.get("s3://docs/a.txt").await?.expect("entry");
    assert_eq!(entry.status, UpdatedStatus::ReadyDelete);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_object_leaves_entry_for_retry() -> Result<()> {
    let fixture = Fixture::new(StubExtractor::passthrough(), "text/plain");
    fixture
        .seed_entry("s3://docs/missing.txt", "text/plain", UpdatedStatus::Updated)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/missing.txt", "text/plain"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.status, Some(IngestStatus::ErrorReadingFile));
    let entry = fixture
        .cache
        .get("s3://docs/missing.txt")
        .await?
        .expect("entry");
    assert!(entry.ingested_at.is_none(), "retryable failures must not stamp");
    assert_eq!(entry.status, UpdatedStatus::Updated);
    Ok(())
}

#[tokio::test]
async fn test_unregistered_content_type_marks_ingested() -> Result<()> {
    let fixture = Fixture::new(StubExtractor::passthrough(), "text/plain");
    fixture
        .objects
        .insert_object("docs", "blob.bin", b"\x00\x01", "application/x-thing");
    fixture
        .seed_entry("s3://docs/blob.bin", "application/x-thing", UpdatedStatus::Updated)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/blob.bin", "application/x-thing"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.status, Some(IngestStatus::UnsupportedContentType));
    let entry = fixture.cache.get("s3://docs/blob.bin").await?.expect("entry");
    assert_eq!(entry.status, UpdatedStatus::Ingested);
    Ok(())
}

#[tokio::test]
async fn test_empty_extraction_marks_ingested_with_zero_chunks() -> Result<()> {
    let fixture = Fixture::new(StubExtractor::passthrough(), "text/plain");
    fixture
        .objects
        .insert_object("docs", "empty.txt", b"   ", "text/plain");
    fixture
        .seed_entry("s3://docs/empty.txt", "text/plain", UpdatedStatus::Updated)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/empty.txt", "text/plain"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.status, Some(IngestStatus::NoChunksToProcess));
    assert_eq!(outcome.embeddings_generated, 0);
    let entry = fixture.cache.get("s3://docs/empty.txt").await?.expect("entry");
    assert_eq!(entry.status, UpdatedStatus::Ingested);
    Ok(())
}

#[tokio::test]
async fn test_pdf_no_content_maps_to_no_valid_chunks() -> Result<()> {
    let fixture = Fixture::new(
        StubExtractor::failing(|| ExtractError::NoContent),
        "application/pdf",
    );
    fixture
        .objects
        .insert_object("docs", "scan.pdf", b"%PDF-", "application/pdf");
    fixture
        .seed_entry("s3://docs/scan.pdf", "application/pdf", UpdatedStatus::Updated)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/scan.pdf", "application/pdf"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.status, Some(IngestStatus::NoValidChunks));
    let entry = fixture.cache.get("s3://docs/scan.pdf").await?.expect("entry");
    assert_eq!(entry.status, UpdatedStatus::Ingested);
    Ok(())
}

#[tokio::test]
async fn test_video_pipeline_failure_is_retryable() -> Result<()> {
    let fixture = Fixture::new(
        StubExtractor::failing(|| ExtractError::Pipeline("transcription died".to_string())),
        "video/mp4",
    );
    fixture
        .objects
        .insert_object("docs", "talk.mp4", b"mp4", "video/mp4");
    fixture
        .seed_entry("s3://docs/talk.mp4", "video/mp4", UpdatedStatus::Updated)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/talk.mp4", "video/mp4"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.status, Some(IngestStatus::VideoProcessingFailed));
    let entry = fixture.cache.get("s3://docs/talk.mp4").await?.expect("entry");
    assert!(entry.ingested_at.is_none());
    assert_eq!(entry.status, UpdatedStatus::Updated);
    Ok(())
}

#[tokio::test]
async fn test_video_missing_media_container_status() -> Result<()> {
    let fixture = Fixture::new(
        StubExtractor::failing(|| ExtractError::Config("MEDIA_BUCKET_NAME is not set".into())),
        "video/mp4",
    );
    fixture
        .objects
        .insert_object("docs", "talk.mp4", b"mp4", "video/mp4");
    fixture
        .seed_entry("s3://docs/talk.mp4", "video/mp4", UpdatedStatus::Updated)
        .await;

    let outcome = run_embedding_job(
        &job("s3://docs/talk.mp4", "video/mp4"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    assert_eq!(outcome.status, Some(IngestStatus::MissingMediaBucket));
    Ok(())
}

#[tokio::test]
async fn test_sidecar_metadata_is_attached_to_vectors() -> Result<()> {
    let fixture = Fixture::new(StubExtractor::passthrough(), "text/plain");
    fixture
        .objects
        .insert_object("docs", "a.txt", b"body text", "text/plain");
    fixture.objects.insert_object(
        "docs",
        "a.txt.metadata.json",
        br#"{"department": "support"}"#,
        "application/json",
    );
    fixture
        .seed_entry("s3://docs/a.txt", "text/plain", UpdatedStatus::Updated)
        .await;

    run_embedding_job(
        &job("s3://docs/a.txt", "text/plain"),
        &fixture.deps(),
        &IngestConfig::default(),
    )
    .await?;

    let rows = fixture.vectors.rows();
    assert_eq!(rows[0].metadata["department"], "support");
    assert_eq!(rows[0].metadata["source"], "s3://docs/a.txt");
    assert_eq!(rows[0].metadata["embeddings_model_id"], "fixed-model");
    Ok(())
}

#[tokio::test]
async fn test_outcome_serialization_shape() -> Result<()> {
    let outcome = docrag::ingest::EmbeddingOutcome::failed("s3://d/f.txt", IngestStatus::NoValidChunks);
    let value = serde_json::to_value(&outcome)?;
    assert_eq!(value["FileURI"], "s3://d/f.txt");
    assert_eq!(value["EmbeddingsGenerated"], 0);
    assert_eq!(value["Status"], "NO_VALID_CHUNKS");

    let ok = docrag::ingest::EmbeddingOutcome::succeeded("s3://d/f.txt", 7);
    let value = serde_json::to_value(&ok)?;
    assert!(value.get("Status").is_none());
    Ok(())
}
