//! # CSV Crate Tests
//!
//! Unit tests for row formatting plus an end-to-end run of the embedding
//! worker over a CSV file, exercising the extractor through the same
//! registry dispatch the real pipeline uses.

use anyhow::Result;
use docrag::cache::{CacheEntry, UpdatedStatus};
use docrag::config::IngestConfig;
use docrag::ingest::worker::{run_embedding_job, ExtractorSet, WorkerDeps};
use docrag::ingest::{EmbeddingJob, Extractor};
use docrag::providers::db::storage::CacheStore;
use docrag::providers::memory::{
    MemoryCacheStore, MemoryObjectStore, MemoryVectorStore,
};
use docrag::types::SourceInfo;
use docrag_csv::{format_rows, CsvExtractor};
use docrag_test_utils::StubEmbedder;
use std::sync::Arc;

const CSV_CONTENT: &str = "name,role\nAda,engineer\nGrace,admiral\nEdsger,professor\n";

fn source() -> SourceInfo {
    SourceInfo {
        container: "docs".to_string(),
        key: "people.csv".to_string(),
        content_type: "text/csv".to_string(),
    }
}

// --- Unit tests for row formatting ---

#[test]
fn test_format_rows_key_value_lines() -> Result<()> {
    let rows = format_rows(CSV_CONTENT)?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], "name: Ada\nrole: engineer");
    assert_eq!(rows[2], "name: Edsger\nrole: professor");
    Ok(())
}

#[test]
fn test_format_rows_header_only() -> Result<()> {
    let rows = format_rows("name,role\n")?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_extract_one_unit_per_row() -> Result<()> {
    let extractor = CsvExtractor::new(false);
    let units = extractor.extract(CSV_CONTENT.as_bytes(), &source()).await?;

    assert_eq!(units.len(), 3);
    assert_eq!(units[1].text, "name: Grace\nrole: admiral");
    Ok(())
}

#[tokio::test]
async fn test_extract_concatenated() -> Result<()> {
    let extractor = CsvExtractor::new(true);
    let units = extractor.extract(CSV_CONTENT.as_bytes(), &source()).await?;

    assert_eq!(units.len(), 1);
    assert!(units[0].text.starts_with("name: Ada"));
    assert!(units[0].text.contains("name: Edsger"));
    Ok(())
}

// --- End-to-end worker run ---

#[tokio::test]
async fn test_worker_embeds_csv_rows() -> Result<()> {
    // --- Arrange ---
    let objects = MemoryObjectStore::new();
    let cache = MemoryCacheStore::new();
    let vectors = MemoryVectorStore::new();
    let embedder = StubEmbedder::new();

    objects.insert_object("docs", "people.csv", CSV_CONTENT.as_bytes(), "text/csv");

    let file_uri = "s3://docs/people.csv";
    cache
        .put(&CacheEntry {
            file_uri: file_uri.to_string(),
            content_type: "text/csv".to_string(),
            size: CSV_CONTENT.len() as u64,
            etag: "etag-1".to_string(),
            updated_at: 1_700_000_000,
            status: UpdatedStatus::Updated,
            ingested_at: None,
        })
        .await?;

    let mut extractors = ExtractorSet::new();
    extractors.register(
        &["text/csv", "application/csv"],
        Arc::new(CsvExtractor::new(false)),
    );

    let deps = WorkerDeps {
        objects: &objects,
        cache: &cache,
        vectors: &vectors,
        embedder: &embedder,
        extractors: &extractors,
    };
    let job = EmbeddingJob {
        file_uri: file_uri.to_string(),
        content_type: "text/csv".to_string(),
        model_ref_key: None,
    };

    // --- Act ---
    let outcome = run_embedding_job(&job, &deps, &IngestConfig::default()).await?;

    // --- Assert ---
    assert_eq!(outcome.embeddings_generated, 3);
    assert_eq!(outcome.status, None);
    assert_eq!(vectors.len(), 3);

    let rows = vectors.rows();
    assert!(rows.iter().all(|r| r.source_uri == file_uri));
    assert_eq!(rows[0].metadata["source"], file_uri);
    assert_eq!(rows[0].metadata["embeddings_model_id"], "stub-embedding-model");

    let entry = cache.get(file_uri).await?.expect("entry still present");
    assert_eq!(entry.status, UpdatedStatus::Ingested);
    assert!(entry.ingested_at.is_some());
    Ok(())
}
