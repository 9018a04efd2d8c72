//! # Change-Detection Cache
//!
//! One record per canonical source-file key tracks the last-seen content
//! fingerprint and ingestion lifecycle, so storage-change notifications only
//! trigger (re)processing when file content actually changed.
//!
//! Lifecycle per key:
//!
//! ```text
//! (absent) --create/update event--> UPDATED
//! UPDATED --successful embedding--> INGESTED
//! INGESTED --create/update event w/ new fingerprint--> UPDATED
//! (UPDATED|INGESTED) --delete event--> READYDELETE, or deleted outright
//!                                      when a sanitized duplicate owns the key
//! READYDELETE --vector-store purge completes--> (absent)
//! ```
//!
//! Trigger delivery is at-least-once, so every write here is conditional or
//! idempotent: fingerprint equality short-circuits, and status transitions
//! only fire when the stored status differs.

pub mod reconcile;

use crate::errors::StoreError;
use crate::providers::db::storage::CacheStore;
use crate::providers::object_store::ObjectStore;
use crate::types::object_uri;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Lifecycle status stored on a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdatedStatus {
    #[serde(rename = "UPDATED")]
    Updated,
    #[serde(rename = "INGESTED")]
    Ingested,
    #[serde(rename = "READYDELETE")]
    ReadyDelete,
}

impl UpdatedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdatedStatus::Updated => "UPDATED",
            UpdatedStatus::Ingested => "INGESTED",
            UpdatedStatus::ReadyDelete => "READYDELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPDATED" => Some(UpdatedStatus::Updated),
            "INGESTED" => Some(UpdatedStatus::Ingested),
            "READYDELETE" => Some(UpdatedStatus::ReadyDelete),
            _ => None,
        }
    }
}

/// One row per canonical source-file key.
///
/// `ingested_at` is `None` until the embedding worker succeeds; a `None`
/// value means "needs processing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "FileURI")]
    pub file_uri: String,
    #[serde(rename = "ContentType")]
    pub content_type: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: i64,
    #[serde(rename = "UpdatedStatus")]
    pub status: UpdatedStatus,
    #[serde(rename = "IngestedAt", skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<i64>,
}

/// Partition key under which an entry is stored. The sort key is the fixed
/// literal `metadata`, reserved for future per-file facets.
pub fn cache_key(file_uri: &str) -> String {
    format!("source_location#{file_uri}")
}

/// A storage-change notification as delivered by the object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "event_type")]
    pub kind: StorageEventKind,
    pub container: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEventKind {
    Created,
    Removed,
}

/// What [`handle_storage_event`] decided to do; useful for logging and
/// tests. All persistent effects go through the injected stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDecision {
    /// Entry created or refreshed with a new fingerprint.
    Updated,
    /// Fingerprint unchanged; nothing to do.
    Unchanged,
    /// Resolved content type is outside the allowlist; no entry touched.
    UnsupportedType(String),
    /// Entry marked for the vector purge sweep.
    MarkedReadyDelete,
    /// Unsanitized duplicate removed in favor of the sanitized object.
    DroppedUnsanitizedDuplicate,
}

static DISALLOWED_STEM_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-_]").expect("sanitize pattern is a valid regex"));

/// Rewrites the filename stem of `key` to the canonical sanitized form.
///
/// Only the stem is restricted to `[a-zA-Z0-9_-]`; directories and the
/// extension are preserved. Idempotent.
pub fn sanitize_key(key: &str) -> String {
    let (dir, file) = match key.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, key),
    };
    let (stem, ext) = match file.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (file, None),
    };

    let clean_stem = DISALLOWED_STEM_CHARS.replace_all(stem, "_");
    let clean_file = match ext {
        Some(ext) => format!("{clean_stem}.{ext}"),
        None => clean_stem.into_owned(),
    };
    match dir {
        Some(dir) => format!("{dir}/{clean_file}"),
        None => clean_file,
    }
}

/// Declared types that carry no real information and should be re-inferred
/// from the file extension.
const GENERIC_CONTENT_TYPES: [&str; 3] = [
    "application/octet-stream",
    "application/csv",
    "binary/octet-stream",
];

/// Content types the pipeline knows how to extract. Everything else is
/// skipped permanently without creating a cache entry.
pub const SUPPORTED_CONTENT_TYPES: [&str; 5] = [
    "text/plain",
    "text/csv",
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "video/mp4",
];

/// Maps a file extension to its real content type.
pub fn infer_content_type_from_extension(key: &str) -> Option<&'static str> {
    let ext = key.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        "pdf" => Some("application/pdf"),
        "mp4" => Some("video/mp4"),
        _ => None,
    }
}

/// Applies one storage-change notification to the cache.
///
/// Create/update events sanitize the object key (renaming the object when
/// needed), normalize generic content types from the extension, filter
/// against the supported-type allowlist, and upsert the entry unless the
/// stored fingerprint already matches. Delete events either mark the entry
/// READYDELETE for the purge sweep or, when a sanitized duplicate owns the
/// canonical key, drop the unsanitized entry outright.
pub async fn handle_storage_event(
    event: &StorageEvent,
    objects: &dyn ObjectStore,
    cache: &dyn CacheStore,
) -> Result<EventDecision, StoreError> {
    match event.kind {
        StorageEventKind::Removed => handle_removed(event, objects, cache).await,
        StorageEventKind::Created => handle_created(event, objects, cache).await,
    }
}

async fn handle_removed(
    event: &StorageEvent,
    objects: &dyn ObjectStore,
    cache: &dyn CacheStore,
) -> Result<EventDecision, StoreError> {
    let uri = object_uri(&event.container, &event.key);
    info!("Handling delete event for {uri}");

    let sanitized = sanitize_key(&event.key);
    match objects.head(&event.container, &sanitized).await {
        Ok(_) if sanitized != event.key => {
            // The sanitized object still exists; this unsanitized entry is a
            // duplicate and its vectors belong to the sanitized key.
            cache.delete(&uri).await?;
            info!("Deleted cache entry for unsanitized file {uri}, sanitized version exists");
            Ok(EventDecision::DroppedUnsanitizedDuplicate)
        }
        _ => {
            cache.set_status(&uri, UpdatedStatus::ReadyDelete).await?;
            Ok(EventDecision::MarkedReadyDelete)
        }
    }
}

async fn handle_created(
    event: &StorageEvent,
    objects: &dyn ObjectStore,
    cache: &dyn CacheStore,
) -> Result<EventDecision, StoreError> {
    let container = &event.container;
    let mut key = event.key.clone();

    let sanitized = sanitize_key(&key);
    if sanitized != key {
        info!("Sanitizing object key: '{key}' -> '{sanitized}'");
        let original_uri = object_uri(container, &key);

        if objects.head(container, &sanitized).await.is_ok() {
            // The sanitized version already exists; drop the duplicate
            // rather than re-copying over it.
            info!(
                "Sanitized object already exists, deleting unsanitized {original_uri}"
            );
            objects.delete(container, &key).await?;
            if let Err(e) = cache.delete(&original_uri).await {
                warn!("Failed to delete cache entry for {original_uri}: {e}");
            }
            return Ok(EventDecision::DroppedUnsanitizedDuplicate);
        }

        objects.copy(container, &key, &sanitized, None).await?;
        objects.delete(container, &key).await?;
        if let Err(e) = cache.delete(&original_uri).await {
            warn!("Failed to delete cache entry for {original_uri}: {e}");
        }
        key = sanitized;
    }

    let uri = object_uri(container, &key);
    let head = objects.head(container, &key).await?;

    let mut content_type = head.content_type.clone();
    if GENERIC_CONTENT_TYPES.contains(&content_type.as_str()) {
        if let Some(inferred) = infer_content_type_from_extension(&key) {
            if inferred != content_type {
                info!("Normalizing content type '{content_type}' -> '{inferred}' for {key}");
                objects.copy(container, &key, &key, Some(inferred)).await?;
                content_type = inferred.to_string();
            }
        }
    }

    if !SUPPORTED_CONTENT_TYPES.contains(&content_type.as_str()) {
        debug!("Skipping {key}, unsupported content type: {content_type}");
        return Ok(EventDecision::UnsupportedType(content_type));
    }

    if let Some(existing) = cache.get(&uri).await? {
        if existing.etag == head.etag {
            info!("File {uri} has not changed, skipping update");
            return Ok(EventDecision::Unchanged);
        }
    }

    cache
        .put(&CacheEntry {
            file_uri: uri,
            content_type,
            size: head.size,
            etag: head.etag,
            updated_at: Utc::now().timestamp(),
            status: UpdatedStatus::Updated,
            ingested_at: None,
        })
        .await?;
    Ok(EventDecision::Updated)
}
