//! Store traits for cache entries and media link records.

use crate::cache::{CacheEntry, UpdatedStatus};
use crate::errors::StoreError;
use crate::links::LinkRecord;
use async_trait::async_trait;

/// Persistence for the change-detection cache.
///
/// The cache is the only shared mutable resource in the pipeline and sees
/// concurrent writers, so mutating operations are specified as
/// conditional/idempotent rather than read-modify-write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, file_uri: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Inserts or fully replaces the entry for `entry.file_uri`, clearing
    /// any previous ingestion timestamp.
    async fn put(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Removes the entry; removing an absent entry is not an error.
    async fn delete(&self, file_uri: &str) -> Result<(), StoreError>;

    /// Sets the lifecycle status. Idempotent: writing the stored status
    /// again is a no-op, so duplicate trigger deliveries are harmless.
    /// Setting a status on an absent entry is a no-op as well.
    async fn set_status(&self, file_uri: &str, status: UpdatedStatus) -> Result<(), StoreError>;

    /// Stamps the ingestion time and moves the entry to
    /// [`UpdatedStatus::Ingested`].
    async fn mark_ingested(&self, file_uri: &str, ingested_at: i64) -> Result<(), StoreError>;

    /// File URIs currently in the given status, backed by the status index.
    async fn list_by_status(&self, status: UpdatedStatus) -> Result<Vec<String>, StoreError>;
}

/// Persistence for media link records.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Strongly-consistent read: a record returned by a concurrent
    /// [`LinkStore::insert`] must be visible here immediately.
    async fn get(&self, id: &str) -> Result<Option<LinkRecord>, StoreError>;

    /// Inserts a new record. Records are write-once; inserting an existing
    /// identifier is an error.
    async fn insert(&self, record: &LinkRecord) -> Result<(), StoreError>;
}
