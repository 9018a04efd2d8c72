//! # Vector-Store Reconciliation
//!
//! A periodic sweep removes the vectors of deleted source files. The cache
//! drives it: entries in READYDELETE name files whose objects are gone but
//! whose vectors still exist. After a successful purge the entry itself is
//! deleted, completing the lifecycle.

use crate::cache::UpdatedStatus;
use crate::errors::StoreError;
use crate::providers::db::storage::CacheStore;
use crate::providers::vector::VectorStore;
use tracing::{error, info, warn};

/// Outcome of one reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    /// Files fully purged (vectors and cache entry removed).
    pub purged: usize,
    /// Total vectors removed across all purged files.
    pub vectors_removed: usize,
    /// File URIs whose purge failed; they stay READYDELETE for the next
    /// sweep.
    pub failed: Vec<String>,
}

/// Scans for READYDELETE entries, deletes their vectors, then deletes the
/// entries. Files purge concurrently; failures are collected rather than
/// aborting the sweep.
pub async fn reconcile_ready_delete(
    cache: &dyn CacheStore,
    vectors: &dyn VectorStore,
) -> Result<ReconcileSummary, StoreError> {
    let uris = cache.list_by_status(UpdatedStatus::ReadyDelete).await?;
    let mut summary = ReconcileSummary::default();

    let results =
        futures::future::join_all(uris.iter().map(|uri| purge_file(uri, cache, vectors))).await;

    for (uri, result) in uris.iter().zip(results) {
        match result {
            Ok(removed) => {
                summary.purged += 1;
                summary.vectors_removed += removed;
            }
            Err(e) => {
                error!("Error purging vectors for file {uri}: {e}");
                summary.failed.push(uri.clone());
            }
        }
    }

    if !summary.failed.is_empty() {
        warn!(
            "Failed to purge {} files: {:?}",
            summary.failed.len(),
            summary.failed
        );
    }
    Ok(summary)
}

async fn purge_file(
    uri: &str,
    cache: &dyn CacheStore,
    vectors: &dyn VectorStore,
) -> Result<usize, StoreError> {
    let removed = vectors.delete_by_source(uri).await?;
    if removed == 0 {
        info!("No vectors found for file {uri}");
    } else {
        info!("Deleted {removed} vectors for file {uri}");
    }

    // The entry goes away whether or not any vectors existed.
    cache.delete(uri).await?;
    Ok(removed)
}

/// Operator-initiated full purge: drops and recreates the vector
/// collection. READYDELETE entries are left for the regular sweep.
pub async fn purge_all(vectors: &dyn VectorStore) -> Result<(), StoreError> {
    info!("Purging vector store");
    vectors.reset().await
}
