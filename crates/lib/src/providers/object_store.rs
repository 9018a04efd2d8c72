//! Object-storage access trait.

use crate::errors::StoreError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;
use std::time::Duration;

/// Metadata returned by a head request.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub content_type: String,
    pub size: u64,
    /// Strong content fingerprint (entity tag). Two objects with equal tags
    /// have equal content; a metadata-only touch keeps the tag.
    pub etag: String,
}

/// Narrow object-storage interface used by the pipeline.
///
/// Implementations expose exactly the operations the ingestion flow needs:
/// no bucket management, no listing. `copy` doubles as the rename primitive
/// (key sanitation) and, when copying a key onto itself with a new content
/// type, as the in-place metadata rewrite.
#[async_trait]
pub trait ObjectStore: Send + Sync + DynClone + Debug {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn head(&self, container: &str, key: &str) -> Result<ObjectInfo, StoreError>;

    /// Copies an object within a container, optionally replacing its stored
    /// content type.
    async fn copy(
        &self,
        container: &str,
        src_key: &str,
        dest_key: &str,
        content_type: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, container: &str, key: &str) -> Result<(), StoreError>;

    /// Produces a time-limited signed GET URL for the object.
    async fn sign_get_url(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError>;
}

dyn_clone::clone_trait_object!(ObjectStore);
