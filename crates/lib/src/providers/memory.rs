//! # In-Memory Providers
//!
//! Hash-map-backed implementations of the provider traits, used for local
//! runs and tests. The object store mirrors the entity-tag convention of
//! real object storage by fingerprinting bodies with md5, so
//! change-detection behaves exactly as it would against the real thing.

use crate::cache::{CacheEntry, UpdatedStatus};
use crate::errors::StoreError;
use crate::links::LinkRecord;
use crate::providers::db::storage::{CacheStore, LinkStore};
use crate::providers::object_store::{ObjectInfo, ObjectStore};
use crate::providers::vector::VectorStore;
use crate::types::{object_uri, Chunk};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- Object store ---

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// In-memory [`ObjectStore`].
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object directly, bypassing the trait.
    pub fn insert_object(&self, container: &str, key: &str, body: &[u8], content_type: &str) {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(
            (container.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(container.to_string(), key.to_string()))
    }

    /// Number of stored objects, across all containers.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}

fn not_found(container: &str, key: &str) -> StoreError {
    StoreError::NotFound(object_uri(container, key))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(container.to_string(), key.to_string()))
            .map(|o| o.body.clone())
            .ok_or_else(|| not_found(container, key))
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.insert_object(container, key, &body, content_type);
        Ok(())
    }

    async fn head(&self, container: &str, key: &str) -> Result<ObjectInfo, StoreError> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(&(container.to_string(), key.to_string()))
            .ok_or_else(|| not_found(container, key))?;
        Ok(ObjectInfo {
            content_type: object.content_type.clone(),
            size: object.body.len() as u64,
            etag: format!("{:x}", md5::compute(&object.body)),
        })
    }

    async fn copy(
        &self,
        container: &str,
        src_key: &str,
        dest_key: &str,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().unwrap();
        let mut object = objects
            .get(&(container.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(container, src_key))?;
        if let Some(ct) = content_type {
            object.content_type = ct.to_string();
        }
        objects.insert((container.to_string(), dest_key.to_string()), object);
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().unwrap();
        objects.remove(&(container.to_string(), key.to_string()));
        Ok(())
    }

    async fn sign_get_url(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        let objects = self.objects.lock().unwrap();
        if !objects.contains_key(&(container.to_string(), key.to_string())) {
            return Err(not_found(container, key));
        }
        Ok(format!(
            "memory://{container}/{key}?expires={}",
            expires_in.as_secs()
        ))
    }
}

// --- Cache store ---

/// In-memory [`CacheStore`].
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, file_uri: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.lock().unwrap().get(file_uri).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.file_uri.clone(), entry.clone());
        Ok(())
    }

    async fn delete(&self, file_uri: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(file_uri);
        Ok(())
    }

    async fn set_status(&self, file_uri: &str, status: UpdatedStatus) -> Result<(), StoreError> {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(file_uri) {
            entry.status = status;
        }
        Ok(())
    }

    async fn mark_ingested(&self, file_uri: &str, ingested_at: i64) -> Result<(), StoreError> {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(file_uri) {
            entry.ingested_at = Some(ingested_at);
            entry.status = UpdatedStatus::Ingested;
        }
        Ok(())
    }

    async fn list_by_status(&self, status: UpdatedStatus) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.status == status)
            .map(|e| e.file_uri.clone())
            .collect())
    }
}

// --- Link store ---

/// In-memory [`LinkStore`].
#[derive(Clone, Default)]
pub struct MemoryLinkStore {
    records: Arc<Mutex<HashMap<String, LinkRecord>>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, id: &str) -> Result<Option<LinkRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn insert(&self, record: &LinkRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(StoreError::Request(format!(
                "link record '{}' already exists",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

// --- Vector store ---

#[derive(Debug, Clone)]
pub struct StoredVector {
    pub source_uri: String,
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// In-memory [`VectorStore`].
#[derive(Clone, Default)]
pub struct MemoryVectorStore {
    rows: Arc<Mutex<Vec<StoredVector>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<StoredVector> {
        self.rows.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(
        &self,
        source_uri: &str,
        metadata: &serde_json::Value,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize, StoreError> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::Request(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let mut rows = self.rows.lock().unwrap();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            rows.push(StoredVector {
                source_uri: source_uri.to_string(),
                chunk: chunk.clone(),
                vector: vector.clone(),
                metadata: metadata.clone(),
            });
        }
        Ok(chunks.len())
    }

    async fn delete_by_source(&self, source_uri: &str) -> Result<usize, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.source_uri != source_uri);
        Ok(before - rows.len())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.rows.lock().unwrap().clear();
        Ok(())
    }
}
