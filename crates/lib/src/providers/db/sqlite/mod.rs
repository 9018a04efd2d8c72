//! # Turso-Backed Stores
//!
//! One provider implements all three store traits against a local turso
//! database: cache entries, media link records, and embedded chunks. Reads
//! and writes go through a single connection pool, so `LinkStore::get`'s
//! strong-consistency requirement holds trivially.

pub mod sql;

use crate::cache::{cache_key, CacheEntry, UpdatedStatus};
use crate::errors::StoreError;
use crate::links::{LinkRecord, MediaType};
use crate::providers::db::storage::{CacheStore, LinkStore};
use crate::providers::vector::VectorStore;
use crate::types::Chunk;
use async_trait::async_trait;
use tracing::info;
use turso::{params, Builder, Database, Value};
use uuid::Uuid;

/// Store provider backed by a turso database.
pub struct SqliteProvider {
    db: Database,
}

impl SqliteProvider {
    /// Opens (or creates) the database at `db_url`.
    pub async fn new(db_url: &str) -> Result<Self, StoreError> {
        let db = Builder::new_local(db_url).build().await?;
        Ok(Self { db })
    }

    /// Wraps an already-open database, e.g. an in-memory one in tests.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Creates all tables and indexes if they do not exist yet.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }
}

fn text_value(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        other => format!("{other:?}"),
    }
}

fn optional_i64(value: Value) -> Option<i64> {
    match value {
        Value::Integer(n) => Some(n),
        _ => None,
    }
}

#[async_trait]
impl CacheStore for SqliteProvider {
    async fn get(&self, file_uri: &str) -> Result<Option<CacheEntry>, StoreError> {
        let conn = self.db.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT file_uri, content_type, size, etag, updated_at, updated_status, ingested_at
                 FROM cache_entries WHERE pk = ? AND sk = 'metadata'",
            )
            .await?;
        let mut rows = stmt.query(params![cache_key(file_uri)]).await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let status_text = text_value(row.get_value(5)?);
        let status = UpdatedStatus::parse(&status_text).ok_or_else(|| {
            StoreError::Request(format!("unknown cache status '{status_text}' for {file_uri}"))
        })?;

        Ok(Some(CacheEntry {
            file_uri: text_value(row.get_value(0)?),
            content_type: text_value(row.get_value(1)?),
            size: optional_i64(row.get_value(2)?).unwrap_or(0) as u64,
            etag: text_value(row.get_value(3)?),
            updated_at: optional_i64(row.get_value(4)?).unwrap_or(0),
            status,
            ingested_at: optional_i64(row.get_value(6)?),
        }))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        // A full replace: re-uploading a file resets the ingestion
        // timestamp along with the fingerprint.
        conn.execute(
            "INSERT INTO cache_entries
                (pk, sk, file_uri, content_type, size, etag, updated_at, updated_status, ingested_at)
             VALUES (?, 'metadata', ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(pk, sk) DO UPDATE SET
                content_type = excluded.content_type,
                size = excluded.size,
                etag = excluded.etag,
                updated_at = excluded.updated_at,
                updated_status = excluded.updated_status,
                ingested_at = excluded.ingested_at",
            params![
                cache_key(&entry.file_uri),
                entry.file_uri.clone(),
                entry.content_type.clone(),
                entry.size as i64,
                entry.etag.clone(),
                entry.updated_at,
                entry.status.as_str(),
                entry.ingested_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, file_uri: &str) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        conn.execute(
            "DELETE FROM cache_entries WHERE pk = ? AND sk = 'metadata'",
            params![cache_key(file_uri)],
        )
        .await?;
        Ok(())
    }

    async fn set_status(&self, file_uri: &str, status: UpdatedStatus) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        // Guarded write: a duplicate delivery that carries the stored
        // status touches nothing.
        conn.execute(
            "UPDATE cache_entries SET updated_status = ?2
             WHERE pk = ?1 AND sk = 'metadata' AND updated_status <> ?2",
            params![cache_key(file_uri), status.as_str()],
        )
        .await?;
        Ok(())
    }

    async fn mark_ingested(&self, file_uri: &str, ingested_at: i64) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        conn.execute(
            "UPDATE cache_entries SET ingested_at = ?2, updated_status = ?3
             WHERE pk = ?1 AND sk = 'metadata'",
            params![
                cache_key(file_uri),
                ingested_at,
                UpdatedStatus::Ingested.as_str()
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_by_status(&self, status: UpdatedStatus) -> Result<Vec<String>, StoreError> {
        let conn = self.db.connect()?;
        let mut stmt = conn
            .prepare("SELECT file_uri FROM cache_entries WHERE updated_status = ?")
            .await?;
        let mut rows = stmt.query(params![status.as_str()]).await?;

        let mut uris = Vec::new();
        while let Some(row) = rows.next().await? {
            uris.push(text_value(row.get_value(0)?));
        }
        Ok(uris)
    }
}

#[async_trait]
impl LinkStore for SqliteProvider {
    async fn get(&self, id: &str) -> Result<Option<LinkRecord>, StoreError> {
        let conn = self.db.connect()?;
        let mut stmt = conn
            .prepare("SELECT uuid, original_link, type, created_at FROM media_links WHERE uuid = ?")
            .await?;
        let mut rows = stmt.query(params![id]).await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let type_text = text_value(row.get_value(2)?);
        let media_type = MediaType::parse(&type_text).ok_or_else(|| {
            StoreError::Request(format!("unknown media type '{type_text}' for link {id}"))
        })?;

        Ok(Some(LinkRecord {
            id: text_value(row.get_value(0)?),
            original_link: text_value(row.get_value(1)?),
            media_type,
            created_at: optional_i64(row.get_value(3)?).unwrap_or(0),
        }))
    }

    async fn insert(&self, record: &LinkRecord) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        // No OR REPLACE: records are write-once, and a primary-key clash
        // must surface so the allocation loop can draw a new identifier.
        conn.execute(
            "INSERT INTO media_links (uuid, original_link, type, created_at) VALUES (?, ?, ?, ?)",
            params![
                record.id.clone(),
                record.original_link.clone(),
                record.media_type.as_str(),
                record.created_at,
            ],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteProvider {
    async fn add(
        &self,
        source_uri: &str,
        metadata: &serde_json::Value,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize, StoreError> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::Request(format!(
                "{} chunks but {} vectors for {source_uri}",
                chunks.len(),
                vectors.len()
            )));
        }

        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| StoreError::Request(format!("failed to serialize metadata: {e}")))?;

        let mut conn = self.db.connect()?;
        let tx = conn.transaction().await?;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let vector_bytes: Vec<u8> = vector.iter().flat_map(|v| v.to_le_bytes()).collect();
            tx.execute(
                "INSERT INTO embeddings
                    (id, source_uri, page, title, section_header, content, metadata, embedding)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    Uuid::new_v4().to_string(),
                    source_uri,
                    chunk.page.map(|p| p as i64),
                    chunk.title.clone(),
                    chunk.section_header.clone(),
                    chunk.text.clone(),
                    metadata_json.clone(),
                    vector_bytes,
                ],
            )
            .await?;
        }
        tx.commit().await?;

        info!("Stored {} embeddings for {source_uri}", chunks.len());
        Ok(chunks.len())
    }

    async fn delete_by_source(&self, source_uri: &str) -> Result<usize, StoreError> {
        let conn = self.db.connect()?;
        let mut stmt = conn
            .prepare("SELECT COUNT(*) FROM embeddings WHERE source_uri = ?")
            .await?;
        let mut rows = stmt.query(params![source_uri]).await?;
        let count = match rows.next().await? {
            Some(row) => optional_i64(row.get_value(0)?).unwrap_or(0) as usize,
            None => 0,
        };

        conn.execute(
            "DELETE FROM embeddings WHERE source_uri = ?",
            params![source_uri],
        )
        .await?;
        Ok(count)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        conn.execute(sql::DROP_EMBEDDINGS_TABLE, ()).await?;
        conn.execute(sql::CREATE_EMBEDDINGS_TABLE, ()).await?;
        conn.execute(sql::CREATE_EMBEDDINGS_SOURCE_INDEX, ()).await?;
        Ok(())
    }
}
