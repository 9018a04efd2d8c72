//! Vector-store access trait.

use crate::errors::StoreError;
use crate::types::Chunk;
use async_trait::async_trait;

/// The slice of vector-store functionality the pipeline needs: persisting
/// embedded chunks keyed by their source file, and purging them when the
/// source file goes away. Index schemas and search are out of scope.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persists chunks with their vectors under `source_uri`, attaching the
    /// document-level metadata to each row. `chunks` and `vectors` are
    /// parallel slices. Returns the number of embeddings stored.
    async fn add(
        &self,
        source_uri: &str,
        metadata: &serde_json::Value,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize, StoreError>;

    /// Removes every vector belonging to `source_uri`; returns how many
    /// were removed.
    async fn delete_by_source(&self, source_uri: &str) -> Result<usize, StoreError>;

    /// Drops and recreates the collection.
    async fn reset(&self) -> Result<(), StoreError>;
}
