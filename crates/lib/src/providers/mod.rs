//! # Service Providers
//!
//! Every external service the pipeline touches is reached through a narrow
//! trait defined here and injected explicitly; nothing in the core reaches
//! for a global client. Concrete implementations cover the real backends
//! (signed HTTP object storage, a turso database, an OpenAI-compatible
//! embeddings API) plus in-memory equivalents for local runs and tests.

pub mod db;
pub mod embedding;
pub mod memory;
pub mod object_store;
pub mod s3;
pub mod vector;

pub use db::storage::{CacheStore, LinkStore};
pub use embedding::{embed_with_backoff, Embedder, HttpEmbedder};
pub use object_store::{ObjectInfo, ObjectStore};
pub use vector::VectorStore;
