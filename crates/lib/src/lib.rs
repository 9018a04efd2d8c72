//! # docrag: Document Ingestion for Retrieval-Augmented Chat
//!
//! This crate is the core of a document-ingestion pipeline that turns
//! heterogeneous source files (plain text, CSV, PDF, DOCX, video) into
//! retrieval-ready text chunks, tracks which files actually need
//! (re)processing, and resolves inline media markers back into live URLs
//! when answers are served.
//!
//! The per-format extraction logic lives in plugin crates (`docrag-text`,
//! `docrag-csv`, `docrag-pdf`, `docrag-docx`, `docrag-video`) that implement
//! the [`ingest::Extractor`] trait defined here.

pub mod cache;
pub mod chunking;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod links;
pub mod markers;
pub mod providers;
pub mod resolve;
pub mod types;

pub use cache::{handle_storage_event, CacheEntry, StorageEvent, UpdatedStatus};
pub use chunking::{chunk_preserving_markers, ChunkingConfig};
pub use config::IngestConfig;
pub use errors::{ConfigError, EmbeddingError, StoreError};
pub use ingest::{ExtractError, Extractor};
pub use links::{LinkRecord, MediaType};
pub use markers::{find_markers, format_marker, MarkerSpan, MarkerTag};
pub use types::{Chunk, SourceInfo, TextUnit};
