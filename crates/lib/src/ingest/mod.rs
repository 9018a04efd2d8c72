//! # Ingestion Logic
//!
//! The extractor plugin contract, the wire types for embedding tasks, and
//! the worker that runs one file through extract → chunk → embed →
//! mark-ingested.

pub mod traits;

pub mod types;

pub mod worker;

pub use traits::{ExtractError, Extractor};

pub use types::{EmbeddingJob, EmbeddingOutcome, IngestStatus};

pub use worker::{run_embedding_job, ExtractorSet, WorkerDeps, WorkerError};
