//! # Pipeline Configuration
//!
//! Runtime settings come from the environment; a `.env` file is honored in
//! development. Chunk sizing falls back to the defaults the pipeline was
//! tuned with. Values naming external resources are optional here and
//! required lazily by the features that use them, so a text-only deployment
//! never has to configure a media container.

use crate::chunking::ChunkingConfig;
use crate::errors::ConfigError;
use std::env;

/// Runtime configuration for the ingestion pipeline.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    /// Two-pass chunk sizing.
    pub chunking: ChunkingConfig,
    /// Emit one text unit for the whole CSV instead of one per row.
    pub concat_csv_rows: bool,
    /// Container for processed media assets (extracted images, frames,
    /// transcripts). Required by the DOCX and video extractors.
    pub media_container: Option<String>,
}

impl IngestConfig {
    /// Loads configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            chunking: ChunkingConfig {
                coarse_threshold: read_usize("DOC_SPLIT_THRESHOLD", 25_000)?,
                coarse_chunk_size: read_usize("CHUNK_SIZE_DOC_SPLIT", 10_000)?,
                coarse_overlap: read_usize("OVERLAP_FOR_DOC_SPLIT", 1_000)?,
                chunk_size: read_usize("CHUNK_SIZE", 2_000)?,
                overlap: read_usize("CHUNK_OVERLAP", 300)?,
            },
            concat_csv_rows: read_flag("CONCAT_CSV_ROWS"),
            media_container: env::var("MEDIA_BUCKET_NAME").ok(),
        })
    }

    /// The media container, or a fail-fast configuration error for callers
    /// that cannot work without one.
    pub fn require_media_container(&self) -> Result<&str, ConfigError> {
        self.media_container
            .as_deref()
            .ok_or(ConfigError::MissingVar("MEDIA_BUCKET_NAME"))
    }
}

fn read_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        Err(_) => Ok(default),
    }
}

fn read_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
