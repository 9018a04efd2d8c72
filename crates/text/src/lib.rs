//! # `docrag-text`: Plain Text Extractor
//!
//! The simplest plugin in the ecosystem: the decoded text becomes a single
//! unit, and all sizing happens downstream in the shared chunker.

use async_trait::async_trait;
use docrag::ingest::{ExtractError, Extractor};
use docrag::types::{SourceInfo, TextUnit};
use thiserror::Error;
use tracing::debug;

/// Custom error types for plain-text extraction.
#[derive(Error, Debug)]
pub enum TextExtractError {
    #[error("Source is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl From<TextExtractError> for ExtractError {
    fn from(err: TextExtractError) -> Self {
        match err {
            TextExtractError::Encoding(e) => ExtractError::Parse(e.to_string()),
        }
    }
}

/// The [`Extractor`] implementation for `text/plain`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for TextExtractor {
    async fn extract(
        &self,
        raw: &[u8],
        source: &SourceInfo,
    ) -> Result<Vec<TextUnit>, ExtractError> {
        let text = String::from_utf8(raw.to_vec()).map_err(TextExtractError::from)?;
        if text.trim().is_empty() {
            debug!("Text file {} is empty", source.uri());
            return Ok(Vec::new());
        }
        Ok(vec![TextUnit::from_text(text)])
    }
}
