//! # `docrag-pdf`: Structured-PDF Extractor
//!
//! Consumes the structured output of the external document-layout service
//! and turns it into embeddable text: a fold over tagged line events builds
//! section chunks with page/title metadata, a cleaning stage filters out
//! boilerplate and noise, and a raw-text fallback guarantees that a
//! document whose filtered pipeline comes up empty is not silently dropped.

mod filter;
mod fold;
mod layout;

pub use filter::{filter_chunks, linearize_raw_text, MIN_TOTAL_WORDS};
pub use fold::{fold_layout, SectionChunk, MAX_SECTION_WORDS};
pub use layout::{DocumentLayout, LayoutAnalyzer, LayoutBlock, PageLayout};

use async_trait::async_trait;
use docrag::ingest::{ExtractError, Extractor};
use docrag::types::{SourceInfo, TextUnit};
use filter::fallback_word_count;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Minimum words for the raw-text fallback to be accepted.
pub const FALLBACK_MIN_WORDS: usize = 10;

/// Custom error types for PDF extraction.
#[derive(Error, Debug)]
pub enum PdfExtractError {
    /// The external layout service failed or returned garbage.
    #[error("Layout analysis failed: {0}")]
    Layout(String),
    #[error("Failed to parse layout output: {0}")]
    Parse(String),
}

impl From<PdfExtractError> for ExtractError {
    fn from(err: PdfExtractError) -> Self {
        match err {
            PdfExtractError::Layout(msg) => ExtractError::Pipeline(msg),
            PdfExtractError::Parse(msg) => ExtractError::Parse(msg),
        }
    }
}

/// The [`Extractor`] implementation for `application/pdf`.
pub struct PdfExtractor {
    analyzer: Arc<dyn LayoutAnalyzer>,
}

impl PdfExtractor {
    pub fn new(analyzer: Arc<dyn LayoutAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    /// Runs the filtered pipeline, falling back to raw-text linearization
    /// when filtering removes every chunk. A fallback below
    /// [`FALLBACK_MIN_WORDS`] words counts as no content at all.
    async fn extract(
        &self,
        raw: &[u8],
        source: &SourceInfo,
    ) -> Result<Vec<TextUnit>, ExtractError> {
        let uri = source.uri();
        info!("Processing {uri}");

        let layout = self.analyzer.analyze(raw).await.map_err(ExtractError::from)?;
        let folded = fold_layout(&layout);
        let cleaned = filter_chunks(&folded, MIN_TOTAL_WORDS);

        if !cleaned.is_empty() {
            info!("Processed {uri} into {} cleaned chunks", cleaned.len());
            return Ok(cleaned.into_iter().map(TextUnit::from_text).collect());
        }

        warn!(
            "Filtered extraction produced no valid chunks for {uri}. \
             Trying raw text extraction as fallback."
        );
        let raw_text = linearize_raw_text(&layout);
        let words = fallback_word_count(&raw_text);
        if raw_text.is_empty() || words < FALLBACK_MIN_WORDS {
            warn!("Raw text extraction produced insufficient content for {uri}");
            return Err(ExtractError::NoContent);
        }

        info!("Raw text extraction successful for {uri}. Using single chunk with {words} words.");
        Ok(vec![TextUnit::from_text(raw_text)])
    }
}
