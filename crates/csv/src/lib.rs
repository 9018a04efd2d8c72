//! # `docrag-csv`: CSV Extractor
//!
//! Each data row becomes one text unit of newline-joined `header: value`
//! pairs, so row-level facts embed and retrieve independently. A
//! configuration flag switches to concatenating every row into a single
//! unit for corpora where rows only make sense together.

use async_trait::async_trait;
use docrag::ingest::{ExtractError, Extractor};
use docrag::types::{SourceInfo, TextUnit};
use thiserror::Error;
use tracing::debug;

/// Custom error types for CSV extraction.
#[derive(Error, Debug)]
pub enum CsvExtractError {
    #[error("Source is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("Malformed CSV: {0}")]
    Malformed(#[from] csv::Error),
}

impl From<CsvExtractError> for ExtractError {
    fn from(err: CsvExtractError) -> Self {
        ExtractError::Parse(err.to_string())
    }
}

/// The [`Extractor`] implementation for `text/csv`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExtractor {
    concat_rows: bool,
}

impl CsvExtractor {
    /// `concat_rows` joins every formatted row into one unit instead of
    /// emitting one unit per row.
    pub fn new(concat_rows: bool) -> Self {
        Self { concat_rows }
    }
}

/// Formats the data rows of a CSV document, one string per row, as
/// newline-joined `header: value` pairs.
pub fn format_rows(content: &str) -> Result<Vec<String>, CsvExtractError> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let lines: Vec<String> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| format!("{header}: {value}"))
            .collect();
        rows.push(lines.join("\n"));
    }
    Ok(rows)
}

#[async_trait]
impl Extractor for CsvExtractor {
    async fn extract(
        &self,
        raw: &[u8],
        source: &SourceInfo,
    ) -> Result<Vec<TextUnit>, ExtractError> {
        let content = std::str::from_utf8(raw).map_err(CsvExtractError::from)?;
        let rows = format_rows(content).map_err(ExtractError::from)?;
        debug!("Extracted {} rows from {}", rows.len(), source.uri());

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if self.concat_rows {
            return Ok(vec![TextUnit::from_text(rows.join("\n"))]);
        }
        Ok(rows.into_iter().map(TextUnit::from_text).collect())
    }
}
