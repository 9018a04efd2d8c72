//! # Text Crate Tests
//!
//! Verifies that plain-text extraction normalizes bytes into a single text
//! unit and handles empty and non-UTF-8 input.

use anyhow::Result;
use docrag::ingest::{ExtractError, Extractor};
use docrag::types::SourceInfo;
use docrag_text::TextExtractor;

fn source() -> SourceInfo {
    SourceInfo {
        container: "docs".to_string(),
        key: "notes.txt".to_string(),
        content_type: "text/plain".to_string(),
    }
}

#[tokio::test]
async fn test_extract_single_unit() -> Result<()> {
    let extractor = TextExtractor::new();
    let units = extractor.extract(b"Hello, ingestion.", &source()).await?;

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].text, "Hello, ingestion.");
    assert_eq!(units[0].page, None);
    Ok(())
}

#[tokio::test]
async fn test_extract_whitespace_only_is_empty() -> Result<()> {
    let extractor = TextExtractor::new();
    let units = extractor.extract(b"  \n\t ", &source()).await?;
    assert!(units.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_extract_invalid_utf8_is_parse_error() {
    let extractor = TextExtractor::new();
    let result = extractor.extract(&[0xff, 0xfe, 0x80], &source()).await;
    assert!(matches!(result, Err(ExtractError::Parse(_))));
}
