//! # DOCX Crate Tests
//!
//! Builds minimal DOCX archives in memory and verifies paragraph
//! extraction, inline image-marker injection, and the link records behind
//! the markers.

use anyhow::Result;
use docrag::ingest::{ExtractError, Extractor};
use docrag::markers::{find_markers, MarkerTag};
use docrag::providers::db::storage::LinkStore;
use docrag::providers::memory::{MemoryLinkStore, MemoryObjectStore};
use docrag::types::SourceInfo;
use docrag_docx::DocxExtractor;
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const DOCUMENT_WITH_IMAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Before the image.</w:t></w:r></w:p>
    <w:p><w:r><w:drawing><a:blip r:embed="rId7"/></w:drawing></w:r></w:p>
    <w:p><w:r><w:t>After the image.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId7" Type="image" Target="media/image1.png"/>
</Relationships>"#;

fn build_docx(parts: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in parts {
        writer.start_file(name.to_string(), SimpleFileOptions::default())?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}

fn source() -> SourceInfo {
    SourceInfo {
        container: "docs".to_string(),
        key: "handbook.docx".to_string(),
        content_type:
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
    }
}

#[tokio::test]
async fn test_extract_injects_image_marker() -> Result<()> {
    // --- Arrange ---
    let archive = build_docx(&[
        ("word/document.xml", DOCUMENT_WITH_IMAGE.as_bytes()),
        ("word/_rels/document.xml.rels", RELATIONSHIPS.as_bytes()),
        ("word/media/image1.png", b"\x89PNG fake image bytes"),
    ])?;

    let objects = Arc::new(MemoryObjectStore::new());
    let links = Arc::new(MemoryLinkStore::new());
    let extractor = DocxExtractor::new(objects.clone(), links.clone(), "media-bucket");

    // --- Act ---
    let units = extractor.extract(&archive, &source()).await?;

    // --- Assert ---
    assert_eq!(units.len(), 1);
    let text = &units[0].text;
    assert!(text.contains("Before the image."));
    assert!(text.contains("After the image."));

    let markers = find_markers(text);
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].tag, MarkerTag::Image);
    assert_eq!(markers[0].id.len(), 5);

    // The marker is backed by an uploaded object and a link record.
    assert_eq!(objects.len(), 1);
    let record = links
        .get(&markers[0].id)
        .await?
        .expect("link record for marker");
    assert!(record.original_link.contains("media-bucket"));
    assert!(record.original_link.ends_with("image1.png"));
    Ok(())
}

#[tokio::test]
async fn test_extract_plain_paragraphs() -> Result<()> {
    let document = r#"<?xml version="1.0"?>
<w:document><w:body>
  <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
  <w:p><w:r><w:t>Second paragraph.</w:t></w:r></w:p>
</w:body></w:document>"#;
    let archive = build_docx(&[("word/document.xml", document.as_bytes())])?;

    let extractor = DocxExtractor::new(
        Arc::new(MemoryObjectStore::new()),
        Arc::new(MemoryLinkStore::new()),
        "media-bucket",
    );
    let units = extractor.extract(&archive, &source()).await?;

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].text, "First paragraph. Second paragraph.");
    Ok(())
}

#[tokio::test]
async fn test_extract_missing_document_part_is_parse_error() -> Result<()> {
    let archive = build_docx(&[("word/other.xml", b"<x/>".as_slice())])?;

    let extractor = DocxExtractor::new(
        Arc::new(MemoryObjectStore::new()),
        Arc::new(MemoryLinkStore::new()),
        "media-bucket",
    );
    let result = extractor.extract(&archive, &source()).await;
    assert!(matches!(result, Err(ExtractError::Parse(_))));
    Ok(())
}

#[tokio::test]
async fn test_extract_unresolvable_image_is_skipped() -> Result<()> {
    // The relationship part is absent, so the image cannot be resolved;
    // the text still comes through without a marker.
    let archive = build_docx(&[("word/document.xml", DOCUMENT_WITH_IMAGE.as_bytes())])?;

    let links = Arc::new(MemoryLinkStore::new());
    let extractor = DocxExtractor::new(
        Arc::new(MemoryObjectStore::new()),
        links.clone(),
        "media-bucket",
    );
    let units = extractor.extract(&archive, &source()).await?;

    assert_eq!(units.len(), 1);
    assert!(find_markers(&units[0].text).is_empty());
    assert!(links.is_empty());
    Ok(())
}
