//! # `docrag-docx`: DOCX Extractor
//!
//! Walks `word/document.xml` in document order, collecting paragraph text
//! and replacing embedded images with inline Image markers. Each image blob
//! is uploaded to the media container and registered as a link record, so
//! the marker can be resolved back to a signed URL at answer time.

use async_trait::async_trait;
use chrono::Utc;
use docrag::ingest::{ExtractError, Extractor};
use docrag::links::{register_link, MediaType};
use docrag::markers::{format_marker, MarkerTag};
use docrag::providers::db::storage::LinkStore;
use docrag::providers::object_store::ObjectStore;
use docrag::types::{object_uri, SourceInfo, TextUnit};
use quick_xml::events::Event;
use quick_xml::Reader;
use rand::Rng;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Custom error types for DOCX extraction.
#[derive(Error, Debug)]
pub enum DocxExtractError {
    #[error("Source is not a valid DOCX archive: {0}")]
    Archive(String),
    #[error("Archive part '{0}' is missing")]
    MissingPart(String),
    #[error("Malformed document XML: {0}")]
    Xml(String),
}

impl From<DocxExtractError> for ExtractError {
    fn from(err: DocxExtractError) -> Self {
        ExtractError::Parse(err.to_string())
    }
}

/// One piece of document content in reading order.
#[derive(Debug, Clone, PartialEq)]
enum DocxPiece {
    Text(String),
    /// An embedded image, referenced by its relationship identifier.
    Image { rel_id: String },
}

/// The [`Extractor`] implementation for DOCX documents.
pub struct DocxExtractor {
    objects: Arc<dyn ObjectStore>,
    links: Arc<dyn LinkStore>,
    media_container: String,
}

impl DocxExtractor {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        links: Arc<dyn LinkStore>,
        media_container: &str,
    ) -> Self {
        Self {
            objects,
            links,
            media_container: media_container.to_string(),
        }
    }

    /// Uploads one image blob to the media container and registers a link
    /// record for it, returning the short marker identifier.
    async fn store_image(&self, filename: &str, blob: Vec<u8>) -> Result<String, ExtractError> {
        let key = format!(
            "{}_{}_{filename}",
            Utc::now().timestamp_millis(),
            rand::thread_rng().gen_range(1..100_000_000u64),
        );
        self.objects
            .put(
                &self.media_container,
                &key,
                blob,
                image_content_type(filename),
            )
            .await?;

        let url = format!("https://{}.s3.amazonaws.com/{key}", self.media_container);
        let id = register_link(self.links.as_ref(), &url, MediaType::Image).await?;
        debug!("Registered image link '{id}' -> {url}");
        Ok(id)
    }
}

#[async_trait]
impl Extractor for DocxExtractor {
    async fn extract(
        &self,
        raw: &[u8],
        source: &SourceInfo,
    ) -> Result<Vec<TextUnit>, ExtractError> {
        let mut archive = ZipArchive::new(Cursor::new(raw))
            .map_err(|e| DocxExtractError::Archive(e.to_string()))
            .map_err(ExtractError::from)?;

        let document_xml = read_part(&mut archive, "word/document.xml").map_err(ExtractError::from)?;
        let relationships = match read_part(&mut archive, "word/_rels/document.xml.rels") {
            Ok(bytes) => parse_relationships(&bytes).map_err(ExtractError::from)?,
            // A document with no relationship part cannot reference images.
            Err(DocxExtractError::MissingPart(_)) => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        let pieces = parse_document_xml(&document_xml).map_err(ExtractError::from)?;

        let mut rendered: Vec<String> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                DocxPiece::Text(text) => rendered.push(text),
                DocxPiece::Image { rel_id } => {
                    let Some(target) = relationships.get(&rel_id) else {
                        warn!("Image relationship '{rel_id}' not found in {}", source.uri());
                        continue;
                    };
                    let part_name = format!("word/{}", target.trim_start_matches('/'));
                    let blob = match read_part(&mut archive, &part_name) {
                        Ok(blob) => blob,
                        Err(e) => {
                            warn!("Failed to read embedded image {part_name}: {e}");
                            continue;
                        }
                    };
                    let filename = target.rsplit('/').next().unwrap_or(target.as_str());
                    match self.store_image(filename, blob).await {
                        Ok(id) => rendered
                            .push(format!("\n{}\n", format_marker(MarkerTag::Image, &id))),
                        Err(e) => warn!("Failed to upload embedded image {filename}: {e}"),
                    }
                }
            }
        }

        let text = rendered.join(" ");
        if text.trim().is_empty() {
            debug!(
                "No paragraph text in {}",
                object_uri(&source.container, &source.key)
            );
            return Ok(Vec::new());
        }
        Ok(vec![TextUnit::from_text(text)])
    }
}

/// Reads one file out of the archive into memory.
fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, DocxExtractError> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| DocxExtractError::MissingPart(name.to_string()))?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| DocxExtractError::Archive(e.to_string()))?;
    Ok(bytes)
}

/// Parses the relationship part into an Id → Target map.
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, DocxExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| DocxExtractError::Xml(e.to_string()))?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                        b"Target" => {
                            target = Some(String::from_utf8_lossy(&attr.value).into_owned())
                        }
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocxExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(map)
}

/// Streams `word/document.xml`, emitting text runs and image references in
/// reading order.
fn parse_document_xml(xml: &[u8]) -> Result<Vec<DocxPiece>, DocxExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut pieces = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                match e.name().as_ref() {
                    b"w:t" => in_text_run = true,
                    b"a:blip" => {
                        if let Some(rel_id) = embed_attribute(&e)? {
                            pieces.push(DocxPiece::Image { rel_id });
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"a:blip" {
                    if let Some(rel_id) = embed_attribute(&e)? {
                        pieces.push(DocxPiece::Image { rel_id });
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text_run = false;
                }
            }
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| DocxExtractError::Xml(e.to_string()))?;
                if !text.is_empty() {
                    pieces.push(DocxPiece::Text(text.into_owned()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocxExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(pieces)
}

fn embed_attribute(
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<Option<String>, DocxExtractError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| DocxExtractError::Xml(e.to_string()))?;
        if attr.key.as_ref() == b"r:embed" {
            return Ok(Some(String::from_utf8_lossy(&attr.value).into_owned()));
        }
    }
    Ok(None)
}

fn image_content_type(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(str::to_ascii_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
