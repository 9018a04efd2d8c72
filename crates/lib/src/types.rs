//! Core data types shared across the ingestion pipeline.

use crate::errors::StoreError;

/// One normalized text unit produced by a content-type extractor.
///
/// Most extractors emit a single unit per file; CSV emits one per row and
/// video one per compiled transcript. The optional position metadata is
/// carried through chunking onto the stored [`Chunk`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextUnit {
    pub text: String,
    pub page: Option<u32>,
    pub title: Option<String>,
    pub section_header: Option<String>,
}

impl TextUnit {
    /// A unit carrying text only, no position metadata.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A bounded-length text span plus source metadata, ready for embedding.
///
/// Chunks are never persisted independently of their embedding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source_uri: String,
    pub page: Option<u32>,
    pub title: Option<String>,
    pub section_header: Option<String>,
}

/// Identity of a source object as seen by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub container: String,
    pub key: String,
    pub content_type: String,
}

impl SourceInfo {
    /// The canonical location URI for this object.
    pub fn uri(&self) -> String {
        object_uri(&self.container, &self.key)
    }
}

/// Formats the canonical `s3://container/key` location URI.
pub fn object_uri(container: &str, key: &str) -> String {
    format!("s3://{container}/{key}")
}

/// Splits a location URI back into its container and key.
pub fn parse_object_uri(uri: &str) -> Result<(String, String), StoreError> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| StoreError::Request(format!("Invalid object URI: {uri}")))?;
    let (container, key) = rest
        .split_once('/')
        .ok_or_else(|| StoreError::Request(format!("Object URI has no key component: {uri}")))?;
    Ok((container.to_string(), key.to_string()))
}
