//! # Inline Media Markers
//!
//! Extracted document text represents embedded media as inline markers:
//! `(!?#Image:<id>)`, `(!?#Video:<id>)` and `(!?#Timestamp:<seconds>)`.
//! The delimiters and tag are exact literals; the identifier body tolerates
//! stray whitespace, which extraction services and language models both
//! like to inject.
//!
//! This module is the single scanner shared by the chunker (which must
//! never split a marker across a chunk edge) and reference resolution
//! (which rewrites markers into signed URLs). A marker is atomic: every
//! operation in the pipeline relocates it whole or leaves it alone.

use regex::Regex;
use std::sync::LazyLock;

/// Length of the opaque identifier used by Image and Video markers.
pub const SHORT_ID_LEN: usize = 5;

/// One pass over the text finds every non-overlapping marker span.
/// Group 1 is the tag, group 2 the raw identifier body.
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(!\?#(Image|Video|Timestamp):([A-Za-z0-9.\s]*?)\)")
        .expect("marker pattern is a valid regex")
});

/// The kind of media a marker refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerTag {
    Image,
    Video,
    Timestamp,
}

impl MarkerTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerTag::Image => "Image",
            MarkerTag::Video => "Video",
            MarkerTag::Timestamp => "Timestamp",
        }
    }

    fn from_match(tag: &str) -> Option<Self> {
        match tag {
            "Image" => Some(MarkerTag::Image),
            "Video" => Some(MarkerTag::Video),
            "Timestamp" => Some(MarkerTag::Timestamp),
            _ => None,
        }
    }
}

/// A marker occurrence located within a text.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpan {
    /// Byte offset of the opening `(`.
    pub start: usize,
    /// Byte offset one past the closing `)`.
    pub end: usize,
    pub tag: MarkerTag,
    /// Identifier with all interior whitespace removed.
    pub id: String,
}

/// Locates every marker span in `text` in a single scan, in order of
/// appearance.
pub fn find_markers(text: &str) -> Vec<MarkerSpan> {
    MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let tag = MarkerTag::from_match(caps.get(1)?.as_str())?;
            let id: String = caps
                .get(2)?
                .as_str()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            Some(MarkerSpan {
                start: whole.start(),
                end: whole.end(),
                tag,
                id,
            })
        })
        .collect()
}

/// Renders the canonical marker spelling for a tag and identifier.
pub fn format_marker(tag: MarkerTag, id: &str) -> String {
    format!("(!?#{}:{id})", tag.as_str())
}
