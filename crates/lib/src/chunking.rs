//! # Boundary-Preserving Chunking
//!
//! Splits extracted document text into bounded-size chunks for embedding.
//! Large documents go through two passes: a coarse, marker-oblivious length
//! split into mid-size pieces, then a fine pass over each piece that
//! respects inline media markers so no marker is ever cut across a chunk
//! edge. Sizes are measured in characters.

use crate::markers::find_markers;
use crate::types::{Chunk, TextUnit};

/// Chunk sizing for both passes.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Total extracted length above which the coarse pass kicks in.
    pub coarse_threshold: usize,
    /// Piece size for the coarse, marker-oblivious split.
    pub coarse_chunk_size: usize,
    /// Overlap between coarse pieces.
    pub coarse_overlap: usize,
    /// Target size for embedding-ready chunks.
    pub chunk_size: usize,
    /// Overlap between consecutive embedding-ready chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            coarse_threshold: 25_000,
            coarse_chunk_size: 10_000,
            coarse_overlap: 1_000,
            chunk_size: 2_000,
            overlap: 300,
        }
    }
}

/// Byte offset of every char boundary in `text`, with a trailing sentinel
/// equal to `text.len()`. Lets the chunkers measure and cut in characters
/// while the marker scanner reports byte offsets.
fn char_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    boundaries
}

/// Maps a byte offset (always on a char boundary) to its char index.
fn to_char_index(boundaries: &[usize], byte: usize) -> usize {
    boundaries.partition_point(|&b| b < byte)
}

/// Splits `text` into chunks of roughly `chunk_size` characters without
/// ever cutting through a marker span.
///
/// Guarantees:
/// - Empty input yields zero chunks; input of at most `chunk_size`
///   characters yields exactly one chunk equal to the whole input.
/// - If the natural cut point falls strictly inside a marker, the chunk is
///   extended forward to the end of that marker.
/// - Consecutive chunks overlap by roughly `overlap` characters, except
///   when the resumption point would land inside a marker, in which case
///   the next chunk starts at the end of that marker instead.
/// - Every chunk after the first starts strictly after the previous chunk's
///   start, so the sequence is finite for any finite input.
pub fn chunk_preserving_markers(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let boundaries = char_boundaries(text);
    let char_len = boundaries.len() - 1;
    if char_len <= chunk_size {
        return vec![text.to_string()];
    }

    // Marker spans converted to character coordinates.
    let spans: Vec<(usize, usize)> = find_markers(text)
        .iter()
        .map(|s| {
            (
                to_char_index(&boundaries, s.start),
                to_char_index(&boundaries, s.end),
            )
        })
        .collect();

    let slice = |from: usize, to: usize| text[boundaries[from]..boundaries[to]].to_string();

    let mut chunks = Vec::new();
    let mut pos = 0usize;
    loop {
        let end = usize::min(pos + chunk_size, char_len);

        // Extend the cut to the end of any marker it would split.
        let mut cut = end;
        for &(start, stop) in &spans {
            if start < end && end < stop {
                cut = stop;
                break;
            }
        }
        chunks.push(slice(pos, cut));
        if cut >= char_len {
            break;
        }

        // Resume with overlap, but never inside a marker and always with
        // forward progress.
        let mut next = cut.saturating_sub(overlap);
        if next <= pos {
            next = pos + chunk_size;
        }
        for &(start, stop) in &spans {
            if start < next && next < stop {
                next = stop;
                break;
            }
        }
        if next <= pos {
            next = cut;
        }
        if next >= char_len {
            break;
        }
        pos = next;
    }

    chunks
}

/// Plain length-based splitter used as the coarse first pass. Marker
/// placement is ignored here; the fine pass restores marker safety.
pub fn split_with_overlap(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let boundaries = char_boundaries(text);
    let char_len = boundaries.len() - 1;

    let mut pieces = Vec::new();
    let mut start = 0usize;
    while start < char_len {
        let end = usize::min(start + chunk_size, char_len);
        pieces.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_len {
            break;
        }

        // Move the start for the next piece, considering the overlap.
        let next_start = start + chunk_size - usize::min(overlap, chunk_size - 1);
        if next_start <= start {
            break;
        }
        start = next_start;
    }

    pieces
}

/// Applies the two-pass strategy to a document's extracted units.
///
/// Small documents pass through one chunk per unit; documents whose total
/// extracted length exceeds the coarse threshold are first split into
/// mid-size pieces and then re-chunked marker-safely to the fine target.
pub fn chunk_units(units: &[TextUnit], source_uri: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
    let total: usize = units.iter().map(|u| u.text.chars().count()).sum();

    let make_chunk = |text: String, unit: &TextUnit| Chunk {
        text,
        source_uri: source_uri.to_string(),
        page: unit.page,
        title: unit.title.clone(),
        section_header: unit.section_header.clone(),
    };

    let mut chunks = Vec::new();
    if total > cfg.coarse_threshold {
        for unit in units {
            for piece in split_with_overlap(&unit.text, cfg.coarse_chunk_size, cfg.coarse_overlap) {
                for text in chunk_preserving_markers(&piece, cfg.chunk_size, cfg.overlap) {
                    chunks.push(make_chunk(text, unit));
                }
            }
        }
    } else {
        for unit in units {
            if !unit.text.trim().is_empty() {
                chunks.push(make_chunk(unit.text.clone(), unit));
            }
        }
    }
    chunks
}
