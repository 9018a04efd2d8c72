//! Cleaning and quality filtering of folded section chunks.
//!
//! Layout extraction over real-world PDFs produces a lot of debris:
//! navigation boilerplate, stray page furniture, OCR noise. The filters
//! here drop whole chunks that carry no prose and strip the markup the
//! fold stage embedded, leaving plain text worth embedding.

use crate::fold::{count_words, SectionChunk};
use regex::Regex;
use std::sync::LazyLock;

/// Minimum words a chunk must carry to survive filtering.
pub const MIN_TOTAL_WORDS: usize = 100;
const MIN_SENTENCES: usize = 2;
const MIN_AVG_SENTENCE_WORDS: f32 = 8.0;

/// Boilerplate lines that never carry content.
const JUNK_PHRASES: [&str; 6] = [
    "top of this section",
    "section header",
    "footer",
    "page x",
    "click here",
    "back to top",
];

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is a valid regex"));

fn clean_line(line: &str) -> String {
    TAG_RE.replace_all(line, "").trim().to_string()
}

fn is_junk_chunk(lines: &[String]) -> bool {
    lines.iter().all(|line| {
        let cleaned = clean_line(line).to_lowercase();
        cleaned.is_empty() || JUNK_PHRASES.contains(&cleaned.as_str())
    })
}

fn is_sentence(line: &str) -> bool {
    (line.ends_with('.') || line.ends_with('?') || line.ends_with('!'))
        && line.split_whitespace().count() >= 5
}

/// A line is gibberish when too few of its tokens look like words: bearing
/// a vowel and longer than two characters.
fn is_gibberish(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let real_words = tokens
        .iter()
        .filter(|t| t.len() > 2 && t.chars().any(|c| "aeiouAEIOU".contains(c)))
        .count();
    (real_words as f32) < f32::max(3.0, tokens.len() as f32 * 0.4)
}

/// Cleans and filters section chunks, emitting one text blob per title
/// group in document order. Chunks that are pure boilerplate, too short,
/// too sentence-poor, or mostly gibberish are dropped.
pub fn filter_chunks(chunks: &[SectionChunk], min_total_words: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current_title: Option<&Option<String>> = None;
    let mut valid_lines: Vec<String> = Vec::new();

    let flush = |valid_lines: &mut Vec<String>, out: &mut Vec<String>| {
        if !valid_lines.is_empty() {
            out.push(valid_lines.join("\n\n").trim().to_string());
            valid_lines.clear();
        }
    };

    for chunk in chunks {
        if current_title.is_some_and(|title| title != &chunk.title) {
            flush(&mut valid_lines, &mut out);
        }
        current_title = Some(&chunk.title);

        if is_junk_chunk(&chunk.lines) {
            continue;
        }

        let mut cleaned: Vec<String> = chunk
            .lines
            .iter()
            .map(|l| clean_line(l))
            .filter(|l| !l.is_empty())
            .collect();
        cleaned.retain(|l| !is_gibberish(l));
        if cleaned.is_empty() {
            continue;
        }

        let total_words: usize = cleaned.iter().map(|l| l.split_whitespace().count()).sum();
        let sentence_count = cleaned.iter().filter(|l| is_sentence(l)).count();
        let avg_sentence_words = total_words as f32 / usize::max(sentence_count, 1) as f32;

        if total_words < min_total_words
            || sentence_count < MIN_SENTENCES
            || avg_sentence_words < MIN_AVG_SENTENCE_WORDS
        {
            continue;
        }

        valid_lines.extend(cleaned);
    }
    flush(&mut valid_lines, &mut out);
    out
}

static MULTI_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("newline pattern is a valid regex"));
static SPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("space pattern is a valid regex"));

/// Raw-text linearization of the layout, used as the fallback when
/// filtering removes everything. No quality gates beyond whitespace
/// normalization; rendered tables contribute nothing since they carry no
/// text form.
pub fn linearize_raw_text(doc: &crate::layout::DocumentLayout) -> String {
    use crate::layout::LayoutBlock;

    let mut pages: Vec<String> = Vec::new();
    for page in &doc.pages {
        let mut parts: Vec<String> = Vec::new();
        for block in &page.blocks {
            match block {
                LayoutBlock::Title { text }
                | LayoutBlock::SectionHeader { text }
                | LayoutBlock::Text { text } => {
                    let text = text.trim();
                    if !text.is_empty() {
                        parts.push(text.to_string());
                    }
                }
                LayoutBlock::List { items } => {
                    parts.extend(
                        items
                            .iter()
                            .map(|i| i.trim().to_string())
                            .filter(|i| !i.is_empty()),
                    );
                }
                LayoutBlock::Table { .. } => {}
            }
        }
        let page_text = parts.join("\n");
        if !page_text.trim().is_empty() {
            pages.push(page_text.trim().to_string());
        }
    }

    let raw = pages.join("\n\n");
    let raw = TAG_RE.replace_all(&raw, "");
    let raw = MULTI_NEWLINE_RE.replace_all(&raw, "\n\n");
    let raw = SPACE_RUN_RE.replace_all(&raw, " ");
    raw.trim().to_string()
}

/// Word count helper shared with the extractor's fallback gate.
pub fn fallback_word_count(text: &str) -> usize {
    count_words(text)
}
