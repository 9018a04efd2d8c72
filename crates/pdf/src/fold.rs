//! Folds layout blocks into section chunks.
//!
//! The page/block tree is flattened into a stream of tagged line events and
//! folded with a small explicit accumulator. A chunk flushes when a new
//! title or section header begins, when plain text overflows the word
//! budget (carrying a word overlap into the next chunk), or when a list
//! grows past the budget mid-way.

use crate::layout::{DocumentLayout, LayoutBlock};
use regex::Regex;
use std::sync::LazyLock;

/// Word budget for one section chunk.
pub const MAX_SECTION_WORDS: usize = 800;
/// Words carried from an overflowing chunk into its successor.
const OVERLAP_WORDS: usize = 50;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is a valid regex"));

pub(crate) fn count_words(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

/// A chunk of lines under one title/section with position metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionChunk {
    pub lines: Vec<String>,
    pub page: Option<u32>,
    pub title: Option<String>,
    pub section_header: Option<String>,
}

/// Flat event stream derived from the layout tree.
enum LineEvent<'a> {
    Page(u32),
    Title(&'a str),
    Header(&'a str),
    Text(&'a str),
    List(&'a [String]),
    Table(&'a str),
}

fn events(doc: &DocumentLayout) -> Vec<LineEvent<'_>> {
    let mut out = Vec::new();
    for page in &doc.pages {
        out.push(LineEvent::Page(page.number));
        for block in &page.blocks {
            match block {
                LayoutBlock::Title { text } => out.push(LineEvent::Title(text)),
                LayoutBlock::SectionHeader { text } => out.push(LineEvent::Header(text)),
                LayoutBlock::Text { text } => {
                    // Each physical line is an independent event.
                    out.extend(
                        text.lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty())
                            .map(LineEvent::Text),
                    );
                }
                LayoutBlock::List { items } => out.push(LineEvent::List(items)),
                LayoutBlock::Table { image_base64 } => out.push(LineEvent::Table(image_base64)),
            }
        }
    }
    out
}

#[derive(Default)]
struct FoldAcc {
    out: Vec<SectionChunk>,
    lines: Vec<String>,
    words: usize,
    page: Option<u32>,
    title: Option<String>,
    header: Option<String>,
}

impl FoldAcc {
    fn flush(&mut self) {
        if self.lines.iter().any(|l| !l.trim().is_empty()) {
            self.out.push(SectionChunk {
                lines: std::mem::take(&mut self.lines),
                page: self.page,
                title: self.title.clone(),
                section_header: self.header.clone(),
            });
        } else {
            self.lines.clear();
        }
        self.words = 0;
    }

    fn push_text(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let line_words = count_words(line);
        if self.words + line_words > MAX_SECTION_WORDS && !self.lines.is_empty() {
            // Harvest the tail of the overflowing chunk and seed the next
            // one with it, so context survives the cut.
            let flat = self.lines.join(" ");
            let all_words: Vec<&str> = WORD_RE.find_iter(&flat).map(|m| m.as_str()).collect();
            let start = all_words.len().saturating_sub(OVERLAP_WORDS);
            let overlap_text = all_words[start..].join(" ");

            self.lines.push(overlap_text.clone());
            self.flush();
            if !overlap_text.is_empty() {
                self.words = count_words(&overlap_text);
                self.lines.push(overlap_text);
            }
        }

        self.lines.push(line.to_string());
        self.words += line_words;
    }

    fn push_table(&mut self, base64: &str) {
        // The line preceding a table is usually its caption; embed it with
        // the rendered table so the pairing survives chunking.
        let header = self
            .lines
            .last()
            .filter(|l| !l.starts_with("<table>"))
            .cloned()
            .unwrap_or_default();
        self.lines
            .push(format!("<table>{header}<base64>{base64}</base64></table>"));
        self.words = 0;
    }

    fn push_list(&mut self, items: &[String]) {
        let header = self
            .lines
            .last()
            .filter(|l| !l.starts_with("<table>"))
            .cloned()
            .unwrap_or_default();

        let mut pending: Vec<&str> = Vec::new();
        let mut running = self.words;
        for item in items {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            pending.push(item);
            running += count_words(item);
            if running >= MAX_SECTION_WORDS {
                self.append_list_portion(&header, &pending.join("\n"));
                self.flush();
                pending.clear();
                running = 0;
            }
        }
        if !pending.is_empty() {
            self.append_list_portion(&header, &pending.join("\n"));
            self.words = running;
        }
    }

    fn append_list_portion(&mut self, header: &str, list_chunk: &str) {
        let header = header.trim();
        if !header.is_empty() {
            // Avoid duplicating the caption when it is already the
            // trailing line.
            if self
                .lines
                .last()
                .map(|l| l.trim().eq_ignore_ascii_case(header))
                == Some(true)
            {
                self.lines.pop();
            }
            let header_line = if header.ends_with(':') {
                header.to_string()
            } else {
                format!("{header}:")
            };
            self.lines.push(header_line);
        }
        self.lines.push(list_chunk.to_string());
    }
}

/// Folds a document layout into section chunks.
pub fn fold_layout(doc: &DocumentLayout) -> Vec<SectionChunk> {
    let mut acc = FoldAcc::default();
    for event in events(doc) {
        match event {
            LineEvent::Page(number) => acc.page = Some(number),
            LineEvent::Title(text) => {
                acc.flush();
                acc.title = Some(text.trim().to_string());
                acc.header = None;
                acc.push_text(text);
            }
            LineEvent::Header(text) => {
                acc.flush();
                acc.header = Some(text.trim().to_string());
                acc.push_text(text);
            }
            LineEvent::Text(text) => acc.push_text(text),
            LineEvent::List(items) => acc.push_list(items),
            LineEvent::Table(base64) => acc.push_table(base64),
        }
    }
    acc.flush();
    acc.out
}
