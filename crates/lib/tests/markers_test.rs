//! # Marker Scanner Tests
//!
//! The scanner is the shared primitive under both chunking and reference
//! resolution, so its tolerance rules get pinned down here: exact
//! delimiters and tags, whitespace-tolerant identifier bodies.

use docrag::markers::{find_markers, format_marker, MarkerTag};

#[test]
fn test_find_single_image_marker() {
    let text = "Intro (!?#Image:ab3Xz) outro";
    let spans = find_markers(text);

    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.tag, MarkerTag::Image);
    assert_eq!(span.id, "ab3Xz");
    assert_eq!(&text[span.start..span.end], "(!?#Image:ab3Xz)");
}

#[test]
fn test_find_all_tags_in_one_pass() {
    let text = "(!?#Image:aaaaa) middle (!?#Video:bbbbb) end (!?#Timestamp:93.5)";
    let spans = find_markers(text);

    assert_eq!(spans.len(), 3);
    assert_eq!(spans[0].tag, MarkerTag::Image);
    assert_eq!(spans[1].tag, MarkerTag::Video);
    assert_eq!(spans[2].tag, MarkerTag::Timestamp);
    assert_eq!(spans[2].id, "93.5");

    // Spans are reported in order and never overlap.
    assert!(spans[0].end <= spans[1].start);
    assert!(spans[1].end <= spans[2].start);
}

#[test]
fn test_identifier_whitespace_is_stripped() {
    // Extraction and model output both inject stray spaces inside ids.
    let spans = find_markers("see (!?#Image: a b3 Xz )");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].id, "ab3Xz");
}

#[test]
fn test_delimiters_are_exact() {
    // A space inside the prefix or tag breaks the marker.
    assert!(find_markers("( !?#Image:ab3Xz)").is_empty());
    assert!(find_markers("(!?# Image x:ab3Xz)").is_empty());
    assert!(find_markers("(!?#image:ab3Xz)").is_empty());
    assert!(find_markers("(!?#Imagex:ab3Xz)").is_empty());
}

#[test]
fn test_unterminated_marker_is_not_matched() {
    assert!(find_markers("broken (!?#Image:ab3Xz").is_empty());
}

#[test]
fn test_format_round_trips_through_scan() {
    let rendered = format_marker(MarkerTag::Video, "Zz9qQ");
    assert_eq!(rendered, "(!?#Video:Zz9qQ)");

    let spans = find_markers(&rendered);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].tag, MarkerTag::Video);
    assert_eq!(spans[0].id, "Zz9qQ");
    assert_eq!(spans[0].start, 0);
    assert_eq!(spans[0].end, rendered.len());
}
