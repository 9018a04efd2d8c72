//! # Reference Resolution Tests
//!
//! Verifies marker substitution against in-memory stores, the fail-open
//! behavior on unknown identifiers, and container/key derivation for the
//! URL shapes that occur in stored links.

use anyhow::Result;
use docrag::links::{LinkRecord, MediaType};
use docrag::providers::db::storage::LinkStore;
use docrag::providers::memory::{MemoryLinkStore, MemoryObjectStore};
use docrag::resolve::{extract_container_and_key, resolve_markers, DEFAULT_URL_VALIDITY};

async fn seed(links: &MemoryLinkStore, objects: &MemoryObjectStore, id: &str, key: &str) {
    objects.insert_object("media-bucket", key, b"media bytes", "image/png");
    links
        .insert(&LinkRecord {
            id: id.to_string(),
            original_link: format!("https://media-bucket.s3.amazonaws.com/{key}"),
            media_type: MediaType::Image,
            created_at: 1_700_000_000,
        })
        .await
        .expect("seed link");
}

#[tokio::test]
async fn test_known_marker_is_replaced_with_signed_url() -> Result<()> {
    let links = MemoryLinkStore::new();
    let objects = MemoryObjectStore::new();
    seed(&links, &objects, "ab3Xz", "fig1.png").await;

    let text = "See the figure (!?#Image:ab3Xz) for details.";
    let resolved = resolve_markers(text, &links, &objects, DEFAULT_URL_VALIDITY).await;

    assert!(resolved.starts_with("See the figure (!?#Image:"));
    assert!(resolved.contains("memory://media-bucket/fig1.png"));
    assert!(resolved.contains("expires=3600"));
    assert!(resolved.ends_with(") for details."));
    Ok(())
}

#[tokio::test]
async fn test_unknown_marker_fails_open() -> Result<()> {
    let links = MemoryLinkStore::new();
    let objects = MemoryObjectStore::new();

    let text = "Broken (!?#Image:zzzzz) reference.";
    let resolved = resolve_markers(text, &links, &objects, DEFAULT_URL_VALIDITY).await;

    assert_eq!(resolved, text, "unresolvable markers stay literal");
    Ok(())
}

#[tokio::test]
async fn test_mixed_markers_resolve_independently() -> Result<()> {
    let links = MemoryLinkStore::new();
    let objects = MemoryObjectStore::new();
    seed(&links, &objects, "goodI", "a.png").await;

    let text = "(!?#Image:goodI) and (!?#Video:missn) and (!?#Image:goodI)";
    let resolved = resolve_markers(text, &links, &objects, DEFAULT_URL_VALIDITY).await;

    assert_eq!(resolved.matches("memory://media-bucket/a.png").count(), 2);
    assert!(resolved.contains("(!?#Video:missn)"), "unknown id left as-is");
    Ok(())
}

#[tokio::test]
async fn test_timestamp_markers_are_left_alone() -> Result<()> {
    let links = MemoryLinkStore::new();
    let objects = MemoryObjectStore::new();

    let text = "Jump to (!?#Timestamp:127.5) in the recording.";
    let resolved = resolve_markers(text, &links, &objects, DEFAULT_URL_VALIDITY).await;
    assert_eq!(resolved, text);
    Ok(())
}

#[tokio::test]
async fn test_whitespace_damaged_identifier_still_resolves() -> Result<()> {
    // Model output sometimes injects spaces inside the identifier; the
    // cleaned id must still hit the link store.
    let links = MemoryLinkStore::new();
    let objects = MemoryObjectStore::new();
    seed(&links, &objects, "ab3Xz", "fig2.png").await;

    let resolved =
        resolve_markers("(!?#Image: ab 3Xz )", &links, &objects, DEFAULT_URL_VALIDITY).await;
    assert!(resolved.contains("memory://media-bucket/fig2.png"));
    Ok(())
}

// --- URL shape handling ---

#[test]
fn test_extract_from_virtual_hosted_url() {
    let (container, key) =
        extract_container_and_key("https://media-bucket.s3.amazonaws.com/frames/shot%201.png")
            .expect("parse");
    assert_eq!(container, "media-bucket");
    assert_eq!(key, "frames/shot 1.png");
}

#[test]
fn test_extract_from_regioned_virtual_hosted_url() {
    let (container, key) =
        extract_container_and_key("https://media-bucket.s3.eu-west-1.amazonaws.com/fig.png")
            .expect("parse");
    assert_eq!(container, "media-bucket");
    assert_eq!(key, "fig.png");
}

#[test]
fn test_extract_from_path_style_url() {
    let (container, key) =
        extract_container_and_key("https://s3.amazonaws.com/media-bucket/fig.png").expect("parse");
    assert_eq!(container, "media-bucket");
    assert_eq!(key, "fig.png");
}

#[test]
fn test_extract_from_bare_uri() {
    let (container, key) = extract_container_and_key("s3://media-bucket/fig.png").expect("parse");
    assert_eq!(container, "media-bucket");
    assert_eq!(key, "fig.png");
}
