//! # Reference Resolution
//!
//! Generated answer text may still contain Image and Video markers. At
//! serving time each one is looked up in the link store and replaced with a
//! time-limited signed URL to the underlying object. Resolution fails open:
//! an unknown identifier or a failed lookup leaves the original marker text
//! in place, since the text is user-facing and a dead marker is less
//! harmful than an opaque error. Timestamp markers are never rewritten.

use crate::markers::{find_markers, format_marker, MarkerSpan, MarkerTag};
use crate::providers::db::storage::LinkStore;
use crate::providers::object_store::ObjectStore;
use std::time::Duration;
use tracing::{debug, error};

/// Default validity window for signed URLs.
pub const DEFAULT_URL_VALIDITY: Duration = Duration::from_secs(3600);

/// Rewrites every resolvable Image/Video marker in `text` into a signed
/// URL, leaving unresolvable markers untouched.
pub async fn resolve_markers(
    text: &str,
    links: &dyn LinkStore,
    objects: &dyn ObjectStore,
    validity: Duration,
) -> String {
    let spans = find_markers(text);
    if spans.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for span in &spans {
        if span.tag == MarkerTag::Timestamp {
            continue;
        }
        out.push_str(&text[cursor..span.start]);
        match resolve_one(span, links, objects, validity).await {
            Some(url) => out.push_str(&format_marker(span.tag, &url)),
            None => out.push_str(&text[span.start..span.end]),
        }
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

async fn resolve_one(
    span: &MarkerSpan,
    links: &dyn LinkStore,
    objects: &dyn ObjectStore,
    validity: Duration,
) -> Option<String> {
    debug!("Resolving {} marker '{}'", span.tag.as_str(), span.id);

    let record = match links.get(&span.id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            error!("No link record for marker identifier '{}'", span.id);
            return None;
        }
        Err(e) => {
            error!("Link lookup failed for '{}': {e}", span.id);
            return None;
        }
    };

    let Some((container, key)) = extract_container_and_key(&record.original_link) else {
        error!(
            "Could not derive container/key from stored link: {}",
            record.original_link
        );
        return None;
    };

    match objects.sign_get_url(&container, &key, validity).await {
        Ok(url) => Some(url),
        Err(e) => {
            error!("Failed to sign URL for {}: {e}", record.original_link);
            None
        }
    }
}

/// Derives `(container, key)` from a stored original link.
///
/// Accepts virtual-hosted-style URLs (`https://bucket.s3.amazonaws.com/key`,
/// including regioned hosts), path-style URLs
/// (`https://s3.amazonaws.com/bucket/key`), and bare `s3://bucket/key` URIs.
pub fn extract_container_and_key(link: &str) -> Option<(String, String)> {
    if let Some(rest) = link.strip_prefix("s3://") {
        let (container, key) = rest.split_once('/')?;
        return Some((container.to_string(), key.to_string()));
    }

    let rest = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))?;
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));

    if host.ends_with("amazonaws.com") && !host.starts_with("s3.") && host != "s3.amazonaws.com" {
        // Virtual-hosted style: the bucket is everything before ".s3".
        let (container, _) = host.split_once(".s3")?;
        return Some((container.to_string(), percent_decode(path)));
    }

    // Path style: the first path segment is the bucket.
    match path.split_once('/') {
        Some((container, key)) => Some((container.to_string(), percent_decode(key))),
        None => Some((path.to_string(), String::new())),
    }
}

/// Minimal percent-decoding for object keys embedded in URLs.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_val),
                bytes.get(i + 2).copied().and_then(hex_val),
            ) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
