//! # Media Link Records
//!
//! Image and Video markers carry a short opaque identifier instead of a raw
//! storage URL. The identifier is a foreign key into a persisted link
//! record mapping it to the original object location and media kind.
//! Records are write-once: created when an asset is extracted, read by
//! reference resolution, never mutated.

use crate::errors::StoreError;
use crate::markers::SHORT_ID_LEN;
use crate::providers::db::storage::LinkStore;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound on identifier allocation attempts. The keyspace (62^5) is
/// large enough that hitting this with a healthy store means something else
/// is wrong.
const MAX_ID_ATTEMPTS: usize = 100;

/// What kind of media an identifier points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    VideoFrame,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::VideoFrame => "video_frame",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            "video_frame" => Some(MediaType::VideoFrame),
            _ => None,
        }
    }
}

/// Persisted mapping from a short identifier to the stored media object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    #[serde(rename = "uuid")]
    pub id: String,
    pub original_link: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub created_at: i64,
}

/// Generates one candidate identifier: `SHORT_ID_LEN` random alphanumerics.
pub fn generate_short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}

/// Allocates a unique short identifier and persists the link record.
///
/// Two concurrent allocations can race for the same candidate, so the loop
/// checks the store before inserting and draws a fresh candidate on a
/// collision. Gives up after [`MAX_ID_ATTEMPTS`].
pub async fn register_link(
    store: &dyn LinkStore,
    original_link: &str,
    media_type: MediaType,
) -> Result<String, StoreError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = generate_short_id();
        if store.get(&candidate).await?.is_some() {
            warn!("Link identifier collision on '{candidate}', drawing a new one");
            continue;
        }

        let record = LinkRecord {
            id: candidate.clone(),
            original_link: original_link.to_string(),
            media_type,
            created_at: Utc::now().timestamp(),
        };
        store.insert(&record).await?;
        return Ok(candidate);
    }

    Err(StoreError::Internal(anyhow::anyhow!(
        "failed to allocate a unique link identifier after {MAX_ID_ATTEMPTS} attempts"
    )))
}
