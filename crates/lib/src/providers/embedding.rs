//! # Embeddings Provider
//!
//! Generates vector embeddings by calling an external, OpenAI-compatible
//! embeddings API. Throttling responses are retried with exponential
//! backoff up to a bounded attempt count; every other failure propagates
//! immediately.

use crate::errors::EmbeddingError;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum attempts for a throttled embedding call.
pub const MAX_EMBED_ATTEMPTS: u32 = 5;
/// Delay before the first retry; doubles on each subsequent one.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Every embedding request carries a finite timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// A client that can turn text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// An identifier recorded with the stored vectors, so re-embedding with
    /// a different model is detectable.
    fn model_id(&self) -> &str;

    /// Embeds each input; the output is parallel to `inputs`.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize, Debug)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// [`Embedder`] backed by an OpenAI-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(api_url: &str, model: &str, api_key: Option<&str>) -> Result<Self, EmbeddingError> {
        let client = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(EmbeddingError::Request)?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            model: model.to_string(),
            api_key: api_key.map(String::from),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        debug!(
            "Requesting {} embeddings from {}",
            inputs.len(),
            self.api_url
        );

        let mut request_builder = self.client.post(&self.api_url).json(&request_body);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .send()
            .await
            .map_err(EmbeddingError::Request)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Throttled(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(body));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(EmbeddingError::Deserialization)?;

        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::Api(format!(
                "embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Calls `embedder`, retrying throttling-class failures with exponential
/// backoff. Non-throttling errors propagate on the first occurrence.
pub async fn embed_with_backoff(
    embedder: &dyn Embedder,
    inputs: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match embedder.embed(inputs).await {
            Err(EmbeddingError::Throttled(msg)) if attempt < MAX_EMBED_ATTEMPTS => {
                warn!(
                    "Embeddings API throttled (attempt {attempt}/{MAX_EMBED_ATTEMPTS}): \
                     {msg}; retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}
