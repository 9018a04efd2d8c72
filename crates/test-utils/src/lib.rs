use anyhow::Result;
use async_trait::async_trait;
use docrag::errors::EmbeddingError;
use docrag::providers::db::sqlite::SqliteProvider;
use docrag::providers::embedding::Embedder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub provider: SqliteProvider,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database and initializes the
    /// schema.
    pub async fn new() -> Result<Self> {
        let db = turso::Builder::new_local(":memory:").build().await?;
        let provider = SqliteProvider::from_database(db);
        provider.initialize_schema().await?;
        Ok(Self { provider })
    }
}

// --- Stub Embedder ---

/// An [`Embedder`] that derives a tiny deterministic vector from each
/// input, records every call, and can be programmed to throttle.
#[derive(Clone, Default)]
pub struct StubEmbedder {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    throttle_next: Arc<AtomicUsize>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls fail with a throttling error.
    pub fn throttle_next(&self, n: usize) {
        self.throttle_next.store(n, Ordering::SeqCst);
    }

    /// Every input batch the embedder has seen.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Deterministic stand-in for a real embedding: length and a simple byte
/// checksum, normalized.
pub fn fake_embedding(text: &str) -> Vec<f32> {
    let len = text.len() as f32;
    let sum: u32 = text.bytes().map(u32::from).sum();
    vec![len, (sum % 997) as f32, 1.0]
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        "stub-embedding-model"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.lock().unwrap().push(inputs.to_vec());

        let pending = self.throttle_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.throttle_next.store(pending - 1, Ordering::SeqCst);
            return Err(EmbeddingError::Throttled(
                "stub embedder throttled".to_string(),
            ));
        }

        Ok(inputs.iter().map(|text| fake_embedding(text)).collect())
    }
}
