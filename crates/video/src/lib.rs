//! # `docrag-video`: Video Pipeline Invoker
//!
//! Video files are handled by an external multi-stage pipeline (transcribe
//! → format → summarize → timestamp-inject → frame-extract → link-inject →
//! compile). This crate starts the transcription job, polls it to
//! completion under a hard wall-clock timeout, and hands the transcript to
//! the external processor, surfacing its chunk list or a typed failure. It
//! never re-implements transcript chunking itself; the returned chunks
//! already carry Image/Video/Timestamp markers.

use async_trait::async_trait;
use docrag::ingest::{ExtractError, Extractor};
use docrag::types::{SourceInfo, TextUnit};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// How often the transcription job is polled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Hard wall-clock limit for one transcription job.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7200);

/// Custom error types for video extraction.
#[derive(Error, Debug)]
pub enum VideoExtractError {
    #[error("Media container is not configured: {0}")]
    Config(String),
    #[error("Transcription failed: {0}")]
    Transcription(String),
    #[error("Transcription job '{job_name}' timed out after {seconds} seconds")]
    TimedOut { job_name: String, seconds: u64 },
    #[error("Transcript processing failed: {0}")]
    Processing(String),
}

impl From<VideoExtractError> for ExtractError {
    fn from(err: VideoExtractError) -> Self {
        match err {
            VideoExtractError::Config(msg) => ExtractError::Config(msg),
            other => ExtractError::Pipeline(other.to_string()),
        }
    }
}

/// Parameters for one transcription job.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionJob {
    /// Unique job name derived from the video filename.
    pub name: String,
    pub container: String,
    pub key: String,
    /// Where the transcript artifact lands.
    pub output_container: String,
    pub output_prefix: String,
}

/// Lifecycle of an external transcription job.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionState {
    InProgress,
    Completed,
    Failed(String),
}

/// The external transcription service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn start(&self, job: &TranscriptionJob) -> Result<(), VideoExtractError>;

    async fn status(&self, job_name: &str) -> Result<TranscriptionState, VideoExtractError>;

    /// Fetches the finished transcript for a completed job.
    async fn fetch_transcript(&self, job: &TranscriptionJob) -> Result<String, VideoExtractError>;
}

/// The downstream summarize/timestamp/frame/link stages, external to this
/// crate. Returns transcript chunks ready for embedding, markers included.
#[async_trait]
pub trait TranscriptProcessor: Send + Sync {
    async fn process(
        &self,
        transcript: &str,
        source: &SourceInfo,
        media_container: &str,
    ) -> Result<Vec<String>, VideoExtractError>;
}

/// The [`Extractor`] implementation for `video/mp4`.
pub struct VideoExtractor {
    transcriber: Arc<dyn Transcriber>,
    processor: Arc<dyn TranscriptProcessor>,
    media_container: Option<String>,
    poll_interval: Duration,
    timeout: Duration,
}

impl VideoExtractor {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        processor: Arc<dyn TranscriptProcessor>,
        media_container: Option<String>,
    ) -> Self {
        Self {
            transcriber,
            processor,
            media_container,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, source: &SourceInfo) -> Result<Vec<String>, VideoExtractError> {
        let media_container = self.media_container.as_deref().ok_or_else(|| {
            VideoExtractError::Config("MEDIA_BUCKET_NAME is not set".to_string())
        })?;

        let job = build_job(source, media_container);
        info!(
            "Starting transcription job '{}' for s3://{}/{}",
            job.name, source.container, source.key
        );
        self.transcriber.start(&job).await?;

        let transcript = self.wait_for_transcript(&job).await?;
        self.processor
            .process(&transcript, source, media_container)
            .await
    }

    /// Coarse polling under a hard deadline. A timeout is a terminal
    /// failure for this trigger; the pipeline is never silently restarted.
    async fn wait_for_transcript(
        &self,
        job: &TranscriptionJob,
    ) -> Result<String, VideoExtractError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.transcriber.status(&job.name).await? {
                TranscriptionState::Completed => {
                    info!("Transcription job '{}' completed", job.name);
                    return self.transcriber.fetch_transcript(job).await;
                }
                TranscriptionState::Failed(reason) => {
                    return Err(VideoExtractError::Transcription(format!(
                        "Transcription job '{}' failed: {reason}",
                        job.name
                    )));
                }
                TranscriptionState::InProgress => {
                    if Instant::now() >= deadline {
                        return Err(VideoExtractError::TimedOut {
                            job_name: job.name.clone(),
                            seconds: self.timeout.as_secs(),
                        });
                    }
                    debug!("Transcription job '{}' still in progress", job.name);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl Extractor for VideoExtractor {
    /// The raw bytes are not consumed here; the transcription service reads
    /// the video straight from object storage.
    async fn extract(
        &self,
        _raw: &[u8],
        source: &SourceInfo,
    ) -> Result<Vec<TextUnit>, ExtractError> {
        let chunks = self.run(source).await.map_err(ExtractError::from)?;
        if chunks.is_empty() {
            return Err(ExtractError::NoContent);
        }
        info!(
            "Video processing for {} produced {} transcript chunks",
            source.uri(),
            chunks.len()
        );
        Ok(chunks.into_iter().map(TextUnit::from_text).collect())
    }
}

/// Builds the job with a collision-free name: the sanitized filename stem
/// plus a short unique suffix. The transcript lands under a prefix named
/// after the job so it can be located without listing.
fn build_job(source: &SourceInfo, media_container: &str) -> TranscriptionJob {
    let filename = source.key.rsplit('/').next().unwrap_or(source.key.as_str());
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    let safe_stem: String = stem
        .chars()
        .map(|c| if c == ' ' || c == '.' { '_' } else { c })
        .collect();

    let suffix = Uuid::new_v4().simple().to_string();
    let name = format!("{safe_stem}-{}", &suffix[..8]);
    TranscriptionJob {
        output_prefix: format!("transcripts/{name}"),
        name,
        container: source.container.clone(),
        key: source.key.clone(),
        output_container: media_container.to_string(),
    }
}
