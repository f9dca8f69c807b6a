//! Speech-to-text.
//!
//! Remote providers run as jobs that move `queued -> processing ->
//! completed | error` and are polled until they settle. The
//! [`TranscriptionService`] tries an ordered list of backends and falls
//! through to the next one whenever a backend fails.

mod assemblyai;
mod correction;
mod local;
mod openai;
mod polling;
mod service;

pub use assemblyai::AssemblyAIProvider;
pub use correction::TranscriptCorrector;
pub use local::LocalWhisper;
pub use openai::OpenAIWhisperTranscriber;
pub use polling::PollingTranscriber;
pub use service::{AcceptFn, TranscriptionBackend, TranscriptionService};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Status of a remote transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Whether the job will not change any more.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Snapshot of a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionJob {
    pub id: String,
    pub status: JobStatus,
    /// Transcript, present once completed.
    #[serde(default)]
    pub text: Option<String>,
    /// Provider error message, present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// Trait for anything that turns an audio file into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Trait for remote job-based transcription APIs.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Provider name for logs and errors.
    fn name(&self) -> &str;

    /// Upload the audio and create a job.
    async fn submit(&self, audio_path: &Path) -> Result<TranscriptionJob>;

    /// Fetch the current state of a job.
    async fn poll(&self, job_id: &str) -> Result<TranscriptionJob>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_deserializes_provider_json() {
        let job: TranscriptionJob = serde_json::from_str(
            r#"{"id": "abc", "status": "completed", "text": "hello", "audio_url": "x"}"#,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.text.as_deref(), Some("hello"));
        assert!(job.error.is_none());

        let job: TranscriptionJob =
            serde_json::from_str(r#"{"id": "abc", "status": "queued", "text": null}"#).unwrap();
        assert!(!job.status.is_terminal());
    }
}
