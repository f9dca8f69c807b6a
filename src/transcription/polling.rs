//! Drives a remote job to a terminal state.

use super::{JobStatus, Transcriber, TranscriptionProvider};
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// [`Transcriber`] over a job-based provider.
pub struct PollingTranscriber {
    provider: Arc<dyn TranscriptionProvider>,
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl PollingTranscriber {
    /// Poll every second with no overall time limit.
    pub fn new(provider: Arc<dyn TranscriptionProvider>) -> Self {
        Self {
            provider,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up once a job has been pending this long. `None` waits forever.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

#[async_trait]
impl Transcriber for PollingTranscriber {
    #[instrument(skip(self), fields(provider = %self.provider.name(), audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let started = Instant::now();
        let mut job = self.provider.submit(audio_path).await?;
        info!("Submitted transcription job {}", job.id);

        loop {
            match job.status {
                JobStatus::Completed => {
                    debug!("Job {} completed after {:?}", job.id, started.elapsed());
                    return Ok(job.text.unwrap_or_default());
                }
                JobStatus::Error => {
                    return Err(HeraldError::Transcription(format!(
                        "{} job {} failed: {}",
                        self.provider.name(),
                        job.id,
                        job.error.as_deref().unwrap_or("unknown error")
                    )));
                }
                JobStatus::Queued | JobStatus::Processing => {}
            }

            if let Some(max_wait) = self.max_wait {
                if started.elapsed() >= max_wait {
                    return Err(HeraldError::Transcription(format!(
                        "{} job {} still {:?} after {:?}",
                        self.provider.name(),
                        job.id,
                        job.status,
                        max_wait
                    )));
                }
            }

            tokio::time::sleep(self.poll_interval).await;
            job = self.provider.poll(&job.id).await?;
            debug!("Job {} is {:?}", job.id, job.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use std::path::PathBuf;

    fn polling(provider: Arc<ScriptedProvider>) -> PollingTranscriber {
        PollingTranscriber::new(provider).with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_polls_until_completed() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            (JobStatus::Queued, None),
            (JobStatus::Processing, None),
            (JobStatus::Completed, Some("hello there")),
        ]));
        let text = polling(provider.clone())
            .transcribe(&PathBuf::from("audio.wav"))
            .await
            .unwrap();

        assert_eq!(text, "hello there");
        assert_eq!(provider.submits(), 1);
        assert_eq!(provider.polls(), 2);
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            (JobStatus::Queued, None),
            (JobStatus::Error, None),
        ]));
        let err = polling(provider)
            .transcribe(&PathBuf::from("audio.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Transcription(_)));
    }

    #[tokio::test]
    async fn test_max_wait_bounds_polling() {
        let provider = Arc::new(ScriptedProvider::new(vec![(JobStatus::Processing, None)]));
        let err = polling(provider.clone())
            .with_max_wait(Some(Duration::ZERO))
            .transcribe(&PathBuf::from("audio.wav"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("still Processing"));
        assert_eq!(provider.polls(), 0);
    }
}
