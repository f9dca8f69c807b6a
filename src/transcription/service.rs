//! Ordered fallback across transcription backends.

use super::correction::TranscriptCorrector;
use super::local::LocalWhisper;
use super::openai::OpenAIWhisperTranscriber;
use super::polling::PollingTranscriber;
use super::assemblyai::AssemblyAIProvider;
use super::Transcriber;
use crate::config::{Settings, TranscriptionBackendKind};
use crate::error::{HeraldError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Decides whether a backend's transcript is usable.
pub type AcceptFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// One entry in the fallback order.
#[derive(Clone)]
pub struct TranscriptionBackend {
    name: String,
    transcriber: Arc<dyn Transcriber>,
    accept: AcceptFn,
}

impl TranscriptionBackend {
    /// Backend that accepts any non-blank transcript.
    pub fn new(name: &str, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            name: name.to_string(),
            transcriber,
            accept: Arc::new(|text: &str| !text.trim().is_empty()),
        }
    }

    pub fn with_acceptance(mut self, accept: AcceptFn) -> Self {
        self.accept = accept;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Transcribes audio by trying each backend in order.
pub struct TranscriptionService {
    backends: Vec<TranscriptionBackend>,
    temp_dir: PathBuf,
    corrector: Option<TranscriptCorrector>,
}

impl TranscriptionService {
    pub fn new(backends: Vec<TranscriptionBackend>, temp_dir: &Path) -> Self {
        Self {
            backends,
            temp_dir: temp_dir.to_path_buf(),
            corrector: None,
        }
    }

    /// Build the configured backend chain.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transcription = &settings.transcription;
        let timeout = Duration::from_secs(settings.openai.timeout_secs.max(1));

        let mut backends = Vec::new();
        for kind in &transcription.backends {
            let transcriber: Arc<dyn Transcriber> = match kind {
                TranscriptionBackendKind::Assemblyai => {
                    let provider = AssemblyAIProvider::from_settings(&transcription.assemblyai, timeout)?;
                    Arc::new(
                        PollingTranscriber::new(Arc::new(provider))
                            .with_poll_interval(transcription.poll_interval())
                            .with_max_wait(transcription.max_wait()),
                    )
                }
                TranscriptionBackendKind::Openai => Arc::new(
                    OpenAIWhisperTranscriber::new(&transcription.openai_model, timeout)?
                        .with_language(&transcription.openai_language),
                ),
                TranscriptionBackendKind::LocalWhisper => {
                    Arc::new(LocalWhisper::from_settings(&transcription.local_whisper))
                }
            };
            backends.push(TranscriptionBackend::new(&kind.to_string(), transcriber));
        }

        Ok(Self::new(backends, &settings.temp_dir()))
    }

    /// Run every successful transcript through a correction pass.
    pub fn with_corrector(mut self, corrector: TranscriptCorrector) -> Self {
        self.corrector = Some(corrector);
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Transcribe raw audio bytes (WAV from a recorder, typically).
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.transcribe_staged(audio, ".wav").await
    }

    /// Transcribe an audio file, keeping its extension for the staged copy.
    pub async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let audio = tokio::fs::read(path).await?;
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| ".wav".to_string());
        self.transcribe_staged(&audio, &suffix).await
    }

    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    async fn transcribe_staged(&self, audio: &[u8], suffix: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(HeraldError::InvalidInput("Audio is empty".to_string()));
        }

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        // Removed when dropped, whichever way this function returns.
        let staged = tempfile::Builder::new()
            .prefix("herald-audio-")
            .suffix(suffix)
            .tempfile_in(&self.temp_dir)?;
        tokio::fs::write(staged.path(), audio).await?;

        let text = self.run_backends(staged.path()).await?;

        match &self.corrector {
            Some(corrector) => Ok(corrector.correct(&text).await),
            None => Ok(text),
        }
    }

    async fn run_backends(&self, audio_path: &Path) -> Result<String> {
        if self.backends.is_empty() {
            return Err(HeraldError::Transcription(
                "No transcription backends configured".to_string(),
            ));
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            match backend.transcriber.transcribe(audio_path).await {
                Ok(text) if (backend.accept)(&text) => {
                    info!("Transcribed with {}", backend.name);
                    return Ok(text.trim().to_string());
                }
                Ok(_) => {
                    warn!("{} returned an unusable transcript, trying next backend", backend.name);
                    failures.push(format!("{}: transcript rejected", backend.name));
                }
                Err(e) => {
                    warn!("{} failed, trying next backend: {}", backend.name, e);
                    failures.push(format!("{}: {}", backend.name, e));
                }
            }
        }

        Err(HeraldError::Transcription(format!(
            "All backends failed ({})",
            failures.join("; ")
        )))
    }
}
