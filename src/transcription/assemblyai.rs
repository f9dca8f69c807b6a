//! AssemblyAI job API.

use super::{TranscriptionJob, TranscriptionProvider};
use crate::config::AssemblyAISettings;
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

/// Uploads audio to AssemblyAI and tracks the resulting transcript job.
pub struct AssemblyAIProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    speech_model: String,
}

impl AssemblyAIProvider {
    pub fn new(base_url: &str, api_key: Option<String>, speech_model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            speech_model: speech_model.to_string(),
        })
    }

    /// Build from settings, reading the key from the configured environment variable.
    pub fn from_settings(settings: &AssemblyAISettings, timeout: Duration) -> Result<Self> {
        Self::new(
            &settings.base_url,
            std::env::var(&settings.api_key_env).ok(),
            &settings.speech_model,
            timeout,
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| HeraldError::Transcription("AssemblyAI API key is not set".to_string()))
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(HeraldError::Transcription(format!(
            "AssemblyAI {} failed with HTTP {}: {}",
            what, status, body
        )))
    }
}

#[async_trait]
impl TranscriptionProvider for AssemblyAIProvider {
    fn name(&self) -> &str {
        "assemblyai"
    }

    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn submit(&self, audio_path: &Path) -> Result<TranscriptionJob> {
        let key = self.api_key()?;
        let bytes = tokio::fs::read(audio_path).await?;
        debug!("Uploading {} bytes", bytes.len());

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", key)
            .body(bytes)
            .send()
            .await?;
        let upload: UploadResponse = Self::check(response, "upload").await?.json().await?;

        let response = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", key)
            .json(&serde_json::json!({
                "audio_url": upload.upload_url,
                "speech_models": [self.speech_model],
            }))
            .send()
            .await?;

        Ok(Self::check(response, "job creation").await?.json().await?)
    }

    async fn poll(&self, job_id: &str) -> Result<TranscriptionJob> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}/transcript/{}", self.base_url, job_id))
            .header("authorization", key)
            .send()
            .await?;

        Ok(Self::check(response, "status check").await?.json().await?)
    }
}
