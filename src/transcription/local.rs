//! Local Whisper CLI.

use super::Transcriber;
use crate::config::LocalWhisperSettings;
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Runs the `whisper` command on a file and reads back its text output.
pub struct LocalWhisper {
    command: String,
    model: String,
    language: String,
}

impl Default for LocalWhisper {
    fn default() -> Self {
        Self::from_settings(&LocalWhisperSettings::default())
    }
}

impl LocalWhisper {
    pub fn new(command: &str, model: &str, language: &str) -> Self {
        Self {
            command: command.to_string(),
            model: model.to_string(),
            language: language.to_string(),
        }
    }

    pub fn from_settings(settings: &LocalWhisperSettings) -> Self {
        Self::new(&settings.command, &settings.model, &settings.language)
    }

    fn args(&self, audio_path: &Path, output_dir: &Path) -> Vec<OsString> {
        vec![
            audio_path.as_os_str().to_owned(),
            "--model".into(),
            self.model.clone().into(),
            "--language".into(),
            self.language.clone().into(),
            "--output_format".into(),
            "txt".into(),
            "--output_dir".into(),
            output_dir.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl Transcriber for LocalWhisper {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let output_dir = tempfile::tempdir()?;
        debug!("Running {} with model {}", self.command, self.model);

        let result = Command::new(&self.command)
            .args(self.args(audio_path, output_dir.path()))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                return Err(HeraldError::Transcription(format!("whisper failed: {err}")));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HeraldError::ToolNotFound(self.command.clone()));
            }
            Err(e) => return Err(HeraldError::Transcription(format!("whisper error: {e}"))),
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let transcript_path = output_dir.path().join(format!("{stem}.txt"));

        let text = tokio::fs::read_to_string(&transcript_path).await.map_err(|e| {
            HeraldError::Transcription(format!(
                "whisper produced no transcript at {}: {e}",
                transcript_path.display()
            ))
        })?;

        Ok(text.trim().to_string())
    }
}
