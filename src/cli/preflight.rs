//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials and tools are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, TranscriptionBackendKind};
use crate::error::{HeraldError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing and search embed text.
    Embed,
    /// Answering embeds and calls the chat model.
    Ask,
    /// Transcription needs at least one usable backend.
    Transcribe,
    /// Menu generation calls the chat model.
    Menu,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Embed | Operation::Ask | Operation::Menu => check_api_key("OPENAI_API_KEY")?,
        Operation::Transcribe => check_transcription(settings)?,
    }
    Ok(())
}

/// At least one configured backend must be usable.
fn check_transcription(settings: &Settings) -> Result<()> {
    let t = &settings.transcription;
    let mut missing = Vec::new();

    for backend in &t.backends {
        let outcome = match backend {
            TranscriptionBackendKind::Assemblyai => check_api_key(&t.assemblyai.api_key_env),
            TranscriptionBackendKind::Openai => check_api_key("OPENAI_API_KEY"),
            TranscriptionBackendKind::LocalWhisper => check_tool(&t.local_whisper.command),
        };
        match outcome {
            Ok(()) => return Ok(()),
            Err(e) => missing.push(e.to_string()),
        }
    }

    Err(HeraldError::Config(format!(
        "No usable transcription backend: {}",
        missing.join("; ")
    )))
}

/// Check that an API key environment variable is set and non-empty.
fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(HeraldError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(HeraldError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--help").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(HeraldError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(HeraldError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(HeraldError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
