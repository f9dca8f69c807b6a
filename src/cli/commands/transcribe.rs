//! Transcribe command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::Herald;
use anyhow::Result;
use std::path::Path;

/// Run the transcribe command.
pub async fn run_transcribe(file: &Path, settings: Settings) -> Result<()> {
    if !file.exists() {
        Output::error(&format!("File not found: {}", file.display()));
        anyhow::bail!("File not found: {}", file.display());
    }

    if let Err(e) = preflight::check(Operation::Transcribe, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'herald doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let herald = Herald::from_settings(settings)?;
    let backends = herald.transcription().backend_names().join(" -> ");

    let spinner = Output::spinner(&format!("Transcribing ({})...", backends));
    let result = herald.transcribe_file(file).await;
    spinner.finish_and_clear();

    match result {
        Ok(text) => {
            println!("{}", text);
        }
        Err(e) => {
            Output::error(&format!("Transcription failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
