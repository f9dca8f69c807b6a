//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::Herald;
use anyhow::Result;
use futures::StreamExt;
use std::io::Write;
use std::path::Path;

/// Run the ask command.
///
/// With `audio` set, the question is transcribed first. The answer is
/// printed as it streams in.
pub async fn run_ask(
    question: Option<&str>,
    audio: Option<&Path>,
    urls: &[String],
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    let mut checks = vec![Operation::Ask];
    if audio.is_some() {
        checks.push(Operation::Transcribe);
    }
    for op in checks {
        if let Err(e) = preflight::check(op, &settings) {
            Output::error(&format!("{}", e));
            Output::info("Run 'herald doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let herald = Herald::from_settings(settings)?;

    let question = match (question, audio) {
        (_, Some(path)) => {
            let spinner = Output::spinner("Transcribing question...");
            let text = herald.transcribe_file(path).await;
            spinner.finish_and_clear();
            let text = text?;
            Output::kv("Question", &text);
            text
        }
        (Some(q), None) => q.to_string(),
        (None, None) => anyhow::bail!("Either a question or --audio is required"),
    };

    let spinner = Output::spinner("Reading articles...");
    let answer = herald.ask(urls, &question).await;
    spinner.finish_and_clear();

    let answer = match answer {
        Ok(answer) => answer,
        Err(e) => {
            Output::error(&format!("Failed to index articles: {}", e));
            return Err(e.into());
        }
    };

    for failure in &answer.build.warnings {
        Output::skipped(&failure.url, &failure.reason);
    }

    println!();
    let mut stream = answer.stream;
    let mut printed = 0;
    let mut stdout = std::io::stdout();
    while let Some(item) = stream.next().await {
        match item {
            Ok(text) => {
                stdout.write_all(text.get(printed..).unwrap_or_default().as_bytes())?;
                stdout.flush()?;
                printed = text.len();
            }
            Err(e) => {
                println!();
                Output::error(&format!("Failed to generate answer: {}", e));
                return Err(e.into());
            }
        }
    }
    println!("\n");

    let sources = answer.build.index.sources();
    if !sources.is_empty() {
        Output::header("Sources");
        for source in sources {
            Output::list_item(source);
        }
    }

    Ok(())
}
