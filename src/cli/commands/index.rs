//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::Herald;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(urls: &[String], settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Embed, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'herald doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let herald = Herald::from_settings(settings)?;

    let spinner = Output::spinner(&format!("Indexing {} article(s)...", urls.len()));
    let result = herald.index(urls).await;
    spinner.finish_and_clear();

    match result {
        Ok(build) => {
            let sources = build.index.sources();
            Output::success(&format!(
                "Indexed {} chunks from {} article(s)",
                build.index.len(),
                sources.len()
            ));
            for source in sources {
                Output::list_item(source);
            }
            Output::kv(
                "Built at",
                &build.index.built_at().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
            if !build.warnings.is_empty() {
                Output::warning(&format!("{} URL(s) skipped:", build.warnings.len()));
                for failure in &build.warnings {
                    Output::skipped(&failure.url, &failure.reason);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
