//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::Herald;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, urls: &[String], k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Embed, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'herald doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let herald = Herald::from_settings(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = herald.search(urls, query, k).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", results.len()));

                for (i, result) in results.iter().enumerate() {
                    Output::search_result(
                        i + 1,
                        result.chunk.source_url().unwrap_or("unknown"),
                        result.chunk.start_offset,
                        result.score,
                        &result.chunk.text,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
