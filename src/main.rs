//! Herald CLI entry point.

use anyhow::Result;
use clap::Parser;
use herald::cli::{commands, Cli, Commands};
use herald::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("herald={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Index { urls } => {
            commands::run_index(urls, settings).await?;
        }

        Commands::Search { query, urls, k } => {
            commands::run_search(query, urls, *k, settings).await?;
        }

        Commands::Ask {
            question,
            urls,
            audio,
        } => {
            commands::run_ask(question.as_deref(), audio.as_deref(), urls, settings).await?;
        }

        Commands::Transcribe { file } => {
            commands::run_transcribe(file, settings).await?;
        }

        Commands::Menu { cuisine } => {
            commands::run_menu(cuisine, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
