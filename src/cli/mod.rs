//! CLI module for Herald.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Herald - ask questions about news articles
///
/// Indexes the articles behind a set of URLs, answers questions about them
/// with a retrieval-backed agent, and accepts spoken questions as audio.
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "HERALD_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Fetch, chunk and embed the articles at the given URLs
    Index {
        /// Article URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show the chunks most similar to a query
    Search {
        /// The search query
        query: String,

        /// Article URL to search (repeatable)
        #[arg(short, long = "url", required = true)]
        urls: Vec<String>,

        /// Number of chunks to return
        #[arg(short)]
        k: Option<usize>,
    },

    /// Ask a question about the articles; the answer streams as it is written
    Ask {
        /// The question. Omit when using --audio.
        #[arg(required_unless_present = "audio")]
        question: Option<String>,

        /// Article URL to answer from (repeatable)
        #[arg(short, long = "url", required = true)]
        urls: Vec<String>,

        /// Transcribe the question from this audio file
        #[arg(short, long, conflicts_with = "question")]
        audio: Option<PathBuf>,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Audio file
        file: PathBuf,
    },

    /// Invent a restaurant name and menu for a cuisine
    Menu {
        /// Cuisine, e.g. "Indian"
        cuisine: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open config file in editor
    Edit,

    /// Show config file path
    Path,
}
