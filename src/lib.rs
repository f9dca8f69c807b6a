//! Herald - ask questions about news articles
//!
//! Herald fetches the articles behind a set of URLs, splits them into
//! overlapping chunks, embeds the chunks (through a content-addressed
//! embedding cache) and answers questions with a tool-using agent that
//! retrieves from the resulting index. Questions may also arrive as audio,
//! transcribed through an ordered list of speech-to-text backends.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `fetch` - Article download and HTML text extraction
//! - `chunking` - Fixed-window text splitting with overlap
//! - `embedding` - Embedding providers and the persistent embedding cache
//! - `vector_store` - In-memory vector index and similarity search
//! - `indexer` - Document indexing and the memoized index cache
//! - `rag` - Retrieval and context formatting
//! - `agent` - Streaming answer agent and its tools
//! - `transcription` - Speech-to-text backends and fallback
//! - `menu` - Restaurant name and menu generator
//! - `herald` - Wiring of all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use herald::config::Settings;
//! use herald::Herald;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let herald = Herald::from_settings(Settings::load()?)?;
//!     let urls = vec!["https://example.com/news/autos".to_string()];
//!
//!     let mut answer = herald.ask(&urls, "What happened to auto sales?").await?.stream;
//!     let mut last = String::new();
//!     while let Some(text) = answer.next().await {
//!         last = text?;
//!     }
//!     println!("{}", last);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fetch;
pub mod herald;
pub mod indexer;
pub mod menu;
pub mod openai;
pub mod rag;
pub mod transcription;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{HeraldError, Result};
pub use herald::Herald;
