//! Document fetching.
//!
//! Turns URLs into raw article text. The indexer only sees the
//! [`DocumentFetcher`] trait, so tests plug in canned documents.

mod html;
mod http;

pub use html::extract_text;
pub use http::HttpFetcher;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw text fetched from one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// URL the text came from.
    pub source_url: String,
    /// Extracted article text.
    pub raw_text: String,
}

impl Document {
    /// Create a new document.
    pub fn new(source_url: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// A URL that was skipped while indexing, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub url: String,
    pub reason: String,
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.url, self.reason)
    }
}

/// Trait for document sources.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch one URL. Fails with [`HeraldError::Fetch`](crate::error::HeraldError::Fetch).
    async fn fetch(&self, url: &str) -> Result<Document>;
}
