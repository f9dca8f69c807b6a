//! Top-k similarity retrieval.

use crate::embedding::Embedder;
use crate::error::{HeraldError, Result};
use crate::vector_store::{SearchResult, VectorIndex};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Number of chunks returned when the caller does not say.
pub const DEFAULT_K: usize = 2;

/// Read-only view over one index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl Retriever {
    /// Create a retriever. `embedder` must be the one the index was built with.
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            k: DEFAULT_K,
        }
    }

    /// Set the default number of results.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// The `k` chunks most similar to `query`, best first.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(HeraldError::InvalidInput("Query is empty".to_string()));
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.search(&query_embedding, k);

        debug!("Retrieved {} of {} chunks", results.len(), self.index.len());
        Ok(results)
    }

    /// Retrieve with the default `k` and render the hits for a prompt.
    pub async fn retrieve_formatted(&self, query: &str) -> Result<String> {
        let results = self.retrieve(query, self.k).await?;
        Ok(format_results(&results))
    }
}

/// Render hits as `Source: ...\nContent: ...` blocks separated by blank lines.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "Source: {}\nContent: {}",
                r.chunk.metadata_display(),
                r.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
