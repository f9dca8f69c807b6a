//! Document indexer: fetch URLs, chunk, embed, and build a vector index.

mod memo;

pub use memo::IndexCache;

use crate::chunking::{ChunkingConfig, TextSplitter};
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{HeraldError, Result};
use crate::fetch::{Document, DocumentFetcher, FetchFailure};
use crate::vector_store::VectorIndex;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default number of URLs fetched at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Result of indexing a list of URLs.
#[derive(Debug)]
pub struct IndexBuild {
    /// The finished index.
    pub index: Arc<VectorIndex>,
    /// URLs that were skipped.
    pub warnings: Vec<FetchFailure>,
}

/// Builds (and memoizes) vector indexes for URL lists.
pub struct DocumentIndexer {
    fetcher: Arc<dyn DocumentFetcher>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    cache: Arc<IndexCache>,
    max_concurrent_fetches: usize,
}

impl DocumentIndexer {
    /// Create an indexer with the default chunking.
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        embedder: Arc<dyn Embedder>,
        cache: Arc<IndexCache>,
    ) -> Self {
        Self {
            fetcher,
            embedder,
            splitter: TextSplitter::new(ChunkingConfig::default()),
            cache,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    /// Create an indexer configured from settings, with its own memo cache.
    pub fn from_settings(
        settings: &Settings,
        fetcher: Arc<dyn DocumentFetcher>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let indexing = &settings.indexing;
        let cache = Arc::new(IndexCache::new(
            indexing.index_cache_capacity,
            indexing.index_cache_ttl_secs.map(Duration::from_secs),
        ));

        Self::new(fetcher, embedder, cache)
            .with_chunking(ChunkingConfig {
                chunk_size: indexing.chunk_size,
                chunk_overlap: indexing.chunk_overlap,
            })
            .with_max_concurrent_fetches(indexing.max_concurrent_fetches)
    }

    pub fn with_chunking(mut self, config: ChunkingConfig) -> Self {
        self.splitter = TextSplitter::new(config);
        self
    }

    pub fn with_max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n.max(1);
        self
    }

    /// The embedder used for chunks, shared with retrievers over this index.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Index `urls`, reusing the memoized build for the same ordered list.
    #[instrument(skip(self), fields(url_count = urls.len()))]
    pub async fn build_index(&self, urls: &[String]) -> Result<Arc<IndexBuild>> {
        if urls.is_empty() {
            return Err(HeraldError::IndexEmpty {
                failures: Vec::new(),
            });
        }

        self.cache.get_or_build(urls, || self.build_uncached(urls)).await
    }

    async fn build_uncached(&self, urls: &[String]) -> Result<IndexBuild> {
        // repeated URLs are indexed once, at their first position
        let mut seen = HashSet::new();
        let unique: Vec<String> = urls.iter().filter(|u| seen.insert(u.as_str())).cloned().collect();
        if unique.len() < urls.len() {
            debug!("Ignoring {} repeated URL(s)", urls.len() - unique.len());
        }
        info!("Fetching {} URL(s)", unique.len());

        let fetched: Vec<(String, Result<Document>)> = stream::iter(unique)
            .map(|url| {
                let fetcher = self.fetcher.clone();
                async move {
                    let result = fetcher.fetch(&url).await;
                    (url, result)
                }
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut documents = Vec::new();
        let mut warnings = Vec::new();

        for (url, result) in fetched {
            match result {
                Ok(document) => documents.push(document),
                Err(e) => {
                    let reason = match e {
                        HeraldError::Fetch { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    warn!("Skipping {}: {}", url, reason);
                    warnings.push(FetchFailure { url, reason });
                }
            }
        }

        if documents.is_empty() {
            return Err(HeraldError::IndexEmpty {
                failures: warnings.iter().map(|w| w.to_string()).collect(),
            });
        }

        let chunks = self.splitter.split_all(&documents);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut index = VectorIndex::new();
        index.extend(chunks, vectors)?;

        info!(
            "Indexed {} chunk(s) from {} document(s), {} skipped",
            index.len(),
            documents.len(),
            warnings.len()
        );

        Ok(IndexBuild {
            index: Arc::new(index),
            warnings,
        })
    }
}
