//! Content-addressed embedding cache.
//!
//! Wraps any [`Embedder`] so that each distinct (namespace, text) pair reaches
//! the provider at most once. Vectors are persisted in an [`EmbeddingStore`].

use super::store::EmbeddingStore;
use super::Embedder;
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of texts per provider request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Derive the cache key for a text under a namespace.
///
/// SHA-256 over `namespace`, a NUL separator and the text, as lowercase hex.
pub fn content_hash(namespace: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Embedder that consults a durable store before calling its provider.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    store: Arc<dyn EmbeddingStore>,
    namespace: String,
    batch_size: usize,
}

impl CachedEmbedder {
    /// Wrap `inner`, namespacing entries by its model name.
    pub fn new(inner: Arc<dyn Embedder>, store: Arc<dyn EmbeddingStore>) -> Self {
        let namespace = inner.model_name().to_string();
        Self {
            inner,
            store,
            namespace,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the namespace used when the caller does not pass one.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Set the maximum texts per provider request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Return a vector for every text, computing only the ones not cached yet.
    ///
    /// Identical texts are embedded once. Missing texts go to the provider in
    /// batches; a batch's entries are stored only after that batch succeeds.
    #[instrument(skip(self, texts), fields(count = texts.len(), namespace = %namespace))]
    pub async fn get_or_compute(&self, texts: &[String], namespace: &str) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| content_hash(namespace, t)).collect();

        let mut found: HashMap<String, Vec<f32>> = HashMap::new();
        let mut missing: Vec<(String, String)> = Vec::new();

        for (key, text) in keys.iter().zip(texts) {
            if found.contains_key(key) || missing.iter().any(|(k, _)| k == key) {
                continue;
            }
            match self.store.get(key).await? {
                Some(vector) => {
                    found.insert(key.clone(), vector);
                }
                None => missing.push((key.clone(), text.clone())),
            }
        }

        debug!(
            "Embedding cache: {} hit(s), {} miss(es)",
            found.len(),
            missing.len()
        );

        for batch in missing.chunks(self.batch_size) {
            let batch_texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self.inner.embed_batch(&batch_texts).await?;

            if vectors.len() != batch.len() {
                return Err(HeraldError::Provider(format!(
                    "Provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }

            let entries: Vec<(String, Vec<f32>)> = batch
                .iter()
                .map(|(key, _)| key.clone())
                .zip(vectors)
                .collect();
            self.store.put_many(&entries).await?;
            found.extend(entries);
        }

        keys.iter()
            .map(|key| {
                found
                    .get(key)
                    .cloned()
                    .ok_or_else(|| HeraldError::Cache(format!("No vector for key {}", key)))
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.get_or_compute(&[text.to_string()], &self.namespace)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HeraldError::Provider("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.get_or_compute(texts, &self.namespace).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::store::MemoryStore;
    use crate::testing::CountingEmbedder;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_content_hash_is_namespaced() {
        let a = content_hash("model-a", "hello");
        assert_eq!(a, content_hash("model-a", "hello"));
        assert_ne!(a, content_hash("model-b", "hello"));
        assert_ne!(a, content_hash("model-a", "hello "));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let provider = Arc::new(CountingEmbedder::new());
        let cache = CachedEmbedder::new(provider.clone(), Arc::new(MemoryStore::new()));

        let first = cache.get_or_compute(&texts(&["alpha"]), "ns").await.unwrap();
        let second = cache.get_or_compute(&texts(&["alpha"]), "ns").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.texts_embedded(), 1);
    }

    #[tokio::test]
    async fn test_only_missing_texts_reach_provider() {
        let provider = Arc::new(CountingEmbedder::new());
        let cache = CachedEmbedder::new(provider.clone(), Arc::new(MemoryStore::new()));

        cache.get_or_compute(&texts(&["a", "b"]), "ns").await.unwrap();
        let vectors = cache
            .get_or_compute(&texts(&["b", "c", "a", "c"]), "ns")
            .await
            .unwrap();

        // a, b from the first call, then only c
        assert_eq!(provider.texts_embedded(), 3);
        assert_eq!(vectors.len(), 4);
        assert_eq!(vectors[1], vectors[3]);
        assert_eq!(vectors[0], CountingEmbedder::vector_for("b"));
        assert_eq!(vectors[2], CountingEmbedder::vector_for("a"));
    }

    #[tokio::test]
    async fn test_namespace_separates_entries() {
        let provider = Arc::new(CountingEmbedder::new());
        let cache = CachedEmbedder::new(provider.clone(), Arc::new(MemoryStore::new()));

        cache.get_or_compute(&texts(&["same"]), "model-a").await.unwrap();
        cache.get_or_compute(&texts(&["same"]), "model-b").await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_batches_respect_batch_size() {
        let provider = Arc::new(CountingEmbedder::new());
        let cache = CachedEmbedder::new(provider.clone(), Arc::new(MemoryStore::new()))
            .with_batch_size(2);

        cache
            .get_or_compute(&texts(&["1", "2", "3", "4", "5"]), "ns")
            .await
            .unwrap();
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_writes_nothing() {
        let provider = Arc::new(CountingEmbedder::failing());
        let store = Arc::new(MemoryStore::new());
        let cache = CachedEmbedder::new(provider.clone(), store.clone());

        let err = cache.get_or_compute(&texts(&["x", "y"]), "ns").await.unwrap_err();
        assert!(matches!(err, HeraldError::Provider(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_embedder_impl_uses_default_namespace() {
        let provider = Arc::new(CountingEmbedder::new());
        let store = Arc::new(MemoryStore::new());
        let cache = CachedEmbedder::new(provider.clone(), store.clone());

        let vector = cache.embed("query").await.unwrap();
        assert_eq!(vector, CountingEmbedder::vector_for("query"));

        let key = content_hash(provider.model_name(), "query");
        assert_eq!(store.get(&key).await.unwrap(), Some(vector));
    }
}
