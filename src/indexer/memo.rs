//! Bounded memo of built indexes, keyed by the ordered URL list.

use super::IndexBuild;
use crate::error::Result;
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

struct Slot {
    cell: Arc<OnceCell<Arc<IndexBuild>>>,
    created: Instant,
}

/// LRU cache of index builds with an optional time-to-live.
///
/// Concurrent requests for the same URL list share one build. A failed
/// build leaves nothing behind, so the next request tries again.
pub struct IndexCache {
    slots: Mutex<LruCache<Vec<String>, Slot>>,
    ttl: Option<Duration>,
}

impl IndexCache {
    /// Create a cache holding at most `capacity` builds (minimum 1).
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// In-flight builds never expire.
    fn is_expired(&self, slot: &Slot) -> bool {
        slot.cell.initialized()
            && self
                .ttl
                .map(|ttl| slot.created.elapsed() >= ttl)
                .unwrap_or(false)
    }

    /// Return the memoized build for `urls`, running `build` on a miss.
    pub async fn get_or_build<F, Fut>(&self, urls: &[String], build: F) -> Result<Arc<IndexBuild>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IndexBuild>>,
    {
        let cell = {
            let mut slots = self.slots.lock().await;
            let key = urls.to_vec();

            if slots.peek(&key).map(|s| self.is_expired(s)).unwrap_or(false) {
                debug!("Index for {} URL(s) expired", key.len());
                slots.pop(&key);
            }

            match slots.get(&key) {
                Some(slot) => slot.cell.clone(),
                None => {
                    let cell = Arc::new(OnceCell::new());
                    slots.put(
                        key,
                        Slot {
                            cell: cell.clone(),
                            created: Instant::now(),
                        },
                    );
                    cell
                }
            }
        };

        let result = cell
            .get_or_try_init(|| async { build().await.map(Arc::new) })
            .await
            .cloned();

        if result.is_err() {
            self.forget_if_empty(urls).await;
        }
        result
    }

    /// Memoized build for `urls`, if one has completed and is still fresh.
    pub async fn get(&self, urls: &[String]) -> Option<Arc<IndexBuild>> {
        let mut slots = self.slots.lock().await;
        let slot = slots.get(urls)?;
        if self.is_expired(slot) {
            return None;
        }
        slot.cell.get().cloned()
    }

    /// Number of cached URL lists.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn forget_if_empty(&self, urls: &[String]) {
        let mut slots = self.slots.lock().await;
        if slots.peek(urls).map(|s| !s.cell.initialized()).unwrap_or(false) {
            slots.pop(urls);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeraldError;
    use crate::vector_store::VectorIndex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn empty_build() -> IndexBuild {
        IndexBuild {
            index: Arc::new(VectorIndex::new()),
            warnings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_same_urls_build_once() {
        let cache = IndexCache::new(4, None);
        let builds = AtomicUsize::new(0);
        let key = urls(&["https://a", "https://b"]);

        let first = cache
            .get_or_build(&key, || async {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(empty_build())
            })
            .await
            .unwrap();
        let second = cache
            .get_or_build(&key, || async {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(empty_build())
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_order_matters() {
        let cache = IndexCache::new(4, None);
        let a = cache
            .get_or_build(&urls(&["https://a", "https://b"]), || async { Ok(empty_build()) })
            .await
            .unwrap();
        let b = cache
            .get_or_build(&urls(&["https://b", "https://a"]), || async { Ok(empty_build()) })
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let cache = IndexCache::new(1, None);
        cache
            .get_or_build(&urls(&["https://a"]), || async { Ok(empty_build()) })
            .await
            .unwrap();
        cache
            .get_or_build(&urls(&["https://b"]), || async { Ok(empty_build()) })
            .await
            .unwrap();

        assert!(cache.get(&urls(&["https://a"])).await.is_none());
        assert!(cache.get(&urls(&["https://b"])).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_rebuilds() {
        let cache = IndexCache::new(4, Some(Duration::ZERO));
        let key = urls(&["https://a"]);
        let first = cache.get_or_build(&key, || async { Ok(empty_build()) }).await.unwrap();
        let second = cache.get_or_build(&key, || async { Ok(empty_build()) }).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    async fn share_one_build(ttl: Option<Duration>) {
        let cache = Arc::new(IndexCache::new(4, ttl));
        let builds = Arc::new(AtomicUsize::new(0));
        let key = urls(&["https://a", "https://b"]);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let builds = builds.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_build(&key, || async {
                            builds.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(empty_build())
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_build() {
        share_one_build(None).await;
    }

    #[tokio::test]
    async fn test_zero_ttl_does_not_expire_in_flight_build() {
        share_one_build(Some(Duration::ZERO)).await;
    }

    #[tokio::test]
    async fn test_failed_build_is_not_cached() {
        let cache = IndexCache::new(4, None);
        let key = urls(&["https://a"]);

        let err = cache
            .get_or_build(&key, || async {
                Err(HeraldError::IndexEmpty { failures: Vec::new() })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::IndexEmpty { .. }));
        assert!(cache.is_empty().await);

        tokio_test::assert_ok!(cache.get_or_build(&key, || async { Ok(empty_build()) }).await);
    }
}
