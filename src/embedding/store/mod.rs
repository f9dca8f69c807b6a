//! Durable key-value stores for cached embeddings.
//!
//! Keys are content hashes; values are vectors. Writes are idempotent
//! overwrites, so the last successful write for a key wins.

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{CacheBackend, Settings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding cache backends.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Look up a vector by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>>;

    /// Store a vector, replacing any previous value.
    async fn put(&self, key: &str, vector: &[f32]) -> Result<()>;

    /// Store several vectors.
    async fn put_many(&self, entries: &[(String, Vec<f32>)]) -> Result<()> {
        for (key, vector) in entries {
            self.put(key, vector).await?;
        }
        Ok(())
    }
}

/// Open the store selected in the settings.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn EmbeddingStore>> {
    let store: Arc<dyn EmbeddingStore> = match settings.cache.backend {
        CacheBackend::File => Arc::new(FileStore::new(&settings.cache_dir())?),
        CacheBackend::Sqlite => Arc::new(SqliteStore::new(&settings.cache_sqlite_path())?),
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

/// Serialize a vector to little-endian bytes.
pub(crate) fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a vector from little-endian bytes. `None` if the length is not a multiple of 4.
pub(crate) fn bytes_to_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
