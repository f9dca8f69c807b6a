//! Directory-backed embedding store: one file per key.

use super::{bytes_to_vector, vector_to_bytes, EmbeddingStore};
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Stores each vector in `<dir>/<key>` as raw little-endian f32 bytes.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create) the cache directory.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(HeraldError::Cache(format!("Invalid cache key: {:?}", key)));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl EmbeddingStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let vector = bytes_to_vector(&bytes);
                if vector.is_none() {
                    warn!("Ignoring corrupt cache entry {}", path.display());
                }
                Ok(vector)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, vector: &[f32]) -> Result<()> {
        let path = self.path_for(key)?;
        let dir = self.dir.clone();
        let bytes = vector_to_bytes(vector);

        // Write then rename so readers never see a half-written entry.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&path).map_err(|e| HeraldError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| HeraldError::Cache(format!("Cache write task failed: {}", e)))??;

        debug!("Cached embedding {}", key);
        Ok(())
    }
}
