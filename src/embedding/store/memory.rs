//! In-memory embedding store.
//!
//! Useful for testing and for runs that should not touch disk.

use super::EmbeddingStore;
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory embedding store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HeraldError::Cache(format!("Failed to acquire lock: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, vector: &[f32]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HeraldError::Cache(format!("Failed to acquire lock: {}", e)))?;
        entries.insert(key.to_string(), vector.to_vec());
        Ok(())
    }
}
