//! SQLite-backed embedding store.

use super::{bytes_to_vector, vector_to_bytes, EmbeddingStore};
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS embedding_cache (
    key TEXT PRIMARY KEY,
    vector BLOB NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// SQLite-based embedding store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the cache database.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite embedding cache at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of cached vectors.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM embedding_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HeraldError::Cache(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl EmbeddingStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>> {
        let conn = self.lock()?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT vector FROM embedding_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(bytes.and_then(|b| {
            let vector = bytes_to_vector(&b);
            if vector.is_none() {
                warn!("Ignoring corrupt cache entry {}", key);
            }
            vector
        }))
    }

    async fn put(&self, key: &str, vector: &[f32]) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO embedding_cache (key, vector, created_at) VALUES (?1, ?2, ?3)",
            params![key, vector_to_bytes(vector), Utc::now().to_rfc3339()],
        )?;
        debug!("Cached embedding {}", key);
        Ok(())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn put_many(&self, entries: &[(String, Vec<f32>)]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        for (key, vector) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO embedding_cache (key, vector, created_at) VALUES (?1, ?2, ?3)",
                params![key, vector_to_bytes(vector), now],
            )?;
        }

        tx.commit()?;
        debug!("Cached {} embeddings", entries.len());
        Ok(())
    }
}
