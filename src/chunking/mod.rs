//! Fixed-window text chunking.
//!
//! Documents are cut into overlapping character windows. Offsets are counted
//! in characters (not bytes) from the start of the source text.

use crate::fetch::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Metadata key holding the source URL.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the chunk's start offset.
pub const START_INDEX_KEY: &str = "start_index";

/// A segment of a document's text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk.
    pub text: String,
    /// Character offset of the chunk start in the source text.
    pub start_offset: usize,
    /// Provenance: at least `source` and `start_index`.
    pub source_metadata: BTreeMap<String, Value>,
}

impl Chunk {
    /// Create a chunk tagged with its source URL and offset.
    pub fn new(text: String, start_offset: usize, source_url: &str) -> Self {
        let mut source_metadata = BTreeMap::new();
        source_metadata.insert(SOURCE_KEY.to_string(), Value::from(source_url));
        source_metadata.insert(START_INDEX_KEY.to_string(), Value::from(start_offset));
        Self {
            text,
            start_offset,
            source_metadata,
        }
    }

    /// URL of the document this chunk came from.
    pub fn source_url(&self) -> Option<&str> {
        self.source_metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }

    /// Metadata rendered as a compact JSON object.
    pub fn metadata_display(&self) -> String {
        serde_json::to_string(&self.source_metadata).unwrap_or_default()
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Splits documents into overlapping fixed-size chunks.
#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    /// Create a splitter. Overlap is clamped below the window size.
    pub fn new(config: ChunkingConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        let chunk_overlap = config.chunk_overlap.min(chunk_size - 1);
        Self {
            config: ChunkingConfig {
                chunk_size,
                chunk_overlap,
            },
        }
    }

    /// Split one document. Whitespace-only windows are dropped.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.raw_text.chars().collect();
        let step = self.config.chunk_size - self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.config.chunk_size).min(chars.len());
            let text: String = chars[start..end].iter().collect();

            if !text.trim().is_empty() {
                chunks.push(Chunk::new(text, start, &document.source_url));
            }

            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Split several documents, preserving document order then chunk order.
    pub fn split_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.split(doc)).collect()
    }
}
