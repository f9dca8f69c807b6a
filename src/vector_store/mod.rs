//! In-memory vector index for one indexed set of URLs.
//!
//! An index is filled once by the indexer and then shared read-only.

use crate::chunking::Chunk;
use crate::error::{HeraldError, Result};
use chrono::{DateTime, Utc};

/// A chunk together with its embedding.
#[derive(Debug, Clone)]
pub struct VectorIndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Flat vector index, searched exhaustively.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<VectorIndexEntry>,
    dimensions: Option<usize>,
    built_at: DateTime<Utc>,
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            dimensions: None,
            built_at: Utc::now(),
        }
    }

    /// Append a chunk. All vectors in one index must share a dimension.
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        match self.dimensions {
            Some(dims) if dims != vector.len() => {
                return Err(HeraldError::InvalidInput(format!(
                    "Vector has {} dimensions, index expects {}",
                    vector.len(),
                    dims
                )));
            }
            None => self.dimensions = Some(vector.len()),
            _ => {}
        }
        self.entries.push(VectorIndexEntry { chunk, vector });
        Ok(())
    }

    /// Append chunks and their vectors in order.
    pub fn extend(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(HeraldError::InvalidInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            self.insert(chunk, vector)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VectorIndexEntry] {
        &self.entries
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Distinct source URLs in insertion order.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if let Some(url) = entry.chunk.source_url() {
                if !sources.contains(&url) {
                    sources.push(url);
                }
            }
        }
        sources
    }

    /// Top `limit` chunks by cosine similarity.
    ///
    /// Equal scores keep insertion order. Entries whose score is not
    /// finite rank last.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<SearchResult> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let score = cosine_similarity(query_embedding, &entry.vector);
                (i, if score.is_finite() { score } else { f32::NEG_INFINITY })
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(i, score)| SearchResult {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, url: &str, start: usize) -> Chunk {
        Chunk::new(text.to_string(), start, url)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_score() {
        let mut index = VectorIndex::new();
        index.insert(chunk("east", "https://a", 0), vec![1.0, 0.0]).unwrap();
        index.insert(chunk("north", "https://a", 800), vec![0.0, 1.0]).unwrap();
        index.insert(chunk("north-east", "https://b", 0), vec![0.7, 0.7]).unwrap();

        let results = index.search(&[0.0, 1.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "north");
        assert_eq!(results[1].chunk.text, "north-east");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new();
        index.insert(chunk("first", "https://a", 0), vec![1.0, 0.0]).unwrap();
        index.insert(chunk("second", "https://b", 0), vec![2.0, 0.0]).unwrap();
        index.insert(chunk("third", "https://c", 0), vec![3.0, 0.0]).unwrap();

        let texts: Vec<String> = index
            .search(&[1.0, 0.0], 3)
            .into_iter()
            .map(|r| r.chunk.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_non_finite_vectors_rank_last() {
        let mut index = VectorIndex::new();
        for i in 0..64 {
            let vector = if i % 3 == 0 {
                vec![f32::NAN, 1.0]
            } else if i % 3 == 1 {
                vec![f32::INFINITY, 1.0]
            } else {
                vec![1.0, 0.0]
            };
            index.insert(chunk(&i.to_string(), "https://a", i), vector).unwrap();
        }

        let results = index.search(&[1.0, 0.0], 2);
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["2", "5"]);
        assert!(results.iter().all(|r| r.score.is_finite()));

        let all = index.search(&[1.0, 0.0], 64);
        assert_eq!(all.len(), 64);
        assert_eq!(all[63].score, f32::NEG_INFINITY);
    }

    #[test]
    fn test_search_limit_larger_than_index() {
        let mut index = VectorIndex::new();
        index.insert(chunk("only", "https://a", 0), vec![1.0]).unwrap();
        assert_eq!(index.search(&[1.0], 10).len(), 1);
        assert!(VectorIndex::new().search(&[1.0], 2).is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new();
        index.insert(chunk("a", "https://a", 0), vec![1.0, 0.0]).unwrap();
        let err = index.insert(chunk("b", "https://a", 1), vec![1.0]).unwrap_err();
        assert!(matches!(err, HeraldError::InvalidInput(_)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_sources_are_distinct_and_ordered() {
        let mut index = VectorIndex::new();
        index
            .extend(
                vec![
                    chunk("1", "https://b", 0),
                    chunk("2", "https://a", 0),
                    chunk("3", "https://b", 800),
                ],
                vec![vec![1.0], vec![1.0], vec![1.0]],
            )
            .unwrap();
        assert_eq!(index.sources(), vec!["https://b", "https://a"]);
    }
}
