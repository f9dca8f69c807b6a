//! Retrieval over a built vector index.
//!
//! The retriever embeds a query, ranks the index, and renders the hits
//! with their provenance for the answer model.

mod retriever;

pub use retriever::{format_results, Retriever, DEFAULT_K};
