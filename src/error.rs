//! Error types for Herald.

use thiserror::Error;

/// Library-level error type for Herald operations.
#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single URL could not be fetched or produced no text.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Every requested URL failed, so there is nothing to index.
    #[error("No documents could be indexed ({} URL(s) failed)", failures.len())]
    IndexEmpty { failures: Vec<String> },

    /// Embedding or completion provider was unavailable or returned garbage.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// The answer model failed mid-conversation.
    #[error("Model error: {0}")]
    Model(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Embedding cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Herald operations.
pub type Result<T> = std::result::Result<T, HeraldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_empty_message_counts_failures() {
        let err = HeraldError::IndexEmpty {
            failures: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "No documents could be indexed (2 URL(s) failed)");
    }
}
