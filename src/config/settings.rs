//! Configuration settings for Herald.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub embedding: EmbeddingSettings,
    pub cache: CacheSettings,
    pub indexing: IndexingSettings,
    pub retrieval: RetrievalSettings,
    pub agent: AgentSettings,
    pub transcription: TranscriptionSettings,
    pub menu: MenuSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (staged audio).
    pub temp_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.herald".to_string(),
            temp_dir: "/tmp/herald".to_string(),
        }
    }
}

/// Settings shared by every OpenAI client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use. Also the cache namespace.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Maximum texts per provider request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 100,
        }
    }
}

/// Backend for the durable embedding cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One file per entry under a directory.
    #[default]
    File,
    /// Single SQLite database.
    Sqlite,
    /// Process-local, nothing persisted.
    Memory,
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(CacheBackend::File),
            "sqlite" => Ok(CacheBackend::Sqlite),
            "memory" => Ok(CacheBackend::Memory),
            _ => Err(format!("Unknown cache backend: {}", s)),
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::File => write!(f, "file"),
            CacheBackend::Sqlite => write!(f, "sqlite"),
            CacheBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Embedding cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    /// Directory for the file backend.
    pub dir: String,
    /// Database path for the sqlite backend.
    pub sqlite_path: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            dir: "~/.herald/cache".to_string(),
            sqlite_path: "~/.herald/embeddings.db".to_string(),
        }
    }
}

/// Document fetching, chunking and index memoization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    /// Chunk window in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Maximum URLs fetched at once.
    pub max_concurrent_fetches: usize,
    /// Per-request fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// User agent sent with document requests.
    pub user_agent: String,
    /// Number of built indexes kept in memory.
    pub index_cache_capacity: usize,
    /// Optional age limit for memoized indexes, in seconds.
    pub index_cache_ttl_secs: Option<u64>,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_concurrent_fetches: 4,
            fetch_timeout_secs: 30,
            user_agent: concat!("herald/", env!("CARGO_PKG_VERSION")).to_string(),
            index_cache_capacity: 8,
            index_cache_ttl_secs: None,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks returned per retrieval.
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 2 }
    }
}

/// Answer agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Chat model used for answers.
    pub model: String,
    pub temperature: f32,
    /// Maximum tokens per model turn.
    pub max_tokens: u32,
    /// Maximum model turns per question.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            max_iterations: 15,
        }
    }
}

/// A transcription backend that can appear in the fallback order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptionBackendKind {
    /// AssemblyAI job API with polling.
    Assemblyai,
    /// OpenAI hosted Whisper.
    Openai,
    /// Locally installed Whisper CLI.
    LocalWhisper,
}

impl std::str::FromStr for TranscriptionBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assemblyai" => Ok(TranscriptionBackendKind::Assemblyai),
            "openai" | "whisper-api" => Ok(TranscriptionBackendKind::Openai),
            "local-whisper" | "local" | "whisper" => Ok(TranscriptionBackendKind::LocalWhisper),
            _ => Err(format!("Unknown transcription backend: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionBackendKind::Assemblyai => write!(f, "assemblyai"),
            TranscriptionBackendKind::Openai => write!(f, "openai"),
            TranscriptionBackendKind::LocalWhisper => write!(f, "local-whisper"),
        }
    }
}

/// AssemblyAI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyAISettings {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub speech_model: String,
}

impl Default for AssemblyAISettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.assemblyai.com/v2".to_string(),
            api_key_env: "ASSEMBLYAI_API_KEY".to_string(),
            speech_model: "universal-2".to_string(),
        }
    }
}

/// Local Whisper CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalWhisperSettings {
    /// Executable name or path.
    pub command: String,
    pub model: String,
    pub language: String,
}

impl Default for LocalWhisperSettings {
    fn default() -> Self {
        Self {
            command: "whisper".to_string(),
            model: "base".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Backends tried in order until one succeeds.
    pub backends: Vec<TranscriptionBackendKind>,
    /// Delay between job status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Give up on a remote job after this many seconds. 0 waits forever.
    pub max_wait_secs: u64,
    /// OpenAI hosted transcription model.
    pub openai_model: String,
    /// Spoken language hint for OpenAI transcription (ISO-639-1).
    pub openai_language: String,
    pub assemblyai: AssemblyAISettings,
    pub local_whisper: LocalWhisperSettings,
    /// Run an LLM pass that fixes obvious transcription mistakes.
    pub correct: bool,
    /// Model used for correction.
    pub correction_model: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            backends: vec![
                TranscriptionBackendKind::Assemblyai,
                TranscriptionBackendKind::LocalWhisper,
            ],
            poll_interval_ms: 1000,
            max_wait_secs: 300,
            openai_model: "whisper-1".to_string(),
            openai_language: "en".to_string(),
            assemblyai: AssemblyAISettings::default(),
            local_whisper: LocalWhisperSettings::default(),
            correct: false,
            correction_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl TranscriptionSettings {
    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Maximum wait for a remote job, `None` when unbounded.
    pub fn max_wait(&self) -> Option<Duration> {
        (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs))
    }
}

/// Restaurant/menu generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuSettings {
    pub model: String,
    pub temperature: f32,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::HeraldError;

        if self.indexing.chunk_size == 0 {
            return Err(HeraldError::Config("indexing.chunk_size must be positive".to_string()));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(HeraldError::Config(format!(
                "indexing.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(HeraldError::Config("embedding.batch_size must be positive".to_string()));
        }
        if self.transcription.backends.is_empty() {
            return Err(HeraldError::Config(
                "transcription.backends must list at least one backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HeraldError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("herald")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded embedding cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        Self::expand_path(&self.cache.dir)
    }

    /// Get the expanded SQLite cache path.
    pub fn cache_sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.cache.sqlite_path)
    }
}
