//! Configuration module for Herald.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, CorrectionPrompts, MenuPrompts, Prompts};
pub use settings::{
    AgentSettings, AssemblyAISettings, CacheBackend, CacheSettings, EmbeddingSettings,
    GeneralSettings, IndexingSettings, LocalWhisperSettings, MenuSettings, OpenAISettings,
    PromptSettings, RetrievalSettings, Settings, TranscriptionBackendKind, TranscriptionSettings,
};
