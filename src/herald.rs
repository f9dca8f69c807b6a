//! Component wiring.
//!
//! [`Herald`] owns one instance of every pipeline component, built from
//! [`Settings`] once at startup and shared by the CLI and the HTTP server.

use crate::agent::{AnswerAgent, ChatModel, OpenAIChatModel, RetrieveTool, ToolSet};
use crate::config::{Prompts, Settings};
use crate::embedding::store::open_store;
use crate::embedding::{CachedEmbedder, Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::fetch::{DocumentFetcher, HttpFetcher};
use crate::indexer::{DocumentIndexer, IndexBuild};
use crate::menu::{Menu, MenuGenerator};
use crate::rag::Retriever;
use crate::transcription::{TranscriptCorrector, TranscriptionService};
use crate::vector_store::SearchResult;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// A streamed answer together with the index it was answered from.
pub struct Answer {
    pub build: Arc<IndexBuild>,
    /// Cumulative answer text; the last item is the full answer.
    pub stream: BoxStream<'static, Result<String>>,
}

/// The research pipeline.
pub struct Herald {
    settings: Settings,
    prompts: Prompts,
    indexer: DocumentIndexer,
    chat_model: Arc<dyn ChatModel>,
    transcription: Arc<TranscriptionService>,
    menu: MenuGenerator,
}

impl Herald {
    /// Build every component from settings.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let timeout = Duration::from_secs(settings.openai.timeout_secs.max(1));

        let provider = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
            timeout,
        )?);
        let embedder: Arc<dyn Embedder> = Arc::new(
            CachedEmbedder::new(provider, open_store(&settings)?)
                .with_batch_size(settings.embedding.batch_size),
        );
        let fetcher: Arc<dyn DocumentFetcher> = Arc::new(HttpFetcher::from_settings(&settings.indexing)?);

        let chat_model: Arc<dyn ChatModel> =
            Arc::new(OpenAIChatModel::from_settings(&settings.agent, timeout)?);

        let mut transcription = TranscriptionService::from_settings(&settings)?;
        if settings.transcription.correct {
            let model = OpenAIChatModel::new(&settings.transcription.correction_model, 0.0, timeout)?;
            transcription = transcription.with_corrector(TranscriptCorrector::new(Arc::new(model), prompts.clone()));
        }

        let menu_model = OpenAIChatModel::new(&settings.menu.model, settings.menu.temperature, timeout)?;
        let menu = MenuGenerator::new(Arc::new(menu_model), prompts.clone());

        info!(
            "Herald ready (embedding model {}, answer model {}, cache {})",
            settings.embedding.model, settings.agent.model, settings.cache.backend
        );

        Ok(Self::with_components(
            settings,
            prompts,
            fetcher,
            embedder,
            chat_model,
            transcription,
            menu,
        ))
    }

    /// Assemble from prebuilt components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        fetcher: Arc<dyn DocumentFetcher>,
        embedder: Arc<dyn Embedder>,
        chat_model: Arc<dyn ChatModel>,
        transcription: TranscriptionService,
        menu: MenuGenerator,
    ) -> Self {
        let indexer = DocumentIndexer::from_settings(&settings, fetcher, embedder);
        Self {
            settings,
            prompts,
            indexer,
            chat_model,
            transcription: Arc::new(transcription),
            menu,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transcription(&self) -> Arc<TranscriptionService> {
        self.transcription.clone()
    }

    /// Build (or reuse) the index for `urls`.
    pub async fn index(&self, urls: &[String]) -> Result<Arc<IndexBuild>> {
        self.indexer.build_index(urls).await
    }

    /// Retriever over the index for `urls`.
    pub async fn retriever(&self, urls: &[String]) -> Result<(Retriever, Arc<IndexBuild>)> {
        let build = self.index(urls).await?;
        let retriever = Retriever::new(build.index.clone(), self.indexer.embedder())
            .with_k(self.settings.retrieval.k);
        Ok((retriever, build))
    }

    /// Top-k chunks for `query`. `k` defaults to the configured value.
    #[instrument(skip(self, urls))]
    pub async fn search(&self, urls: &[String], query: &str, k: Option<usize>) -> Result<Vec<SearchResult>> {
        let (retriever, _) = self.retriever(urls).await?;
        let k = k.unwrap_or(retriever.k());
        retriever.retrieve(query, k).await
    }

    /// Answer `question` from the articles at `urls`.
    #[instrument(skip(self, urls))]
    pub async fn ask(&self, urls: &[String], question: &str) -> Result<Answer> {
        let (retriever, build) = self.retriever(urls).await?;
        let tools = ToolSet::new().with(Arc::new(RetrieveTool::new(retriever)));
        let system_prompt = self
            .prompts
            .render_with_custom(&self.prompts.agent.system, &HashMap::new());

        let agent = AnswerAgent::new(self.chat_model.clone(), tools, &system_prompt)
            .with_max_iterations(self.settings.agent.max_iterations);

        Ok(Answer {
            build,
            stream: agent.answer(question),
        })
    }

    /// Transcribe raw audio bytes.
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.transcription.transcribe(audio).await
    }

    /// Transcribe an audio file.
    pub async fn transcribe_file(&self, path: &Path) -> Result<String> {
        self.transcription.transcribe_file(path).await
    }

    /// Generate a restaurant name and menu.
    pub async fn menu(&self, cuisine: &str) -> Result<Menu> {
        self.menu.generate(cuisine).await
    }
}
