//! Test doubles shared by unit tests.

use crate::agent::{ChatMessage, ChatModel, ModelEvent, ModelStream, ToolSpec};
use crate::config::{Prompts, Settings};
use crate::embedding::store::MemoryStore;
use crate::embedding::{CachedEmbedder, Embedder};
use crate::error::{HeraldError, Result};
use crate::fetch::{Document, DocumentFetcher};
use crate::menu::MenuGenerator;
use crate::transcription::{
    JobStatus, Transcriber, TranscriptionBackend, TranscriptionJob, TranscriptionProvider,
    TranscriptionService,
};
use crate::Herald;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Deterministic embedder that counts provider calls.
pub struct CountingEmbedder {
    calls: AtomicUsize,
    texts: AtomicUsize,
    fail: bool,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Embedder whose every call fails with a provider error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Vector this embedder returns for `text`.
    ///
    /// Counts a few keywords so related texts land close together.
    pub fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let count = |word: &str| lower.matches(word).count() as f32;
        vec![
            1.0,
            count("payout") + count("production"),
            count("market") + count("autos"),
            (text.len() % 7) as f32 * 0.01,
            (text.bytes().map(u32::from).sum::<u32>() % 101) as f32 * 0.001,
        ]
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| HeraldError::Provider("empty".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HeraldError::Provider("provider unavailable".to_string()));
        }
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        5
    }

    fn model_name(&self) -> &str {
        "counting-model"
    }
}

/// Fetcher serving canned documents; unknown URLs fail.
#[derive(Default)]
pub struct MapFetcher {
    documents: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, text: &str) -> Self {
        self.documents.insert(url.to_string(), text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Document> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(url)
            .map(|text| Document::new(url, text.as_str()))
            .ok_or_else(|| HeraldError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

/// Chat model that plays back one scripted event list per turn.
pub struct ScriptedChatModel {
    turns: Mutex<VecDeque<Vec<ModelEvent>>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
    stream_error: bool,
}

impl ScriptedChatModel {
    pub fn new(turns: Vec<Vec<ModelEvent>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            seen: Mutex::new(Vec::new()),
            stream_error: false,
        }
    }

    /// End every turn with a model error instead of a clean finish.
    pub fn with_stream_error(mut self) -> Self {
        self.stream_error = true;
        self
    }

    /// Conversations passed to each turn, in order.
    pub fn seen_messages(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn stream_turn(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ModelStream> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let events = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| HeraldError::Model("script exhausted".to_string()))?;

        let mut items: Vec<Result<ModelEvent>> = events.into_iter().map(Ok).collect();
        if self.stream_error {
            items.push(Err(HeraldError::Model("connection reset".to_string())));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Remote provider that walks through a fixed list of job states.
///
/// `submit` returns the first state and each `poll` the next; the last
/// state repeats once the list runs out.
pub struct ScriptedProvider {
    states: Vec<(JobStatus, Option<String>)>,
    submits: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(states: Vec<(JobStatus, Option<&str>)>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|(status, text)| (status, text.map(str::to_string)))
                .collect(),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    fn job(&self, step: usize) -> Result<TranscriptionJob> {
        let (status, text) = self
            .states
            .get(step)
            .or_else(|| self.states.last())
            .cloned()
            .ok_or_else(|| HeraldError::Transcription("empty script".to_string()))?;
        Ok(TranscriptionJob {
            id: "job-1".to_string(),
            status,
            text,
            error: (status == JobStatus::Error).then(|| "audio unreadable".to_string()),
        })
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, _audio_path: &Path) -> Result<TranscriptionJob> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.job(0)
    }

    async fn poll(&self, _job_id: &str) -> Result<TranscriptionJob> {
        let step = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        self.job(step)
    }
}

/// Transcriber with a fixed outcome that records the files it was given.
pub struct RecordingTranscriber {
    outcome: std::result::Result<String, String>,
    paths: Mutex<Vec<PathBuf>>,
}

impl RecordingTranscriber {
    pub fn new(outcome: std::result::Result<&str, &str>) -> Self {
        Self {
            outcome: outcome.map(str::to_string).map_err(str::to_string),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.paths.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for RecordingTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        assert!(audio_path.exists(), "staged audio missing during transcription");
        self.paths.lock().unwrap().push(audio_path.to_path_buf());
        self.outcome
            .clone()
            .map_err(HeraldError::Transcription)
    }
}

/// Pipeline wired to test doubles. Spoken questions transcribe to
/// "what are the key highlights"; temp audio goes under `dir`.
pub fn test_herald(model: Arc<ScriptedChatModel>, fetcher: Arc<MapFetcher>, dir: &Path) -> Herald {
    let embedder = Arc::new(CachedEmbedder::new(
        Arc::new(CountingEmbedder::new()),
        Arc::new(MemoryStore::new()),
    ));
    let transcription = TranscriptionService::new(
        vec![TranscriptionBackend::new(
            "local",
            Arc::new(RecordingTranscriber::new(Ok("what are the key highlights"))),
        )],
        dir,
    );
    let menu = MenuGenerator::new(model.clone(), Prompts::default());

    Herald::with_components(
        Settings::default(),
        Prompts::default(),
        fetcher,
        embedder,
        model,
        transcription,
        menu,
    )
}
