//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for indexing, search, streamed answers,
//! transcription and menu generation. One [`Herald`] (and so one index
//! cache) serves every request.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::HeraldError;
use crate::fetch::FetchFailure;
use crate::Herald;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Largest accepted audio upload.
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let herald = Arc::new(Herald::from_settings(settings)?);
    let app = router(herald);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Herald API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Index", "POST /index");
    Output::kv("Search", "POST /search");
    Output::kv("Ask (streamed)", "POST /ask");
    Output::kv("Transcribe", "POST /transcribe");
    Output::kv("Menu", "POST /menu");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router around a shared pipeline.
pub fn router(herald: Arc<Herald>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/index", post(index))
        .route("/search", post(search))
        .route("/ask", post(ask))
        .route(
            "/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/menu", post(menu))
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .with_state(herald)
}

/// Tag each request with an id, in logs and in the `x-request-id` header.
async fn request_id(req: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    let span = info_span!("request", id = %id, method = %req.method(), path = %req.uri().path());

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct IndexRequest {
    urls: Vec<String>,
}

#[derive(Serialize)]
struct IndexResponse {
    chunks: usize,
    built_at: DateTime<Utc>,
    sources: Vec<String>,
    warnings: Vec<FetchFailure>,
}

#[derive(Deserialize)]
struct SearchRequest {
    urls: Vec<String>,
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Serialize)]
struct SearchHit {
    source: String,
    start_index: usize,
    content: String,
    score: f32,
}

#[derive(Deserialize)]
struct AskRequest {
    urls: Vec<String>,
    question: String,
}

#[derive(Serialize)]
struct TranscribeResponse {
    text: String,
}

#[derive(Deserialize)]
struct MenuRequest {
    cuisine: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    /// Per-URL reasons when nothing could be indexed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<String>,
}

fn error_response(e: HeraldError) -> Response {
    let status = match &e {
        HeraldError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        HeraldError::IndexEmpty { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        HeraldError::Fetch { .. } | HeraldError::Provider(_) | HeraldError::Model(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Request failed ({}): {}", status, e);

    let error = e.to_string();
    let failures = match e {
        HeraldError::IndexEmpty { failures } => failures,
        _ => Vec::new(),
    };
    (status, Json(ErrorResponse { error, failures })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn index(State(herald): State<Arc<Herald>>, Json(req): Json<IndexRequest>) -> Response {
    match herald.index(&req.urls).await {
        Ok(build) => Json(IndexResponse {
            chunks: build.index.len(),
            built_at: build.index.built_at(),
            sources: build.index.sources().into_iter().map(str::to_string).collect(),
            warnings: build.warnings.clone(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn search(State(herald): State<Arc<Herald>>, Json(req): Json<SearchRequest>) -> Response {
    match herald.search(&req.urls, &req.query, req.k).await {
        Ok(results) => Json(SearchResponse {
            results: results
                .into_iter()
                .map(|r| SearchHit {
                    source: r.chunk.source_url().unwrap_or_default().to_string(),
                    start_index: r.chunk.start_offset,
                    content: r.chunk.text,
                    score: r.score,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Stream the answer as plain-text deltas.
///
/// Index failures are reported as JSON before streaming starts. A model
/// failure mid-answer aborts the body.
async fn ask(State(herald): State<Arc<Herald>>, Json(req): Json<AskRequest>) -> Response {
    let answer = match herald.ask(&req.urls, &req.question).await {
        Ok(answer) => answer,
        Err(e) => return error_response(e),
    };
    info!(
        "Streaming answer from {} chunks ({} URL(s) skipped)",
        answer.build.index.len(),
        answer.build.warnings.len()
    );

    let deltas = answer.stream.scan(0usize, |sent, item| {
        let delta = item.map(|text| {
            let delta = text.get(*sent..).unwrap_or_default().to_string();
            *sent = text.len();
            delta
        });
        futures::future::ready(Some(delta))
    });

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(deltas),
    )
        .into_response()
}

async fn transcribe(State(herald): State<Arc<Herald>>, body: Bytes) -> Response {
    match herald.transcribe(&body).await {
        Ok(text) => Json(TranscribeResponse { text }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn menu(State(herald): State<Arc<Herald>>, Json(req): Json<MenuRequest>) -> Response {
    match herald.menu(&req.cuisine).await {
        Ok(menu) => Json(menu).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ModelEvent, ToolInvocation};
    use crate::testing::{test_herald, MapFetcher, ScriptedChatModel};

    const URL: &str = "https://news.example.com/autos";

    /// Serve `herald` on an ephemeral port and return its base URL.
    async fn spawn(herald: Herald) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(herald))).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health_has_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let herald = test_herald(
            Arc::new(ScriptedChatModel::new(Vec::new())),
            Arc::new(MapFetcher::new()),
            dir.path(),
        );
        let base = spawn(herald).await;

        let response = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_index_reports_skipped_urls() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::new().with(URL, "Autos sales rose."));
        let herald = test_herald(Arc::new(ScriptedChatModel::new(Vec::new())), fetcher, dir.path());
        let base = spawn(herald).await;

        let body: serde_json::Value = reqwest::Client::new()
            .post(format!("{}/index", base))
            .json(&serde_json::json!({ "urls": [URL, "https://news.example.com/missing"] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["chunks"], 1);
        assert_eq!(body["sources"][0], URL);
        assert_eq!(body["warnings"][0]["url"], "https://news.example.com/missing");
    }

    #[tokio::test]
    async fn test_index_all_failed_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let herald = test_herald(
            Arc::new(ScriptedChatModel::new(Vec::new())),
            Arc::new(MapFetcher::new()),
            dir.path(),
        );
        let base = spawn(herald).await;

        let response = reqwest::Client::new()
            .post(format!("{}/index", base))
            .json(&serde_json::json!({ "urls": [URL] }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 422);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["failures"][0].as_str().unwrap().starts_with(URL));
    }

    #[tokio::test]
    async fn test_ask_streams_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedChatModel::new(vec![
            vec![ModelEvent::ToolCall(ToolInvocation {
                id: "call_1".to_string(),
                name: "retrieve_context".to_string(),
                arguments: r#"{"query":"autos"}"#.to_string(),
            })],
            vec![
                ModelEvent::Text("Autos sales ".to_string()),
                ModelEvent::Text("rose.".to_string()),
            ],
        ]));
        let fetcher = Arc::new(MapFetcher::new().with(URL, "Autos sales rose."));
        let base = spawn(test_herald(model, fetcher, dir.path())).await;

        let response = reqwest::Client::new()
            .post(format!("{}/ask", base))
            .json(&serde_json::json!({ "urls": [URL], "question": "How did autos do?" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(response.text().await.unwrap(), "Autos sales rose.");
    }

    #[tokio::test]
    async fn test_transcribe_raw_body() {
        let dir = tempfile::tempdir().unwrap();
        let herald = test_herald(
            Arc::new(ScriptedChatModel::new(Vec::new())),
            Arc::new(MapFetcher::new()),
            dir.path(),
        );
        let base = spawn(herald).await;

        let body: serde_json::Value = reqwest::Client::new()
            .post(format!("{}/transcribe", base))
            .body(vec![0u8; 64])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["text"], "what are the key highlights");
    }
}
