//! HTTP document fetcher.

use super::{extract_text, Document, DocumentFetcher};
use crate::config::IndexingSettings;
use crate::error::{HeraldError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Fetches articles over HTTP(S) and reduces HTML to readable text.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Create a fetcher from indexing settings.
    pub fn from_settings(settings: &IndexingSettings) -> Result<Self> {
        Self::new(
            Duration::from_secs(settings.fetch_timeout_secs),
            &settings.user_agent,
        )
    }

    fn fetch_error(url: &str, reason: impl Into<String>) -> HeraldError {
        HeraldError::Fetch {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    Text,
}

/// How to read a response body, or `None` when it is not text.
///
/// A missing content type is treated as HTML.
fn body_kind(content_type: Option<&str>) -> Option<BodyKind> {
    let Some(content_type) = content_type else {
        return Some(BodyKind::Html);
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => Some(BodyKind::Html),
        m if m.starts_with("text/") => Some(BodyKind::Text),
        _ => None,
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Document> {
        let parsed = Url::parse(url).map_err(|e| Self::fetch_error(url, format!("invalid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Self::fetch_error(
                url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Self::fetch_error(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::fetch_error(url, format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let is_html = match body_kind(content_type) {
            Some(BodyKind::Html) => true,
            Some(BodyKind::Text) => false,
            None => {
                return Err(Self::fetch_error(
                    url,
                    format!("unsupported content type '{}'", content_type.unwrap_or_default()),
                ))
            }
        };

        let body = response
            .text()
            .await
            .map_err(|e| Self::fetch_error(url, e.to_string()))?;

        let text = if is_html {
            extract_text(&body)
        } else {
            body.trim().to_string()
        };

        if text.is_empty() {
            return Err(Self::fetch_error(url, "no readable text"));
        }

        debug!("Fetched {} characters", text.chars().count());
        Ok(Document::new(url, text))
    }
}
