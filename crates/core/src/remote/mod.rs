//! Remote extraction through an LLM-backed capability.
//!
//! Two backends share one client: an extraction service that speaks the
//! `POST /extract` contract, and direct calls to the Gemini `generateContent`
//! API. Both hand back a normalized [`ArticleRecord`]. The client sets no
//! request timeout of its own; the orchestrator bounds each call.

pub mod prompt;
pub mod response;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use crate::article::{ArticleRecord, PageContext};
use crate::config::{RemoteBackend, RemoteConfig};
use crate::{RecitalError, Result};

pub use prompt::{build_excerpt, build_prompt};
pub use response::{locate_json, parse_model_output, parse_service_reply};

/// Gemini REST root.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for remote extraction.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    backend: RemoteBackend,
    max_markup_chars: usize,
    gemini_base: String,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            http: Client::new(),
            backend: config.backend.clone(),
            max_markup_chars: config.max_markup_chars,
            gemini_base: GEMINI_API_BASE.to_string(),
        }
    }

    /// Points Gemini calls at another API root.
    pub fn with_gemini_base(mut self, base: impl Into<String>) -> Self {
        self.gemini_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether a credential or endpoint is configured.
    pub fn is_available(&self) -> bool {
        match &self.backend {
            RemoteBackend::Service { endpoint } => endpoint.as_deref().is_some_and(|e| !e.trim().is_empty()),
            RemoteBackend::Gemini { api_key, .. } => api_key.as_deref().is_some_and(|k| !k.trim().is_empty()),
        }
    }

    /// Extracts an article from `page` through the configured backend.
    ///
    /// # Errors
    ///
    /// [`RecitalError::RemoteUnavailable`] without an endpoint or key,
    /// [`RecitalError::RemoteRequestFailed`] on transport errors, non-2xx
    /// statuses, and service-reported failures, and
    /// [`RecitalError::RemoteResponseUnparsable`] when no record can be recovered.
    pub async fn extract_remote(&self, page: &PageContext) -> Result<ArticleRecord> {
        match &self.backend {
            RemoteBackend::Service { endpoint } => {
                let endpoint = endpoint
                    .as_deref()
                    .filter(|e| !e.trim().is_empty())
                    .ok_or_else(|| RecitalError::RemoteUnavailable("no extraction endpoint configured".to_string()))?;
                self.extract_via_service(endpoint, page).await
            }
            RemoteBackend::Gemini { api_key, model } => {
                let api_key = api_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| RecitalError::RemoteUnavailable("Gemini API key is not configured".to_string()))?;
                self.extract_via_gemini(api_key, model, page).await
            }
        }
    }

    async fn extract_via_service(&self, endpoint: &str, page: &PageContext) -> Result<ArticleRecord> {
        let body = json!({
            "url": page.url,
            "html": build_excerpt(&page.markup, self.max_markup_chars),
            "title": page.title_hint,
        });

        tracing::debug!(%endpoint, url = %page.url, "sending page to extraction service");
        let response = self.http.post(endpoint).json(&body).send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        parse_service_reply(&text, page)
    }

    async fn extract_via_gemini(&self, api_key: &str, model: &str, page: &PageContext) -> Result<ArticleRecord> {
        let url = format!("{}/models/{}:generateContent", self.gemini_base, model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(page, self.max_markup_chars) }] }],
        });

        tracing::debug!(%model, url = %page.url, "sending page to Gemini");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let reply: Value = serde_json::from_str(&text)
            .map_err(|e| RecitalError::RemoteResponseUnparsable(format!("invalid Gemini reply: {}", e)))?;
        let output = reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| RecitalError::RemoteResponseUnparsable("Gemini reply has no text part".to_string()))?;
        parse_model_output(output, page)
    }
}

fn transport_error(err: reqwest::Error) -> RecitalError {
    RecitalError::RemoteRequestFailed { status: err.status().map(|s| s.as_u16()), message: err.to_string() }
}

/// Non-2xx reply; the service's `error` field is used as the message when present.
fn status_error(status: StatusCode, body: &str) -> RecitalError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match &v["error"] {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("message").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    RecitalError::RemoteRequestFailed { status: Some(status.as_u16()), message }
}
