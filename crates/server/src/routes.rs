//! HTTP surface of the extraction service.
//!
//! `POST /extract` (and `/api/extract`) takes `{ url, html?, title? }` and
//! answers `{ success: true, article }` or `{ success: false, error }` with a
//! non-2xx status, including when the request deadline passes. `GET /health`
//! answers `{ status: "ok" }`.

use std::sync::Arc;

use axum::BoxError;
use axum::error_handling::HandleErrorLayer;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use recital_core::{ArticleRecord, FetchConfig, Orchestrator, RecitalError, fetch_url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

use crate::config::ServerConfig;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Used when a request carries a URL but no markup.
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: Option<String>,
    pub html: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractReply {
    pub success: bool,
    pub article: ArticleRecord,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<RecitalError> for ApiError {
    fn from(err: RecitalError) -> Self {
        let status = match &err {
            RecitalError::RemoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RecitalError::RemoteRequestFailed { .. } | RecitalError::RemoteResponseUnparsable(_) => {
                StatusCode::BAD_GATEWAY
            }
            RecitalError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RecitalError::InvalidUrl(_) | RecitalError::HtmlParseError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: rejection.status(), message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "extraction request failed");
        }
        (self.status, Json(json!({ "success": false, "error": self.message }))).into_response()
    }
}

pub fn build_router(state: SharedState, config: &ServerConfig) -> Router {
    let request_timeout = config.request_timeout;
    let layers = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(HandleErrorLayer::new(move |err: BoxError| async move { deadline_error(err, request_timeout) }))
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract))
        .route("/api/extract", post(extract))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(layers)
}

fn deadline_error(err: BoxError, deadline: std::time::Duration) -> ApiError {
    if err.is::<Elapsed>() {
        let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
        RecitalError::Timeout { timeout_ms }.into()
    } else {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: format!("Unhandled internal error: {}", err) }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn extract(
    State(state): State<SharedState>, payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractReply>, ApiError> {
    let Json(request) = payload?;
    let url = request.url.filter(|u| !u.trim().is_empty());
    let html = request.html.filter(|h| !h.trim().is_empty());

    let (url, html) = match (url, html) {
        (url, Some(html)) => (url.unwrap_or_default(), html),
        (Some(url), None) => {
            let html = fetch_url(&url, &state.fetch)
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to fetch URL: {}", e)))?;
            (url, html)
        }
        (None, None) => return Err(ApiError::bad_request("URL is required")),
    };

    let article = state.orchestrator.extract(&url, &html, request.title.as_deref()).await?;
    info!(url = %url, title = %article.title, chars = article.text_length(), "article extracted");

    Ok(Json(ExtractReply { success: true, article }))
}
