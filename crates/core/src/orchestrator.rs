//! The extraction fallback chain.
//!
//! Methods run strictly one after another in priority order: remote LLM
//! extraction, the site rule for the page host, then generic scoring. Each
//! method is bounded by [`ExtractionConfig::method_timeout`]. The first method
//! to produce a non-empty record wins and nothing after it runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use recital_core::{Orchestrator, RecitalConfig};
//!
//! # async fn run() -> recital_core::Result<()> {
//! let orchestrator = Orchestrator::new(&RecitalConfig::default());
//! let article = orchestrator.extract("https://example.com/post", "<html>...</html>", None).await?;
//! println!("{}", article.title);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::article::{ArticleRecord, PageContext};
use crate::config::{ExtractionConfig, RecitalConfig};
use crate::heuristic;
use crate::remote::RemoteClient;
use crate::{RecitalError, Result};

/// Extraction methods in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MethodKind {
    RemoteLlm,
    SiteSpecific,
    GenericHeuristic,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RemoteLlm => "remote LLM",
            Self::SiteSpecific => "site-specific",
            Self::GenericHeuristic => "generic heuristic",
        };
        f.write_str(name)
    }
}

/// What one method produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(ArticleRecord),
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionAttempt {
    pub method: MethodKind,
    pub outcome: AttemptOutcome,
}

/// One step of the fallback chain.
///
/// Returning [`RecitalError::HeuristicEmpty`] records the attempt as `Empty`;
/// any other error records it as `Failed`.
#[async_trait]
pub trait ExtractionMethod: Send + Sync {
    fn kind(&self) -> MethodKind;

    async fn extract(&self, page: &PageContext) -> Result<ArticleRecord>;
}

pub struct RemoteMethod {
    client: RemoteClient,
}

impl RemoteMethod {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionMethod for RemoteMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::RemoteLlm
    }

    async fn extract(&self, page: &PageContext) -> Result<ArticleRecord> {
        self.client.extract_remote(page).await
    }
}

/// Heuristic tier run on a blocking thread; DOM parsing is CPU-bound.
pub struct HeuristicMethod {
    kind: MethodKind,
    min_length: usize,
}

impl HeuristicMethod {
    pub fn site_specific(min_length: usize) -> Self {
        Self { kind: MethodKind::SiteSpecific, min_length }
    }

    pub fn generic(min_length: usize) -> Self {
        Self { kind: MethodKind::GenericHeuristic, min_length }
    }
}

#[async_trait]
impl ExtractionMethod for HeuristicMethod {
    fn kind(&self) -> MethodKind {
        self.kind
    }

    async fn extract(&self, page: &PageContext) -> Result<ArticleRecord> {
        let page = page.clone();
        let (kind, min_length) = (self.kind, self.min_length);

        let record = tokio::task::spawn_blocking(move || match kind {
            MethodKind::SiteSpecific => heuristic::extract_site_specific(&page, min_length),
            _ => heuristic::extract_generic(&page, min_length),
        })
        .await
        .map_err(|e| RecitalError::HtmlParseError(format!("heuristic task failed: {}", e)))?;

        record.ok_or(RecitalError::HeuristicEmpty)
    }
}

/// Runs extraction methods in order until one succeeds.
#[derive(Clone)]
pub struct Orchestrator {
    methods: Vec<Arc<dyn ExtractionMethod>>,
    config: ExtractionConfig,
}

impl Orchestrator {
    /// Builds the standard chain from `config`.
    pub fn new(config: &RecitalConfig) -> Self {
        let extraction = config.extraction.clone();
        let min_length = extraction.min_content_length;

        let mut methods: Vec<Arc<dyn ExtractionMethod>> = Vec::new();
        if extraction.remote_enabled {
            methods.push(Arc::new(RemoteMethod::new(RemoteClient::new(&config.remote))));
        }
        methods.push(Arc::new(HeuristicMethod::site_specific(min_length)));
        methods.push(Arc::new(HeuristicMethod::generic(min_length)));

        Self { methods, config: extraction }
    }

    /// Uses a custom method chain, tried in the given order.
    pub fn with_methods(methods: Vec<Arc<dyn ExtractionMethod>>, config: ExtractionConfig) -> Self {
        Self { methods, config }
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodKind> + '_ {
        self.methods.iter().map(|m| m.kind())
    }

    /// Extracts the article of one page.
    ///
    /// # Errors
    ///
    /// [`RecitalError::ExtractionFailed`] when every method fails or comes back
    /// empty. With fallback disabled, the first method's own error is returned.
    pub async fn extract(&self, url: &str, markup: &str, title_hint: Option<&str>) -> Result<ArticleRecord> {
        self.extract_with_report(url, markup, title_hint).await.map(|(article, _)| article)
    }

    /// Like [`Orchestrator::extract`], also returning every attempt made.
    pub async fn extract_with_report(
        &self, url: &str, markup: &str, title_hint: Option<&str>,
    ) -> Result<(ArticleRecord, Vec<ExtractionAttempt>)> {
        let page = PageContext::new(url, markup, title_hint.map(str::to_string));
        let mut attempts = Vec::with_capacity(self.methods.len());

        let timeout_ms = u64::try_from(self.config.method_timeout.as_millis()).unwrap_or(u64::MAX);
        for method in &self.methods {
            let kind = method.kind();
            let result = match tokio::time::timeout(self.config.method_timeout, method.extract(&page)).await {
                Ok(result) => result,
                Err(_) => Err(RecitalError::Timeout { timeout_ms }),
            };

            let outcome = match result {
                Ok(record) if !record.is_empty_for(self.config.min_content_length) => {
                    tracing::info!(method = %kind, title = %record.title, chars = record.text_length(), "extraction succeeded");
                    attempts.push(ExtractionAttempt { method: kind, outcome: AttemptOutcome::Success(record.clone()) });
                    return Ok((record, attempts));
                }
                Ok(_) | Err(RecitalError::HeuristicEmpty) => {
                    tracing::debug!(method = %kind, "extraction came back empty");
                    AttemptOutcome::Empty
                }
                Err(err) => {
                    if kind == MethodKind::RemoteLlm {
                        tracing::warn!(method = %kind, error = %err, "extraction failed");
                    } else {
                        tracing::debug!(method = %kind, error = %err, "extraction failed");
                    }
                    if !self.config.fallback_enabled {
                        return Err(err);
                    }
                    AttemptOutcome::Failed(err.to_string())
                }
            };

            attempts.push(ExtractionAttempt { method: kind, outcome });
            if !self.config.fallback_enabled {
                break;
            }
        }

        Err(RecitalError::ExtractionFailed { attempts })
    }
}
