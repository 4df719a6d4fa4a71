//! Message protocol between a page client and the reader service.
//!
//! Requests carry an `action` tag; every reply is `{ success, ... }` with an
//! `error` string on failure. [`ReaderService`] owns one [`ReaderSession`] per
//! client, and a [`Transport`] carries messages to it. [`LocalTransport`] is
//! the in-process implementation.
//!
//! ```json
//! {"action": "extractContent", "url": "https://example.com/a", "html": "<html>...</html>"}
//! {"success": true, "article": {"title": "...", "textContent": "...", ...}}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::article::ArticleRecord;
use crate::config::{RecitalConfig, SpeechConfig};
use crate::highlight::TextBuffer;
use crate::orchestrator::Orchestrator;
use crate::session::{SessionId, SessionStore};
use crate::speech::{PlaybackState, SpeechController, SpeechEngine};
use crate::{RecitalError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Extract the article of a page and keep it in the session.
    #[serde(alias = "activateReaderMode")]
    ExtractContent {
        url: String,
        #[serde(default)]
        html: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    /// Read arbitrary text aloud.
    #[serde(alias = "readAloudSelection")]
    ReadSelection { text: String },
    /// Read `text`, or the session's article when absent.
    ReadAloudPage {
        #[serde(default)]
        text: Option<String>,
    },
    PauseSpeech,
    ResumeSpeech,
    StopSpeech,
    SetSpeechOptions {
        #[serde(default)]
        rate: Option<f32>,
        #[serde(default)]
        pitch: Option<f32>,
        #[serde(default)]
        voice: Option<String>,
    },
    /// Stop speech and drop the session.
    CloseReader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self { success: true, article: None, state: None, error: None }
    }

    pub fn with_article(article: ArticleRecord) -> Self {
        Self { article: Some(article), ..Self::ok() }
    }

    pub fn with_state(state: PlaybackState) -> Self {
        Self { state: Some(state.to_string()), ..Self::ok() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, article: None, state: None, error: Some(message.into()) }
    }
}

/// Carries requests from a client to a reader service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, session: SessionId, request: Request) -> Response;
}

/// Reader state of one client.
pub struct ReaderSession {
    pub article: Option<ArticleRecord>,
    pub controller: SpeechController<TextBuffer>,
}

impl ReaderSession {
    pub fn new(engine: Arc<dyn SpeechEngine>, speech: &SpeechConfig) -> Self {
        Self { article: None, controller: SpeechController::new(engine, TextBuffer::default(), speech) }
    }
}

/// Handles protocol requests for many sessions.
pub struct ReaderService {
    orchestrator: Orchestrator,
    engine: Arc<dyn SpeechEngine>,
    speech: SpeechConfig,
    sessions: SessionStore<ReaderSession>,
}

impl ReaderService {
    pub fn new(config: &RecitalConfig, engine: Arc<dyn SpeechEngine>) -> Self {
        Self::with_orchestrator(Orchestrator::new(config), engine, config.speech.clone())
    }

    pub fn with_orchestrator(orchestrator: Orchestrator, engine: Arc<dyn SpeechEngine>, speech: SpeechConfig) -> Self {
        Self { orchestrator, engine, speech, sessions: SessionStore::new() }
    }

    /// Opens an empty session.
    pub fn open_session(&mut self) -> SessionId {
        let session = self.new_session();
        self.sessions.create(session)
    }

    pub fn session(&self, id: &SessionId) -> Result<&ReaderSession> {
        self.sessions.get(id)
    }

    pub fn session_mut(&mut self, id: &SessionId) -> Result<&mut ReaderSession> {
        self.sessions.get_mut(id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Handles one request. Failures become `{ success: false, error }`.
    pub async fn handle(&mut self, id: SessionId, request: Request) -> Response {
        match self.dispatch(id, request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(session = %id, kind = err.kind(), error = %err, "request failed");
                Response::failure(err.to_string())
            }
        }
    }

    /// Applies queued speech events of one session.
    pub fn pump(&mut self, id: &SessionId) -> Result<PlaybackState> {
        let session = self.sessions.get_mut(id)?;
        session.controller.drain_events();
        Ok(session.controller.state())
    }

    fn new_session(&self) -> ReaderSession {
        ReaderSession::new(self.engine.clone(), &self.speech)
    }

    fn session_or_create(&mut self, id: SessionId) -> &mut ReaderSession {
        let (engine, speech) = (self.engine.clone(), &self.speech);
        self.sessions.get_or_insert_with(id, || ReaderSession::new(engine, speech))
    }

    /// Stops every other session that still holds an utterance.
    ///
    /// Sessions share one engine, and a new utterance replaces whatever the
    /// engine was speaking.
    async fn stop_other_sessions(&mut self, id: SessionId) {
        for (other, session) in self.sessions.iter_mut() {
            if *other != id && session.controller.is_active() {
                session.controller.stop().await;
                tracing::info!(session = %other, "speech stopped for another session");
            }
        }
    }

    async fn dispatch(&mut self, id: SessionId, request: Request) -> Result<Response> {
        match request {
            Request::ExtractContent { url, html, title } => {
                let markup = match html {
                    Some(html) => html,
                    None => crate::fetch::fetch_url(&url, &crate::fetch::FetchConfig::default()).await?,
                };
                let article = self.orchestrator.extract(&url, &markup, title.as_deref()).await?;
                self.session_or_create(id).article = Some(article.clone());
                Ok(Response::with_article(article))
            }
            Request::ReadSelection { text } => {
                self.stop_other_sessions(id).await;
                let session = self.session_or_create(id);
                read(session, TextBuffer::from_text(&text), &text).await
            }
            Request::ReadAloudPage { text: Some(text) } => {
                self.stop_other_sessions(id).await;
                let session = self.session_or_create(id);
                read(session, TextBuffer::from_text(&text), &text).await
            }
            Request::ReadAloudPage { text: None } => {
                let article = self
                    .sessions
                    .get(&id)?
                    .article
                    .clone()
                    .ok_or_else(|| RecitalError::SpeechCapabilityError("no article loaded to read".to_string()))?;
                self.stop_other_sessions(id).await;
                let session = self.sessions.get_mut(&id)?;
                read(session, TextBuffer::from_html(&article.content), &article.text_content).await
            }
            Request::PauseSpeech => {
                let controller = &mut self.sessions.get_mut(&id)?.controller;
                controller.pause().await?;
                Ok(Response::with_state(controller.state()))
            }
            Request::ResumeSpeech => {
                let controller = &mut self.sessions.get_mut(&id)?.controller;
                controller.resume().await?;
                Ok(Response::with_state(controller.state()))
            }
            Request::StopSpeech => {
                let controller = &mut self.sessions.get_mut(&id)?.controller;
                controller.stop().await;
                Ok(Response::with_state(controller.state()))
            }
            Request::SetSpeechOptions { rate, pitch, voice } => {
                let controller = &mut self.sessions.get_mut(&id)?.controller;
                if let Some(rate) = rate {
                    controller.set_rate(rate).await?;
                }
                if let Some(pitch) = pitch {
                    controller.set_pitch(pitch).await?;
                }
                if voice.is_some() {
                    controller.set_voice(voice).await?;
                }
                Ok(Response::with_state(controller.state()))
            }
            Request::CloseReader => {
                let mut session =
                    self.sessions.remove(&id).ok_or_else(|| RecitalError::UnknownSession(id.to_string()))?;
                session.controller.stop().await;
                tracing::info!(session = %id, "reader closed");
                Ok(Response::ok())
            }
        }
    }
}

/// Ends any running utterance and starts reading `text` on `surface`.
async fn read(session: &mut ReaderSession, surface: TextBuffer, text: &str) -> Result<Response> {
    if text.trim().is_empty() {
        return Err(RecitalError::SpeechCapabilityError("no text to read".to_string()));
    }
    let controller = &mut session.controller;
    controller.stop().await;
    controller.replace_surface(surface)?;
    controller.start(text).await?;
    Ok(Response::with_state(controller.state()))
}

/// In-process transport over a shared service.
#[derive(Clone)]
pub struct LocalTransport {
    service: Arc<Mutex<ReaderService>>,
}

impl LocalTransport {
    pub fn new(service: ReaderService) -> Self {
        Self { service: Arc::new(Mutex::new(service)) }
    }

    pub fn service(&self) -> Arc<Mutex<ReaderService>> {
        self.service.clone()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, session: SessionId, request: Request) -> Response {
        self.service.lock().await.handle(session, request).await
    }
}
