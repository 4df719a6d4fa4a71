use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::Result;

/// An installed voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEventKind {
    /// The word starting at `char_index` of the submitted text is being spoken.
    Boundary { char_index: usize },
    End,
    Error(String),
}

/// An engine notification tagged with the utterance it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub generation: u64,
    pub kind: SpeechEventKind,
}

/// One utterance handed to an engine.
#[derive(Debug, Clone)]
pub struct UtteranceRequest {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub voice: Option<String>,
    /// Copied into every event this utterance produces.
    pub generation: u64,
    pub events: UnboundedSender<SpeechEvent>,
}

impl UtteranceRequest {
    /// Sends an event for this utterance. A closed channel is ignored.
    pub fn emit(&self, kind: SpeechEventKind) {
        let _ = self.events.send(SpeechEvent { generation: self.generation, kind });
    }
}

/// A text-to-speech capability.
///
/// `speak` returns once the utterance is queued; progress arrives as events on
/// the request's channel. An engine speaks one utterance at a time.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, request: UtteranceRequest) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Drops the current utterance. No further events are sent for it.
    async fn cancel(&self) -> Result<()>;

    async fn voices(&self) -> Result<Vec<Voice>>;
}
