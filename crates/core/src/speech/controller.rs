//! Playback state machine and boundary-to-highlight synchronization.
//!
//! ```text
//! Idle --start--> Playing <--pause/resume--> Paused
//! Playing|Paused --stop--> Stopped --> Idle
//! Playing|Paused --end/error--> Idle
//! ```
//!
//! Every utterance gets a new generation number. Events from an older
//! generation are dropped, so `stop` and `start` always win over events still
//! queued in the channel.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::engine::{SpeechEngine, SpeechEvent, SpeechEventKind, UtteranceRequest};
use crate::config::SpeechConfig;
use crate::highlight::{HighlightRenderer, HighlightSurface, TextBuffer};
use crate::wordmap::WordTable;
use crate::{RecitalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// State of one reading session, mutated only by the controller.
#[derive(Debug, Clone)]
pub struct SpeechSession {
    pub state: PlaybackState,
    /// Index of the next table entry to highlight.
    pub word_cursor: usize,
    pub table: WordTable,
    pub rate: f32,
    pub pitch: f32,
    pub voice_id: Option<String>,
}

impl SpeechSession {
    fn new(config: &SpeechConfig) -> Self {
        Self {
            state: PlaybackState::Idle,
            word_cursor: 0,
            table: WordTable::default(),
            rate: SpeechConfig::clamp_rate(config.rate),
            pitch: SpeechConfig::clamp_pitch(config.pitch),
            voice_id: config.voice_id.clone(),
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Paused)
    }
}

/// Drives a [`SpeechEngine`] and keeps the highlight on the spoken word.
pub struct SpeechController<S: HighlightSurface = TextBuffer> {
    engine: Arc<dyn SpeechEngine>,
    renderer: HighlightRenderer<S>,
    session: SpeechSession,
    /// Text the current table was built from.
    text: Option<String>,
    generation: u64,
    events_tx: UnboundedSender<SpeechEvent>,
    events_rx: UnboundedReceiver<SpeechEvent>,
    last_error: Option<String>,
}

impl<S: HighlightSurface> SpeechController<S> {
    pub fn new(engine: Arc<dyn SpeechEngine>, surface: S, config: &SpeechConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            renderer: HighlightRenderer::new(surface),
            session: SpeechSession::new(config),
            text: None,
            generation: 0,
            events_tx,
            events_rx,
            last_error: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state
    }

    pub fn session(&self) -> &SpeechSession {
        &self.session
    }

    /// Whether an utterance is playing or paused.
    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn renderer(&self) -> &HighlightRenderer<S> {
        &self.renderer
    }

    /// Swaps the rendered surface; only allowed while nothing is playing.
    pub fn replace_surface(&mut self, surface: S) -> Result<S> {
        if self.session.is_active() {
            return Err(self.invalid("replace the surface"));
        }
        Ok(self.renderer.replace_surface(surface))
    }

    /// Error message of the last aborted utterance.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Starts reading `text` from its first word.
    ///
    /// The word table is reused when `text` matches the previous utterance.
    pub async fn start(&mut self, text: &str) -> Result<()> {
        if self.session.is_active() {
            return Err(self.invalid("start"));
        }

        if self.text.as_deref() != Some(text) {
            self.session.table = WordTable::build(text);
            self.text = Some(text.to_string());
        }
        self.session.word_cursor = 0;
        self.last_error = None;
        self.renderer.clear_current();

        tracing::info!(words = self.session.table.len(), "speech session started");
        self.submit(0).await?;
        self.session.state = PlaybackState::Playing;
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<()> {
        if self.session.state != PlaybackState::Playing {
            return Err(self.invalid("pause"));
        }
        if let Err(err) = self.engine.pause().await {
            return Err(self.abort(err));
        }
        self.session.state = PlaybackState::Paused;
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<()> {
        if self.session.state != PlaybackState::Paused {
            return Err(self.invalid("resume"));
        }
        if let Err(err) = self.engine.resume().await {
            return Err(self.abort(err));
        }
        self.session.state = PlaybackState::Playing;
        Ok(())
    }

    /// Cancels speech and ends the session. Valid in every state.
    pub async fn stop(&mut self) {
        if let Err(err) = self.engine.cancel().await {
            tracing::warn!(error = %err, "speech engine failed to cancel");
        }
        self.session.state = PlaybackState::Stopped;
        self.generation += 1;
        self.renderer.clear_current();
        self.session.word_cursor = 0;
        self.session.table = WordTable::default();
        self.text = None;
        self.session.state = PlaybackState::Idle;
        tracing::info!("speech session stopped");
    }

    pub async fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.session.rate = SpeechConfig::clamp_rate(rate);
        self.restart_from_sentence().await
    }

    pub async fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        self.session.pitch = SpeechConfig::clamp_pitch(pitch);
        self.restart_from_sentence().await
    }

    pub async fn set_voice(&mut self, voice_id: Option<String>) -> Result<()> {
        self.session.voice_id = voice_id;
        self.restart_from_sentence().await
    }

    /// Applies one engine event.
    pub fn handle_event(&mut self, event: SpeechEvent) {
        if event.generation != self.generation {
            tracing::debug!(event = event.generation, current = self.generation, "dropping stale speech event");
            return;
        }

        match event.kind {
            SpeechEventKind::Boundary { char_index } => {
                let cursor = self.session.word_cursor;
                let Some(entry) = self.session.table.get(cursor) else {
                    tracing::debug!(char_index, cursor, "boundary past the word table");
                    return;
                };
                let (offset, length) = (entry.start_offset, entry.length);
                self.renderer.highlight(offset, length);
                self.session.word_cursor = cursor + 1;
            }
            SpeechEventKind::End => {
                self.renderer.clear_current();
                self.session.state = PlaybackState::Idle;
                tracing::info!("speech session finished");
            }
            SpeechEventKind::Error(message) => {
                self.abort(RecitalError::SpeechCapabilityError(message));
            }
        }
    }

    /// Waits for the next event and applies it.
    pub async fn next_event(&mut self) -> Option<SpeechEvent> {
        let event = self.events_rx.recv().await?;
        self.handle_event(event.clone());
        Some(event)
    }

    /// Applies events until the utterance ends or is aborted.
    pub async fn run_until_idle(&mut self) {
        while self.session.is_active() {
            if self.next_event().await.is_none() {
                break;
            }
        }
    }

    /// Applies every event already queued without waiting.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Restarts the utterance from the first word of the current sentence.
    async fn restart_from_sentence(&mut self) -> Result<()> {
        if !self.session.is_active() {
            return Ok(());
        }
        let was_paused = self.session.state == PlaybackState::Paused;

        if let Err(err) = self.engine.cancel().await {
            return Err(self.abort(err));
        }
        self.renderer.clear_current();

        let current = self.session.word_cursor.saturating_sub(1);
        let sentence = self.session.table.sentence_start_index(current);
        let offset = self.session.table.get(sentence).map_or(0, |e| e.start_offset);
        self.session.word_cursor = sentence;

        tracing::debug!(sentence, offset, "restarting utterance");
        self.submit(offset).await?;

        if was_paused && let Err(err) = self.engine.pause().await {
            return Err(self.abort(err));
        }
        Ok(())
    }

    /// Opens a new generation and speaks the table text from char `offset`.
    async fn submit(&mut self, offset: usize) -> Result<()> {
        self.generation += 1;
        let text = self.text.as_deref().unwrap_or_default();
        let byte = text.char_indices().nth(offset).map_or(text.len(), |(b, _)| b);

        let request = UtteranceRequest {
            text: text[byte..].to_string(),
            rate: self.session.rate,
            pitch: self.session.pitch,
            voice: self.session.voice_id.clone(),
            generation: self.generation,
            events: self.events_tx.clone(),
        };

        match self.engine.speak(request).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.abort(err)),
        }
    }

    /// Resets playback after an engine failure and keeps the message.
    fn abort(&mut self, err: RecitalError) -> RecitalError {
        tracing::warn!(error = %err, "speech aborted");
        self.renderer.clear_current();
        self.session.state = PlaybackState::Idle;
        self.last_error = Some(err.to_string());
        err
    }

    fn invalid(&self, action: &'static str) -> RecitalError {
        RecitalError::InvalidTransition { from: self.session.state.to_string(), action }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::speech::engine::Voice;

    /// Records calls and exposes the last request so tests can emit events.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        last: Mutex<Option<UtteranceRequest>>,
        fail_speak: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn last(&self) -> UtteranceRequest {
            self.last.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl SpeechEngine for Recorder {
        async fn speak(&self, request: UtteranceRequest) -> Result<()> {
            self.calls.lock().unwrap().push(format!("speak:{}", request.text));
            if self.fail_speak {
                return Err(RecitalError::SpeechCapabilityError("no voices".into()));
            }
            *self.last.lock().unwrap() = Some(request);
            Ok(())
        }

        async fn pause(&self) -> Result<()> {
            self.calls.lock().unwrap().push("pause".into());
            Ok(())
        }

        async fn resume(&self) -> Result<()> {
            self.calls.lock().unwrap().push("resume".into());
            Ok(())
        }

        async fn cancel(&self) -> Result<()> {
            self.calls.lock().unwrap().push("cancel".into());
            Ok(())
        }

        async fn voices(&self) -> Result<Vec<Voice>> {
            Ok(Vec::new())
        }
    }

    const TEXT: &str = "Hello, world! This is Reader Mode.";

    fn controller(text: &str) -> (SpeechController, Arc<Recorder>) {
        let engine = Arc::new(Recorder::default());
        let controller = SpeechController::new(engine.clone(), TextBuffer::from_text(text), &SpeechConfig::default());
        (controller, engine)
    }

    fn boundary(generation: u64) -> SpeechEvent {
        SpeechEvent { generation, kind: SpeechEventKind::Boundary { char_index: 0 } }
    }

    #[tokio::test]
    async fn test_start_pause_resume_stop() {
        let (mut c, engine) = controller(TEXT);
        c.start(TEXT).await.unwrap();
        assert_eq!(c.state(), PlaybackState::Playing);

        c.handle_event(boundary(c.generation()));
        assert!(c.renderer().current().is_some());

        c.pause().await.unwrap();
        assert_eq!(c.state(), PlaybackState::Paused);
        c.resume().await.unwrap();
        assert_eq!(c.state(), PlaybackState::Playing);

        c.stop().await;
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(c.renderer().current().is_none());
        assert!(c.session().table.is_empty());
        assert_eq!(c.session().word_cursor, 0);
        assert_eq!(engine.calls(), vec![format!("speak:{TEXT}"), "pause".into(), "resume".into(), "cancel".into()]);
    }

    #[tokio::test]
    async fn test_invalid_transitions_change_nothing() {
        let (mut c, _) = controller(TEXT);
        let err = c.pause().await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot pause while idle");
        assert!(c.resume().await.is_err());
        assert_eq!(c.state(), PlaybackState::Idle);

        c.start(TEXT).await.unwrap();
        assert!(matches!(c.resume().await, Err(RecitalError::InvalidTransition { .. })));
        assert!(c.start(TEXT).await.is_err());
        assert_eq!(c.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_boundaries_walk_the_table() {
        let (mut c, _) = controller(TEXT);
        c.start(TEXT).await.unwrap();
        let generation = c.generation();

        for _ in 0..5 {
            c.handle_event(boundary(generation));
        }
        let handle = c.renderer().current().unwrap();
        assert_eq!((handle.offset, handle.length), (22, 6));
        assert_eq!(c.renderer().surface().marked_text().as_deref(), Some("Reader"));
    }

    #[tokio::test]
    async fn test_boundaries_past_table_are_ignored() {
        let text = "one two three four five";
        let (mut c, _) = controller(text);
        c.start(text).await.unwrap();
        let generation = c.generation();

        for _ in 0..5 {
            c.handle_event(boundary(generation));
        }
        let fifth = c.renderer().current().cloned().unwrap();
        c.handle_event(boundary(generation));
        c.handle_event(boundary(generation));
        assert_eq!(c.renderer().current(), Some(&fifth));
        assert_eq!(c.session().word_cursor, 5);
    }

    #[tokio::test]
    async fn test_stale_events_are_dropped() {
        let (mut c, engine) = controller(TEXT);
        c.start(TEXT).await.unwrap();
        let old = engine.last();

        c.stop().await;
        c.start(TEXT).await.unwrap();
        old.emit(SpeechEventKind::Boundary { char_index: 0 });
        old.emit(SpeechEventKind::End);
        c.drain_events();

        assert_eq!(c.state(), PlaybackState::Playing);
        assert!(c.renderer().current().is_none());
        assert_eq!(c.session().word_cursor, 0);
    }

    #[tokio::test]
    async fn test_end_and_error_return_to_idle() {
        let (mut c, engine) = controller(TEXT);
        c.start(TEXT).await.unwrap();
        engine.last().emit(SpeechEventKind::Boundary { char_index: 0 });
        engine.last().emit(SpeechEventKind::End);
        c.run_until_idle().await;
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(c.renderer().current().is_none());
        assert!(!c.session().table.is_empty());

        c.start(TEXT).await.unwrap();
        engine.last().emit(SpeechEventKind::Error("audio device lost".into()));
        c.run_until_idle().await;
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(c.last_error().unwrap().contains("audio device lost"));
    }

    #[tokio::test]
    async fn test_rate_change_restarts_sentence() {
        let (mut c, engine) = controller(TEXT);
        c.start(TEXT).await.unwrap();
        let first_generation = c.generation();
        for _ in 0..4 {
            c.handle_event(boundary(first_generation));
        }

        c.set_rate(40.0).await.unwrap();
        assert_eq!(c.session().rate, 16.0);
        assert_eq!(c.session().word_cursor, 2);
        assert!(c.generation() > first_generation);

        let request = engine.last();
        assert_eq!(request.text, "This is Reader Mode.");
        assert_eq!(request.rate, 16.0);

        c.handle_event(boundary(c.generation()));
        let handle = c.renderer().current().unwrap();
        assert_eq!(handle.offset, 14);
        assert_eq!(c.renderer().surface().marked_text().as_deref(), Some("This"));
    }

    #[tokio::test]
    async fn test_voice_change_while_paused_stays_paused() {
        let (mut c, engine) = controller(TEXT);
        c.start(TEXT).await.unwrap();
        c.pause().await.unwrap();
        c.set_voice(Some("v2".into())).await.unwrap();

        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(engine.last().voice.as_deref(), Some("v2"));
        assert_eq!(engine.calls().last().map(String::as_str), Some("pause"));
    }

    #[tokio::test]
    async fn test_idle_settings_do_not_speak() {
        let (mut c, engine) = controller(TEXT);
        c.set_pitch(5.0).await.unwrap();
        assert_eq!(c.session().pitch, 2.0);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_speak_failure_resets_to_idle() {
        let engine = Arc::new(Recorder { fail_speak: true, ..Default::default() });
        let mut c = SpeechController::new(engine, TextBuffer::from_text(TEXT), &SpeechConfig::default());
        let err = c.start(TEXT).await.unwrap_err();
        assert!(matches!(err, RecitalError::SpeechCapabilityError(_)));
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(c.last_error().is_some());
    }
}
