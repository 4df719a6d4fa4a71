//! A simulated speech engine that "speaks" at a fixed words-per-minute pace.
//!
//! It produces no audio. Boundary events fire at the start of every token
//! holding a letter or digit, spaced by the pace divided by the rate. The
//! terminal reader uses it to drive highlighting without a system TTS.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::engine::{SpeechEngine, SpeechEventKind, UtteranceRequest, Voice};
use crate::{RecitalError, Result};

/// Words per minute at rate 1.0.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 180;

#[derive(Default)]
struct Playback {
    task: Option<JoinHandle<()>>,
    paused: Option<watch::Sender<bool>>,
}

/// Simulated engine; see the module docs.
#[derive(Clone)]
pub struct PacedEngine {
    words_per_minute: u32,
    voices: Arc<Vec<Voice>>,
    playback: Arc<Mutex<Playback>>,
}

impl Default for PacedEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS_PER_MINUTE)
    }
}

impl PacedEngine {
    pub fn new(words_per_minute: u32) -> Self {
        let voice = |id: &str, name: &str, lang: &str| Voice { id: id.into(), name: name.into(), lang: lang.into() };
        Self {
            words_per_minute: words_per_minute.max(1),
            voices: Arc::new(vec![voice("paced-en", "Paced English", "en-US"), voice("paced-fr", "Paced French", "fr-FR")]),
            playback: Arc::new(Mutex::new(Playback::default())),
        }
    }

    /// Delay between two boundaries at `rate`.
    pub fn word_interval(&self, rate: f32) -> Duration {
        let rate = f64::from(rate.max(0.1));
        Duration::from_secs_f64(60.0 / f64::from(self.words_per_minute) / rate)
    }
}

/// Char indexes where a spoken token starts.
pub fn boundary_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut index = 0;
    for token in text.split_inclusive(char::is_whitespace) {
        let word = token.trim_end();
        if word.chars().any(char::is_alphanumeric) {
            offsets.push(index);
        }
        index += token.chars().count();
    }
    offsets
}

#[async_trait]
impl SpeechEngine for PacedEngine {
    async fn speak(&self, request: UtteranceRequest) -> Result<()> {
        if let Some(voice) = &request.voice
            && !self.voices.iter().any(|v| &v.id == voice)
        {
            return Err(RecitalError::SpeechCapabilityError(format!("unknown voice {}", voice)));
        }

        let mut playback = self.playback.lock().await;
        if let Some(task) = playback.task.take() {
            task.abort();
        }

        let (paused_tx, mut paused_rx) = watch::channel(false);
        let interval = self.word_interval(request.rate);
        let offsets = boundary_offsets(&request.text);

        playback.paused = Some(paused_tx);
        playback.task = Some(tokio::spawn(async move {
            for char_index in offsets {
                if paused_rx.wait_for(|paused| !paused).await.is_err() {
                    return;
                }
                request.emit(SpeechEventKind::Boundary { char_index });
                tokio::time::sleep(interval).await;
            }
            request.emit(SpeechEventKind::End);
        }));
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        if let Some(paused) = &self.playback.lock().await.paused {
            paused.send_replace(true);
        }
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        if let Some(paused) = &self.playback.lock().await.paused {
            paused.send_replace(false);
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        let mut playback = self.playback.lock().await;
        if let Some(task) = playback.task.take() {
            task.abort();
        }
        playback.paused = None;
        Ok(())
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.voices.as_ref().clone())
    }
}
