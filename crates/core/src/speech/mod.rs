//! Read-aloud playback synchronized with word highlighting.

pub mod controller;
pub mod engine;
pub mod paced;

pub use controller::{PlaybackState, SpeechController, SpeechSession};
pub use engine::{SpeechEngine, SpeechEvent, SpeechEventKind, UtteranceRequest, Voice};
pub use paced::PacedEngine;
