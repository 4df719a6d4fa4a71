//! Runtime configuration for extraction and speech.
//!
//! [`RecitalConfig`] groups the knobs consumed by the orchestrator, the remote
//! client, and the playback controller. It can be built in code with
//! [`RecitalConfigBuilder`], deserialized from JSON, or loaded from the user's
//! config directory with [`RecitalConfig::load`].
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use recital_core::RecitalConfig;
//!
//! let config = RecitalConfig::builder()
//!     .remote_enabled(false)
//!     .method_timeout(Duration::from_secs(5))
//!     .min_content_length(200)
//!     .build();
//! assert!(!config.extraction.remote_enabled);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{RecitalError, Result};

/// Default service endpoint for remote extraction.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/extract";

/// Default model for direct LLM extraction.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

/// Settings for the extraction fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Try the remote LLM method first (default: true).
    pub remote_enabled: bool,
    /// Advance to the next method when one fails or comes back empty (default: true).
    pub fallback_enabled: bool,
    /// Upper bound for each method, in milliseconds on the wire.
    #[serde(with = "millis")]
    pub method_timeout: Duration,
    /// Minimum `text_content` length, in chars, for a record to count as a success (default: 100).
    pub min_content_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            remote_enabled: true,
            fallback_enabled: true,
            method_timeout: Duration::from_secs(15),
            min_content_length: 100,
        }
    }
}

/// Where remote extraction requests go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RemoteBackend {
    /// An extraction service speaking the `POST /extract` contract.
    Service { endpoint: Option<String> },
    /// Direct calls to the Gemini `generateContent` API.
    Gemini {
        #[serde(rename = "apiKey")]
        api_key: Option<String>,
        model: String,
    },
}

impl Default for RemoteBackend {
    fn default() -> Self {
        Self::Service { endpoint: Some(DEFAULT_ENDPOINT.to_string()) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteConfig {
    pub backend: RemoteBackend,
    /// Hard cap on the markup excerpt sent to the remote capability, in chars.
    pub max_markup_chars: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { backend: RemoteBackend::default(), max_markup_chars: 100_000 }
    }
}

/// Default speech parameters applied to new sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeechConfig {
    pub rate: f32,
    pub pitch: f32,
    pub voice_id: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { rate: 1.0, pitch: 1.0, voice_id: None }
    }
}

impl SpeechConfig {
    /// Speech engines accept rates from 0.1x to 16x.
    pub const RATE_RANGE: (f32, f32) = (0.1, 16.0);
    pub const PITCH_RANGE: (f32, f32) = (0.0, 2.0);

    pub fn clamp_rate(rate: f32) -> f32 {
        rate.clamp(Self::RATE_RANGE.0, Self::RATE_RANGE.1)
    }

    pub fn clamp_pitch(pitch: f32) -> f32 {
        pitch.clamp(Self::PITCH_RANGE.0, Self::PITCH_RANGE.1)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecitalConfig {
    pub extraction: ExtractionConfig,
    pub remote: RemoteConfig,
    pub speech: SpeechConfig,
}

impl RecitalConfig {
    /// Creates a new builder for RecitalConfig.
    pub fn builder() -> RecitalConfigBuilder {
        RecitalConfigBuilder::new()
    }

    /// Default config file location: `<config_dir>/recital/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("recital").join("config.json"))
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`RecitalError::FileNotFound`] when the path does not exist and
    /// [`RecitalError::ConfigError`] when the JSON is malformed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RecitalError::FileNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| RecitalError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Loads the default config file if present, then applies environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `GEMINI_API_KEY` and `RECITAL_ENDPOINT` overrides.
    ///
    /// An API key switches the backend to Gemini unless a key is already set.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("RECITAL_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            self.remote.backend = RemoteBackend::Service { endpoint: Some(endpoint) };
            return;
        }

        if let Some(key) = lookup("GEMINI_API_KEY").filter(|v| !v.trim().is_empty()) {
            match &mut self.remote.backend {
                RemoteBackend::Gemini { api_key, .. } => {
                    if api_key.is_none() {
                        *api_key = Some(key);
                    }
                }
                RemoteBackend::Service { .. } => {
                    self.remote.backend = RemoteBackend::Gemini { api_key: Some(key), model: DEFAULT_MODEL.to_string() };
                }
            }
        }
    }
}

/// Builder for RecitalConfig.
pub struct RecitalConfigBuilder {
    config: RecitalConfig,
}

impl RecitalConfigBuilder {
    pub fn new() -> Self {
        Self { config: RecitalConfig::default() }
    }

    pub fn remote_enabled(mut self, value: bool) -> Self {
        self.config.extraction.remote_enabled = value;
        self
    }

    pub fn fallback_enabled(mut self, value: bool) -> Self {
        self.config.extraction.fallback_enabled = value;
        self
    }

    pub fn method_timeout(mut self, value: Duration) -> Self {
        self.config.extraction.method_timeout = value;
        self
    }

    pub fn min_content_length(mut self, value: usize) -> Self {
        self.config.extraction.min_content_length = value;
        self
    }

    /// Points remote extraction at a service endpoint.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.remote.backend = RemoteBackend::Service { endpoint: Some(url.into()) };
        self
    }

    /// Uses the Gemini API directly with the given key and model.
    pub fn gemini(mut self, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        self.config.remote.backend = RemoteBackend::Gemini { api_key: Some(api_key.into()), model: model.into() };
        self
    }

    pub fn max_markup_chars(mut self, value: usize) -> Self {
        self.config.remote.max_markup_chars = value;
        self
    }

    /// Sets the default speech rate, clamped to the supported range.
    pub fn rate(mut self, value: f32) -> Self {
        self.config.speech.rate = SpeechConfig::clamp_rate(value);
        self
    }

    /// Sets the default speech pitch, clamped to the supported range.
    pub fn pitch(mut self, value: f32) -> Self {
        self.config.speech.pitch = SpeechConfig::clamp_pitch(value);
        self
    }

    pub fn voice(mut self, value: impl Into<String>) -> Self {
        self.config.speech.voice_id = Some(value.into());
        self
    }

    pub fn build(self) -> RecitalConfig {
        self.config
    }
}

impl Default for RecitalConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
