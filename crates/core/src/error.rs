//! Error types for Recital operations.
//!
//! This module defines the main error type [`RecitalError`] which represents
//! every failure that can surface from extraction, fetching, speech playback,
//! and the message service.
//!
//! # Example
//!
//! ```rust
//! use recital_core::{RecitalError, Result};
//!
//! fn require_markup(html: &str) -> Result<&str> {
//!     if html.trim().is_empty() {
//!         return Err(RecitalError::HeuristicEmpty);
//!     }
//!     Ok(html)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::ExtractionAttempt;

/// Main error type for extraction and read-aloud operations.
#[derive(Error, Debug)]
pub enum RecitalError {
    /// The remote extraction capability has no credential or endpoint configured.
    #[error("Remote extraction is unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote call failed in transport, returned a non-2xx status,
    /// or the service reported a failure in its payload.
    #[error("Remote extraction request failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    RemoteRequestFailed { status: Option<u16>, message: String },

    /// The remote response did not contain a recoverable article record.
    #[error("Remote response could not be parsed: {0}")]
    RemoteResponseUnparsable(String),

    /// Heuristic extraction found nothing above the minimum length.
    #[error("No article content cleared the minimum length")]
    HeuristicEmpty,

    /// Every configured extraction method failed or returned empty content.
    ///
    /// Carries the ordered attempts so callers can report what was tried.
    #[error("Could not extract article content after {} attempt(s)", .attempts.len())]
    ExtractionFailed { attempts: Vec<ExtractionAttempt> },

    /// The speech engine refused or aborted an utterance.
    #[error("Speech engine error: {0}")]
    SpeechCapabilityError(String),

    /// A highlight offset did not resolve to any rendered text node.
    ///
    /// The renderer swallows this as a no-op; it exists so the condition has a name in logs.
    #[error("Highlight offset {offset} is outside the rendered text")]
    HighlightDesync { offset: usize },

    /// A playback action was requested in a state that does not allow it.
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: &'static str },

    /// A message referenced a session that does not exist.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// HTTP request errors from reqwest.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request or method timeout.
    #[error("Timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Wraps standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is missing fields or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RecitalError {
    /// Short machine-readable name for the error kind, used in wire responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RemoteUnavailable(_) => "remote_unavailable",
            Self::RemoteRequestFailed { .. } => "remote_request_failed",
            Self::RemoteResponseUnparsable(_) => "remote_response_unparsable",
            Self::HeuristicEmpty => "heuristic_empty",
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::SpeechCapabilityError(_) => "speech_error",
            Self::HighlightDesync { .. } => "highlight_desync",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::UnknownSession(_) => "unknown_session",
            Self::HttpError(_) => "http_error",
            Self::Timeout { .. } => "timeout",
            Self::InvalidUrl(_) => "invalid_url",
            Self::HtmlParseError(_) => "html_parse_error",
            Self::FileNotFound(_) => "file_not_found",
            Self::Io(_) => "io_error",
            Self::ConfigError(_) => "config_error",
        }
    }
}

/// Result type alias for RecitalError.
pub type Result<T> = std::result::Result<T, RecitalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecitalError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_request_failed_with_status() {
        let err = RecitalError::RemoteRequestFailed { status: Some(502), message: "bad gateway".into() };
        assert_eq!(err.to_string(), "Remote extraction request failed (status 502): bad gateway");

        let err = RecitalError::RemoteRequestFailed { status: None, message: "refused".into() };
        assert_eq!(err.to_string(), "Remote extraction request failed: refused");
    }

    #[test]
    fn test_extraction_failed_counts_attempts() {
        let err = RecitalError::ExtractionFailed { attempts: Vec::new() };
        assert!(err.to_string().contains("0 attempt"));
        assert_eq!(err.kind(), "extraction_failed");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = RecitalError::InvalidTransition { from: "Idle".into(), action: "pause" };
        assert_eq!(err.to_string(), "Cannot pause while Idle");
    }

    #[test]
    fn test_timeout_error() {
        let err = RecitalError::Timeout { timeout_ms: 250 };
        assert_eq!(err.to_string(), "Timed out after 250 ms");
    }
}
