//! Page retrieval from URLs, files, and stdin.
//!
//! The server uses [`fetch_url`] when a client sends a URL without markup; the
//! CLI uses all three to accept its `INPUT` argument.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use url::Url;

use crate::{RecitalError, Result};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Maximum redirects followed before giving up.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 10,
            user_agent: "Mozilla/5.0 (compatible; Recital/0.1; reader mode)".to_string(),
            max_redirects: 5,
        }
    }
}

/// Validates that `url` is an absolute http(s) URL.
pub fn parse_page_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| RecitalError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(RecitalError::InvalidUrl(format!("unsupported scheme {}", other))),
    }
}

/// Fetches HTML content from a URL, following redirects.
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = parse_page_url(url)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .redirect(Policy::limited(config.max_redirects))
        .user_agent(&config.user_agent)
        .build()?;

    let response = client
        .get(parsed_url)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| if e.is_timeout() { RecitalError::Timeout { timeout_ms: config.timeout.saturating_mul(1000) } } else { e.into() })?
        .error_for_status()?;

    Ok(response.text().await?)
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(RecitalError::FileNotFound(path_buf))
    } else {
        Ok(fs::read_to_string(&path_buf)?)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
