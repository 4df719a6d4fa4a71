//! Server settings read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use recital_core::{RecitalConfig, RemoteBackend};

const DEFAULT_PORT: u16 = 3000;

/// Largest accepted request body (page markup can be large).
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub body_limit: usize,
    /// Whole-request deadline, above the sum of the per-method timeouts.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            body_limit: BODY_LIMIT,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Reads `PORT`; everything else keeps its default.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            let port: u16 = port.trim().parse().with_context(|| format!("Invalid PORT: {}", port))?;
            config.addr.set_port(port);
        }
        Ok(config)
    }
}

/// Extraction settings for the service.
///
/// The service is itself the remote extraction endpoint, so the remote method
/// only stays on when it talks to Gemini directly.
pub fn extraction_config(mut config: RecitalConfig) -> RecitalConfig {
    let has_key = matches!(&config.remote.backend, RemoteBackend::Gemini { api_key: Some(key), .. } if !key.is_empty());
    if !has_key {
        tracing::warn!("GEMINI_API_KEY is not set; serving heuristic extraction only");
        config.extraction.remote_enabled = false;
    }
    config
}
