use std::sync::Arc;

use anyhow::Context;
use recital_core::{FetchConfig, Orchestrator, RecitalConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod routes;

use config::ServerConfig;
use routes::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let server = ServerConfig::from_env(|key| std::env::var(key).ok())?;
    let recital = config::extraction_config(RecitalConfig::load().context("Failed to load configuration")?);

    let orchestrator = Orchestrator::new(&recital);
    let methods: Vec<String> = orchestrator.methods().map(|m| m.to_string()).collect();
    let state = Arc::new(AppState { orchestrator, fetch: FetchConfig::default() });
    let router = build_router(state, &server);

    info!(addr = %server.addr, methods = ?methods, "Binding HTTP listener");
    let listener = TcpListener::bind(server.addr).await.with_context(|| format!("Failed to bind {}", server.addr))?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    info!("HTTP server exited");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
