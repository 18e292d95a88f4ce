// The mirror maintenance surface (bundle import/export, last-update probes)
// is driven by operator tooling and tests rather than the request path.
// Allow dead_code crate-wide until that tooling grows a CLI entry point.
#![allow(dead_code)]

mod auth;
mod config;
mod errors;
mod git;
mod http;
mod metrics;
mod mirror;
mod ops;
mod protocol;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::auth::{NoToken, StaticTokenSource, TokenSource};
use crate::config::ServerConfig;
use crate::git::{locate_git_binary, GitRunner};
use crate::metrics::MetricsRegistry;
use crate::mirror::MirrorRegistry;
use crate::ops::TracingOperationLogger;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mirrorcache",
    about = "Transparent caching proxy for the Git smart-HTTP protocol (version 2)"
)]
struct Cli {
    /// Port to listen to.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Root directory of cached repositories.
    #[arg(long)]
    cache_root: PathBuf,

    /// Optional YAML settings file.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared across all request handlers and background tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<MirrorRegistry>,
    pub http_client: reqwest::Client,
    pub metrics: MetricsRegistry,
    pub token_source: Arc<dyn TokenSource>,
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // ---- CLI ----
    let cli = Cli::parse();

    // ---- Tracing ----
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // ---- Settings ----
    let settings = match &cli.config {
        Some(path) => config::load_settings(path)?,
        None => config::Settings::default(),
    };
    let config = Arc::new(ServerConfig {
        port: cli.port,
        cache_root: cli.cache_root.clone(),
        settings,
    });

    tracing::info!(
        port = config.port,
        cache_root = %config.cache_root.display(),
        "starting mirrorcache"
    );

    // ---- External git binary ----
    let git_binary = locate_git_binary().context("cannot find the git binary")?;
    tracing::info!(git = %git_binary.display(), "located git binary");

    // ---- Cache root ----
    tokio::fs::create_dir_all(&config.cache_root)
        .await
        .with_context(|| {
            format!(
                "failed to create the cache root: {}",
                config.cache_root.display()
            )
        })?;

    // ---- Infrastructure ----
    let http_client = reqwest::Client::builder()
        .user_agent("mirrorcache/0.1")
        .build()
        .context("failed to build reqwest client")?;

    let metrics = MetricsRegistry::new();

    let token_source: Arc<dyn TokenSource> = match &config.settings.upstream_token {
        Some(token) => Arc::new(StaticTokenSource::new(token)),
        None => Arc::new(NoToken),
    };

    let registry = Arc::new(MirrorRegistry::new(
        config.cache_root.clone(),
        GitRunner::new(git_binary),
        http_client.clone(),
        Arc::new(TracingOperationLogger),
    ));

    // ---- App state ----
    let state = AppState {
        config: Arc::clone(&config),
        registry,
        http_client,
        metrics,
        token_source,
    };

    // ---- HTTP server ----
    let app = http::handler::create_router(Arc::new(state));
    let listen_addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("mirrorcache shut down cleanly");
    Ok(())
}
