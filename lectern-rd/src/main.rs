//! Reader Daemon (lectern-rd) - Main entry point
//!
//! Narrates text content through the platform speech engine, controlled over
//! HTTP with SSE events for UI highlighting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectern_rd::api;
use lectern_rd::config::{Config, ConfigOverrides};
use lectern_rd::narrator::Narrator;
use lectern_rd::speech::engine::{EngineEvent, NullEngine, SpeechEngine};
use lectern_rd::speech::NativeEngine;
use lectern_rd::SharedState;

/// Command-line arguments for lectern-rd
#[derive(Parser, Debug)]
#[command(name = "lectern-rd")]
#[command(about = "Reader daemon for Lectern")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LECTERN_RD_PORT")]
    port: Option<u16>,

    /// Path to TOML configuration file
    #[arg(short, long, env = "LECTERN_RD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let config = Config::load(args.config.as_deref(), ConfigOverrides { port: args.port })
        .await
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "lectern_rd={},tower_http=debug",
                    config.logging.level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Lectern reader daemon on port {}", config.port);

    // Bring up the speech engine; a platform without speech still serves
    // content endpoints and reports "unsupported" narration state
    let (engine, engine_rx): (
        Box<dyn SpeechEngine>,
        tokio::sync::mpsc::UnboundedReceiver<EngineEvent>,
    ) = match NativeEngine::new(&config.narration.preferred_language) {
        Ok((engine, rx)) => {
            info!("Native speech engine initialized");
            (Box::new(engine), rx)
        }
        Err(e) => {
            warn!("Speech engine unavailable: {}", e);
            let (engine, rx) = NullEngine::new();
            (Box::new(engine), rx)
        }
    };

    // Spawn the narrator actor
    let state = Arc::new(SharedState::new());
    let narrator = Narrator::spawn(
        engine,
        engine_rx,
        config.narration.clone(),
        Arc::clone(&state),
    );
    info!("Narrator started");

    // HTTP client for content fetching
    let http = reqwest::Client::builder()
        .timeout(config.fetch.timeout())
        .user_agent(concat!("lectern-rd/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    // Build the application router
    let ctx = api::AppContext {
        state,
        narrator,
        http,
        fetch: config.fetch.clone(),
    };
    let app = api::create_router(ctx);

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
