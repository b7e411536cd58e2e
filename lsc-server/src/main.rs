//! lsc-server: lung sound classification over HTTP and WebSocket
//!
//! Loads the CNN artifact once, then serves WAV uploads on `/predict` and
//! raw PCM streams on `/audio` with fan-out to `/audio_listen`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lsc_common::InferenceContext;
use lsc_server::capture::remove_stale_capture;
use lsc_server::config::{CliArgs, ConfigSource};
use lsc_server::logging::init_logging;
use lsc_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let (config, source) = args.resolve().context("Failed to load configuration")?;

    let _log_guard = init_logging(&config.logging)?;

    // Build identification first, before model loading delays
    info!(
        "Starting lsc-server v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("LSC_REVISION"),
        env!("LSC_BUILT")
    );

    match &source {
        ConfigSource::File(path) => info!("Configuration loaded from {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found, using built-in defaults"),
    }

    if let Some(path) = config.stream.capture_target() {
        match remove_stale_capture(path) {
            Ok(true) => info!("Removed previous stream capture {}", path.display()),
            Ok(false) => {}
            Err(e) => warn!("Could not remove previous stream capture {}: {}", path.display(), e),
        }
    }

    info!("Loading model from {}", config.model_path.display());
    let inference = match InferenceContext::load(&config.model_path) {
        Ok(context) => Arc::new(context),
        Err(e) => {
            error!("Failed to load model: {}", e);
            return Err(e).context("Model artifact is required to start");
        }
    };
    info!("Model loaded");

    let state = AppState::new(inference, &config);
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("lsc-server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("lsc-server stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
