//! Lootwatch Web Server - webhook ingestion gateway.
//!
//! This binary provides a thin, fast web server that:
//! - Answers subscription-verification handshakes
//! - Receives publication webhooks from YouTube, Facebook, and TikTok
//! - Immediately hands raw payloads to the background dispatcher
//! - Returns 202 in microseconds
//!
//! Signature verification, parsing, classification, and notification all
//! happen in the background pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lootwatch::{
    AppState, Config, Dispatcher, GeminiClassifier, InMemoryIdempotencyStore, SlackNotifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        facebook_verify_configured = config.facebook_verify_token.is_some(),
        facebook_signature_required = config.require_facebook_signature,
        tiktok_secret_configured = config.tiktok_client_secret.is_some(),
        gemini_configured = config.gemini_api_key.is_some(),
        slack_configured = config.slack_webhook_url.is_some(),
        dispatch_concurrency = config.dispatch_concurrency,
        "config_loaded"
    );

    // Wire the pipeline collaborators
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let classifier = Arc::new(GeminiClassifier::new(
        config.gemini_api_key.clone().unwrap_or_default(),
        config.gemini_model.clone(),
        config.classify_timeout_ms,
    )?);
    let notifier = Arc::new(SlackNotifier::new(
        config.slack_webhook_url.clone(),
        config.request_timeout_ms,
    )?);

    let dispatcher = Dispatcher::new(config.clone(), store, classifier, notifier);
    info!("dispatcher_created");

    // Create application state and router
    let state = AppState::new(config.clone(), dispatcher);
    let app = lootwatch::web::router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
