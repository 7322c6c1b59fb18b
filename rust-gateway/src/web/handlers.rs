//! Webhook endpoint handlers.
//!
//! These handlers are designed to be extremely fast - they only:
//! 1. Answer subscription-verification GETs synchronously
//! 2. Hand raw POST bytes to the dispatch coordinator
//! 3. Return immediately
//!
//! All verification, parsing, and processing happens in the background
//! pipeline.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }
}

/// Build the application router.
///
/// One method-routed webhook endpoint plus a liveness probe. Methods other
/// than GET/POST on `/webhooks` get axum's 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks", get(verify_webhook).post(receive_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Subscription Verification (GET)
// =============================================================================

/// Query parameters of a subscription-verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Subscription-verification endpoint.
///
/// With a verify token: exact match against the configured secret echoes
/// the challenge, anything else is a generic 403. With only a challenge:
/// echo it back (PubSubHubbub-style handshakes authenticate nothing here).
/// With neither: a static informational body.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    if let Some(token) = &query.verify_token {
        let expected = state.config.facebook_verify_token.as_deref().unwrap_or("");
        if !expected.is_empty() && token == expected {
            let challenge = query.challenge.unwrap_or_default();
            info!(mode = query.mode.as_deref().unwrap_or(""), "subscription_verified");
            return (StatusCode::OK, challenge).into_response();
        }

        warn!("subscription_verify_token_mismatch");
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }

    if let Some(challenge) = query.challenge {
        info!("subscription_challenge_echoed");
        return (StatusCode::OK, challenge).into_response();
    }

    (
        StatusCode::OK,
        "This endpoint receives media publication webhooks.",
    )
        .into_response()
}

// =============================================================================
// Webhook Intake (POST)
// =============================================================================

/// Webhook intake endpoint.
///
/// Hands the raw headers and body to the dispatcher and acknowledges with
/// 202 without waiting for any pipeline work.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    info!(body_length = body.len(), "webhook_received");

    state.dispatcher.spawn(headers, body);

    (StatusCode::ACCEPTED, "accepted")
}
