//! Web server module for the webhook endpoint.
//!
//! This module provides a thin, fast HTTP surface that:
//! - Answers subscription-verification GETs synchronously
//! - Hands raw POST payloads to the dispatch coordinator
//! - Returns 202 in microseconds
//!
//! All verification, parsing, and processing happens in the background
//! pipeline.

pub mod handlers;
pub mod signature;

pub use handlers::{health, receive_webhook, router, verify_webhook, AppState, HealthResponse};
pub use signature::{verify_facebook_signature, verify_tiktok_signature, VerificationResult};
