//! Webhook payload detection and parsing.
//!
//! This module turns a raw request into a normalized event:
//!
//! ```text
//! HeaderMap → detect() → Provider → parse_payload() → ParsedPayload
//! ```
//!
//! Detection inspects headers only; parsing consumes the raw body. Any
//! structural anomaly in a payload is a recoverable `None` with a logged
//! diagnostic, never a panic that could take down the dispatch task.

pub mod facebook;
pub mod tiktok;
pub mod youtube;

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use tracing::{debug, info};

use crate::event::{MediaEvent, Provider};

/// Composite TikTok signature header (`t=<timestamp>,s=<hex-hmac>`).
pub const TIKTOK_SIGNATURE_HEADER: &str = "TikTok-Signature";

/// Meta/Facebook payload signature header (`sha256=<hex>`).
pub const FACEBOOK_SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Content type of PubSubHubbub Atom feed deliveries.
pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

/// Parser output: either a classifiable media event, or a valid control
/// payload that must be recorded as processed but triggers no downstream
/// collaborator calls (e.g. a TikTok ping).
#[derive(Debug, Clone)]
pub enum ParsedPayload {
    Media(MediaEvent),
    Ack { key: String },
}

/// Select the provider profile for a request from its headers.
///
/// The signature headers are provider-exclusive in practice, so the checks
/// are independent; first match wins.
pub fn detect(headers: &HeaderMap) -> Option<Provider> {
    if headers.contains_key(TIKTOK_SIGNATURE_HEADER) {
        return Some(Provider::TikTok);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    // Parameters like `; charset=utf-8` do not affect detection.
    if content_type
        .split(';')
        .next()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case(ATOM_CONTENT_TYPE))
    {
        return Some(Provider::YouTube);
    }

    if headers.contains_key(FACEBOOK_SIGNATURE_HEADER) {
        return Some(Provider::Facebook);
    }

    debug!(content_type = %content_type, "provider_detection_no_match");
    None
}

/// Parse a raw body for the detected provider.
///
/// Routes to the provider-specific parser. Returns `None` when the payload
/// is malformed, incomplete, or not notification-worthy.
pub fn parse_payload(provider: Provider, body: &[u8]) -> Option<ParsedPayload> {
    info!(provider = %provider, body_length = body.len(), "payload_parse_start");

    let parsed = match provider {
        Provider::YouTube => youtube::parse(body).map(ParsedPayload::Media),
        Provider::Facebook => facebook::parse(body).map(ParsedPayload::Media),
        Provider::TikTok => tiktok::parse(body),
    };

    match &parsed {
        Some(ParsedPayload::Media(event)) => info!(
            provider = %provider,
            external_id = %event.external_id,
            owner_id = %event.owner_id,
            "payload_parse_complete"
        ),
        Some(ParsedPayload::Ack { key }) => info!(
            provider = %provider,
            key = %key,
            "payload_parse_ack"
        ),
        None => debug!(provider = %provider, "payload_parse_empty"),
    }

    parsed
}
