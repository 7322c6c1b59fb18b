//! Normalized event types shared across the pipeline.
//!
//! Parsers produce a `MediaEvent` from a raw webhook body. Every event
//! carries enough context for classification, deduplication, and the
//! Slack summary without referring back to the raw payload.

use std::fmt;

use serde::{Deserialize, Serialize};

/// External platform originating a webhook notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    YouTube,
    Facebook,
    TikTok,
}

impl Provider {
    /// Stable lowercase tag used for idempotency-key prefixes and log fields.
    pub fn tag(&self) -> &'static str {
        match self {
            Provider::YouTube => "youtube",
            Provider::Facebook => "facebook",
            Provider::TikTok => "tiktok",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Normalized record for one published media item.
///
/// Only constructed from payloads that already passed provider detection
/// and signature verification. Parsing either fills every field or yields
/// no event at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEvent {
    /// Originating platform
    pub provider: Provider,
    /// Provider-assigned identifier of the published item (video or post ID)
    pub external_id: String,
    /// Display text associated with the item (may be empty)
    pub title_or_caption: String,
    /// Channel ID, page ID, or user open-id
    pub owner_id: String,
    /// Publish timestamp, provider-native precision preserved verbatim
    pub published_at: String,
    /// Fully qualified URL to the published media
    pub canonical_uri: String,
    /// Supplementary caption/message text, extra classification context
    pub free_text: String,
}

impl MediaEvent {
    /// Deterministic key identifying this notification-worthy occurrence.
    ///
    /// Derived before any side-effecting call. The provider tag prefix
    /// keeps key spaces disjoint across providers.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.provider.tag(), self.external_id)
    }
}
