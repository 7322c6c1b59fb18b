//! TikTok webhook payload parsing.
//!
//! TikTok events are JSON with an `event` discriminator. A publish
//! completion carries a `content` field which is itself a JSON-encoded
//! string holding a `share_id` of the form `video.<ID>.<suffix>`; the
//! numeric video ID sits between the dots. Ping events are valid but carry
//! no media and must ack as a no-op.

use serde::Deserialize;
use tracing::{debug, warn};

use super::ParsedPayload;
use crate::event::{MediaEvent, Provider};

const EVENT_PUBLISH_COMPLETE: &str = "video.publish.complete";
const EVENT_PING: &str = "ping";
const EVENT_PING_NAMESPACED: &str = "tiktok.ping";

#[derive(Debug, Deserialize)]
struct TikTokPayload {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    create_time: Option<i64>,
    #[serde(default)]
    user_openid: Option<String>,
    /// JSON-encoded string, not an object
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublishContent {
    share_id: Option<String>,
}

/// Parse a TikTok webhook body.
///
/// `video.publish.complete` yields a `MediaEvent`; `ping` / `tiktok.ping`
/// yields an `Ack`; unknown event types yield `None`.
pub fn parse(body: &[u8]) -> Option<ParsedPayload> {
    let payload: TikTokPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "tiktok_payload_parse_failed");
            return None;
        }
    };

    let Some(event) = payload.event.as_deref() else {
        warn!("tiktok_payload_without_event");
        return None;
    };

    match event {
        EVENT_PUBLISH_COMPLETE => parse_publish(&payload).map(ParsedPayload::Media),
        EVENT_PING | EVENT_PING_NAMESPACED => {
            let create_time = payload.create_time.unwrap_or(0);
            debug!(create_time = create_time, "tiktok_ping_received");
            Some(ParsedPayload::Ack {
                key: format!("tiktok:ping:{}", create_time),
            })
        }
        other => {
            warn!(event = %other, "tiktok_event_unhandled");
            None
        }
    }
}

fn parse_publish(payload: &TikTokPayload) -> Option<MediaEvent> {
    let Some(content) = payload.content.as_deref() else {
        warn!("tiktok_publish_without_content");
        return None;
    };

    let video_id = extract_video_id(content)?;

    let Some(owner_id) = payload.user_openid.clone() else {
        warn!(video_id = %video_id, "tiktok_publish_without_openid");
        return None;
    };
    let Some(create_time) = payload.create_time else {
        warn!(video_id = %video_id, "tiktok_publish_without_create_time");
        return None;
    };

    let canonical_uri = format!("https://www.tiktok.com/video/{}", video_id);

    Some(MediaEvent {
        provider: Provider::TikTok,
        external_id: video_id,
        // The payload carries no title; the notifier substitutes the
        // configured channel display name.
        title_or_caption: String::new(),
        owner_id,
        published_at: create_time.to_string(),
        canonical_uri,
        free_text: String::new(),
    })
}

/// Decode the nested content JSON and recover the numeric video ID from a
/// `share_id` of the form `video.<ID>.<suffix>`.
fn extract_video_id(content: &str) -> Option<String> {
    let content: PublishContent = match serde_json::from_str(content) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "tiktok_content_parse_failed");
            return None;
        }
    };

    let Some(share_id) = content.share_id else {
        warn!("tiktok_content_without_share_id");
        return None;
    };

    match share_id.split('.').nth(1) {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            warn!(share_id = %share_id, "tiktok_share_id_malformed");
            None
        }
    }
}
