//! Facebook page webhook payload parsing.
//!
//! Page notifications arrive as a JSON envelope of `entry` objects, each
//! carrying `changes`. Only changes against the `feed` field describe a
//! post publication; everything else (mentions, ratings, ...) is ignored.

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::event::{MediaEvent, Provider};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    field: String,
    #[serde(default)]
    value: Option<ChangeValue>,
}

#[derive(Debug, Deserialize)]
struct ChangeValue {
    post_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
    /// Item kind: "photo", "video", "status", ...
    #[serde(default)]
    item: Option<String>,
    /// URL of the published media
    #[serde(default)]
    link: Option<String>,
    /// Unix creation timestamp
    #[serde(default)]
    created_time: Option<i64>,
}

/// Parse a page webhook body into a `MediaEvent`.
///
/// Missing post ID or media link is a parse failure; a change against a
/// field other than `feed` is silently not notification-worthy.
pub fn parse(body: &[u8]) -> Option<MediaEvent> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "facebook_envelope_parse_failed");
            return None;
        }
    };

    let entry = match envelope.entry.first() {
        Some(entry) => entry,
        None => {
            warn!("facebook_envelope_without_entry");
            return None;
        }
    };
    let change = match entry.changes.first() {
        Some(change) => change,
        None => {
            warn!("facebook_entry_without_changes");
            return None;
        }
    };

    if change.field != "feed" {
        debug!(field = %change.field, "facebook_change_field_ignored");
        return None;
    }

    let Some(value) = &change.value else {
        warn!("facebook_change_without_value");
        return None;
    };

    let Some(post_id) = value.post_id.clone() else {
        warn!("facebook_change_without_post_id");
        return None;
    };

    let link = match &value.link {
        Some(link) if Url::parse(link).is_ok() => link.clone(),
        Some(link) => {
            warn!(link = %link, "facebook_link_not_a_url");
            return None;
        }
        None => {
            warn!(post_id = %post_id, "facebook_change_without_link");
            return None;
        }
    };

    let Some(created_time) = value.created_time else {
        warn!(post_id = %post_id, "facebook_change_without_created_time");
        return None;
    };
    let published_at = match Utc.timestamp_opt(created_time, 0).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => {
            warn!(created_time = created_time, "facebook_created_time_out_of_range");
            return None;
        }
    };

    // Page ID: the entry carries it directly; older envelopes only encode
    // it as the `{page_id}_{post_id}` prefix.
    let owner_id = entry
        .id
        .clone()
        .unwrap_or_else(|| post_id.split('_').next().unwrap_or_default().to_string());

    let message = value.message.clone().unwrap_or_default();

    debug!(
        post_id = %post_id,
        item = value.item.as_deref().unwrap_or("unknown"),
        "facebook_post_parsed"
    );

    Some(MediaEvent {
        provider: Provider::Facebook,
        external_id: post_id,
        title_or_caption: message.clone(),
        owner_id,
        published_at,
        canonical_uri: link,
        free_text: message,
    })
}
