//! Chat notification collaborator and summary formatting.
//!
//! Delivery is best-effort: a missing webhook URL disables the notifier
//! with a debug log, and the dispatcher catches any send failure. One
//! formatting function covers all providers so the summary layout cannot
//! drift between branches.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::event::{MediaEvent, Provider};

/// Verdict labels embedded in the summary.
const LABEL_INCLUDED: &str = "포함";
const LABEL_NOT_INCLUDED: &str = "미포함";

/// Best-effort delivery of a formatted summary to a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Incoming-webhook Slack notifier.
pub struct SlackNotifier {
    webhook_url: Option<String>,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to create notifier HTTP client")?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            debug!("slack_notifier_disabled");
            return Ok(());
        };

        let body = serde_json::json!({ "text": message });

        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;

        debug!("slack_notification_sent");
        Ok(())
    }
}

/// Format the human-readable summary for one classified event.
///
/// `channel_name` is the display label for the owner line; callers pass
/// the configured channel display name when the provider's payload omits
/// one, otherwise the payload's own owner identifier.
pub fn format_notification(event: &MediaEvent, included: bool, channel_name: &str) -> String {
    let verdict = if included {
        LABEL_INCLUDED
    } else {
        LABEL_NOT_INCLUDED
    };

    let kind = match event.provider {
        Provider::YouTube | Provider::TikTok => "영상",
        Provider::Facebook => "게시물",
    };

    let title = if event.title_or_caption.is_empty() {
        "(제목 없음)"
    } else {
        event.title_or_caption.as_str()
    };

    format!(
        "[{provider}] {kind} 제목: {title}\n확률형 아이템 문구: {verdict}\nURL: {uri}\n채널: {channel}\n게시 시각: {published}",
        provider = event.provider,
        kind = kind,
        title = title,
        verdict = verdict,
        uri = event.canonical_uri,
        channel = channel_name,
        published = event.published_at,
    )
}
