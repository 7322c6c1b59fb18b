//! YouTube PubSubHubbub payload parsing.
//!
//! The hub delivers an Atom `<feed>` with a single `<entry>` describing the
//! published video. Deleted-video notifications carry no `<entry>` and are
//! not notification-worthy.

use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::warn;

use crate::event::{MediaEvent, Provider};

#[derive(Debug, Deserialize)]
struct Feed {
    entry: Option<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "yt:videoId", alias = "videoId")]
    video_id: Option<String>,
    #[serde(rename = "yt:channelId", alias = "channelId")]
    channel_id: Option<String>,
    title: Option<String>,
    published: Option<String>,
}

/// Parse an Atom feed body into a `MediaEvent`.
///
/// Required entry fields: video ID, channel ID, title, published timestamp.
/// A feed without an entry, or an entry missing any required field, is a
/// parse failure, not a crash.
pub fn parse(body: &[u8]) -> Option<MediaEvent> {
    let xml = match std::str::from_utf8(body) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "youtube_body_not_utf8");
            return None;
        }
    };

    let feed: Feed = match from_str(xml) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "youtube_feed_parse_failed");
            return None;
        }
    };

    let Some(entry) = feed.entry else {
        warn!("youtube_feed_without_entry");
        return None;
    };

    let (Some(video_id), Some(channel_id), Some(title), Some(published)) =
        (entry.video_id, entry.channel_id, entry.title, entry.published)
    else {
        warn!("youtube_entry_incomplete");
        return None;
    };

    let canonical_uri = format!("https://www.youtube.com/watch?v={}", video_id);

    Some(MediaEvent {
        provider: Provider::YouTube,
        external_id: video_id,
        title_or_caption: title,
        owner_id: channel_id,
        published_at: published,
        canonical_uri,
        free_text: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns="http://www.w3.org/2005/Atom">
  <link rel="hub" href="https://pubsubhubbub.appspot.com"/>
  <title>YouTube video feed</title>
  <updated>2024-03-10T01:15:00+00:00</updated>
  <entry>
    <id>yt:video:dQw4w9WgXcQ</id>
    <yt:videoId>dQw4w9WgXcQ</yt:videoId>
    <yt:channelId>UCuAXFkgsw1L7xaCfnd5JJOw</yt:channelId>
    <title>New upload announcement</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=dQw4w9WgXcQ"/>
    <author>
      <name>Example Channel</name>
      <uri>https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw</uri>
    </author>
    <published>2024-03-10T01:10:10+00:00</published>
    <updated>2024-03-10T01:15:00+00:00</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_full_feed() {
        let event = parse(FULL_FEED.as_bytes()).unwrap();

        assert_eq!(event.provider, Provider::YouTube);
        assert_eq!(event.external_id, "dQw4w9WgXcQ");
        assert_eq!(event.owner_id, "UCuAXFkgsw1L7xaCfnd5JJOw");
        assert_eq!(event.title_or_caption, "New upload announcement");
        assert_eq!(event.published_at, "2024-03-10T01:10:10+00:00");
        assert_eq!(
            event.canonical_uri,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_feed_without_entry_is_none() {
        let feed = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>YouTube video feed</title>
</feed>"#;
        assert!(parse(feed.as_bytes()).is_none());
    }

    #[test]
    fn test_entry_missing_video_id_is_none() {
        let feed = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015">
  <entry>
    <yt:channelId>UC123</yt:channelId>
    <title>No video id</title>
    <published>2024-03-10T01:10:10+00:00</published>
  </entry>
</feed>"#;
        assert!(parse(feed.as_bytes()).is_none());
    }

    #[test]
    fn test_entry_missing_published_is_none() {
        let feed = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015">
  <entry>
    <yt:videoId>abc</yt:videoId>
    <yt:channelId>UC123</yt:channelId>
    <title>No timestamp</title>
  </entry>
</feed>"#;
        assert!(parse(feed.as_bytes()).is_none());
    }

    #[test]
    fn test_malformed_xml_is_none() {
        assert!(parse(b"<feed><entry>").is_none());
        assert!(parse(b"not xml at all").is_none());
        assert!(parse(b"").is_none());
    }
}
