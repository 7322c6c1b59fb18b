// tests/pipeline_e2e.rs
//
// End-to-end pipeline tests against the public Dispatcher API with mock
// collaborators. Signatures are computed for real; outcomes are observed
// through the idempotency store and the collaborator mocks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::Mutex;

use lootwatch::{
    Classifier, Config, Dispatcher, IdempotencyStore, InMemoryIdempotencyStore, Notifier,
};

struct ScriptedClassifier {
    verdict: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _uri: &str, _prompt: &str, _ctx: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict.to_string())
    }
}

#[derive(Default)]
struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        self.messages.lock().await.push(message.to_string());
        Ok(())
    }
}

struct Pipeline {
    dispatcher: Dispatcher,
    store: Arc<InMemoryIdempotencyStore>,
    classifier: Arc<ScriptedClassifier>,
    notifier: Arc<CollectingNotifier>,
}

fn pipeline(verdict: &'static str) -> Pipeline {
    let config = Config {
        port: 0,
        facebook_verify_token: Some("verify-token".into()),
        facebook_app_secret: Some("app-secret".into()),
        require_facebook_signature: false,
        tiktok_client_secret: Some("client-secret".into()),
        tiktok_signature_max_age: 0,
        gemini_api_key: None,
        gemini_model: "gemini-2.5-pro".into(),
        classify_timeout_ms: 1000,
        slack_webhook_url: None,
        channel_display_name: "모니터링 채널".into(),
        dispatch_concurrency: 4,
        request_timeout_ms: 1000,
    };

    let store = Arc::new(InMemoryIdempotencyStore::new());
    let classifier = Arc::new(ScriptedClassifier {
        verdict,
        calls: AtomicUsize::new(0),
    });
    let notifier = Arc::new(CollectingNotifier::default());

    let dispatcher = Dispatcher::new(
        config,
        Arc::clone(&store) as Arc<dyn IdempotencyStore>,
        Arc::clone(&classifier) as Arc<dyn Classifier>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );

    Pipeline {
        dispatcher,
        store,
        classifier,
        notifier,
    }
}

fn tiktok_request(secret: &str, body: &str) -> (HeaderMap, Vec<u8>) {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("1700000000.{body}").as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());

    let mut headers = HeaderMap::new();
    headers.insert(
        "TikTok-Signature",
        HeaderValue::from_str(&format!("t=1700000000,s={digest}")).unwrap(),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    (headers, body.as_bytes().to_vec())
}

#[tokio::test]
async fn test_tiktok_ping_records_key_without_collaborators() {
    let p = pipeline("True");
    let (headers, body) =
        tiktok_request("client-secret", r#"{"event":"ping","create_time":1700000000}"#);

    p.dispatcher.process(&headers, &body).await;

    // Processed: the ping key is already in the store.
    assert!(!p.store.check_and_record("tiktok:ping:1700000000").await);
    // But neither collaborator ran.
    assert_eq!(p.classifier.calls.load(Ordering::SeqCst), 0);
    assert!(p.notifier.messages.lock().await.is_empty());
}

#[tokio::test]
async fn test_tiktok_publish_end_to_end() {
    let p = pipeline("True");
    let body = r#"{"event":"video.publish.complete","create_time":1615338610,"user_openid":"act.owner","content":"{\"share_id\":\"video.6974245311675353080.VDCrcMJV\"}"}"#;
    let (headers, body) = tiktok_request("client-secret", body);

    p.dispatcher.process(&headers, &body).await;

    let messages = p.notifier.messages.lock().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("https://www.tiktok.com/video/6974245311675353080"));
    assert!(messages[0].contains("확률형 아이템 문구: 포함"));
    assert!(messages[0].contains("채널: 모니터링 채널"));
}

#[tokio::test]
async fn test_tampered_tiktok_body_is_dropped() {
    let p = pipeline("True");
    let body = r#"{"event":"video.publish.complete","create_time":1615338610,"user_openid":"act.owner","content":"{\"share_id\":\"video.1.a\"}"}"#;
    let (headers, signed_body) = tiktok_request("client-secret", body);

    // Mutate one character after signing.
    let mut tampered = signed_body.clone();
    tampered[10] ^= 0x01;

    p.dispatcher.process(&headers, &tampered).await;

    assert_eq!(p.classifier.calls.load(Ordering::SeqCst), 0);
    assert!(p.notifier.messages.lock().await.is_empty());
    // Nothing was recorded either: verification precedes key derivation.
    assert!(p.store.check_and_record("tiktok:1").await);
}

#[tokio::test]
async fn test_facebook_feed_change_end_to_end() {
    let p = pipeline("False");
    let mut headers = HeaderMap::new();
    headers.insert(
        "X-Hub-Signature-256",
        HeaderValue::from_static("sha256=unchecked-by-default"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let body = r#"{"entry":[{"id":"page-9","changes":[{"field":"feed","value":{
        "post_id":"page-9_777","message":"신규 게시물","item":"video",
        "link":"https://www.facebook.com/page-9/videos/777","created_time":1615338610
    }}]}]}"#;

    p.dispatcher.process(&headers, body.as_bytes()).await;

    let messages = p.notifier.messages.lock().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("게시물 제목: 신규 게시물"));
    assert!(messages[0].contains("확률형 아이템 문구: 미포함"));
    assert!(messages[0].contains("채널: page-9"));
    assert!(messages[0].contains("2021-03-10T01:10:10Z"));
}

#[tokio::test]
async fn test_facebook_non_feed_change_is_skipped() {
    let p = pipeline("True");
    let mut headers = HeaderMap::new();
    headers.insert(
        "X-Hub-Signature-256",
        HeaderValue::from_static("sha256=unchecked-by-default"),
    );

    let body = r#"{"entry":[{"id":"page-9","changes":[{"field":"mention","value":{
        "post_id":"page-9_778","link":"https://example.com/p/778","created_time":1615338610
    }}]}]}"#;

    p.dispatcher.process(&headers, body.as_bytes()).await;

    assert_eq!(p.classifier.calls.load(Ordering::SeqCst), 0);
    assert!(p.notifier.messages.lock().await.is_empty());
    // Nothing notification-worthy was recorded.
    assert!(p.store.check_and_record("facebook:page-9_778").await);
}

#[tokio::test]
async fn test_concurrent_duplicate_deliveries_notify_once() {
    let p = pipeline("True");

    let feed = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015">
  <entry>
    <yt:videoId>race-vid</yt:videoId>
    <yt:channelId>UC123</yt:channelId>
    <title>Upload</title>
    <published>2024-03-10T01:10:10+00:00</published>
  </entry>
</feed>"#;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let dispatcher = p.dispatcher.clone();
        handles.push(tokio::spawn(async move {
            let mut headers = HeaderMap::new();
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/atom+xml"),
            );
            dispatcher.process(&headers, feed.as_bytes()).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(p.classifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(p.notifier.messages.lock().await.len(), 1);
}
