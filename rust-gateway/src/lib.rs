//! Lootwatch - webhook ingestion gateway for media publication monitoring.
//!
//! This library backs the `lootwatch-web` binary: a gateway that receives
//! content-publication webhooks from YouTube, Facebook, and TikTok,
//! authenticates and normalizes them, classifies the referenced media, and
//! relays a summary to Slack.
//!
//! ## Architecture
//!
//! ```text
//! Webhooks → Web Server → Dispatcher → detect/verify/parse → dedup → classify → notify
//! ```

pub mod classify;
pub mod config;
pub mod dedup;
pub mod dispatch;
pub mod event;
pub mod notify;
pub mod parse;
pub mod web;

// Re-export commonly used types
pub use classify::{Classifier, GeminiClassifier, CLASSIFICATION_PROMPT, INCLUDED_VERDICT};
pub use config::Config;
pub use dedup::{IdempotencyStore, InMemoryIdempotencyStore};
pub use dispatch::Dispatcher;
pub use event::{MediaEvent, Provider};
pub use notify::{format_notification, Notifier, SlackNotifier};
pub use parse::{detect, parse_payload, ParsedPayload};
pub use web::AppState;
