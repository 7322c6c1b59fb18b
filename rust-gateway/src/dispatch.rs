//! Dispatch coordinator - the asynchronous processing pipeline.
//!
//! The web handler acknowledges a POST immediately; everything with real
//! work in it happens here, off the request path:
//!
//! ```text
//! detect → verify signature → parse → check_and_record → classify → notify
//! ```
//!
//! Every stage can end the pipeline early (unknown provider, rejected
//! signature, malformed payload, duplicate key, failed collaborator). No
//! outcome is fatal to the process: the failure mode is always log and
//! stop.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::classify::{Classifier, CLASSIFICATION_PROMPT, INCLUDED_VERDICT};
use crate::config::Config;
use crate::dedup::IdempotencyStore;
use crate::event::Provider;
use crate::notify::{format_notification, Notifier};
use crate::parse::{
    self, ParsedPayload, FACEBOOK_SIGNATURE_HEADER, TIKTOK_SIGNATURE_HEADER,
};
use crate::web::signature::{
    verify_facebook_signature, verify_tiktok_signature, VerificationResult,
};

/// Why a pipeline run stopped before notifying.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unrecognized provider")]
    UnknownProvider,
    #[error("signature rejected: {0}")]
    Unauthenticated(&'static str),
    #[error("malformed or incomplete payload")]
    InvalidPayload,
    #[error("classification failed: {0:#}")]
    Classification(#[source] anyhow::Error),
    #[error("notification failed: {0:#}")]
    Notification(#[source] anyhow::Error),
}

/// Successful pipeline outcome.
#[derive(Debug)]
enum Processed {
    /// Event classified and a notification sent.
    Notified { key: String, included: bool },
    /// Key already recorded by an earlier delivery; downstream skipped.
    Duplicate { key: String },
    /// Valid control payload (ping): recorded, no collaborator calls.
    Acked { key: String },
}

/// Sequences verification, parsing, dedup, classification, and
/// notification for each inbound POST.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    config: Config,
    store: Arc<dyn IdempotencyStore>,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn Notifier>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        config: Config,
        store: Arc<dyn IdempotencyStore>,
        classifier: Arc<dyn Classifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.dispatch_concurrency));
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                store,
                classifier,
                notifier,
                permits,
            }),
        }
    }

    /// Schedule one inbound request for background processing.
    ///
    /// Returns immediately; the caller has already sent its response. The
    /// semaphore bounds how many pipelines run at once so a delivery burst
    /// cannot exhaust the process.
    pub fn spawn(&self, headers: HeaderMap, body: Bytes) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let _permit = match Arc::clone(&dispatcher.inner.permits).acquire_owned().await {
                Ok(permit) => permit,
                // Closed semaphore means the process is shutting down.
                Err(_) => return,
            };
            dispatcher.process(&headers, &body).await;
        });
    }

    /// Run the full pipeline for one request and log the outcome.
    ///
    /// Nothing is observable to the original HTTP caller; errors never
    /// propagate past this boundary.
    pub async fn process(&self, headers: &HeaderMap, body: &[u8]) {
        match self.process_inner(headers, body).await {
            Ok(Processed::Notified { key, included }) => {
                info!(key = %key, included = included, "dispatch_notified");
            }
            Ok(Processed::Duplicate { key }) => {
                info!(key = %key, "dispatch_duplicate_skipped");
            }
            Ok(Processed::Acked { key }) => {
                info!(key = %key, "dispatch_acked");
            }
            Err(e @ (PipelineError::Classification(_) | PipelineError::Notification(_))) => {
                error!(error = %e, "dispatch_collaborator_failed");
            }
            Err(e) => {
                warn!(error = %e, "dispatch_discarded");
            }
        }
    }

    async fn process_inner(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Processed, PipelineError> {
        let inner = &self.inner;

        let provider = parse::detect(headers).ok_or(PipelineError::UnknownProvider)?;

        match self.verify(provider, headers, body) {
            VerificationResult::Authentic => {}
            VerificationResult::Rejected(reason) => {
                return Err(PipelineError::Unauthenticated(reason));
            }
        }

        let payload =
            parse::parse_payload(provider, body).ok_or(PipelineError::InvalidPayload)?;

        let event = match payload {
            ParsedPayload::Ack { key } => {
                // Record control payloads too: a redelivered ping must not
                // look like a fresh one in the logs.
                let newly_recorded = inner.store.check_and_record(&key).await;
                debug!(key = %key, newly_recorded = newly_recorded, "ping_recorded");
                return Ok(Processed::Acked { key });
            }
            ParsedPayload::Media(event) => event,
        };

        // Key derivation precedes every side-effecting call.
        let key = event.idempotency_key();
        if !inner.store.check_and_record(&key).await {
            return Ok(Processed::Duplicate { key });
        }

        let verdict = inner
            .classifier
            .classify(&event.canonical_uri, CLASSIFICATION_PROMPT, &event.free_text)
            .await
            .map_err(PipelineError::Classification)?;
        let included = verdict.trim() == INCLUDED_VERDICT;

        let channel_name = match event.provider {
            Provider::TikTok if !inner.config.channel_display_name.is_empty() => {
                inner.config.channel_display_name.as_str()
            }
            _ => event.owner_id.as_str(),
        };
        let message = format_notification(&event, included, channel_name);

        inner
            .notifier
            .notify(&message)
            .await
            .map_err(PipelineError::Notification)?;

        Ok(Processed::Notified { key, included })
    }

    /// Authenticate a request's claimed origin for its detected provider.
    fn verify(
        &self,
        provider: Provider,
        headers: &HeaderMap,
        body: &[u8],
    ) -> VerificationResult {
        let config = &self.inner.config;
        match provider {
            Provider::TikTok => {
                let header = headers
                    .get(TIKTOK_SIGNATURE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                verify_tiktok_signature(
                    config.tiktok_client_secret.as_deref().unwrap_or(""),
                    header,
                    body,
                    config.tiktok_signature_max_age,
                )
            }
            Provider::Facebook => {
                if !config.require_facebook_signature {
                    // Explicit policy: the subscription handshake already
                    // authenticated via the verify token.
                    debug!("facebook_signature_check_skipped");
                    return VerificationResult::Authentic;
                }
                let header = headers
                    .get(FACEBOOK_SIGNATURE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                verify_facebook_signature(
                    config.facebook_app_secret.as_deref().unwrap_or(""),
                    header,
                    body,
                )
            }
            // PubSubHubbub relies on transport-level trust.
            Provider::YouTube => VerificationResult::Authentic,
        }
    }
}
