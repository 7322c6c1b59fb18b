//! Idempotency tracking for processed events.
//!
//! Webhook providers redeliver: a slow response, a resubscription, or a hub
//! retry all produce a second POST for the same logical event. The store
//! remembers which keys were already handled so downstream collaborators
//! run at most once per event.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

/// Records which event keys have already been processed.
///
/// The dispatcher depends only on this trait; deployments needing
/// durability or a bounded window can back it with an external key-value
/// store without touching the pipeline.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Atomically check and record a key.
    ///
    /// Returns `true` if the key was newly recorded (caller proceeds),
    /// `false` if it was already present (caller skips all downstream
    /// work). Two concurrent calls with the same key yield exactly one
    /// `true`.
    async fn check_and_record(&self, key: &str) -> bool;
}

/// Process-local store: a set guarded by a mutex.
///
/// Empty at process start, grows for the process lifetime, never persisted
/// or pruned. Suited to single-instance deployments; the trait seam covers
/// everything else.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    seen: Mutex<HashSet<String>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn check_and_record(&self, key: &str) -> bool {
        let mut seen = self.seen.lock().await;
        let newly_recorded = seen.insert(key.to_string());
        debug!(
            key = %key,
            newly_recorded = newly_recorded,
            seen_count = seen.len(),
            "idempotency_check"
        );
        newly_recorded
    }
}
