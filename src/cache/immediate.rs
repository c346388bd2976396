//! Synchronous invalidation tier.
//!
//! Runs inside the mutation request for the tags that must not be stale even
//! for a single subsequent read. Currently only deletes use it.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use super::keys::CacheTag;
use super::outcome::{InvalidationOutcome, fan_out};
use super::store::CacheStore;

#[derive(Clone)]
pub struct ImmediateInvalidator {
    store: Arc<dyn CacheStore>,
}

impl ImmediateInvalidator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Invalidate `tags` and `paths` before returning.
    ///
    /// Every call is attempted; failures are collected in the outcome.
    #[instrument(skip_all, fields(tags = tags.len(), paths = paths.len()))]
    pub async fn invalidate_now(&self, tags: &[CacheTag], paths: &[String]) -> InvalidationOutcome {
        let started_at = Instant::now();
        let outcome = fan_out(self.store.as_ref(), tags, paths).await;

        info!(
            backend = self.store.backend(),
            invalidated_tags = outcome.invalidated_tags.len(),
            invalidated_paths = outcome.invalidated_paths.len(),
            failed = outcome.failed(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Immediate invalidation complete"
        );

        outcome
    }
}
