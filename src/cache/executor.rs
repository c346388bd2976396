//! Server side of the revalidation boundary.
//!
//! Authenticates a revalidation payload, validates it, and invalidates every
//! requested tag and path against the cache store.

use std::sync::Arc;
use std::time::Instant;

use larder_api_types::RevalidatePayload;
use metrics::{counter, histogram};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::keys::ROOT_PATH;
use super::outcome::{InvalidationOutcome, fan_out};
use super::request::{InvalidationRequest, MutationAction};
use super::store::CacheStore;

pub(crate) const METRIC_REVALIDATE_MS: &str = "larder_revalidate_ms";
pub(crate) const METRIC_EXECUTOR_REJECTED_TOTAL: &str = "larder_executor_rejected_total";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("shared secret is missing or does not match")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
}

impl ExecutorError {
    fn reason(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Validation(_) => "validation",
        }
    }
}

pub struct RevalidationExecutor {
    secret_hash: Vec<u8>,
    store: Arc<dyn CacheStore>,
}

impl RevalidationExecutor {
    pub fn new(secret: &str, store: Arc<dyn CacheStore>) -> Self {
        Self {
            secret_hash: hash_secret(secret),
            store,
        }
    }

    /// Execute a revalidation payload.
    ///
    /// Nothing is invalidated unless the secret matches and the payload is
    /// valid. Once past those checks every tag and path is attempted.
    #[instrument(skip_all, fields(action = payload.action.map(|a| a.as_str())))]
    pub async fn execute(
        &self,
        payload: RevalidatePayload,
    ) -> Result<InvalidationOutcome, ExecutorError> {
        let started_at = Instant::now();

        let request = match self.admit(payload) {
            Ok(request) => request,
            Err(err) => {
                counter!(METRIC_EXECUTOR_REJECTED_TOTAL, "reason" => err.reason()).increment(1);
                warn!(reason = err.reason(), error = %err, "Revalidation rejected");
                return Err(err);
            }
        };

        let mut paths = request.paths.clone();
        if matches!(
            request.action,
            MutationAction::Updated | MutationAction::Deleted
        ) && !paths.iter().any(|path| path == ROOT_PATH)
        {
            paths.push(ROOT_PATH.to_string());
        }

        let outcome = fan_out(self.store.as_ref(), &request.tags, &paths).await;

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        let result = if outcome.is_success() { "ok" } else { "partial" };
        histogram!(METRIC_REVALIDATE_MS, "result" => result).record(elapsed_ms);

        info!(
            entity_slug = request.entity_slug.as_deref().unwrap_or(""),
            backend = self.store.backend(),
            invalidated_tags = outcome.invalidated_tags.len(),
            invalidated_paths = outcome.invalidated_paths.len(),
            failed = outcome.failed(),
            elapsed_ms,
            "Revalidation executed"
        );

        Ok(outcome)
    }

    fn admit(&self, payload: RevalidatePayload) -> Result<InvalidationRequest, ExecutorError> {
        let presented = payload
            .shared_secret
            .as_deref()
            .ok_or(ExecutorError::Unauthorized)?;
        if self.secret_hash.ct_eq(&hash_secret(presented)).unwrap_u8() == 0 {
            return Err(ExecutorError::Unauthorized);
        }

        InvalidationRequest::try_from(payload).map_err(|err| ExecutorError::Validation(err.message))
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}
