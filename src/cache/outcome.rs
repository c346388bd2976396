//! Invalidation outcomes and best-effort fan-out.

use std::collections::BTreeMap;

use futures::future::join_all;
use larder_api_types::RevalidateResponse;
use metrics::counter;
use tracing::warn;

use super::keys::CacheTag;
use super::store::{CacheStore, CacheStoreError};

pub(crate) const METRIC_INVALIDATIONS_TOTAL: &str = "larder_invalidations_total";

/// Result of one batch of invalidations.
///
/// Failures are itemized per tag and per path and never abort the batch.
/// Tags and paths live in separate namespaces, so a tag spelled `/` never
/// collides with the root path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationOutcome {
    pub invalidated_tags: Vec<CacheTag>,
    pub invalidated_paths: Vec<String>,
    pub errors: BTreeMap<CacheTag, CacheStoreError>,
    pub path_errors: BTreeMap<String, CacheStoreError>,
}

impl InvalidationOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.path_errors.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.errors.len() + self.path_errors.len()
    }

    pub fn attempted(&self) -> usize {
        self.invalidated_tags.len() + self.invalidated_paths.len() + self.failed()
    }

    pub fn to_response(&self) -> RevalidateResponse {
        RevalidateResponse {
            success: self.is_success(),
            invalidated: self
                .invalidated_tags
                .iter()
                .map(|tag| tag.as_str().to_string())
                .collect(),
            invalidated_paths: self.invalidated_paths.clone(),
            errors: self
                .errors
                .iter()
                .map(|(tag, err)| (tag.as_str().to_string(), err.to_string()))
                .collect(),
            path_errors: self
                .path_errors
                .iter()
                .map(|(path, err)| (path.clone(), err.to_string()))
                .collect(),
        }
    }
}

/// Attempt every tag and path against `store`, collecting per-item results.
///
/// Calls run concurrently; result order follows input order.
pub(crate) async fn fan_out(
    store: &dyn CacheStore,
    tags: &[CacheTag],
    paths: &[String],
) -> InvalidationOutcome {
    let backend = store.backend();

    let tag_results = join_all(tags.iter().map(|tag| store.invalidate_tag(tag))).await;
    let path_results = join_all(paths.iter().map(|path| store.invalidate_path(path))).await;

    let mut outcome = InvalidationOutcome::default();

    for (tag, result) in tags.iter().zip(tag_results) {
        match result {
            Ok(()) => {
                counter!(METRIC_INVALIDATIONS_TOTAL, "kind" => "tag", "result" => "ok")
                    .increment(1);
                outcome.invalidated_tags.push(tag.clone());
            }
            Err(err) => {
                counter!(METRIC_INVALIDATIONS_TOTAL, "kind" => "tag", "result" => "error")
                    .increment(1);
                warn!(backend, tag = %tag, error = %err, "tag invalidation failed");
                outcome.errors.insert(tag.clone(), err);
            }
        }
    }

    for (path, result) in paths.iter().zip(path_results) {
        match result {
            Ok(()) => {
                counter!(METRIC_INVALIDATIONS_TOTAL, "kind" => "path", "result" => "ok")
                    .increment(1);
                outcome.invalidated_paths.push(path.clone());
            }
            Err(err) => {
                counter!(METRIC_INVALIDATIONS_TOTAL, "kind" => "path", "result" => "error")
                    .increment(1);
                warn!(backend, path = %path, error = %err, "path invalidation failed");
                outcome.path_errors.insert(path.clone(), err);
            }
        }
    }

    outcome
}
