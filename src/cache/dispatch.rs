//! Fire-and-forget revalidation dispatch.
//!
//! Sends the full tag set of a mutation to the revalidation endpoint on a
//! detached task with a hard deadline. Failures are logged and counted,
//! never returned to the mutation caller.

use std::time::Instant;

use larder_api_types::{ApiErrorBody, RevalidateResponse};
use metrics::{counter, histogram};
use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::config::RevalidationConfig;
use super::planner::InvalidationPlan;
use super::request::{InvalidationRequest, RecipeSnapshot};

pub(crate) const METRIC_DISPATCH_TOTAL: &str = "larder_dispatch_total";
pub(crate) const METRIC_DISPATCH_MS: &str = "larder_dispatch_ms";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no shared secret configured; revalidation skipped")]
    MissingSecret,
    #[error("revalidation is disabled")]
    Disabled,
    #[error("revalidation request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("revalidation transport error: {0}")]
    Transport(String),
    #[error("revalidation endpoint answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("revalidation response could not be decoded: {0}")]
    Decode(String),
    #[error("revalidation task failed: {0}")]
    Task(String),
}

/// Handle to an in-flight dispatch.
///
/// Dropping the handle detaches the task; mutation handlers normally do.
/// Awaiting [`DispatchHandle::outcome`] is for tests and tooling.
#[derive(Debug)]
pub struct DispatchHandle {
    inner: DispatchInner,
}

#[derive(Debug)]
enum DispatchInner {
    Spawned(JoinHandle<Result<RevalidateResponse, DispatchError>>),
    Skipped(DispatchError),
}

impl DispatchHandle {
    pub(crate) fn skipped(reason: DispatchError) -> Self {
        Self {
            inner: DispatchInner::Skipped(reason),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.inner, DispatchInner::Skipped(_))
    }

    pub async fn outcome(self) -> Result<RevalidateResponse, DispatchError> {
        match self.inner {
            DispatchInner::Spawned(handle) => handle
                .await
                .map_err(|err| DispatchError::Task(err.to_string()))?,
            DispatchInner::Skipped(reason) => Err(reason),
        }
    }
}

/// Client side of the revalidation boundary.
#[derive(Clone, Debug)]
pub struct RevalidationDispatcher {
    client: Client,
    config: RevalidationConfig,
}

impl RevalidationDispatcher {
    pub fn new(config: RevalidationConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("larder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RevalidationConfig {
        &self.config
    }

    /// Build the request for `recipe` using the configured secret.
    pub fn request_for(
        &self,
        recipe: &RecipeSnapshot,
        plan: &InvalidationPlan,
    ) -> Result<InvalidationRequest, DispatchError> {
        let secret = self
            .config
            .secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or(DispatchError::MissingSecret)?;
        Ok(InvalidationRequest::from_plan(recipe, plan, secret))
    }

    /// Launch the request on a detached task and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, request: InvalidationRequest) -> DispatchHandle {
        if !self.config.enabled {
            debug!(action = %request.action, "Dispatch skipped: revalidation disabled");
            return DispatchHandle::skipped(DispatchError::Disabled);
        }

        let dispatcher = self.clone();
        let span = info_span!(
            "revalidate.dispatch",
            action = %request.action,
            entity_slug = request.entity_slug.as_deref().unwrap_or(""),
            tags = request.tags.len(),
        );

        let handle = tokio::spawn(
            async move {
                let result = dispatcher.send(&request).await;
                match &result {
                    Ok(response) if response.success => {
                        counter!(METRIC_DISPATCH_TOTAL, "result" => "ok").increment(1);
                        info!(
                            invalidated = response.invalidated.len(),
                            "Revalidation dispatched"
                        );
                    }
                    Ok(response) => {
                        counter!(METRIC_DISPATCH_TOTAL, "result" => "partial").increment(1);
                        warn!(
                            invalidated = response.invalidated.len(),
                            errors = ?response.errors,
                            "Revalidation partially failed"
                        );
                    }
                    Err(err) => {
                        counter!(METRIC_DISPATCH_TOTAL, "result" => "error").increment(1);
                        warn!(error = %err, "Revalidation dispatch failed");
                    }
                }
                result
            }
            .instrument(span),
        );

        DispatchHandle {
            inner: DispatchInner::Spawned(handle),
        }
    }

    /// Send the request and wait for the executor's answer.
    pub async fn send(
        &self,
        request: &InvalidationRequest,
    ) -> Result<RevalidateResponse, DispatchError> {
        let started_at = Instant::now();
        let result = self.post(request).await;
        histogram!(METRIC_DISPATCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn post(
        &self,
        request: &InvalidationRequest,
    ) -> Result<RevalidateResponse, DispatchError> {
        let response = self
            .client
            .post(self.config.endpoint.clone())
            .json(&request.to_payload())
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => match body.error.hint {
                    Some(hint) => format!("{}: {hint}", body.error.message),
                    None => body.error.message,
                },
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            };
            return Err(DispatchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<RevalidateResponse>()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    self.timeout_error()
                } else {
                    DispatchError::Decode(err.to_string())
                }
            })
    }

    fn classify(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            self.timeout_error()
        } else {
            DispatchError::Transport(err.to_string())
        }
    }

    fn timeout_error(&self) -> DispatchError {
        DispatchError::Timeout {
            after_ms: self.config.timeout.as_millis() as u64,
        }
    }
}
