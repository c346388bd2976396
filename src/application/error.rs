use axum::response::Response;
use larder_api_types::MutationAction;
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

/// Why a revalidation request was turned away, read back by the response
/// logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub code: &'static str,
    pub reason: String,
    pub action: Option<MutationAction>,
}

impl ErrorReport {
    pub fn new(code: &'static str, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: Option<MutationAction>) -> Self {
        self.action = action;
        self
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
