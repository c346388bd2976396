use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use larder_api_types::{ApiErrorBody, ApiErrorMessage, MutationAction};

use crate::application::error::ErrorReport;
use crate::cache::ExecutorError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const INVALID_INPUT: &str = "invalid_input";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    action: Option<MutationAction>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            action: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Shared secret missing or invalid",
            None,
        )
    }

    /// Record the action the rejected payload asked for, if it parsed that far.
    pub fn with_action(mut self, action: Option<MutationAction>) -> Self {
        self.action = action;
        self
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Unauthorized => Self::unauthorized(),
            ExecutorError::Validation(detail) => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid revalidation request",
                Some(detail),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = ErrorReport::new(
            self.code,
            self.hint.as_deref().unwrap_or(self.message),
        )
        .with_action(self.action);

        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
