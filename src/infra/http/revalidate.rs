use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use larder_api_types::{RevalidatePayload, RevalidateResponse};

use super::{HttpState, error::ApiError};

/// `POST /api/revalidate`
///
/// Every body the extractor rejects (bad JSON, unknown action, wrong
/// content type) is a `400`; auth and field validation happen in the
/// executor.
pub async fn revalidate(
    State(state): State<HttpState>,
    payload: Result<Json<RevalidatePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        ApiError::bad_request("Malformed request body", Some(rejection.body_text()))
    })?;

    let action = payload.action;
    let outcome = state
        .executor
        .execute(payload)
        .await
        .map_err(|err| ApiError::from(err).with_action(action))?;
    let body: RevalidateResponse = outcome.to_response();

    Ok((StatusCode::OK, Json(body)).into_response())
}
