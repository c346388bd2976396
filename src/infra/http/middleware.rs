use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use larder_api_types::MutationAction;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Runs each request inside an `http.request` span, echoes its id back in
/// `x-request-id`, and logs rejections with the reason the handler attached.
pub async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let started_at = Instant::now();

    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    let status = response.status();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    span.in_scope(|| match report {
        Some(report) => {
            let action = report.action.map(MutationAction::as_str);
            if status.is_server_error() {
                error!(
                    status = status.as_u16(),
                    code = report.code,
                    action,
                    reason = %report.reason,
                    elapsed_ms,
                    "revalidation failed"
                );
            } else {
                warn!(
                    status = status.as_u16(),
                    code = report.code,
                    action,
                    reason = %report.reason,
                    elapsed_ms,
                    "revalidation rejected"
                );
            }
        }
        None if status.is_server_error() => {
            error!(status = status.as_u16(), elapsed_ms, "request failed");
        }
        None if status.is_client_error() => {
            warn!(status = status.as_u16(), elapsed_ms, "client request error");
        }
        None => debug!(status = status.as_u16(), elapsed_ms, "request served"),
    });

    response
}
