//! HTTP surface of the revalidation boundary.

mod error;
mod middleware;
mod revalidate;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    http::StatusCode,
    routing::{get, post},
};
use larder_api_types::REVALIDATE_PATH;

use crate::cache::RevalidationExecutor;

pub use error::{ApiError, codes};
pub use middleware::REQUEST_ID_HEADER;

#[derive(Clone)]
pub struct HttpState {
    pub executor: Arc<RevalidationExecutor>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route(REVALIDATE_PATH, post(revalidate::revalidate))
        .route("/health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::trace_requests))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
