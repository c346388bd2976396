use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use larder::cache::{CacheStore, MemoryCacheStore, RevalidationExecutor};
use larder::infra::http::{HttpState, REQUEST_ID_HEADER, build_router};
use larder_api_types::{ApiErrorBody, RevalidateResponse};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn seeded_store() -> Arc<MemoryCacheStore> {
    let store = Arc::new(MemoryCacheStore::new());
    store.insert("/", ["recipes", "latest"], "home");
    store.insert("/trending", ["trending"], "trending");
    store.insert("/categories", ["categories"], "categories");
    store.insert(
        "/recipes/lemon-cake",
        ["entity-lemon-cake", "lemon-cake"],
        "cake",
    );
    store.insert(
        "/categories/desserts",
        ["category-desserts", "desserts"],
        "desserts",
    );
    store.insert("/recipes/honey-chicken", ["entity-honey-chicken"], "chicken");
    store
}

fn app(store: Arc<dyn CacheStore>) -> Router {
    let executor = Arc::new(RevalidationExecutor::new(SECRET, store));
    build_router(HttpState { executor })
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/revalidate")
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("request should build")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.expect("router should respond");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body should be readable");
    (status, bytes.to_vec())
}

fn delete_lemon_cake(secret: &str) -> Value {
    json!({
        "sharedSecret": secret,
        "action": "delete-entity",
        "entitySlug": "lemon-cake",
        "entityCategorySlug": "desserts",
        "tags": [
            "recipes", "latest", "trending", "categories",
            "entity-lemon-cake", "lemon-cake", "category-desserts", "desserts"
        ]
    })
}

#[tokio::test]
async fn authorized_delete_invalidates_every_tag() {
    let store = seeded_store();
    let (status, body) = send(
        app(store.clone()),
        post(delete_lemon_cake(SECRET).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: RevalidateResponse = serde_json::from_slice(&body).expect("json body");
    assert!(response.success);
    assert_eq!(response.invalidated.len(), 8);
    assert_eq!(response.invalidated_paths, vec!["/".to_string()]);
    assert!(response.errors.is_empty());

    assert_eq!(store.len(), 1);
    assert!(store.contains("/recipes/honey-chicken"));
}

#[tokio::test]
async fn wrong_secret_is_unauthorized_and_side_effect_free() {
    let store = seeded_store();
    let (status, body) = send(
        app(store.clone()),
        post(delete_lemon_cake("guess").to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: ApiErrorBody = serde_json::from_slice(&body).expect("json error body");
    assert_eq!(error.error.code, "unauthorized");
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn missing_secret_is_unauthorized() {
    let store = seeded_store();
    let mut payload = delete_lemon_cake(SECRET);
    payload
        .as_object_mut()
        .expect("payload is an object")
        .remove("sharedSecret");

    let (status, _) = send(app(store.clone()), post(payload.to_string())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let store = seeded_store();

    let cases = [
        "{not json".to_string(),
        json!({ "sharedSecret": SECRET, "action": "rename-entity", "tags": [] }).to_string(),
        json!({ "sharedSecret": SECRET, "action": "new-entity", "tags": "recipes" }).to_string(),
    ];

    for case in cases {
        let (status, body) = send(app(store.clone()), post(case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case: {case}");
        let error: ApiErrorBody = serde_json::from_slice(&body).expect("json error body");
        assert_eq!(error.error.code, "bad_request");
    }

    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn missing_tags_is_a_validation_error() {
    let store = seeded_store();
    let payload = json!({ "sharedSecret": SECRET, "action": "update-entity" });

    let (status, body) = send(app(store.clone()), post(payload.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ApiErrorBody = serde_json::from_slice(&body).expect("json error body");
    assert_eq!(error.error.code, "invalid_input");
    assert!(
        error
            .error
            .hint
            .as_deref()
            .is_some_and(|hint| hint.contains("tags"))
    );
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn create_with_category_leaves_detail_pages_alone() {
    let store = seeded_store();
    let payload = json!({
        "sharedSecret": SECRET,
        "action": "new-entity",
        "entitySlug": "honey-chicken",
        "entityCategorySlug": "dinner",
        "tags": ["recipes", "latest", "trending", "categories", "category-dinner"],
        "paths": ["/"]
    });

    let (status, body) = send(app(store.clone()), post(payload.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    let response: RevalidateResponse = serde_json::from_slice(&body).expect("json body");
    assert!(response.success);
    assert!(store.contains("/recipes/honey-chicken"));
    assert!(store.contains("/recipes/lemon-cake"));
    assert!(!store.contains("/trending"));
}

#[tokio::test]
async fn health_is_no_content() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .expect("request should build");

    let (status, body) = send(app(seeded_store()), request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let ok = app(seeded_store())
        .oneshot(post(delete_lemon_cake(SECRET).to_string()))
        .await
        .expect("router should respond");
    let rejected = app(seeded_store())
        .oneshot(post(delete_lemon_cake("guess").to_string()))
        .await
        .expect("router should respond");

    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    let ids: Vec<String> = [&ok, &rejected]
        .iter()
        .map(|response| {
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .expect("x-request-id header")
                .to_string()
        })
        .collect();
    assert_eq!(ids[0].len(), 36);
    assert_ne!(ids[0], ids[1]);
}

struct RejectingStore {
    reject: &'static str,
}

#[async_trait::async_trait]
impl CacheStore for RejectingStore {
    async fn invalidate_tag(
        &self,
        tag: &larder::cache::CacheTag,
    ) -> Result<(), larder::cache::CacheStoreError> {
        if tag.as_str() == self.reject {
            return Err(larder::cache::CacheStoreError::Status {
                target: tag.to_string(),
                status: 503,
            });
        }
        Ok(())
    }

    async fn invalidate_path(&self, _path: &str) -> Result<(), larder::cache::CacheStoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "rejecting"
    }
}

#[tokio::test]
async fn partial_failure_is_itemized_with_ok_status() {
    let store = Arc::new(RejectingStore { reject: "B" });
    let payload = json!({
        "sharedSecret": SECRET,
        "action": "new-entity",
        "tags": ["A", "B", "C"]
    });

    let (status, body) = send(app(store), post(payload.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    let response: RevalidateResponse = serde_json::from_slice(&body).expect("json body");
    assert!(!response.success);
    assert_eq!(response.invalidated, vec!["A", "C"]);
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors.contains_key("B"));
    assert!(response.path_errors.is_empty());
}
