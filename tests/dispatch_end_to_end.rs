//! Dispatcher → real revalidation endpoint on an ephemeral port.

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{Router, routing::post};
use larder::cache::{
    CacheTrigger, DispatchError, ImmediateInvalidator, MemoryCacheStore, RecipeSnapshot,
    RevalidationConfig, RevalidationDispatcher, RevalidationExecutor,
};
use larder::infra::http::{HttpState, build_router};
use tokio::net::TcpListener;
use url::Url;
use uuid::Uuid;

const SECRET: &str = "e2e-secret";

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("test server should run");
    });
    addr
}

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
    store.insert("/categories/desserts", ["category-desserts"], "desserts");
    store.insert("/recipes/honey-chicken", ["entity-honey-chicken"], "chicken");
    store
}

fn config_for(addr: SocketAddr, secret: &str) -> RevalidationConfig {
    let base = Url::parse(&format!("http://{addr}")).expect("valid base url");
    RevalidationConfig::default()
        .with_endpoint(&base)
        .with_secret(secret)
        .with_timeout(Duration::from_secs(2))
}

fn lemon_cake() -> RecipeSnapshot {
    RecipeSnapshot::new(Uuid::new_v4(), "lemon-cake", Some("desserts".to_string()))
}

#[tokio::test]
async fn delete_converges_through_both_tiers() {
    let store = seeded_store();
    let executor = Arc::new(RevalidationExecutor::new(SECRET, store.clone()));
    let addr = spawn_server(build_router(HttpState { executor })).await;

    let trigger = CacheTrigger::new(
        ImmediateInvalidator::new(store.clone()),
        RevalidationDispatcher::new(config_for(addr, SECRET)).expect("client builds"),
    );

    let report = trigger.recipe_deleted(&lemon_cake()).await;

    // the immediate tier has already run when the trigger returns
    let immediate = report.immediate.expect("delete runs the immediate tier");
    assert!(immediate.is_success());
    assert!(!store.contains("/"));
    assert!(!store.contains("/trending"));
    assert!(!store.contains("/categories"));

    let response = report
        .dispatch
        .outcome()
        .await
        .expect("dispatch should reach the endpoint");
    assert!(response.success);
    assert_eq!(
        response.invalidated,
        vec![
            "recipes",
            "latest",
            "trending",
            "categories",
            "entity-lemon-cake",
            "lemon-cake",
            "category-desserts",
            "desserts",
        ]
    );

    assert!(!store.contains("/recipes/lemon-cake"));
    assert!(!store.contains("/categories/desserts"));
    assert_eq!(store.len(), 1);
    assert!(store.contains("/recipes/honey-chicken"));
}

#[tokio::test]
async fn secret_mismatch_surfaces_only_in_the_dispatch_outcome() {
    let store = seeded_store();
    let executor = Arc::new(RevalidationExecutor::new(SECRET, store.clone()));
    let addr = spawn_server(build_router(HttpState { executor })).await;

    let trigger = CacheTrigger::new(
        ImmediateInvalidator::new(store.clone()),
        RevalidationDispatcher::new(config_for(addr, "stale-secret")).expect("client builds"),
    );

    let report = trigger.recipe_updated(&lemon_cake()).await;
    let outcome = report.dispatch.outcome().await;

    assert!(matches!(
        outcome,
        Err(DispatchError::Status { status: 401, .. })
    ));
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn slow_endpoint_never_blocks_the_mutation() {
    let slow = Router::new().route(
        "/api/revalidate",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let addr = spawn_server(slow).await;

    let store = seeded_store();
    let config = config_for(addr, SECRET).with_timeout(Duration::from_millis(200));
    let trigger = CacheTrigger::new(
        ImmediateInvalidator::new(store.clone()),
        RevalidationDispatcher::new(config).expect("client builds"),
    );

    let started = Instant::now();
    let report = trigger.recipe_updated(&lemon_cake()).await;
    assert!(started.elapsed() < Duration::from_millis(200));

    let outcome = report.dispatch.outcome().await;
    assert!(matches!(outcome, Err(DispatchError::Timeout { after_ms: 200 })));
    assert!(started.elapsed() < Duration::from_secs(2));
}
