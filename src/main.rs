use std::{process, sync::Arc, time::Duration};

use larder::{
    application::error::AppError,
    cache::{
        CacheStore, InvalidationRequest, MemoryCacheStore, RecipeSnapshot, RemotePurgeStore,
        RevalidationConfig, RevalidationDispatcher, RevalidationExecutor,
    },
    config::{self, CacheBackend},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Dispatch(args) => run_dispatch(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let secret = settings.revalidation.secret.clone().ok_or_else(|| {
        AppError::validation("`revalidation.secret` must be set to serve the revalidation endpoint")
    })?;

    let store = build_store(&settings)?;
    let backend = store.backend();
    let executor = Arc::new(RevalidationExecutor::new(&secret, store));
    let router = http::build_router(HttpState { executor });

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, backend, "Revalidation endpoint listening");

    serve_until_shutdown(listener, router, settings.server.graceful_shutdown).await
}

async fn serve_until_shutdown(
    listener: TcpListener,
    router: axum::Router,
    grace: Duration,
) -> Result<(), AppError> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => return flatten_server_result(joined),
        () = shutdown_signal() => {}
    }

    info!(grace_seconds = grace.as_secs(), "Shutdown signal received, draining");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(grace, server).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!(
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; exiting"
            );
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn build_store(settings: &config::Settings) -> Result<Arc<dyn CacheStore>, AppError> {
    match settings.cache.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCacheStore::new())),
        CacheBackend::Remote => {
            let purge_url = settings.cache.purge_url.as_ref().ok_or_else(|| {
                InfraError::configuration("`cache.purge_url` is required for the remote backend")
            })?;
            let store = RemotePurgeStore::new(
                purge_url,
                settings.cache.purge_token.clone(),
                settings.revalidation.timeout,
            )
            .map_err(InfraError::from)?;
            Ok(Arc::new(store))
        }
    }
}

async fn run_dispatch(
    settings: config::Settings,
    args: config::DispatchArgs,
) -> Result<(), AppError> {
    let recipe = RecipeSnapshot {
        id: args.id.unwrap_or_else(Uuid::new_v4),
        slug: args.slug,
        category_slug: args.category,
    };
    let plan = recipe.plan(args.action);
    info!(%plan, "Derived invalidation plan");

    if args.dry_run {
        let request = InvalidationRequest::from_plan(&recipe, &plan, "<redacted>");
        print_json(&request.to_payload())?;
        return Ok(());
    }

    let dispatcher = RevalidationDispatcher::new(RevalidationConfig::from(&settings.revalidation))
        .map_err(InfraError::from)?;
    if !dispatcher.config().enabled {
        info!("Revalidation disabled; nothing sent");
        return Ok(());
    }

    let request = dispatcher
        .request_for(&recipe, &plan)
        .map_err(InfraError::from)?;
    let response = dispatcher
        .send(&request)
        .await
        .map_err(InfraError::from)?;
    print_json(&response)?;

    if !response.success {
        return Err(AppError::unexpected(format!(
            "revalidation partially failed for {} tag(s) and {} path(s)",
            response.errors.len(),
            response.path_errors.len()
        )));
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
