use std::{process, sync::Arc, time::Duration};

use catalog::{
    application::{error::AppError, items::ItemService, repos::ItemsRepo},
    config,
    infra::{
        error::InfraError,
        http::{self, ApiState},
        store::JsonFileStore,
        telemetry,
    },
    stats::{self, ChangeWatcher, StatsCache, StatsConfig, StatsConsumer},
};
use tokio::task::JoinHandle;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Stats(_) => run_stats(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = Arc::new(open_store(&settings).await?);
    let repo: Arc<dyn ItemsRepo> = store.clone();

    let stats_config = StatsConfig::from(&settings.stats);
    let cache = Arc::new(StatsCache::new(repo.clone()));
    let (trigger, receiver) = stats::channel(&stats_config);
    let trigger = Arc::new(trigger);

    let consumer = StatsConsumer::new(cache.clone(), receiver, stats_config.debounce());
    let consumer_handle = tokio::spawn(consumer.run());

    trigger.startup();

    let watcher = if stats_config.watch {
        Some(ChangeWatcher::start(store.path(), trigger.clone())?)
    } else {
        info!(
            target = "catalog::stats",
            "File watching disabled; stats refresh on local writes only"
        );
        None
    };

    let items = ItemService::new(repo.clone()).with_stats_trigger(trigger);
    let state = ApiState {
        items: Arc::new(items),
        stats: cache,
        repo,
        default_page_size: settings.api.default_page_size,
    };

    let result = serve_http(&settings, state).await;

    drop(watcher);
    stop_task(consumer_handle).await;

    result
}

/// Compute stats once over the document and print them.
async fn run_stats(settings: config::Settings) -> Result<(), AppError> {
    let store = open_store(&settings).await?;
    let cache = StatsCache::new(Arc::new(store));

    if cache.recompute().await == stats::RecomputeOutcome::Retained {
        return Err(AppError::unexpected(format!(
            "could not compute stats from {}",
            settings.storage.data_file.display()
        )));
    }

    let snapshot = cache
        .get()
        .ok_or_else(|| AppError::unexpected("stats snapshot missing after recompute"))?;
    let rendered = serde_json::to_string_pretty(snapshot.as_ref())
        .map_err(|err| AppError::unexpected(format!("failed to encode stats: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn open_store(settings: &config::Settings) -> Result<JsonFileStore, AppError> {
    let store =
        JsonFileStore::open(&settings.storage.data_file, settings.storage.io_timeout).await?;
    info!(
        target = "catalog::store",
        path = %store.path().display(),
        "Item document ready"
    );
    Ok(store)
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "HTTP server listening");

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = drain_deadline(grace) => {
            warn!(
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!("HTTP server stopped");
    Ok(())
}

/// Resolves once a shutdown signal has arrived and the grace period has elapsed.
async fn drain_deadline(grace: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn stop_task(handle: JoinHandle<()>) {
    handle.abort();
    let _ = handle.await;
}
