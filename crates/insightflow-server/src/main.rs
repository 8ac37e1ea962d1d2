//! InsightFlow Server - Main entry point

use anyhow::Result;
use insightflow_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{info, warn};

use insightflow_server::{
    api,
    config::{Config, StoreBackend},
    features::FeatureState,
    identity::HeaderIdentityProvider,
    insights::GeminiProvider,
    jobs::{AnalysisEvents, AnalysisQueue, AnalysisWorker},
    store::{MemoryStore, PgStore, SharedStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("insightflow-server")
        .filter_directives("insightflow_server=debug,tower_http=debug,sqlx=info")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting InsightFlow Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store: SharedStore = match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        },
        StoreBackend::Postgres => Arc::new(PgStore::connect(&config.database).await?),
    };
    info!(backend = store.backend(), "Store initialized");

    let events = AnalysisEvents::default();
    let (queue, receiver) = AnalysisQueue::bounded(config.jobs.queue_capacity);
    let worker = AnalysisWorker::new(
        receiver,
        store.clone(),
        events.clone(),
        config.jobs.worker_concurrency,
    )
    .start();

    let state = FeatureState {
        store,
        queue,
        events,
        insights: Arc::new(GeminiProvider::new(&config.insights)?),
        identity: Arc::new(HeaderIdentityProvider::new(&config.auth)),
    };

    // The router owns the only queue handles from here on
    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped accepting requests, draining analysis queue");

    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    match tokio::time::timeout(timeout, worker).await {
        Ok(Ok(())) => info!("Server shut down gracefully"),
        Ok(Err(e)) => tracing::error!("Analysis worker terminated abnormally: {}", e),
        Err(_) => warn!(
            "Analysis queue not drained after {} seconds, unfinished analyses stay in their current state",
            timeout.as_secs()
        ),
    }

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
