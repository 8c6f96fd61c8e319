//! # sync-board server
//!
//! Loads settings, opens the primary store, picks the search index backend,
//! wires the services and serves the HTTP API. A background task drains the
//! index repair outbox on a fixed interval until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use api_adapters::{build_router, AppState};
use configs::{LogFormat, LogSettings, SearchBackend, SearchSettings, Settings};
use domains::SearchIndex;
use secrecy::ExposeSecret;
use services::{BoardService, IndexSync, ReplyService};
use storage_adapters::sqlite::connect;
use storage_adapters::{InMemorySearchIndex, SqliteBoardRepository, SqliteSyncOutbox};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    let pool = connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("opening primary store")?;
    let store = Arc::new(SqliteBoardRepository::from_pool(pool.clone()));
    let outbox = Arc::new(SqliteSyncOutbox::new(pool));
    let index = build_index(&settings.search)?;

    let sync = Arc::new(
        IndexSync::new(store.clone(), index, outbox)
            .with_policy(settings.sync.policy)
            .with_batch_size(settings.sync.batch_size)
            .with_max_attempts(settings.sync.max_attempts),
    );
    let boards = Arc::new(BoardService::new(store, sync.clone()));
    let replies = Arc::new(ReplyService::new(boards.clone()));

    let (stop_tx, stop_rx) = watch::channel(false);
    let reconciler = (settings.sync.reconcile_interval_secs > 0).then(|| {
        tokio::spawn(run_reconciler(
            sync.clone(),
            Duration::from_secs(settings.sync.reconcile_interval_secs),
            stop_rx,
        ))
    });

    let app = build_router(AppState {
        boards,
        replies,
        sync,
    });
    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, policy = ?settings.sync.policy, "sync-board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = stop_tx.send(true);
    if let Some(handle) = reconciler {
        if let Err(err) = handle.await {
            warn!(error = %err, "reconciler task ended abnormally");
        }
    }
    info!("shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(log: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn build_index(search: &SearchSettings) -> Result<Arc<dyn SearchIndex>> {
    match search.backend {
        SearchBackend::Memory => {
            warn!("using the in-memory search index; documents are lost on restart");
            Ok(Arc::new(InMemorySearchIndex::new()))
        }
        SearchBackend::Elasticsearch => elastic_index(search),
    }
}

#[cfg(feature = "search-elastic")]
fn elastic_index(search: &SearchSettings) -> Result<Arc<dyn SearchIndex>> {
    use storage_adapters::{ElasticsearchConfig, ElasticsearchIndex};

    let mut config = ElasticsearchConfig::new(&search.url, &search.index);
    config.username = search.username.clone();
    config.password = search
        .password
        .as_ref()
        .map(|p| p.expose_secret().to_owned().into());
    config.timeout = Duration::from_secs(search.timeout_secs);
    info!(url = %search.url, index = %search.index, "using elasticsearch index");
    Ok(Arc::new(ElasticsearchIndex::new(config)?))
}

#[cfg(not(feature = "search-elastic"))]
fn elastic_index(_: &SearchSettings) -> Result<Arc<dyn SearchIndex>> {
    anyhow::bail!("search.backend = elasticsearch needs the `search-elastic` feature")
}

async fn run_reconciler(sync: Arc<IndexSync>, every: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = sync.reconcile().await {
                    error!(error = %err, "reconcile pass failed");
                }
            }
            _ = stop.changed() => {
                info!("reconciler stopped");
                return;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received Ctrl+C, shutting down"),
        _ = terminate => warn!("received SIGTERM, shutting down"),
    }
}
