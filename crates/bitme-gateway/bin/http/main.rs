mod cli;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use bitme_core::{MissPolicy, UrlStore};
use bitme_gateway::{App, AppState};
use bitme_generator::RandomGenerator;
use bitme_storage::{InMemoryUrlStore, PgUrlStore, PoolConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        strict_resolve = config.strict_resolve,
        "starting gateway server"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, Arc::new(InMemoryUrlStore::new())).await?;
        }
        StorageBackendArg::Postgres => {
            let dsn = config
                .postgres_dsn
                .clone()
                .context("postgres dsn is required when storage backend is postgres")?;
            let pool_config = PoolConfig::builder()
                .dsn(dsn)
                .max_conns(config.max_conns)
                .min_conns(config.min_conns)
                .max_conn_lifetime(Duration::from_secs(config.max_conn_lifetime_secs))
                .max_conn_idle_time(Duration::from_secs(config.max_conn_idle_time_secs))
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .build();

            let store = PgUrlStore::connect(&pool_config)
                .await
                .context("failed to open postgres pool")?;
            if config.init_schema {
                store.ensure_schema().await?;
            }

            let served = run_server(&config, Arc::new(store.clone())).await;
            store.close().await;
            served?;
        }
    }

    info!("gateway server stopped");
    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormatArg::Text => subscriber.init(),
        LogFormatArg::Json => subscriber.json().init(),
    }
}

async fn run_server(config: &CLI, store: Arc<dyn UrlStore>) -> anyhow::Result<()> {
    let miss_policy = if config.strict_resolve {
        MissPolicy::FailFast
    } else {
        MissPolicy::Tolerant
    };
    let state = AppState::new(
        store,
        Arc::new(RandomGenerator::with_length(config.short_code_length)),
        Arc::new(RandomGenerator::with_length(config.admin_code_length)),
    )
    .with_miss_policy(miss_policy);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
