//! Catalog Server - Main entry point

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use catalog_common::logging::{init_logging, LogConfig};
use catalog_server::{
    api,
    config::Config,
    db::{self, ProductStore, UploadStore},
    features::FeatureState,
    ingest::{IngestPipeline, IngestWorker},
    storage::local::LocalBlobStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over the defaults here
    let mut log_config = LogConfig::from_env()?;
    if log_config.filter_directives.is_none() {
        log_config.filter_directives =
            Some("catalog_server=debug,tower_http=info,sqlx=warn".to_string());
    }
    init_logging(&log_config)?;

    info!("Starting Catalog Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database).await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    let blobs = Arc::new(LocalBlobStore::new(&config.storage.root));
    info!(root = %config.storage.root.display(), "Blob store initialized");

    let uploads = UploadStore::new(pool.clone());
    let products = ProductStore::new(pool.clone());

    let worker_handle = if config.ingest.enabled {
        let pipeline = Arc::new(IngestPipeline::new(
            blobs.clone(),
            Arc::new(products),
            Arc::new(uploads.clone()),
        ));
        let worker = IngestWorker::new(pipeline, uploads.clone(), &config.ingest);
        info!(
            poll_interval_ms = config.ingest.poll_interval_ms,
            max_concurrent = config.ingest.max_concurrent,
            "Ingestion worker started"
        );
        Some(worker.spawn())
    } else {
        info!("Ingestion worker disabled");
        None
    };

    let state = FeatureState {
        db: pool,
        uploads,
        blobs,
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    api::serve(addr, state, shutdown_signal()).await?;

    if let Some(handle) = worker_handle {
        handle.shutdown().await;
        info!("Ingestion worker stopped");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
