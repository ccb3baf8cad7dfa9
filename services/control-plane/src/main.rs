//! drover control plane
//!
//! Runs the administrative core scheduler: periodic garbage collection of
//! terminal evaluations, their allocations, and dead nodes.

use std::sync::Arc;

use anyhow::Result;
use drover_control_plane::{
    config,
    scheduler::GcWorker,
    state::MemStore,
    timetable::TimeTable,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to DROVER_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting drover control plane");
    info!(
        region = %config.core.region,
        eval_gc_threshold_secs = config.core.eval_gc_threshold.as_secs(),
        node_gc_threshold_secs = config.core.node_gc_threshold.as_secs(),
        "Configuration loaded"
    );

    let time_table = Arc::new(TimeTable::new(
        config.timetable_granularity,
        config.timetable_limit,
    ));
    let store = Arc::new(MemStore::new(config.core.region.clone(), time_table.clone()));

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let gc_worker = GcWorker::new(
        store.clone(),
        time_table,
        store,
        config.core.clone(),
        config.worker.clone(),
    );
    let gc_handle = tokio::spawn(async move {
        gc_worker.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    // Signal shutdown to all workers
    let _ = shutdown_tx.send(true);

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, gc_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "GC worker terminated abnormally"),
        Err(e) => warn!(error = %e, "GC worker did not shut down in time"),
    }

    info!("Control plane shutdown complete");
    Ok(())
}
