//! GC background worker.
//!
//! Enqueues the core GC jobs on their own intervals and runs each one
//! against a fresh snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::core_sched::{CoreJob, CoreSchedConfig, CoreScheduler};
use super::error::CoreSchedError;
use crate::rpc::ClusterWriter;
use crate::state::SnapshotSource;
use crate::timetable::IndexOracle;

#[derive(Debug, Clone)]
pub struct GcWorkerConfig {
    pub eval_gc_interval: Duration,
    pub node_gc_interval: Duration,
}

impl Default for GcWorkerConfig {
    fn default() -> Self {
        Self {
            eval_gc_interval: Duration::from_secs(300),
            node_gc_interval: Duration::from_secs(300),
        }
    }
}

/// Periodically runs the core GC jobs until shutdown.
pub struct GcWorker<Src> {
    source: Arc<Src>,
    oracle: Arc<dyn IndexOracle>,
    writer: Arc<dyn ClusterWriter>,
    sched_config: CoreSchedConfig,
    config: GcWorkerConfig,
}

impl<Src: SnapshotSource> GcWorker<Src> {
    pub fn new(
        source: Arc<Src>,
        oracle: Arc<dyn IndexOracle>,
        writer: Arc<dyn ClusterWriter>,
        sched_config: CoreSchedConfig,
        config: GcWorkerConfig,
    ) -> Self {
        Self {
            source,
            oracle,
            writer,
            sched_config,
            config,
        }
    }

    /// Run the GC worker until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            eval_gc_interval_secs = self.config.eval_gc_interval.as_secs(),
            node_gc_interval_secs = self.config.node_gc_interval.as_secs(),
            region = %self.sched_config.region,
            "Starting GC worker"
        );

        let mut eval_interval = tokio::time::interval(self.config.eval_gc_interval);
        let mut node_interval = tokio::time::interval(self.config.node_gc_interval);
        // Don't collect on startup - wait for first interval
        eval_interval.tick().await;
        node_interval.tick().await;

        loop {
            tokio::select! {
                _ = eval_interval.tick() => {
                    self.run_logged(CoreJob::EvalGc).await;
                }
                _ = node_interval.tick() => {
                    self.run_logged(CoreJob::NodeGc).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("GC worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Runs one core job against a fresh snapshot.
    pub async fn run_once(&self, job: CoreJob) -> Result<(), CoreSchedError> {
        let snap = self.source.snapshot().await?;
        let sched = CoreScheduler::new(
            snap,
            Arc::clone(&self.oracle),
            Arc::clone(&self.writer),
            self.sched_config.clone(),
        );
        sched.process(&job.evaluation()).await
    }

    async fn run_logged(&self, job: CoreJob) {
        if let Err(e) = self.run_once(job).await {
            // Retried on the next tick.
            error!(job = %job, error = %e, "Core GC job failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GcWorkerConfig::default();
        assert_eq!(config.eval_gc_interval.as_secs(), 300);
        assert_eq!(config.node_gc_interval.as_secs(), 300);
    }
}
