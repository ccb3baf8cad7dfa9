use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::scheduler::{CoreSchedConfig, GcWorkerConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub core: CoreSchedConfig,
    pub worker: GcWorkerConfig,
    pub timetable_granularity: Duration,
    pub timetable_limit: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = lookup("DROVER_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let core_defaults = CoreSchedConfig::default();
        let core = CoreSchedConfig {
            eval_gc_threshold: secs(
                &lookup,
                "DROVER_EVAL_GC_THRESHOLD_SECS",
                core_defaults.eval_gc_threshold,
            )?,
            node_gc_threshold: secs(
                &lookup,
                "DROVER_NODE_GC_THRESHOLD_SECS",
                core_defaults.node_gc_threshold,
            )?,
            region: lookup("DROVER_REGION").unwrap_or(core_defaults.region),
        };

        let worker_defaults = GcWorkerConfig::default();
        let worker = GcWorkerConfig {
            eval_gc_interval: nonzero_secs(
                &lookup,
                "DROVER_EVAL_GC_INTERVAL_SECS",
                worker_defaults.eval_gc_interval,
            )?,
            node_gc_interval: nonzero_secs(
                &lookup,
                "DROVER_NODE_GC_INTERVAL_SECS",
                worker_defaults.node_gc_interval,
            )?,
        };

        let timetable_granularity = secs(
            &lookup,
            "DROVER_TIMETABLE_GRANULARITY_SECS",
            Duration::from_secs(5 * 60),
        )?;
        let timetable_limit = secs(
            &lookup,
            "DROVER_TIMETABLE_LIMIT_SECS",
            Duration::from_secs(72 * 60 * 60),
        )?;

        Ok(Self {
            log_level,
            core,
            worker,
            timetable_granularity,
            timetable_limit,
        })
    }
}

fn secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'")),
        None => Ok(default),
    }
}

/// Like [`secs`], but rejects zero. Used for timer periods.
fn nonzero_secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let value = secs(lookup, key, default)?;
    if value.is_zero() {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}
