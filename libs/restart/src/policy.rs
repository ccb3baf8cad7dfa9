//! Restart policy configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    DEFAULT_BATCH_ATTEMPTS, DEFAULT_RESTART_DELAY, DEFAULT_SERVICE_ATTEMPTS,
    DEFAULT_SERVICE_INTERVAL,
};

/// Kind of job a task belongs to. Selects the tracker variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Long-running work that is expected to stay up.
    Service,

    /// Run-to-completion work.
    Batch,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Batch => "batch",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a job kind string is not recognized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job kind: {0}")]
pub struct ParseJobKindError(pub String);

impl FromStr for JobKind {
    type Err = ParseJobKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(Self::Service),
            "batch" => Ok(Self::Batch),
            other => Err(ParseJobKindError(other.to_string())),
        }
    }
}

/// Restart policy attached to a task group.
///
/// Supplied once when a tracker is created and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPolicy {
    /// Restarts allowed per window (service) or per lifetime (batch).
    pub attempts: u32,

    /// Length of the service restart window. Unused for batch work.
    pub interval: Duration,

    /// Base wait before a granted restart.
    pub delay: Duration,
}

impl RestartPolicy {
    /// Returns the default policy for a job kind.
    pub fn default_for(kind: JobKind) -> Self {
        match kind {
            JobKind::Service => Self {
                attempts: DEFAULT_SERVICE_ATTEMPTS,
                interval: DEFAULT_SERVICE_INTERVAL,
                delay: DEFAULT_RESTART_DELAY,
            },
            JobKind::Batch => Self {
                attempts: DEFAULT_BATCH_ATTEMPTS,
                interval: Duration::ZERO,
                delay: DEFAULT_RESTART_DELAY,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_parse() {
        assert_eq!("service".parse::<JobKind>(), Ok(JobKind::Service));
        assert_eq!("batch".parse::<JobKind>(), Ok(JobKind::Batch));
        assert_eq!(
            "system".parse::<JobKind>(),
            Err(ParseJobKindError("system".to_string()))
        );
    }

    #[test]
    fn test_default_policies() {
        let service = RestartPolicy::default_for(JobKind::Service);
        assert_eq!(service.attempts, 2);
        assert_eq!(service.interval, Duration::from_secs(60));

        let batch = RestartPolicy::default_for(JobKind::Batch);
        assert_eq!(batch.attempts, 15);
        assert_eq!(batch.interval, Duration::ZERO);
    }
}
