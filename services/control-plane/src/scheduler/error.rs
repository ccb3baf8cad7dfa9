//! Core scheduler error types.

use std::time::Duration;

use drover_id::NodeId;
use thiserror::Error;

use crate::rpc::WriteError;
use crate::state::StateError;

/// Errors surfaced by a core scheduler pass.
///
/// None of these are retried inside the pass; the caller reschedules.
#[derive(Debug, Error)]
pub enum CoreSchedError {
    /// The evaluation names a job the core scheduler does not run.
    #[error("core scheduler cannot handle job '{0}'")]
    UnknownJob(String),

    /// The GC horizon cannot be subtracted from the current time.
    #[error("GC threshold {0:?} is out of range")]
    InvalidThreshold(Duration),

    /// Reading the snapshot failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The batched eval/alloc delete failed.
    #[error("eval reap failed: {0}")]
    EvalReap(#[source] WriteError),

    /// Deregistering a node failed; later nodes were not attempted.
    #[error("node '{node_id}' reap failed: {source}")]
    NodeReap {
        node_id: NodeId,
        #[source]
        source: WriteError,
    },
}

impl CoreSchedError {
    /// Returns true if the failure came from the write path.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::EvalReap(_) | Self::NodeReap { .. })
    }
}
