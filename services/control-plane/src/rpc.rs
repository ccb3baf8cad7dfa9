//! Cluster write path.
//!
//! Deletions requested by the core scheduler are forwarded to the cluster
//! leader and committed through the replicated log. Both operations are
//! idempotent at the write path: deleting an ID that is already gone is a
//! no-op, so a pass can safely resubmit everything it found.

use async_trait::async_trait;
use drover_id::{AllocId, EvalId, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the write path.
#[derive(Debug, Error)]
pub enum WriteError {
    /// No leader is currently known to forward to.
    #[error("no cluster leader")]
    NoLeader,

    /// The leader rejected or failed to apply the request.
    #[error("{method} failed: {message}")]
    Rpc {
        method: &'static str,
        message: String,
    },
}

/// Header shared by all write requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Region whose leader must commit the write.
    pub region: String,
}

/// Deletes evaluations and the allocations they created, in one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalDeleteRequest {
    pub evals: Vec<EvalId>,
    pub allocs: Vec<AllocId>,
    #[serde(flatten)]
    pub write: WriteRequest,
}

/// Removes a node from cluster state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDeregisterRequest {
    pub node_id: NodeId,
    #[serde(flatten)]
    pub write: WriteRequest,
}

/// Leader-forwarded mutations used by garbage collection.
#[async_trait]
pub trait ClusterWriter: Send + Sync {
    /// Deletes the evaluations and allocations named in the request.
    async fn reap_evals(&self, req: EvalDeleteRequest) -> Result<(), WriteError>;

    /// Deregisters a single node.
    async fn deregister_node(&self, req: NodeDeregisterRequest) -> Result<(), WriteError>;
}
