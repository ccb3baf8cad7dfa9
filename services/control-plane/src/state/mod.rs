//! Cluster state records and the read-only snapshot contract.
//!
//! The core scheduler never mutates state directly. It reads a point-in-time
//! [`StateSnapshot`] and asks the write path to delete what it finds.
//!
//! [`MemStore`] is the in-process state store used by the binary and tests.

mod store;

pub use store::{MemSnapshot, MemStore};

use async_trait::async_trait;
use drover_id::{AllocId, EvalId, Index, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from snapshot reads.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state read failed: {0}")]
    Read(String),
}

// =============================================================================
// Evaluations
// =============================================================================

/// Evaluation type used for administrative work.
pub const EVAL_TYPE_CORE: &str = "_core";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStatus {
    Pending,
    Complete,
    Failed,
    Canceled,
}

impl EvalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Canceled)
    }
}

/// A scheduling evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvalId,

    /// Job this evaluation was created for. For core evaluations this is the
    /// administrative job tag.
    pub job_id: String,

    #[serde(rename = "type")]
    pub eval_type: String,

    pub status: EvalStatus,

    pub modify_index: Index,
}

impl Evaluation {
    /// Returns true once the evaluation will no longer be updated.
    pub fn terminal_status(&self) -> bool {
        self.status.is_terminal()
    }
}

// =============================================================================
// Allocations
// =============================================================================

/// What the scheduler wants the allocation to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocDesiredStatus {
    Run,
    Stop,
    Evict,
    Failed,
}

/// What the client last reported the allocation doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocClientStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Lost,
}

/// Placement of a task group on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocId,
    pub eval_id: EvalId,
    pub node_id: NodeId,
    pub desired_status: AllocDesiredStatus,
    pub client_status: AllocClientStatus,
    pub modify_index: Index,
}

impl Allocation {
    /// Returns true once neither the scheduler nor the client will move the
    /// allocation again.
    pub fn terminal_status(&self) -> bool {
        match self.desired_status {
            AllocDesiredStatus::Stop | AllocDesiredStatus::Evict | AllocDesiredStatus::Failed => {
                true
            }
            AllocDesiredStatus::Run => matches!(
                self.client_status,
                AllocClientStatus::Complete | AllocClientStatus::Failed | AllocClientStatus::Lost
            ),
        }
    }
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Initializing,
    Ready,
    Down,
}

/// A worker node registered with the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub status: NodeStatus,
    pub modify_index: Index,
}

impl Node {
    pub fn terminal_status(&self) -> bool {
        self.status == NodeStatus::Down
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Read-only, point-in-time view of cluster state.
///
/// Every read on one snapshot observes the same state.
pub trait StateSnapshot: Send + Sync {
    /// All evaluations, in no particular order.
    fn evals(&self) -> Result<Vec<Evaluation>, StateError>;

    /// All nodes, in no particular order.
    fn nodes(&self) -> Result<Vec<Node>, StateError>;

    /// Allocations created by an evaluation.
    fn allocs_by_eval(&self, eval_id: &EvalId) -> Result<Vec<Allocation>, StateError>;

    /// Allocations placed on a node, of any status.
    fn allocs_by_node(&self, node_id: &NodeId) -> Result<Vec<Allocation>, StateError>;
}

/// Produces fresh snapshots for periodic work.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    type Snapshot: StateSnapshot + 'static;

    async fn snapshot(&self) -> Result<Self::Snapshot, StateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(desired: AllocDesiredStatus, client: AllocClientStatus) -> Allocation {
        Allocation {
            id: AllocId::new(),
            eval_id: EvalId::new(),
            node_id: NodeId::new(),
            desired_status: desired,
            client_status: client,
            modify_index: Index::new(1),
        }
    }

    #[test]
    fn test_alloc_terminal_status() {
        use AllocClientStatus as C;
        use AllocDesiredStatus as D;

        assert!(!alloc(D::Run, C::Running).terminal_status());
        assert!(!alloc(D::Run, C::Pending).terminal_status());
        assert!(alloc(D::Run, C::Complete).terminal_status());
        assert!(alloc(D::Run, C::Lost).terminal_status());
        assert!(alloc(D::Stop, C::Running).terminal_status());
        assert!(alloc(D::Evict, C::Pending).terminal_status());
    }

    #[test]
    fn test_eval_terminal_status() {
        assert!(!EvalStatus::Pending.is_terminal());
        assert!(EvalStatus::Complete.is_terminal());
        assert!(EvalStatus::Failed.is_terminal());
        assert!(EvalStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_eval_serializes_type_field() {
        let eval = Evaluation {
            id: EvalId::new(),
            job_id: "eval-gc".to_string(),
            eval_type: EVAL_TYPE_CORE.to_string(),
            status: EvalStatus::Pending,
            modify_index: Index::ZERO,
        };
        let json = serde_json::to_value(&eval).unwrap();
        assert_eq!(json["type"], "_core");
        assert_eq!(json["status"], "pending");
    }
}
