//! Core scheduler: administrative garbage collection.
//!
//! The core scheduler handles evaluations of type `_core`. The evaluation's
//! job ID names the pass to run:
//!
//! - `eval-gc`: delete terminal evaluations together with their allocations
//! - `node-gc`: deregister dead nodes that nothing references anymore
//!
//! A record is only "old" if its modify index is at or below the index the
//! time table reports for `now - threshold`. Each pass is stateless: it
//! recomputes eligibility from one snapshot, so re-running after a crash or
//! a failed write simply finds the same candidates again.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use drover_id::{AllocId, EvalId, Index, NodeId};
use tracing::{debug, error, instrument};

use super::error::CoreSchedError;
use crate::rpc::{ClusterWriter, EvalDeleteRequest, NodeDeregisterRequest, WriteRequest};
use crate::state::{
    Allocation, EvalStatus, Evaluation, StateError, StateSnapshot, EVAL_TYPE_CORE,
};
use crate::timetable::IndexOracle;

/// Default age before terminal evaluations are collected.
pub const DEFAULT_EVAL_GC_THRESHOLD: Duration = Duration::from_secs(60 * 60);

/// Default age before dead nodes are collected.
pub const DEFAULT_NODE_GC_THRESHOLD: Duration = Duration::from_secs(24 * 60 * 60);

/// Administrative jobs run by the core scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreJob {
    EvalGc,
    NodeGc,
}

impl CoreJob {
    /// Job ID carried on the core evaluation.
    pub const fn job_id(&self) -> &'static str {
        match self {
            Self::EvalGc => "eval-gc",
            Self::NodeGc => "node-gc",
        }
    }

    /// Builds a fresh core evaluation requesting this job.
    pub fn evaluation(&self) -> Evaluation {
        Evaluation {
            id: EvalId::new(),
            job_id: self.job_id().to_string(),
            eval_type: EVAL_TYPE_CORE.to_string(),
            status: EvalStatus::Pending,
            modify_index: Index::ZERO,
        }
    }
}

impl FromStr for CoreJob {
    type Err = CoreSchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eval-gc" => Ok(Self::EvalGc),
            "node-gc" => Ok(Self::NodeGc),
            other => Err(CoreSchedError::UnknownJob(other.to_string())),
        }
    }
}

impl std::fmt::Display for CoreJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.job_id())
    }
}

/// GC horizons and the region writes are addressed to.
#[derive(Debug, Clone)]
pub struct CoreSchedConfig {
    pub eval_gc_threshold: Duration,
    pub node_gc_threshold: Duration,
    pub region: String,
}

impl Default for CoreSchedConfig {
    fn default() -> Self {
        Self {
            eval_gc_threshold: DEFAULT_EVAL_GC_THRESHOLD,
            node_gc_threshold: DEFAULT_NODE_GC_THRESHOLD,
            region: "global".to_string(),
        }
    }
}

/// What a pass collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub evals: usize,
    pub allocs: usize,
    pub nodes: usize,
}

impl GcReport {
    pub fn is_empty(&self) -> bool {
        self.evals == 0 && self.allocs == 0 && self.nodes == 0
    }
}

/// Evaluations and allocations eligible for deletion together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalGcCandidates {
    pub evals: Vec<EvalId>,
    pub allocs: Vec<AllocId>,
}

impl EvalGcCandidates {
    pub fn is_empty(&self) -> bool {
        self.evals.is_empty() && self.allocs.is_empty()
    }
}

// =============================================================================
// Eligibility
// =============================================================================

/// Evaluations that are terminal and at or below `threshold`.
pub fn old_terminal_evals(evals: Vec<Evaluation>, threshold: Index) -> Vec<Evaluation> {
    evals
        .into_iter()
        .filter(|eval| eval.terminal_status() && eval.modify_index <= threshold)
        .collect()
}

/// True if no allocation is still live or too recent to collect.
pub fn allocs_collectible(allocs: &[Allocation], threshold: Index) -> bool {
    allocs
        .iter()
        .all(|alloc| alloc.terminal_status() && alloc.modify_index <= threshold)
}

/// Computes the eval/alloc candidate set for `threshold`.
///
/// An evaluation is collected only together with all of its allocations. If
/// any allocation is live or recent, or the allocations cannot be read, the
/// evaluation is left for a later pass.
pub fn eval_gc_candidates<S>(snap: &S, threshold: Index) -> Result<EvalGcCandidates, StateError>
where
    S: StateSnapshot + ?Sized,
{
    let mut candidates = EvalGcCandidates::default();

    for eval in old_terminal_evals(snap.evals()?, threshold) {
        let allocs = match snap.allocs_by_eval(&eval.id) {
            Ok(allocs) => allocs,
            Err(e) => {
                error!(eval_id = %eval.id, error = %e, "Failed to get allocs for eval");
                continue;
            }
        };

        if !allocs_collectible(&allocs, threshold) {
            continue;
        }

        candidates.evals.push(eval.id);
        candidates.allocs.extend(allocs.iter().map(|alloc| alloc.id));
    }

    Ok(candidates)
}

/// Computes the dead nodes eligible for deregistration at `threshold`.
///
/// Any allocation referencing a node, terminal or not, keeps it.
pub fn node_gc_candidates<S>(snap: &S, threshold: Index) -> Result<Vec<NodeId>, StateError>
where
    S: StateSnapshot + ?Sized,
{
    let mut candidates = Vec::new();

    for node in snap.nodes()? {
        if !node.terminal_status() || node.modify_index > threshold {
            continue;
        }

        match snap.allocs_by_node(&node.id) {
            Ok(allocs) if allocs.is_empty() => candidates.push(node.id),
            Ok(_) => {}
            Err(e) => {
                error!(node_id = %node.id, error = %e, "Failed to get allocs for node");
            }
        }
    }

    Ok(candidates)
}

// =============================================================================
// Core Scheduler
// =============================================================================

/// Runs core jobs against one point-in-time snapshot.
pub struct CoreScheduler<S> {
    snap: S,
    oracle: Arc<dyn IndexOracle>,
    writer: Arc<dyn ClusterWriter>,
    config: CoreSchedConfig,
}

impl<S: StateSnapshot> CoreScheduler<S> {
    pub fn new(
        snap: S,
        oracle: Arc<dyn IndexOracle>,
        writer: Arc<dyn ClusterWriter>,
        config: CoreSchedConfig,
    ) -> Self {
        Self {
            snap,
            oracle,
            writer,
            config,
        }
    }

    /// Runs the job named by a core evaluation.
    #[instrument(skip(self, eval), fields(eval_id = %eval.id, job_id = %eval.job_id))]
    pub async fn process(&self, eval: &Evaluation) -> Result<(), CoreSchedError> {
        let job: CoreJob = eval.job_id.parse()?;

        let report = match job {
            CoreJob::EvalGc => self.eval_gc().await?,
            CoreJob::NodeGc => self.node_gc().await?,
        };

        if !report.is_empty() {
            debug!(
                evals = report.evals,
                allocs = report.allocs,
                nodes = report.nodes,
                "Core job collected records"
            );
        }
        Ok(())
    }

    /// Deletes old terminal evaluations together with their allocations.
    pub async fn eval_gc(&self) -> Result<GcReport, CoreSchedError> {
        let threshold = self.old_threshold(self.config.eval_gc_threshold)?;
        debug!(
            old_threshold = %threshold,
            horizon_secs = self.config.eval_gc_threshold.as_secs(),
            "eval GC: scanning before index"
        );

        let candidates = eval_gc_candidates(&self.snap, threshold)?;
        if candidates.is_empty() {
            return Ok(GcReport::default());
        }

        let report = GcReport {
            evals: candidates.evals.len(),
            allocs: candidates.allocs.len(),
            nodes: 0,
        };
        debug!(
            evals = report.evals,
            allocs = report.allocs,
            "eval GC: evaluations eligible"
        );

        let req = EvalDeleteRequest {
            evals: candidates.evals,
            allocs: candidates.allocs,
            write: self.write_request(),
        };
        if let Err(e) = self.writer.reap_evals(req).await {
            error!(error = %e, "Eval reap failed");
            return Err(CoreSchedError::EvalReap(e));
        }

        Ok(report)
    }

    /// Deregisters old dead nodes with no remaining allocations.
    ///
    /// Nodes are deregistered one at a time. The first failure ends the
    /// pass; nodes already deregistered stay deregistered and the rest are
    /// picked up next time.
    pub async fn node_gc(&self) -> Result<GcReport, CoreSchedError> {
        let threshold = self.old_threshold(self.config.node_gc_threshold)?;
        debug!(
            old_threshold = %threshold,
            horizon_secs = self.config.node_gc_threshold.as_secs(),
            "node GC: scanning before index"
        );

        let candidates = node_gc_candidates(&self.snap, threshold)?;
        if candidates.is_empty() {
            return Ok(GcReport::default());
        }
        debug!(nodes = candidates.len(), "node GC: nodes eligible");

        let mut report = GcReport::default();
        for node_id in candidates {
            let req = NodeDeregisterRequest {
                node_id,
                write: self.write_request(),
            };
            if let Err(e) = self.writer.deregister_node(req).await {
                error!(node_id = %node_id, error = %e, "Node reap failed");
                return Err(CoreSchedError::NodeReap { node_id, source: e });
            }
            report.nodes += 1;
        }

        Ok(report)
    }

    /// Index below which records are old enough for a GC horizon.
    fn old_threshold(&self, horizon: Duration) -> Result<Index, CoreSchedError> {
        let cutoff = TimeDelta::from_std(horizon)
            .ok()
            .and_then(|delta| Utc::now().checked_sub_signed(delta))
            .ok_or(CoreSchedError::InvalidThreshold(horizon))?;

        Ok(self.oracle.nearest_index(cutoff))
    }

    fn write_request(&self) -> WriteRequest {
        WriteRequest {
            region: self.config.region.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AllocClientStatus, AllocDesiredStatus, MemSnapshot, Node, NodeStatus};

    fn eval(status: EvalStatus, index: u64) -> Evaluation {
        Evaluation {
            id: EvalId::new(),
            job_id: "web".to_string(),
            eval_type: "service".to_string(),
            status,
            modify_index: Index::new(index),
        }
    }

    fn alloc(eval: &Evaluation, desired: AllocDesiredStatus, index: u64) -> Allocation {
        Allocation {
            id: AllocId::new(),
            eval_id: eval.id,
            node_id: NodeId::new(),
            desired_status: desired,
            client_status: AllocClientStatus::Complete,
            modify_index: Index::new(index),
        }
    }

    #[test]
    fn test_core_job_parse() {
        assert_eq!("eval-gc".parse::<CoreJob>().unwrap(), CoreJob::EvalGc);
        assert_eq!("node-gc".parse::<CoreJob>().unwrap(), CoreJob::NodeGc);

        let err = "job-gc".parse::<CoreJob>().unwrap_err();
        assert!(matches!(err, CoreSchedError::UnknownJob(ref tag) if tag == "job-gc"));
        assert_eq!(err.to_string(), "core scheduler cannot handle job 'job-gc'");
    }

    #[test]
    fn test_core_job_evaluation() {
        let eval = CoreJob::NodeGc.evaluation();
        assert_eq!(eval.job_id, "node-gc");
        assert_eq!(eval.eval_type, EVAL_TYPE_CORE);
        assert!(!eval.terminal_status());
    }

    #[test]
    fn test_old_terminal_evals_filters_status_and_age() {
        let keep = eval(EvalStatus::Complete, 10);
        let evals = vec![
            keep.clone(),
            eval(EvalStatus::Pending, 5),
            eval(EvalStatus::Failed, 11),
        ];
        assert_eq!(old_terminal_evals(evals, Index::new(10)), vec![keep]);
    }

    #[test]
    fn test_allocs_collectible() {
        let e = eval(EvalStatus::Complete, 1);
        let old = alloc(&e, AllocDesiredStatus::Stop, 5);
        let recent = alloc(&e, AllocDesiredStatus::Stop, 50);
        let mut live = alloc(&e, AllocDesiredStatus::Run, 5);
        live.client_status = AllocClientStatus::Running;

        let threshold = Index::new(10);
        assert!(allocs_collectible(&[], threshold));
        assert!(allocs_collectible(std::slice::from_ref(&old), threshold));
        assert!(!allocs_collectible(&[old.clone(), recent], threshold));
        assert!(!allocs_collectible(&[old, live], threshold));
    }

    #[test]
    fn test_eval_collected_with_its_allocs() {
        let e = eval(EvalStatus::Complete, 5);
        let a = alloc(&e, AllocDesiredStatus::Stop, 6);
        let snap = MemSnapshot::new().with_eval(e.clone()).with_alloc(a.clone());

        let candidates = eval_gc_candidates(&snap, Index::new(10)).unwrap();
        assert_eq!(candidates.evals, vec![e.id]);
        assert_eq!(candidates.allocs, vec![a.id]);
    }

    #[test]
    fn test_live_alloc_vetoes_whole_eval() {
        let e = eval(EvalStatus::Complete, 5);
        let done = alloc(&e, AllocDesiredStatus::Stop, 6);
        let mut running = alloc(&e, AllocDesiredStatus::Run, 6);
        running.client_status = AllocClientStatus::Running;
        let snap = MemSnapshot::new()
            .with_eval(e)
            .with_alloc(done)
            .with_alloc(running);

        let candidates = eval_gc_candidates(&snap, Index::new(10)).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_node_with_terminal_alloc_kept() {
        let dead = Node {
            id: NodeId::new(),
            status: NodeStatus::Down,
            modify_index: Index::new(3),
        };
        let referenced = Node {
            id: NodeId::new(),
            status: NodeStatus::Down,
            modify_index: Index::new(3),
        };
        let e = eval(EvalStatus::Complete, 2);
        let mut a = alloc(&e, AllocDesiredStatus::Stop, 2);
        a.node_id = referenced.id;
        let snap = MemSnapshot::new()
            .with_node(dead.clone())
            .with_node(referenced)
            .with_alloc(a);

        assert_eq!(node_gc_candidates(&snap, Index::new(10)).unwrap(), vec![dead.id]);
    }

    #[test]
    fn test_gc_report_empty() {
        assert!(GcReport::default().is_empty());
        assert!(!GcReport {
            nodes: 1,
            ..GcReport::default()
        }
        .is_empty());
    }
}
