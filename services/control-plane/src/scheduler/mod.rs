//! Core scheduler for administrative cluster work.
//!
//! The core scheduler is responsible for:
//! - Garbage collecting terminal evaluations and their allocations
//! - Deregistering dead nodes that no allocation references
//! - Running both passes periodically against fresh snapshots

mod core_sched;
mod error;
mod worker;

pub use core_sched::{
    allocs_collectible, eval_gc_candidates, node_gc_candidates, old_terminal_evals, CoreJob,
    CoreSchedConfig, CoreScheduler, EvalGcCandidates, GcReport, DEFAULT_EVAL_GC_THRESHOLD,
    DEFAULT_NODE_GC_THRESHOLD,
};
pub use error::CoreSchedError;
pub use worker::{GcWorker, GcWorkerConfig};
