//! In-memory state store.
//!
//! Acts as a single-node cluster: every write is assigned the next log
//! index, witnessed in the time table, and applied immediately. Snapshots
//! are cheap clones taken under the read lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use drover_id::{AllocId, EvalId, Index, NodeId};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Allocation, Evaluation, Node, SnapshotSource, StateError, StateSnapshot};
use crate::rpc::{ClusterWriter, EvalDeleteRequest, NodeDeregisterRequest, WriteError};
use crate::timetable::TimeTable;

#[derive(Debug, Clone, Default)]
struct Tables {
    evals: BTreeMap<EvalId, Evaluation>,
    allocs: BTreeMap<AllocId, Allocation>,
    nodes: BTreeMap<NodeId, Node>,
}

#[derive(Debug, Default)]
struct Inner {
    index: Index,
    tables: Tables,
}

impl Inner {
    fn next_index(&mut self, time_table: &TimeTable) -> Index {
        self.index = self.index.next();
        time_table.witness(self.index, Utc::now());
        self.index
    }
}

/// In-memory cluster state with a local write path.
pub struct MemStore {
    region: String,
    inner: RwLock<Inner>,
    time_table: Arc<TimeTable>,
}

impl MemStore {
    pub fn new(region: impl Into<String>, time_table: Arc<TimeTable>) -> Self {
        Self {
            region: region.into(),
            inner: RwLock::new(Inner::default()),
            time_table,
        }
    }

    /// Time table witnessed by this store's writes.
    pub fn time_table(&self) -> Arc<TimeTable> {
        Arc::clone(&self.time_table)
    }

    /// Index of the most recent write.
    pub async fn latest_index(&self) -> Index {
        self.inner.read().await.index
    }

    /// Inserts or replaces an evaluation, stamping it with the next index.
    pub async fn upsert_eval(&self, mut eval: Evaluation) -> Index {
        let mut inner = self.inner.write().await;
        let index = inner.next_index(&self.time_table);
        eval.modify_index = index;
        inner.tables.evals.insert(eval.id, eval);
        index
    }

    /// Inserts or replaces an allocation, stamping it with the next index.
    pub async fn upsert_alloc(&self, mut alloc: Allocation) -> Index {
        let mut inner = self.inner.write().await;
        let index = inner.next_index(&self.time_table);
        alloc.modify_index = index;
        inner.tables.allocs.insert(alloc.id, alloc);
        index
    }

    /// Inserts or replaces a node, stamping it with the next index.
    pub async fn upsert_node(&self, mut node: Node) -> Index {
        let mut inner = self.inner.write().await;
        let index = inner.next_index(&self.time_table);
        node.modify_index = index;
        inner.tables.nodes.insert(node.id, node);
        index
    }

    /// Takes a point-in-time snapshot.
    pub async fn snapshot(&self) -> MemSnapshot {
        let inner = self.inner.read().await;
        MemSnapshot {
            tables: inner.tables.clone(),
        }
    }

    fn check_region(&self, method: &'static str, region: &str) -> Result<(), WriteError> {
        if region == self.region {
            return Ok(());
        }
        Err(WriteError::Rpc {
            method,
            message: format!("no route to region '{region}'"),
        })
    }
}

#[async_trait]
impl ClusterWriter for MemStore {
    async fn reap_evals(&self, req: EvalDeleteRequest) -> Result<(), WriteError> {
        self.check_region("Eval.Reap", &req.write.region)?;

        let mut inner = self.inner.write().await;
        let index = inner.next_index(&self.time_table);
        for id in &req.evals {
            inner.tables.evals.remove(id);
        }
        for id in &req.allocs {
            inner.tables.allocs.remove(id);
        }

        debug!(
            index = %index,
            evals = req.evals.len(),
            allocs = req.allocs.len(),
            "Applied eval reap"
        );
        Ok(())
    }

    async fn deregister_node(&self, req: NodeDeregisterRequest) -> Result<(), WriteError> {
        self.check_region("Node.Deregister", &req.write.region)?;

        let mut inner = self.inner.write().await;
        let index = inner.next_index(&self.time_table);
        let existed = inner.tables.nodes.remove(&req.node_id).is_some();

        debug!(index = %index, node_id = %req.node_id, existed, "Applied node deregister");
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for MemStore {
    type Snapshot = MemSnapshot;

    async fn snapshot(&self) -> Result<MemSnapshot, StateError> {
        Ok(MemStore::snapshot(self).await)
    }
}

/// Immutable snapshot of a [`MemStore`], or a hand-built fixture.
#[derive(Debug, Clone, Default)]
pub struct MemSnapshot {
    tables: Tables,
}

impl MemSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an evaluation as-is, keeping its modify index.
    pub fn with_eval(mut self, eval: Evaluation) -> Self {
        self.tables.evals.insert(eval.id, eval);
        self
    }

    /// Adds an allocation as-is, keeping its modify index.
    pub fn with_alloc(mut self, alloc: Allocation) -> Self {
        self.tables.allocs.insert(alloc.id, alloc);
        self
    }

    /// Adds a node as-is, keeping its modify index.
    pub fn with_node(mut self, node: Node) -> Self {
        self.tables.nodes.insert(node.id, node);
        self
    }
}

impl StateSnapshot for MemSnapshot {
    fn evals(&self) -> Result<Vec<Evaluation>, StateError> {
        Ok(self.tables.evals.values().cloned().collect())
    }

    fn nodes(&self) -> Result<Vec<Node>, StateError> {
        Ok(self.tables.nodes.values().cloned().collect())
    }

    fn allocs_by_eval(&self, eval_id: &EvalId) -> Result<Vec<Allocation>, StateError> {
        Ok(self
            .tables
            .allocs
            .values()
            .filter(|alloc| alloc.eval_id == *eval_id)
            .cloned()
            .collect())
    }

    fn allocs_by_node(&self, node_id: &NodeId) -> Result<Vec<Allocation>, StateError> {
        Ok(self
            .tables
            .allocs
            .values()
            .filter(|alloc| alloc.node_id == *node_id)
            .cloned()
            .collect())
    }
}
