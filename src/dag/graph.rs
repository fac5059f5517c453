// src/dag/graph.rs

//! Task graph container: node storage, edge editing and the read-only
//! observation surface.
//!
//! Nodes are stored flat, keyed by [`TaskId`]; the predecessor/successor
//! relation lives in a petgraph [`DiGraphMap`] side-table (edge direction
//! predecessor -> successor), so no cyclic ownership arises. Exclusive
//! `&mut self` access serializes all edits; node identities come from a
//! process-wide atomic counter and stay stable for the node's lifetime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dag::node::{Action, TaskNode, TaskState};
use crate::errors::{Result, TaskDagError};
use crate::exec::RunOptions;
use crate::pool::Pool;
use crate::types::{TaskId, Weight};

/// Process-wide task id counter.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A graph of tasks with predecessor/successor edges.
///
/// This is the object-graph construction front-end and the unit of
/// execution: build nodes and edges, then drive the whole graph with
/// [`execute`](TaskGraph::execute). After a run, per-node outcomes are
/// observable through [`node`](TaskGraph::node).
#[derive(Debug, Default)]
pub struct TaskGraph {
    nodes: HashMap<TaskId, TaskNode>,
    /// Edge direction: predecessor -> successor.
    edges: DiGraphMap<TaskId, ()>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: DiGraphMap::new(),
        }
    }

    /// Create a node with the given weight and pool (`None` means the
    /// implicit default pool) and return its assigned id.
    pub fn add_node(&mut self, weight: Weight, pool: Option<Pool>, action: Action) -> TaskId {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let pool = pool.unwrap_or_default();

        self.nodes.insert(
            id,
            TaskNode {
                id,
                weight,
                pool,
                action,
                state: TaskState::NotStarted,
                failure: None,
            },
        );
        self.edges.add_node(id);

        debug!(task = id, weight, pool = pool.id(), "added task node");
        id
    }

    /// Record `pred` as a predecessor of `node` (and symmetrically `node`
    /// as a successor of `pred`). Edges are sets: re-adding an existing
    /// edge is silently ignored.
    pub fn add_predecessor(&mut self, node: TaskId, pred: TaskId) -> Result<()> {
        self.check_edge_edit(node, pred)?;
        self.edges.add_edge(pred, node, ());
        Ok(())
    }

    /// Exact inverse of [`add_predecessor`](TaskGraph::add_predecessor).
    pub fn remove_predecessor(&mut self, node: TaskId, pred: TaskId) -> Result<()> {
        self.check_edge_edit(node, pred)?;
        self.edges.remove_edge(pred, node);
        Ok(())
    }

    fn check_edge_edit(&self, node: TaskId, pred: TaskId) -> Result<()> {
        if node == pred {
            return Err(TaskDagError::InvalidArgument(format!(
                "task {node} cannot depend on itself"
            )));
        }
        let n = self.nodes.get(&node).ok_or_else(|| {
            TaskDagError::InvalidArgument(format!("unknown task id {node}"))
        })?;
        if !self.nodes.contains_key(&pred) {
            return Err(TaskDagError::InvalidArgument(format!(
                "unknown task id {pred}"
            )));
        }
        if n.state != TaskState::NotStarted {
            return Err(TaskDagError::InvalidState(format!(
                "task {node} has state {:?}; edges can only be edited before it starts",
                n.state
            )));
        }
        Ok(())
    }

    /// Read-only view of a node.
    pub fn node(&self, id: TaskId) -> Option<&TaskNode> {
        self.nodes.get(&id)
    }

    /// Tasks that must reach a terminal state before `id` may run.
    pub fn predecessors(&self, id: TaskId) -> Vec<TaskId> {
        self.edges
            .neighbors_directed(id, Direction::Incoming)
            .collect()
    }

    /// Tasks that depend on `id`.
    pub fn successors(&self, id: TaskId) -> Vec<TaskId> {
        self.edges
            .neighbors_directed(id, Direction::Outgoing)
            .collect()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run every node of this graph to a terminal state.
    ///
    /// Convenience wrapper around [`crate::exec::execute`].
    pub async fn execute(&mut self, options: RunOptions, cancel: CancellationToken) -> Result<()> {
        crate::exec::execute(self, options, cancel).await
    }

    // --- internal surface for the validator and executors ---

    pub(crate) fn state(&self, id: TaskId) -> TaskState {
        match self.nodes.get(&id) {
            Some(n) => n.state,
            None => {
                // Should not happen once a run set is computed; treat an
                // unknown id as terminal so it cannot wedge a run.
                warn!(task = id, "state queried for unknown task id");
                TaskState::Skipped
            }
        }
    }

    pub(crate) fn set_state(&mut self, id: TaskId, state: TaskState) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.state = state;
        }
    }

    pub(crate) fn record_failure(&mut self, id: TaskId, err: anyhow::Error) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.failure = Some(err);
        }
    }

    /// Clone of the node's action handle, for launching.
    pub(crate) fn action_of(&self, id: TaskId) -> Option<Action> {
        self.nodes.get(&id).map(|n| Arc::clone(&n.action))
    }

    /// Whether every predecessor of `id` has reached a terminal state.
    pub(crate) fn predecessors_signaled(&self, id: TaskId) -> bool {
        self.edges
            .neighbors_directed(id, Direction::Incoming)
            .all(|p| self.state(p).is_signaled())
    }

    /// Whether any predecessor of `id` ended `Failed` or `Skipped`.
    pub(crate) fn any_predecessor_faulted(&self, id: TaskId) -> bool {
        self.edges
            .neighbors_directed(id, Direction::Incoming)
            .any(|p| self.state(p).is_faulted())
    }

    /// Transitively mark every dependent of `failed` as `Skipped`.
    ///
    /// Dependents that are already terminal keep their state; a dependent
    /// that is currently `Running` is overwritten, and its eventual
    /// completion must not undo the skip (the completion path gates on
    /// the state). Returns the newly skipped ids.
    pub(crate) fn skip_dependents(&mut self, failed: TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.successors(failed);
        let mut skipped = Vec::new();

        while let Some(id) = stack.pop() {
            let state = self.state(id);
            if state.is_signaled() {
                continue;
            }
            self.set_state(id, TaskState::Skipped);
            debug!(
                task = id,
                upstream = failed,
                was = ?state,
                "skipping dependent of failed task"
            );
            skipped.push(id);
            stack.extend(self.successors(id));
        }

        skipped
    }

    /// Restore the given nodes to `NotStarted`, clearing any captured
    /// failure value.
    pub(crate) fn reset_nodes(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        for id in ids {
            if let Some(n) = self.nodes.get_mut(&id) {
                n.state = TaskState::NotStarted;
                n.failure = None;
            }
        }
    }
}
