// src/dag/keyed.rs

//! Id-keyed construction facade.
//!
//! An alternative front-end for callers that address operations by their
//! own integer keys instead of holding [`TaskId`]s. Dependency keys must
//! already be registered when an operation is added; forward references
//! are rejected at admission time. Scheduling semantics are identical to
//! building the [`TaskGraph`] directly.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::dag::graph::TaskGraph;
use crate::dag::node::Action;
use crate::errors::{Result, TaskDagError};
use crate::exec::RunOptions;
use crate::pool::Pool;
use crate::types::{TaskId, Weight};

/// Builds a [`TaskGraph`] from operations keyed by caller-chosen ids.
#[derive(Debug, Default)]
pub struct KeyedGraphBuilder {
    graph: TaskGraph,
    keys: HashMap<u64, TaskId>,
}

impl KeyedGraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: TaskGraph::new(),
            keys: HashMap::new(),
        }
    }

    /// Register an operation under `key`, depending on the operations
    /// registered under `deps`.
    ///
    /// Fails with `InvalidArgument` on a duplicate key or a dependency
    /// key that has not been registered yet.
    pub fn add_op(
        &mut self,
        key: u64,
        weight: Weight,
        pool: Option<Pool>,
        deps: &[u64],
        action: Action,
    ) -> Result<TaskId> {
        if self.keys.contains_key(&key) {
            return Err(TaskDagError::InvalidArgument(format!(
                "operation key {key} is already registered"
            )));
        }

        let mut pred_ids = Vec::with_capacity(deps.len());
        for dep in deps {
            match self.keys.get(dep) {
                Some(&id) => pred_ids.push(id),
                None => {
                    return Err(TaskDagError::InvalidArgument(format!(
                        "operation {key} depends on unregistered key {dep}"
                    )))
                }
            }
        }

        let id = self.graph.add_node(weight, pool, action);
        for pred in pred_ids {
            self.graph.add_predecessor(id, pred)?;
        }
        self.keys.insert(key, id);
        Ok(id)
    }

    /// The [`TaskId`] assigned to `key`, if registered.
    pub fn node_id(&self, key: u64) -> Option<TaskId> {
        self.keys.get(&key).copied()
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn into_graph(self) -> TaskGraph {
        self.graph
    }

    /// Run the built graph; thin wrapper over [`crate::exec::execute`].
    pub async fn execute(&mut self, options: RunOptions, cancel: CancellationToken) -> Result<()> {
        self.graph.execute(options, cancel).await
    }
}
