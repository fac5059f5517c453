// src/exec/mod.rs

//! Execution entry point and shared completion handling.
//!
//! [`execute`] validates the graph, computes the run set, and dispatches
//! to one of two executors:
//! - [`sequential`] when the global cap is 1 and no runnable task
//!   overrides the default pool
//! - [`pooled`] otherwise, which observes per-pool caps alongside the
//!   global cap
//!
//! Task failures are data, not control flow: a failed action marks its
//! node `Failed` and transitively skips dependents, and the run still
//! returns `Ok`. Only cancellation and pre-run validation abort a run.

pub mod pooled;
pub mod sequential;

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::node::TaskState;
use crate::dag::validate;
use crate::errors::{Result, TaskDagError};
use crate::types::TaskId;

/// Options for a single run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Global concurrency cap; also the cap of the default pool. Must be
    /// >= 1 unless every runnable task carries an explicit pool.
    pub max_parallelism: i32,
    /// Restore every task that reached a terminal state during the run
    /// back to `NotStarted` (clearing failure values) once the run
    /// finishes, so the same graph can run again.
    pub reset_after_done: bool,
}

impl RunOptions {
    pub fn new(max_parallelism: i32) -> Self {
        Self {
            max_parallelism,
            reset_after_done: false,
        }
    }

    pub fn reset_after_done(mut self, reset: bool) -> Self {
        self.reset_after_done = reset;
        self
    }
}

/// Drive every runnable task of `graph` to a terminal state.
pub async fn execute(
    graph: &mut TaskGraph,
    options: RunOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let members = validate::compute_run_set(graph)?;
    if members.is_empty() {
        debug!("nothing to run; all tasks already terminal or graph empty");
        return Ok(());
    }

    // The cap check is deferred until the run set is known: a cap below 1
    // is acceptable as long as no runnable task borrows it via the
    // default pool.
    if options.max_parallelism < 1 {
        if let Some(&id) = members.iter().find(|&&id| uses_default_pool(graph, id)) {
            graph.reset_nodes(members.iter().copied());
            return Err(TaskDagError::InvalidArgument(format!(
                "max_parallelism must be >= 1 (got {}) while task {id} uses the default pool",
                options.max_parallelism
            )));
        }
    }

    let sequential = options.max_parallelism == 1
        && members.iter().all(|&id| uses_default_pool(graph, id));

    info!(
        tasks = members.len(),
        max_parallelism = options.max_parallelism,
        sequential,
        "starting run"
    );

    let result = if sequential {
        sequential::run(graph, &members, cancel).await
    } else {
        pooled::run(graph, &members, options.max_parallelism, cancel).await
    };

    if result.is_ok() && options.reset_after_done {
        reset_finished(graph, &members);
    }

    result
}

fn uses_default_pool(graph: &TaskGraph, id: TaskId) -> bool {
    graph.node(id).map(|n| n.pool().is_default()).unwrap_or(true)
}

/// Apply an action outcome to its node.
///
/// The skip marker is monotone: a predecessor may have failed after this
/// task launched, and the resulting `Skipped` must survive the late
/// completion, whatever the action returned.
pub(crate) fn finalize_completion(graph: &mut TaskGraph, id: TaskId, result: anyhow::Result<()>) {
    if graph.state(id) == TaskState::Skipped {
        debug!(task = id, "completion for a task skipped mid-flight; keeping Skipped");
        return;
    }

    match result {
        Ok(()) => {
            graph.set_state(id, TaskState::Completed);
            debug!(task = id, "task completed");
        }
        Err(err) => {
            warn!(task = id, error = %err, "task failed; skipping dependents");
            graph.record_failure(id, err);
            graph.set_state(id, TaskState::Failed);
            let skipped = graph.skip_dependents(id);
            if !skipped.is_empty() {
                debug!(task = id, count = skipped.len(), "dependents skipped");
            }
        }
    }
}

/// Restore run-set members that reached a terminal state this run.
fn reset_finished(graph: &mut TaskGraph, members: &HashSet<TaskId>) {
    let finished: Vec<TaskId> = members
        .iter()
        .copied()
        .filter(|&id| graph.state(id).is_signaled())
        .collect();
    debug!(count = finished.len(), "restoring finished tasks to NotStarted");
    graph.reset_nodes(finished);
}
