// src/exec/sequential.rs

//! Sequential fast-path executor.
//!
//! Chosen only when the global cap is 1 and every runnable task uses the
//! default pool, so pool bookkeeping is unnecessary: one action runs at a
//! time, highest weight first among ready tasks.

use std::cmp::Reverse;
use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dag::graph::TaskGraph;
use crate::dag::node::TaskState;
use crate::errors::{Result, TaskDagError};
use crate::exec::finalize_completion;
use crate::types::TaskId;

pub(crate) async fn run(
    graph: &mut TaskGraph,
    members: &HashSet<TaskId>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut remaining: HashSet<TaskId> = members.clone();

    loop {
        if cancel.is_cancelled() {
            return Err(TaskDagError::Cancelled);
        }

        // Reap tasks that became terminal without running (skip
        // propagation from an earlier failure).
        remaining.retain(|&id| !graph.state(id).is_signaled());
        if remaining.is_empty() {
            break;
        }

        let mut ready: Vec<TaskId> = remaining
            .iter()
            .copied()
            .filter(|&id| graph.predecessors_signaled(id))
            .collect();
        ready.sort_by_key(|&id| {
            let weight = graph.node(id).map(|n| n.weight()).unwrap_or_default();
            (Reverse(weight), id)
        });

        let mut progressed = false;
        for id in ready {
            if graph.any_predecessor_faulted(id) {
                // Never launched; the fault arrived before selection.
                graph.set_state(id, TaskState::Skipped);
                remaining.remove(&id);
                progressed = true;
                continue;
            }

            remaining.remove(&id);
            graph.set_state(id, TaskState::Running);
            debug!(task = id, "running task");

            let Some(action) = graph.action_of(id) else {
                continue;
            };
            let outcome = (*action)(cancel.clone()).await;
            finalize_completion(graph, id, outcome);

            progressed = true;
            break;
        }

        if !progressed {
            // The validator should have refused cyclic input.
            return Err(TaskDagError::Cycle(
                "no runnable task while unfinished tasks remain".to_string(),
            ));
        }
    }

    Ok(())
}
