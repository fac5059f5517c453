// src/exec/pooled.rs

//! Pooled parallel executor.
//!
//! The run set is partitioned by pool identity; each pool gets a slot
//! record with its effective cap, a pending list and a running count.
//! The main loop:
//!
//! 1. stop on cancellation
//! 2. reap tasks that became terminal without launching (skip
//!    propagation from failures)
//! 3. for every pool with free slots, launch ready tasks in descending
//!    weight order (ties broken by ascending id)
//! 4. wait for the first completion across all pools, then finalize it
//!
//! Graph bookkeeping stays on this loop's thread; spawned futures only
//! run the opaque user action and report its outcome.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::dag::graph::TaskGraph;
use crate::dag::node::TaskState;
use crate::errors::{Result, TaskDagError};
use crate::exec::finalize_completion;
use crate::types::{PoolId, TaskId};

/// Per-pool execution bookkeeping for one run.
struct PoolSlot {
    cap: usize,
    pending: Vec<TaskId>,
    running: usize,
}

type Completion = (PoolId, TaskId, anyhow::Result<()>);

pub(crate) async fn run(
    graph: &mut TaskGraph,
    members: &HashSet<TaskId>,
    global_cap: i32,
    cancel: CancellationToken,
) -> Result<()> {
    let mut slots: HashMap<PoolId, PoolSlot> = HashMap::new();
    for &id in members {
        let pool = graph.node(id).map(|n| n.pool()).unwrap_or_default();
        slots
            .entry(pool.id())
            .or_insert_with(|| PoolSlot {
                cap: pool.effective_cap(global_cap) as usize,
                pending: Vec::new(),
                running: 0,
            })
            .pending
            .push(id);
    }

    let mut run_set: HashSet<TaskId> = members.clone();
    let mut tasks: JoinSet<Completion> = JoinSet::new();

    loop {
        if cancel.is_cancelled() {
            return drain_cancelled(graph, &mut slots, &mut tasks).await;
        }

        // Reap tasks that reached a terminal state without launching, so
        // successors observe their predecessors as settled.
        for slot in slots.values_mut() {
            slot.pending.retain(|&id| !graph.state(id).is_signaled());
        }
        run_set.retain(|&id| !graph.state(id).is_signaled());

        let mut progressed = false;
        for (&pool_id, slot) in slots.iter_mut() {
            if slot.pending.is_empty() {
                continue;
            }

            let mut ready: Vec<TaskId> = slot
                .pending
                .iter()
                .copied()
                .filter(|&id| graph.predecessors_signaled(id))
                .collect();
            ready.sort_by_key(|&id| {
                let weight = graph.node(id).map(|n| n.weight()).unwrap_or_default();
                (Reverse(weight), id)
            });

            for id in ready {
                if graph.any_predecessor_faulted(id) {
                    // Never launched; a predecessor settled Failed or
                    // Skipped before this task was selected.
                    graph.set_state(id, TaskState::Skipped);
                    slot.pending.retain(|&x| x != id);
                    run_set.remove(&id);
                    progressed = true;
                    continue;
                }
                if slot.running >= slot.cap {
                    break;
                }

                slot.pending.retain(|&x| x != id);
                run_set.remove(&id);
                graph.set_state(id, TaskState::Running);
                let Some(action) = graph.action_of(id) else {
                    continue;
                };

                debug!(task = id, pool = pool_id, "launching task");
                let token = cancel.clone();
                tasks.spawn(async move {
                    let outcome = (*action)(token).await;
                    (pool_id, id, outcome)
                });
                slot.running += 1;
                progressed = true;
            }
        }

        if !tasks.is_empty() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return drain_cancelled(graph, &mut slots, &mut tasks).await;
                }
                joined = tasks.join_next() => {
                    if let Err(err) = observe_completion(graph, &mut slots, joined) {
                        return abort_run(&mut tasks, err).await;
                    }
                }
            }
            continue;
        }

        if run_set.is_empty() {
            break;
        }
        if !progressed {
            // The validator should have refused cyclic input.
            return Err(TaskDagError::Cycle(
                "no runnable task while unfinished tasks remain".to_string(),
            ));
        }
    }

    // Close the race with any straggler still in flight.
    while !tasks.is_empty() {
        let joined = tasks.join_next().await;
        if let Err(err) = observe_completion(graph, &mut slots, joined) {
            return abort_run(&mut tasks, err).await;
        }
    }

    Ok(())
}

fn observe_completion(
    graph: &mut TaskGraph,
    slots: &mut HashMap<PoolId, PoolSlot>,
    joined: Option<std::result::Result<Completion, tokio::task::JoinError>>,
) -> Result<()> {
    match joined {
        Some(Ok((pool_id, id, outcome))) => {
            if let Some(slot) = slots.get_mut(&pool_id) {
                slot.running -= 1;
            }
            finalize_completion(graph, id, outcome);
            Ok(())
        }
        Some(Err(join_err)) => {
            // The completion tuple is lost with the panicked task, so the
            // node and its pool slot cannot be settled; the run cannot
            // continue with consistent accounting.
            let cause = if join_err.is_panic() {
                "action task panicked"
            } else {
                "action task was cancelled"
            };
            Err(TaskDagError::Other(anyhow::anyhow!("{cause}: {join_err}")))
        }
        None => Ok(()),
    }
}

/// Fatal join failure: abort everything still in flight and surface the
/// error as the run's result.
async fn abort_run(tasks: &mut JoinSet<Completion>, err: TaskDagError) -> Result<()> {
    error!(error = %err, "aborting run after join failure");
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}
    Err(err)
}

/// Stop scheduling, let in-flight actions observe the token and wind
/// down, then surface the cancellation.
async fn drain_cancelled(
    graph: &mut TaskGraph,
    slots: &mut HashMap<PoolId, PoolSlot>,
    tasks: &mut JoinSet<Completion>,
) -> Result<()> {
    debug!(in_flight = tasks.len(), "cancellation observed; draining running tasks");
    while !tasks.is_empty() {
        let joined = tasks.join_next().await;
        if let Err(err) = observe_completion(graph, slots, joined) {
            error!(error = %err, "join failure while draining a cancelled run");
        }
    }
    Err(TaskDagError::Cancelled)
}
