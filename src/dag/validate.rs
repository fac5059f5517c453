// src/dag/validate.rs

//! Run-set computation and cycle detection.
//!
//! Before an execution starts, the graph is restricted to the nodes that
//! should actually run this time:
//!
//! - roots are nodes with no non-signaled successors (nothing unfinished
//!   depends on them)
//! - from each root, predecessors are traversed recursively; every newly
//!   seen non-signaled node is admitted and marked `ReadyToRun`
//! - an empty run set while non-signaled nodes exist proves a cycle
//!
//! A Kahn peel over the admitted set then proves acyclicity; on failure
//! every admitted node is restored to `NotStarted` before the error is
//! returned.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::dag::graph::TaskGraph;
use crate::dag::node::TaskState;
use crate::errors::{Result, TaskDagError};
use crate::types::TaskId;

/// Compute and mark the run set, failing on cyclic input.
///
/// The only state mutation on success is `NotStarted -> ReadyToRun` on
/// admitted nodes; on a cycle failure all marks are rolled back.
pub(crate) fn compute_run_set(graph: &mut TaskGraph) -> Result<HashSet<TaskId>> {
    let roots: Vec<TaskId> = graph
        .task_ids()
        .filter(|&id| {
            graph
                .successors(id)
                .iter()
                .all(|&s| graph.state(s).is_signaled())
        })
        .collect();

    // Admit every non-signaled node reachable from a root by following
    // predecessor edges.
    let mut members: HashSet<TaskId> = HashSet::new();
    let mut stack: Vec<TaskId> = roots;

    while let Some(id) = stack.pop() {
        if graph.state(id).is_signaled() || !members.insert(id) {
            continue;
        }
        stack.extend(graph.predecessors(id));
    }

    if members.is_empty() {
        let unfinished = graph
            .task_ids()
            .find(|&id| !graph.state(id).is_signaled());
        if let Some(id) = unfinished {
            return Err(TaskDagError::Cycle(format!(
                "task {id} is unfinished but unreachable from any root"
            )));
        }
        // Nothing to do: empty input or everything already terminal.
        return Ok(members);
    }

    for &id in &members {
        graph.set_state(id, TaskState::ReadyToRun);
    }

    if let Err(e) = check_acyclic(graph, &members) {
        graph.reset_nodes(members.iter().copied());
        return Err(e);
    }

    debug!(run_set = members.len(), "run set admitted");
    Ok(members)
}

/// Kahn's algorithm restricted to the run set: repeatedly peel nodes
/// whose in-set predecessor count is zero; leftovers prove a cycle.
fn check_acyclic(graph: &TaskGraph, members: &HashSet<TaskId>) -> Result<()> {
    let mut in_degree: HashMap<TaskId, usize> = members
        .iter()
        .map(|&id| {
            let degree = graph
                .predecessors(id)
                .iter()
                .filter(|p| members.contains(p))
                .count();
            (id, degree)
        })
        .collect();

    let mut queue: VecDeque<TaskId> = in_degree
        .iter()
        .filter(|&(_, d)| *d == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut peeled = 0usize;
    while let Some(id) = queue.pop_front() {
        peeled += 1;
        for succ in graph.successors(id) {
            if let Some(d) = in_degree.get_mut(&succ) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(succ);
                }
            }
        }
    }

    if peeled != members.len() {
        let stuck: Vec<TaskId> = in_degree
            .iter()
            .filter(|&(_, d)| *d > 0)
            .map(|(&id, _)| id)
            .collect();
        return Err(TaskDagError::Cycle(format!(
            "cycle among tasks {stuck:?}"
        )));
    }

    Ok(())
}
