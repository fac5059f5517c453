// src/dag/node.rs

//! Task metadata and lifecycle state.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::pool::Pool;
use crate::types::{TaskId, Weight};

/// Future returned by a task action.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// User-supplied asynchronous action.
///
/// The action receives the run's cancellation token so long-running work
/// can wind down early when the run is cancelled. It must be re-invokable
/// (`Fn`) because a node reset via `reset_after_done` may run again in a
/// later run.
pub type Action = Arc<dyn Fn(CancellationToken) -> ActionFuture + Send + Sync>;

/// Adapt an async closure into an [`Action`].
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |cancel| Box::pin(f(cancel)))
}

/// Lifecycle state of a task node.
///
/// Transitions run `NotStarted -> ReadyToRun -> Running -> {Completed |
/// Failed}`, or from any pre-terminal state to `Skipped` when a
/// predecessor faults. `Skipped` is monotone: once set it is never
/// overwritten by a late completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    ReadyToRun,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskState {
    /// Terminal states.
    pub fn is_signaled(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Skipped
        )
    }

    /// Terminal states that block dependents.
    pub fn is_faulted(self) -> bool {
        matches!(self, TaskState::Failed | TaskState::Skipped)
    }
}

/// One unit of work: weight, pool membership, async action, and state.
///
/// Nodes are owned by a [`TaskGraph`](crate::dag::TaskGraph); edges live
/// in the graph's side-table, keyed by [`TaskId`].
pub struct TaskNode {
    pub(crate) id: TaskId,
    pub(crate) weight: Weight,
    pub(crate) pool: Pool,
    pub(crate) action: Action,
    pub(crate) state: TaskState,
    pub(crate) failure: Option<anyhow::Error>,
}

impl TaskNode {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_signaled(&self) -> bool {
        self.state.is_signaled()
    }

    pub fn is_faulted(&self) -> bool {
        self.state.is_faulted()
    }

    /// Failure value captured from the action, present only when the node
    /// is `Failed`.
    pub fn failure(&self) -> Option<&anyhow::Error> {
        self.failure.as_ref()
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .field("pool", &self.pool)
            .field("state", &self.state)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
