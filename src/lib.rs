// src/lib.rs

//! Dependency-aware asynchronous task scheduler.
//!
//! Callers build a [`TaskGraph`] of weighted operations (each an opaque
//! async action, optionally bound to a concurrency [`Pool`]) and run the
//! whole graph with [`execute`]. Every task runs exactly once, as early
//! as the dependency order and pool caps allow; per-task outcomes
//! (completed, failed with a captured error, or skipped because a
//! predecessor faulted) are observable on the graph afterwards.
//!
//! ```no_run
//! use taskdag::{action, RunOptions, TaskGraph};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> taskdag::Result<()> {
//! let mut graph = TaskGraph::new();
//! let fetch = graph.add_node(10, None, action(|_| async { Ok(()) }));
//! let build = graph.add_node(20, None, action(|_| async { Ok(()) }));
//! let link = graph.add_node(0, None, action(|_| async { Ok(()) }));
//! graph.add_predecessor(link, fetch)?;
//! graph.add_predecessor(link, build)?;
//!
//! graph.execute(RunOptions::new(3), CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod dag;
pub mod errors;
pub mod exec;
pub mod pool;
pub mod types;

pub use dag::{action, Action, ActionFuture, KeyedGraphBuilder, TaskGraph, TaskNode, TaskState};
pub use errors::{Result, TaskDagError};
pub use exec::{execute, RunOptions};
pub use pool::Pool;
pub use types::{PoolId, TaskId, Weight};
