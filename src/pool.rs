// src/pool.rs

//! Concurrency pools.
//!
//! A pool is a small value carrying a unique identity and a parallelism
//! cap. Tasks that share a pool identity compete for that pool's slots;
//! tasks with no explicit pool belong to the implicit default pool, whose
//! cap is borrowed from the run's global cap.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::{Result, TaskDagError};
use crate::types::PoolId;

/// Sentinel cap of the default pool, resolved to the global cap at run time.
const DEFAULT_POOL_CAP: i32 = -1;

/// Reserved identity of the default pool.
const DEFAULT_POOL_ID: PoolId = 0;

/// Process-wide pool id counter; 0 is reserved for the default pool.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A named concurrency bucket with its own cap.
///
/// Two tasks belong to the same pool iff their pool identities match, so
/// a `Pool` value should be created once and copied to every member task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pool {
    id: PoolId,
    max_parallelism: i32,
}

impl Pool {
    /// Create a pool allowing up to `max_parallelism` members to run at once.
    pub fn new(max_parallelism: i32) -> Result<Self> {
        if max_parallelism < 1 {
            return Err(TaskDagError::InvalidArgument(format!(
                "pool max_parallelism must be >= 1 (got {max_parallelism})"
            )));
        }
        Ok(Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            max_parallelism,
        })
    }

    /// The implicit pool of tasks created without an explicit pool.
    pub(crate) const fn default_pool() -> Self {
        Self {
            id: DEFAULT_POOL_ID,
            max_parallelism: DEFAULT_POOL_CAP,
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn max_parallelism(&self) -> i32 {
        self.max_parallelism
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_POOL_ID
    }

    /// Cap actually enforced during a run with the given global cap.
    pub(crate) fn effective_cap(&self, global_cap: i32) -> i32 {
        if self.max_parallelism > 0 {
            self.max_parallelism
        } else {
            global_cap
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::default_pool()
    }
}
