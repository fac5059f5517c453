/// Stable identity of a task node, unique process-wide.
pub type TaskId = u64;

/// Priority weight. Among ready siblings in one pool, higher runs first.
pub type Weight = i32;

/// Identity of a concurrency pool.
pub type PoolId = u64;
