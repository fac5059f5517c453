// src/dag/mod.rs

//! Task graph model: nodes, edges, the two construction front-ends and
//! the pre-run validator.

pub mod graph;
pub mod keyed;
pub mod node;
pub(crate) mod validate;

pub use graph::TaskGraph;
pub use keyed::KeyedGraphBuilder;
pub use node::{action, Action, ActionFuture, TaskNode, TaskState};
