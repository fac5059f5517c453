use std::collections::HashMap;

use taskdag::{Action, Pool, TaskGraph, TaskId, Weight};

/// Fluent builder for small test graphs keyed by human-readable names.
///
/// `after` edges may reference any already-added name; the builder panics
/// on a bad fixture rather than returning errors, since a malformed
/// fixture is a test bug.
pub struct GraphBuilder {
    graph: TaskGraph,
    ids: HashMap<String, TaskId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: TaskGraph::new(),
            ids: HashMap::new(),
        }
    }

    pub fn task(mut self, name: &str, weight: Weight, action: Action) -> Self {
        let id = self.graph.add_node(weight, None, action);
        self.ids.insert(name.to_string(), id);
        self
    }

    pub fn task_in_pool(mut self, name: &str, weight: Weight, pool: Pool, action: Action) -> Self {
        let id = self.graph.add_node(weight, Some(pool), action);
        self.ids.insert(name.to_string(), id);
        self
    }

    /// Make `name` depend on `dep` (both must already be added).
    pub fn after(mut self, name: &str, dep: &str) -> Self {
        let node = self.id(name);
        let pred = self.id(dep);
        self.graph
            .add_predecessor(node, pred)
            .expect("failed to add edge in test fixture");
        self
    }

    pub fn id(&self, name: &str) -> TaskId {
        *self
            .ids
            .get(name)
            .unwrap_or_else(|| panic!("unknown task name '{name}' in test fixture"))
    }

    pub fn build(self) -> (TaskGraph, HashMap<String, TaskId>) {
        (self.graph, self.ids)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
