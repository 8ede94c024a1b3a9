//! Builders for wiring small graphs in tests.

use std::collections::HashMap;
use std::sync::Arc;

use taskdag::pool::ExecutionPool;
use taskdag::task::Task;

use crate::graph::TestGraph;

/// Declarative builder for a [`TestGraph`] plus its tasks.
///
/// ```ignore
/// let pool = Arc::new(ManualPool::new());
/// let (graph, tasks) = GraphBuilder::new(pool)
///     .task("t1", &[])
///     .task("t2", &["t1"])
///     .build();
/// tasks["t1"].start();
/// ```
pub struct GraphBuilder {
    pool: Arc<dyn ExecutionPool>,
    tasks: Vec<(Arc<Task>, Vec<String>)>,
}

impl GraphBuilder {
    pub fn new(pool: Arc<dyn ExecutionPool>) -> Self {
        Self {
            pool,
            tasks: Vec::new(),
        }
    }

    /// Add a task with the default body, waiting on the named tasks.
    pub fn task(self, label: &str, after: &[&str]) -> Self {
        self.task_with(Task::new(label), after)
    }

    /// Add a pre-built task (custom body, observers, ...), waiting on the
    /// named tasks.
    pub fn task_with(mut self, task: Arc<Task>, after: &[&str]) -> Self {
        self.tasks
            .push((task, after.iter().map(|s| s.to_string()).collect()));
        self
    }

    /// Build the graph: insert every task, then add edges in declaration
    /// order. Panics on an unknown `after` label (test misconfiguration).
    pub fn build(self) -> (Arc<TestGraph>, HashMap<String, Arc<Task>>) {
        let graph = TestGraph::new(self.pool);

        let mut by_label: HashMap<String, Arc<Task>> = HashMap::new();
        for (task, _) in &self.tasks {
            graph.insert(task);
            by_label.insert(task.label().to_string(), Arc::clone(task));
        }

        for (task, after) in &self.tasks {
            for dep_label in after {
                let prerequisite = by_label
                    .get(dep_label)
                    .unwrap_or_else(|| panic!("unknown prerequisite `{dep_label}`"));
                graph.add_edge(prerequisite, task);
            }
        }

        (graph, by_label)
    }
}
