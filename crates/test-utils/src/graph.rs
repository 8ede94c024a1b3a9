//! Simple in-memory [`TaskGraph`] used by the integration tests.
//!
//! Keeps forward and reverse adjacency keyed by [`TaskUid`] (labels need
//! not be unique) and records every collaborator notification so tests
//! can assert on them. Acyclicity is the caller's responsibility, as it
//! is for any `TaskGraph` implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use taskdag::graph::TaskGraph;
use taskdag::pool::ExecutionPool;
use taskdag::task::{Task, TaskFailure, TaskOutput, TaskUid};
use tracing::warn;

/// Notification recorded from the graph-collaborator interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    Reset(String),
    Finished { task: String, has_result: bool },
    Failed { task: String, error: String },
}

struct Node {
    task: Arc<Task>,
    prerequisites: Vec<TaskUid>,
    dependents: Vec<TaskUid>,
}

#[derive(Default)]
struct Adjacency {
    nodes: HashMap<TaskUid, Node>,
}

/// In-memory graph that owns its tasks.
pub struct TestGraph {
    pool: Arc<dyn ExecutionPool>,
    inner: Mutex<Adjacency>,
    events: Mutex<Vec<GraphEvent>>,
}

impl TestGraph {
    pub fn new(pool: Arc<dyn ExecutionPool>) -> Arc<Self> {
        Arc::new(Self {
            pool,
            inner: Mutex::new(Adjacency::default()),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Insert a task and attach it to this graph.
    pub fn insert(self: &Arc<Self>, task: &Arc<Task>) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.nodes.insert(
                task.uid(),
                Node {
                    task: Arc::clone(task),
                    prerequisites: Vec::new(),
                    dependents: Vec::new(),
                },
            );
        }
        let graph: Arc<dyn TaskGraph> = self.clone();
        task.attach(&graph);
    }

    /// Add a prerequisite edge: `dependent` waits for `prerequisite`.
    ///
    /// Both tasks must already be inserted. Fires the task's
    /// `prerequisite_added` hook after the edge tables are updated and the
    /// graph lock is released (the hook may transition the task, which
    /// calls back into this graph).
    pub fn add_edge(&self, prerequisite: &Arc<Task>, dependent: &Arc<Task>) {
        {
            let mut inner = self.inner.lock().unwrap();
            assert!(
                inner.nodes.contains_key(&prerequisite.uid())
                    && inner.nodes.contains_key(&dependent.uid()),
                "add_edge on tasks not inserted into the graph"
            );
            inner
                .nodes
                .get_mut(&dependent.uid())
                .unwrap()
                .prerequisites
                .push(prerequisite.uid());
            inner
                .nodes
                .get_mut(&prerequisite.uid())
                .unwrap()
                .dependents
                .push(dependent.uid());
        }
        dependent.prerequisite_added(prerequisite);
    }

    /// Notifications recorded so far, in arrival order.
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.lock().unwrap().clone()
    }

    fn neighbours(&self, task: &Task, reverse: bool) -> Vec<Arc<Task>> {
        let inner = self.inner.lock().unwrap();
        let Some(node) = inner.nodes.get(&task.uid()) else {
            warn!(task = %task.label(), "graph query for a task not in this graph");
            return Vec::new();
        };
        let uids = if reverse {
            &node.dependents
        } else {
            &node.prerequisites
        };
        uids.iter()
            .filter_map(|uid| inner.nodes.get(uid).map(|n| Arc::clone(&n.task)))
            .collect()
    }
}

impl TaskGraph for TestGraph {
    fn prerequisites(&self, task: &Task) -> Vec<Arc<Task>> {
        self.neighbours(task, false)
    }

    fn dependents(&self, task: &Task) -> Vec<Arc<Task>> {
        self.neighbours(task, true)
    }

    fn default_pool(&self) -> Arc<dyn ExecutionPool> {
        Arc::clone(&self.pool)
    }

    fn task_was_reset(&self, task: &Task) {
        self.events
            .lock()
            .unwrap()
            .push(GraphEvent::Reset(task.label().to_string()));
    }

    fn task_finished(&self, task: &Task, result: Option<&TaskOutput>) {
        self.events.lock().unwrap().push(GraphEvent::Finished {
            task: task.label().to_string(),
            has_result: result.is_some(),
        });
    }

    fn task_failed(&self, task: &Task, error: &TaskFailure) {
        self.events.lock().unwrap().push(GraphEvent::Failed {
            task: task.label().to_string(),
            error: error.to_string(),
        });
    }
}
