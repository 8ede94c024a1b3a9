// src/graph.rs

//! The graph collaborator interface.
//!
//! The containing graph owns its tasks and answers structural queries; this
//! crate never assumes anything about how edges are stored, and never
//! detects cycles itself. Implementations must hand back acyclic dependent
//! sets; cascades recurse through `dependents` and rely on the from-state
//! checks (plus acyclicity) to terminate.

use std::sync::Arc;

use crate::pool::ExecutionPool;
use crate::task::{Task, TaskFailure, TaskOutput};

/// Collaborator implemented by the graph container that owns tasks.
///
/// Tasks hold a `Weak` back-reference to their graph; the graph keeps tasks
/// alive, never the other way around.
///
/// The `task_*` notification methods are called from inside a lifecycle
/// operation's side-effect block, after the transition is committed and
/// state observers have fired. They may call lifecycle operations back
/// (each re-enters the target task's own guard), but must not block
/// indefinitely.
pub trait TaskGraph: Send + Sync {
    /// Direct prerequisites of `task` (tasks that must be Finished before
    /// `task` may become Ready).
    fn prerequisites(&self, task: &Task) -> Vec<Arc<Task>>;

    /// Direct dependents of `task` (tasks that list `task` as a
    /// prerequisite).
    fn dependents(&self, task: &Task) -> Vec<Arc<Task>>;

    /// Pool used to run task bodies when the task has no per-task override.
    fn default_pool(&self) -> Arc<dyn ExecutionPool>;

    /// `task` was reset back to Pending; aggregate bookkeeping (completion
    /// counts, progress bars, ...) should be updated.
    fn task_was_reset(&self, task: &Task);

    /// `task` entered Finished with the given result.
    fn task_finished(&self, task: &Task, result: Option<&TaskOutput>);

    /// `task` entered Failed with the given error.
    fn task_failed(&self, task: &Task, error: &TaskFailure);
}
