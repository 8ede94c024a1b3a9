// src/observe.rs

//! Observation surface: state-change events and completion delegates.
//!
//! A task commits a transition under its own lock, releases the lock, and
//! only then fires its state-change observers; the operation's side-effect
//! block (cascades, graph notifications) runs after the observers return.
//! Observers are therefore free to call lifecycle operations on the same
//! task or on others without deadlocking.

use std::sync::Arc;

use serde::Serialize;

use crate::state::TaskState;
use crate::task::{Task, TaskFailure, TaskOutput, TaskUid};

/// A committed state transition on a single task.
///
/// `seq` is the task-local commit counter: observers may receive events for
/// one task on different threads, but sorting by `seq` always recovers the
/// order in which the transitions were actually committed.
#[derive(Debug, Clone, Serialize)]
pub struct StateChange {
    pub task: TaskUid,
    pub label: String,
    pub from: TaskState,
    pub to: TaskState,
    pub seq: u64,
}

/// Callback registered via [`Task::on_state_change`]. Stored behind `Arc`
/// so the task can snapshot the observer list and invoke the callbacks
/// without holding its own registration lock.
pub type StateObserver = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Optional per-task delegate notified when the task reaches a completed
/// state. Unlike the graph collaborator (which is always told), this is
/// opt-in per task.
pub trait CompletionObserver: Send + Sync {
    fn task_finished(&self, task: &Task, result: Option<&TaskOutput>);
    fn task_failed(&self, task: &Task, error: &TaskFailure);
}
