// src/state.rs

//! Lifecycle states for tasks in the dependency graph.

use serde::Serialize;
use std::fmt;

/// Lifecycle state of a [`Task`](crate::task::Task).
///
/// The legal transitions are:
///
/// | From      | To        | Trigger                                   |
/// |-----------|-----------|-------------------------------------------|
/// | Pending   | Ready     | all prerequisites Finished                |
/// | Pending   | Cancelled | `cancel`                                  |
/// | Ready     | Pending   | unfinished prerequisite edge added        |
/// | Ready     | Executing | `start`                                   |
/// | Ready     | Cancelled | `cancel`                                  |
/// | Executing | Pending   | `reset`                                   |
/// | Executing | Cancelled | `cancel`                                  |
/// | Executing | Finished  | `finish`                                  |
/// | Executing | Failed    | `fail`                                    |
/// | Cancelled | Pending   | `retry` / `reset`                         |
/// | Finished  | Pending   | `reset`                                   |
/// | Failed    | Pending   | `retry` / `reset`                         |
///
/// A trigger issued from any other state is a silent no-op, so lifecycle
/// operations can always be invoked speculatively by concurrent callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Waiting on at least one unfinished prerequisite.
    Pending,
    /// Eligible to run (all prerequisites Finished, or none).
    Ready,
    /// The body is running (or about to run) on the execution pool.
    Executing,
    Cancelled,
    Finished,
    Failed,
}

impl Default for TaskState {
    /// Freshly constructed, unattached tasks are Ready.
    fn default() -> Self {
        TaskState::Ready
    }
}

impl TaskState {
    /// Whether this state carries a completion timestamp.
    pub fn is_completed(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Ready => "ready",
            TaskState::Executing => "executing",
            TaskState::Cancelled => "cancelled",
            TaskState::Finished => "finished",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}
