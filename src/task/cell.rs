// src/task/cell.rs

//! The transition guard: per-task guarded state cell and the transition
//! primitive every lifecycle operation goes through.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::observe::StateChange;
use crate::state::TaskState;
use crate::task::{Task, TaskFailure, TaskOutput};

/// Everything that must change atomically with the state.
///
/// Guarded by `Task::cell`; only the transition primitive below ever
/// writes to it. Keeping result/error/timestamp inside the same cell is
/// what makes "result is non-empty only in Finished" hold at every
/// observable instant, not just eventually.
#[derive(Default)]
pub(crate) struct TaskCell {
    pub(crate) state: TaskState,
    pub(crate) result: Option<TaskOutput>,
    pub(crate) error: Option<TaskFailure>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    /// Commit counter; bumped once per committed transition.
    pub(crate) seq: u64,
}

impl TaskCell {
    /// Clear result, error and completion timestamp (used when leaving a
    /// completed state for Pending).
    pub(crate) fn scrub(&mut self) {
        self.result = None;
        self.error = None;
        self.completed_at = None;
    }
}

/// Result of a transition attempt.
pub(crate) enum TransitionOutcome {
    /// Current state was acceptable and differed from the target; the new
    /// state is committed and observers have been notified.
    Changed(StateChange),
    /// Current state was acceptable but already equal to the target.
    /// Nothing was committed or notified, but the operation's side-effect
    /// block still runs (a retry of a Pending task must still re-evaluate
    /// eligibility, for example).
    Unchanged,
    /// Current state was not in the acceptable set; silent no-op.
    Refused,
}

impl TransitionOutcome {
    pub(crate) fn accepted(&self) -> bool {
        !matches!(self, TransitionOutcome::Refused)
    }

    pub(crate) fn changed(&self) -> bool {
        matches!(self, TransitionOutcome::Changed(_))
    }
}

impl Task {
    /// Attempt `accept* → to`, applying `apply` to the cell under the same
    /// lock when the attempt is accepted.
    ///
    /// The lock guards only the check-and-commit: observers fire after
    /// release, and callers run their side-effect blocks after that, so
    /// observers and cascades may re-enter this task freely.
    pub(crate) fn transition(
        &self,
        accept: &[TaskState],
        to: TaskState,
        apply: impl FnOnce(&mut TaskCell),
    ) -> TransitionOutcome {
        let change = {
            let mut cell = self.cell.lock().expect("task state cell poisoned");
            if !accept.contains(&cell.state) {
                return TransitionOutcome::Refused;
            }
            if cell.state == to {
                apply(&mut cell);
                return TransitionOutcome::Unchanged;
            }
            let from = cell.state;
            cell.state = to;
            cell.seq += 1;
            apply(&mut cell);
            StateChange {
                task: self.uid(),
                label: self.label().to_string(),
                from,
                to,
                seq: cell.seq,
            }
        };

        trace!(
            task = %change.label,
            from = %change.from,
            to = %change.to,
            seq = change.seq,
            "state committed"
        );
        self.notify_state_change(&change);
        TransitionOutcome::Changed(change)
    }
}
