// src/task/mod.rs

//! Tasks and their lifecycle operations.
//!
//! - [`cell`] holds the transition guard: the per-task lock plus the
//!   check-and-commit primitive.
//! - [`describe`] provides the diagnostic descriptions.
//!
//! Every lifecycle operation follows the same shape: attempt a transition
//! through the guard (a silent no-op when the current state is not in the
//! operation's acceptable set), then run the operation's side-effect block
//! outside the guard: graph notifications, cascades to dependents,
//! re-evaluation of eligibility. Cross-task effects only ever go through
//! the other task's own lifecycle operations, so each task's guard stays
//! strictly local.

pub mod cell;
pub mod describe;

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::graph::TaskGraph;
use crate::observe::{CompletionObserver, StateChange, StateObserver};
use crate::pool::ExecutionPool;
use crate::state::TaskState;

use cell::{TaskCell, TransitionOutcome};

/// Process-unique task id, assigned at construction.
///
/// Labels are human-assigned and not required to be unique; graph
/// implementations key their edge tables on this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskUid(u64);

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

impl std::fmt::Display for TaskUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque success value, set only while the task is Finished.
pub type TaskOutput = Arc<dyn Any + Send + Sync>;

/// Opaque failure value, set only while the task is Failed.
pub type TaskFailure = Arc<anyhow::Error>;

/// Body of a task: invoked on the execution pool once the task has
/// entered Executing. The body is expected to drive the task to a
/// completed state itself via [`Task::finish`] or [`Task::fail`], and to
/// check [`Task::is_cancelled`] cooperatively if it runs long.
pub type TaskBody =
    Arc<dyn Fn(Arc<Task>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Serializable read-only view of a task, for diagnostics and observers
/// that ship events onward.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub uid: TaskUid,
    pub label: String,
    pub state: TaskState,
    pub has_result: bool,
    pub has_error: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A node in the dependency graph with its own lifecycle state machine.
///
/// Shared as `Arc<Task>`; the containing graph owns tasks, tasks keep only
/// a weak back-reference to the graph. A task is constructed Ready and
/// usually demoted to Pending as prerequisite edges are added.
pub struct Task {
    uid: TaskUid,
    label: String,
    cell: Mutex<TaskCell>,
    body: RwLock<TaskBody>,
    graph: RwLock<Option<Weak<dyn TaskGraph>>>,
    pool_override: RwLock<Option<Arc<dyn ExecutionPool>>>,
    state_observers: RwLock<Vec<StateObserver>>,
    completion_observer: RwLock<Option<Arc<dyn CompletionObserver>>>,
}

fn default_body() -> TaskBody {
    // A body-less task is a pure join/fan-out point in the graph.
    Arc::new(|task: Arc<Task>| {
        Box::pin(async move {
            task.finish(None);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    })
}

impl Task {
    /// Create a new, unattached task with the default body (immediately
    /// finishes with no result).
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            uid: TaskUid(NEXT_UID.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
            cell: Mutex::new(TaskCell::default()),
            body: RwLock::new(default_body()),
            graph: RwLock::new(None),
            pool_override: RwLock::new(None),
            state_observers: RwLock::new(Vec::new()),
            completion_observer: RwLock::new(None),
        })
    }

    /// Create a task with a custom body.
    pub fn with_body(
        label: impl Into<String>,
        body: impl Fn(Arc<Task>) -> Pin<Box<dyn Future<Output = ()> + Send>>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        let task = Self::new(label);
        *task.body.write().expect("body lock poisoned") = Arc::new(body);
        task
    }

    // ------------------------------------------------------------------
    // Wiring
    // ------------------------------------------------------------------

    /// Attach this task to its containing graph.
    ///
    /// Called by the graph when the task is inserted. The reference is
    /// weak: dropping the graph returns the task to detached behaviour.
    pub fn attach(&self, graph: &Arc<dyn TaskGraph>) {
        *self.graph.write().expect("graph lock poisoned") = Some(Arc::downgrade(graph));
    }

    /// Override the pool this task's body runs on. Unset tasks use the
    /// graph's default pool.
    pub fn set_pool(&self, pool: Arc<dyn ExecutionPool>) {
        *self.pool_override.write().expect("pool lock poisoned") = Some(pool);
    }

    /// Register an observer fired synchronously after every committed
    /// transition (after the commit, before the operation's side-effects).
    pub fn on_state_change(&self, observer: impl Fn(&StateChange) + Send + Sync + 'static) {
        self.state_observers
            .write()
            .expect("observer lock poisoned")
            .push(Arc::new(observer));
    }

    /// Install the optional completion delegate notified on finish/fail.
    pub fn set_completion_observer(&self, observer: Arc<dyn CompletionObserver>) {
        *self
            .completion_observer
            .write()
            .expect("observer lock poisoned") = Some(observer);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn uid(&self) -> TaskUid {
        self.uid
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> TaskState {
        self.cell.lock().expect("task state cell poisoned").state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == TaskState::Pending
    }

    pub fn is_ready(&self) -> bool {
        self.state() == TaskState::Ready
    }

    pub fn is_executing(&self) -> bool {
        self.state() == TaskState::Executing
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Finished
    }

    pub fn is_failed(&self) -> bool {
        self.state() == TaskState::Failed
    }

    /// Result of the last successful run; `Some` only while Finished.
    pub fn result(&self) -> Option<TaskOutput> {
        self.cell
            .lock()
            .expect("task state cell poisoned")
            .result
            .clone()
    }

    /// Error of the last failed run; `Some` only while Failed.
    pub fn error(&self) -> Option<TaskFailure> {
        self.cell
            .lock()
            .expect("task state cell poisoned")
            .error
            .clone()
    }

    /// When the task entered Finished or Failed; `Some` only in those states.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.cell
            .lock()
            .expect("task state cell poisoned")
            .completed_at
    }

    /// Consistent point-in-time view of the task.
    pub fn snapshot(&self) -> TaskSnapshot {
        let cell = self.cell.lock().expect("task state cell poisoned");
        TaskSnapshot {
            uid: self.uid,
            label: self.label.clone(),
            state: cell.state,
            has_result: cell.result.is_some(),
            has_error: cell.error.is_some(),
            completed_at: cell.completed_at,
        }
    }

    /// Upgraded graph back-reference, if attached and still alive.
    pub fn graph(&self) -> Option<Arc<dyn TaskGraph>> {
        self.graph
            .read()
            .expect("graph lock poisoned")
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn prerequisites(&self) -> Vec<Arc<Task>> {
        self.graph()
            .map(|g| g.prerequisites(self))
            .unwrap_or_default()
    }

    fn dependents(&self) -> Vec<Arc<Task>> {
        self.graph()
            .map(|g| g.dependents(self))
            .unwrap_or_default()
    }

    fn effective_pool(&self, graph: &Arc<dyn TaskGraph>) -> Arc<dyn ExecutionPool> {
        self.pool_override
            .read()
            .expect("pool lock poisoned")
            .clone()
            .unwrap_or_else(|| graph.default_pool())
    }

    pub(crate) fn notify_state_change(&self, change: &StateChange) {
        // Snapshot the list so an observer can register further observers
        // or re-enter a lifecycle operation without holding this lock.
        let observers: Vec<StateObserver> = self
            .state_observers
            .read()
            .expect("observer lock poisoned")
            .clone();
        for observer in &observers {
            observer(change);
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Submit this task's body to the effective pool.
    ///
    /// The Ready→Executing attempt happens when the pooled unit of work
    /// actually begins, not at submission: a cancel landing in between
    /// wins, and the body never runs.
    ///
    /// # Panics
    /// Panics if the task is not attached to a live graph; starting a
    /// detached task is a contract violation, not a recoverable error.
    pub fn start(self: &Arc<Self>) {
        let graph = self
            .graph()
            .ok_or_else(|| crate::errors::TaskDagError::Detached(self.label.clone()))
            .expect("start() requires a task attached to a live graph");
        let pool = self.effective_pool(&graph);

        let task = Arc::clone(self);
        let work = Box::pin(async move {
            let entered = task
                .transition(&[TaskState::Ready], TaskState::Executing, |_| {})
                .changed();
            if !entered {
                debug!(task = %task.label, state = %task.state(), "start superseded before execution");
                return;
            }
            let body = task.body.read().expect("body lock poisoned").clone();
            body(Arc::clone(&task)).await;
        });

        if let Err(error) = pool.spawn(work) {
            warn!(task = %self.label, %error, "pool refused submission; task not started");
        }
    }

    /// Promote Pending→Ready and start, if every prerequisite is Finished.
    ///
    /// Called when the task first becomes eligible and whenever a
    /// dependent needs re-evaluation. Detached tasks cannot evaluate
    /// their prerequisites and are left untouched.
    pub fn start_if_ready(self: &Arc<Self>) {
        if self.graph().is_none() {
            debug!(task = %self.label, "start_if_ready on detached task; ignoring");
            return;
        }
        if !self.prerequisites().iter().all(|p| p.is_finished()) {
            return;
        }
        if self
            .transition(&[TaskState::Pending], TaskState::Ready, |_| {})
            .changed()
        {
            self.start();
        }
    }

    /// Cancel this task (Pending/Ready/Executing → Cancelled) and, on
    /// success, cascade to every direct dependent.
    ///
    /// Cancellation is cooperative for a running body (it keeps running
    /// until it checks [`is_cancelled`](Self::is_cancelled)) but
    /// unconditional for the state machine.
    pub fn cancel(self: &Arc<Self>) {
        let outcome = self.transition(
            &[TaskState::Pending, TaskState::Ready, TaskState::Executing],
            TaskState::Cancelled,
            |_| {},
        );
        if outcome.changed() {
            debug!(task = %self.label, "cancelled; cascading to dependents");
            for dependent in self.dependents() {
                dependent.cancel();
            }
        }
    }

    /// Reset (Executing/Finished/Failed/Cancelled → Pending): scrub
    /// result/error/timestamp, tell the graph, and re-evaluate own
    /// eligibility. Dependents are reset unconditionally, whether or not
    /// this task itself transitioned.
    pub fn reset(self: &Arc<Self>) {
        let outcome = self.transition(
            &[
                TaskState::Executing,
                TaskState::Finished,
                TaskState::Failed,
                TaskState::Cancelled,
            ],
            TaskState::Pending,
            TaskCell::scrub,
        );
        if outcome.changed() {
            debug!(task = %self.label, "reset to pending");
            if let Some(graph) = self.graph() {
                graph.task_was_reset(self);
            }
            self.start_if_ready();
        }
        for dependent in self.dependents() {
            dependent.reset();
        }
    }

    /// Retry (Pending/Ready/Cancelled/Failed → Pending): scrub and
    /// re-evaluate own eligibility. Dependents are retried
    /// unconditionally.
    ///
    /// A retry of a task already Pending is accepted without a state
    /// change; its eligibility is still re-evaluated, which is how
    /// dependents stuck behind a failure recover when the retry cascades
    /// through them.
    pub fn retry(self: &Arc<Self>) {
        let outcome = self.transition(
            &[
                TaskState::Pending,
                TaskState::Ready,
                TaskState::Cancelled,
                TaskState::Failed,
            ],
            TaskState::Pending,
            TaskCell::scrub,
        );
        if outcome.accepted() {
            debug!(task = %self.label, "retrying");
            self.start_if_ready();
        }
        for dependent in self.dependents() {
            dependent.retry();
        }
    }

    /// Complete successfully (Executing → Finished only). Records the
    /// result and completion time, notifies the completion delegate and
    /// the graph, then promotes every direct dependent that has become
    /// eligible.
    pub fn finish(self: &Arc<Self>, result: Option<TaskOutput>) {
        // Keep a handle on the value actually committed: an observer (or a
        // concurrent reset) may scrub the cell before the notifications
        // below run, and they must still report this run's result.
        let committed = result.clone();
        let outcome = self.transition(&[TaskState::Executing], TaskState::Finished, |cell| {
            cell.result = result;
            cell.error = None;
            cell.completed_at = Some(Utc::now());
        });
        let TransitionOutcome::Changed(change) = outcome else {
            return;
        };
        debug!(task = %self.label, seq = change.seq, "finished");

        if let Some(observer) = self
            .completion_observer
            .read()
            .expect("observer lock poisoned")
            .clone()
        {
            observer.task_finished(self, committed.as_ref());
        }
        if let Some(graph) = self.graph() {
            graph.task_finished(self, committed.as_ref());
        }
        for dependent in self.dependents() {
            dependent.start_if_ready();
        }
    }

    /// Fail (Executing → Failed only). Records the error and completion
    /// time and notifies the completion delegate and the graph.
    ///
    /// Deliberately does not cascade: dependents stay Pending until an
    /// operator retries or resets. Failure halts forward progress, it
    /// does not spread.
    pub fn fail(self: &Arc<Self>, error: impl Into<TaskFailure>) {
        let error = error.into();
        let outcome = self.transition(&[TaskState::Executing], TaskState::Failed, |cell| {
            cell.error = Some(Arc::clone(&error));
            cell.result = None;
            cell.completed_at = Some(Utc::now());
        });
        let TransitionOutcome::Changed(change) = outcome else {
            return;
        };
        debug!(task = %self.label, seq = change.seq, %error, "failed");

        if let Some(observer) = self
            .completion_observer
            .read()
            .expect("observer lock poisoned")
            .clone()
        {
            observer.task_failed(self, &error);
        }
        if let Some(graph) = self.graph() {
            graph.task_failed(self, &error);
        }
    }

    /// Hook called by the graph when a prerequisite edge to this task is
    /// added. An unfinished prerequisite demotes a Ready task back to
    /// Pending; in any other state this is a no-op.
    pub fn prerequisite_added(&self, prerequisite: &Task) {
        if prerequisite.is_finished() {
            return;
        }
        if self
            .transition(&[TaskState::Ready], TaskState::Pending, |_| {})
            .changed()
        {
            debug!(
                task = %self.label,
                prerequisite = %prerequisite.label,
                "demoted to pending by new unfinished prerequisite"
            );
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("uid", &self.uid)
            .field("label", &self.label)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
