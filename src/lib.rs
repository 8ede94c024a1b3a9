// src/lib.rs

//! taskdag: a concurrency-safe task lifecycle engine for dependency
//! graphs.
//!
//! Each [`Task`] is a node in a DAG with its own state machine
//! (Pending / Ready / Executing / Cancelled / Finished / Failed). A task
//! becomes Ready only once every prerequisite is Finished; completing a
//! task promotes its dependents, cancelling a task cascades forward,
//! failing a task halts its branch until an operator retries or resets.
//!
//! The crate owns only the per-task state machine and the propagation
//! logic. Two collaborators are consumed behind traits:
//!
//! - [`graph::TaskGraph`], the container that owns tasks, stores edges,
//!   and answers prerequisite/dependent queries;
//! - [`pool::ExecutionPool`], where task bodies actually run
//!   ([`pool::TokioPool`] in production).
//!
//! Concurrency model: every lifecycle operation may be called from any
//! thread at any time. A per-task guard serializes the check-and-commit
//! of each transition; invalid triggers are silent no-ops, so callers can
//! issue operations speculatively. State-change observers fire after the
//! commit and before the operation's cascading side-effects, outside the
//! guard, so they may safely call back into this or any other task.
//!
//! ```no_run
//! use taskdag::Task;
//!
//! # fn attach_to_some_graph(_: &std::sync::Arc<Task>) {}
//! let compile = Task::new("compile");
//! let link = Task::new("link");
//! // graph wiring (insert + edges) is the graph implementation's job
//! attach_to_some_graph(&compile);
//! attach_to_some_graph(&link);
//!
//! compile.start();          // link transitions automatically once
//!                           // compile finishes
//! ```

pub mod errors;
pub mod graph;
pub mod logging;
pub mod observe;
pub mod pool;
pub mod state;
pub mod task;

pub use graph::TaskGraph;
pub use observe::{CompletionObserver, StateChange};
pub use pool::{ExecutionPool, TokioPool};
pub use state::TaskState;
pub use task::{Task, TaskFailure, TaskOutput, TaskSnapshot, TaskUid};
