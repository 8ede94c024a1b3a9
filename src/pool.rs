// src/pool.rs

//! Pluggable execution pool abstraction.
//!
//! Tasks talk to an `ExecutionPool` instead of a concrete runtime. This
//! makes it easy to swap in a deterministic pool in tests while keeping the
//! tokio-backed pool in production.
//!
//! - [`TokioPool`] is the default implementation: it spawns each unit of
//!   work onto a tokio runtime handle.
//! - Tests can provide their own pool that, for example, queues units of
//!   work and runs them only when explicitly driven.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

/// A unit of work submitted by [`Task::start`](crate::task::Task::start).
pub type PoolWork = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Trait abstracting where task bodies run.
///
/// `spawn` must not run `work` inline before returning: `start()` relies on
/// the Ready→Executing attempt happening when the pool *actually begins*
/// the work, so a cancel landing between submission and execution wins.
/// Returning an error means the work was dropped without running; the
/// caller logs it and the task's state is untouched.
pub trait ExecutionPool: Send + Sync {
    fn spawn(&self, work: PoolWork) -> Result<()>;
}

/// Execution pool backed by a tokio runtime.
pub struct TokioPool {
    handle: tokio::runtime::Handle,
}

impl TokioPool {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Pool on the runtime of the calling context.
    ///
    /// # Panics
    /// Panics outside a tokio runtime, like [`tokio::runtime::Handle::current`].
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl ExecutionPool for TokioPool {
    fn spawn(&self, work: PoolWork) -> Result<()> {
        self.handle.spawn(work);
        Ok(())
    }
}
