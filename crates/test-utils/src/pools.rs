//! Test execution pools.
//!
//! - [`ManualPool`] queues submitted work and runs it only when a test
//!   drives it, making "submitted but not yet executing" windows
//!   observable and cascades deterministic.
//! - [`RejectingPool`] refuses every submission, for exercising the
//!   pool-rejection path.

use std::collections::VecDeque;
use std::sync::Mutex;

use taskdag::errors::{Result, TaskDagError};
use taskdag::pool::{ExecutionPool, PoolWork};

/// Pool that queues work until the test explicitly runs it.
#[derive(Default)]
pub struct ManualPool {
    queue: Mutex<VecDeque<PoolWork>>,
}

impl ManualPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units of work submitted but not yet run.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run the oldest queued unit of work to completion.
    ///
    /// Returns `false` if the queue was empty. The queue lock is released
    /// before the work is awaited, so work may submit more work.
    pub async fn run_next(&self) -> bool {
        let work = self.queue.lock().unwrap().pop_front();
        match work {
            Some(work) => {
                work.await;
                true
            }
            None => false,
        }
    }

    /// Run queued work (including work submitted while draining) until the
    /// queue is empty.
    pub async fn drain(&self) {
        while self.run_next().await {}
    }
}

impl ExecutionPool for ManualPool {
    fn spawn(&self, work: PoolWork) -> Result<()> {
        self.queue.lock().unwrap().push_back(work);
        Ok(())
    }
}

/// Pool that rejects all submissions.
pub struct RejectingPool;

impl ExecutionPool for RejectingPool {
    fn spawn(&self, _work: PoolWork) -> Result<()> {
        Err(TaskDagError::PoolRejected("rejecting pool".to_string()))
    }
}
