// tests/property_invariants.rs

//! Randomized lifecycle storms on a small diamond graph.
//!
//! Whatever sequence of speculative triggers arrives, every task's cell
//! must stay internally consistent after every single operation: result
//! only in Finished, error only in Failed, completion timestamp only in
//! completed states, and nothing may panic or hang.

mod common;
use crate::common::builders::GraphBuilder;
use crate::common::pools::ManualPool;

use std::sync::Arc;

use proptest::prelude::*;
use taskdag::{Task, TaskState};

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Cancel,
    Reset,
    Retry,
    Finish,
    Fail,
    Drain,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Cancel),
        Just(Op::Reset),
        Just(Op::Retry),
        Just(Op::Finish),
        Just(Op::Fail),
        Just(Op::Drain),
    ]
}

fn assert_cell_consistent(task: &Arc<Task>) {
    let snap = task.snapshot();
    assert_eq!(
        snap.completed_at.is_some(),
        snap.state.is_completed(),
        "{snap:?}"
    );
    match snap.state {
        TaskState::Finished => assert!(!snap.has_error, "{snap:?}"),
        TaskState::Failed => {
            assert!(!snap.has_result, "{snap:?}");
            assert!(snap.has_error, "{snap:?}");
        }
        _ => {
            assert!(!snap.has_result, "{snap:?}");
            assert!(!snap.has_error, "{snap:?}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lifecycle_storms_preserve_cell_invariants(
        ops in proptest::collection::vec((0..4usize, op_strategy()), 1..60)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.block_on(async move {
            let pool = Arc::new(ManualPool::new());
            let (_graph, tasks) = GraphBuilder::new(pool.clone())
                .task("src", &[])
                .task("left", &["src"])
                .task("right", &["src"])
                .task("sink", &["left", "right"])
                .build();
            let order = ["src", "left", "right", "sink"];

            for (idx, op) in ops {
                let t = &tasks[order[idx]];
                match op {
                    Op::Start => t.start(),
                    Op::Cancel => t.cancel(),
                    Op::Reset => t.reset(),
                    Op::Retry => t.retry(),
                    Op::Finish => t.finish(Some(Arc::new(1_i32))),
                    Op::Fail => t.fail(anyhow::anyhow!("injected")),
                    Op::Drain => pool.drain().await,
                }
                for label in order {
                    assert_cell_consistent(&tasks[label]);
                }
            }

            // Settle: once the pool is drained, nothing is left Executing
            // (default bodies always complete themselves).
            pool.drain().await;
            for label in order {
                assert_cell_consistent(&tasks[label]);
                prop_assert!(tasks[label].state() != TaskState::Executing);
            }
            Ok(())
        })?;
    }
}
