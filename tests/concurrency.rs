// tests/concurrency.rs

//! Races the state machine exists to survive: start vs cancel, storms of
//! speculative triggers from many threads, and the observable commit order.

mod common;
use crate::common::builders::GraphBuilder;
use crate::common::pools::ManualPool;
use crate::common::{init_tracing, with_timeout};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskdag::{Task, TaskState, TaskUid, TokioPool};

async fn wait_for_terminal(task: &Arc<Task>) -> TaskState {
    with_timeout(async {
        loop {
            let state = task.state();
            if matches!(
                state,
                TaskState::Cancelled | TaskState::Finished | TaskState::Failed
            ) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
}

#[tokio::test]
async fn cancel_between_submission_and_execution_wins() {
    init_tracing();

    let pool = Arc::new(ManualPool::new());
    let ran = Arc::new(Mutex::new(false));
    let body_ran = Arc::clone(&ran);
    let t = Task::with_body("t", move |task| {
        let ran = Arc::clone(&body_ran);
        Box::pin(async move {
            *ran.lock().unwrap() = true;
            task.finish(Some(Arc::new(1_i32)));
        })
    });
    let (_graph, _tasks) = GraphBuilder::new(pool.clone())
        .task_with(Arc::clone(&t), &[])
        .build();

    t.start();
    assert_eq!(pool.pending(), 1);

    // The unit of work is queued but has not begun; cancellation must win
    // and the body must never run.
    t.cancel();
    pool.drain().await;

    assert_eq!(t.state(), TaskState::Cancelled);
    assert!(!*ran.lock().unwrap());
    assert!(t.result().is_none());
    assert!(t.error().is_none());
}

#[tokio::test]
async fn cancelling_a_task_mid_execution_refuses_its_late_finish() {
    init_tracing();

    let entered = Arc::new(tokio::sync::Notify::new());
    let gate = Arc::new(tokio::sync::Notify::new());
    let (body_entered, body_gate) = (Arc::clone(&entered), Arc::clone(&gate));
    let t = Task::with_body("t", move |task| {
        let entered = Arc::clone(&body_entered);
        let gate = Arc::clone(&body_gate);
        Box::pin(async move {
            entered.notify_one();
            gate.notified().await;
            task.finish(Some(Arc::new(1_i32)));
        })
    });
    let pool = Arc::new(ManualPool::new());
    let (_graph, _tasks) = GraphBuilder::new(pool.clone())
        .task_with(Arc::clone(&t), &[])
        .build();

    t.start();
    let runner = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.run_next().await }
    });

    with_timeout(entered.notified()).await;
    assert!(t.is_executing());

    // The body is parked inside Executing; cancel it from outside.
    t.cancel();
    assert_eq!(t.state(), TaskState::Cancelled);

    gate.notify_one();
    assert!(with_timeout(runner).await.unwrap());

    // The body's finish() after the cancel is a refused transition.
    assert_eq!(t.state(), TaskState::Cancelled);
    assert!(t.result().is_none());
    assert!(t.error().is_none());
    assert!(t.completed_at().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_start_and_cancel_yields_exactly_one_winner() {
    init_tracing();

    for _ in 0..50 {
        let pool = Arc::new(TokioPool::current());
        let t = Task::with_body("racer", |task| {
            Box::pin(async move {
                task.finish(Some(Arc::new("done".to_string())));
            })
        });
        let (_graph, _tasks) = GraphBuilder::new(pool)
            .task_with(Arc::clone(&t), &[])
            .build();

        let starter = {
            let t = Arc::clone(&t);
            std::thread::spawn(move || t.start())
        };
        let canceller = {
            let t = Arc::clone(&t);
            std::thread::spawn(move || t.cancel())
        };
        starter.join().unwrap();
        canceller.join().unwrap();

        match wait_for_terminal(&t).await {
            TaskState::Cancelled => {
                // A cancelled task must never have run its finished
                // side-effects.
                assert!(t.result().is_none());
                assert!(t.error().is_none());
                assert!(t.completed_at().is_none());
            }
            TaskState::Finished => {
                assert!(t.result().is_some());
                assert!(t.error().is_none());
            }
            other => panic!("unexpected terminal state {other}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn speculative_trigger_storm_preserves_cell_invariants() {
    init_tracing();

    let pool = Arc::new(TokioPool::current());
    let (_graph, tasks) = GraphBuilder::new(pool)
        .task("src", &[])
        .task("left", &["src"])
        .task("right", &["src"])
        .task("sink", &["left", "right"])
        .build();

    let all: Vec<Arc<Task>> = tasks.values().cloned().collect();

    let mut handles = Vec::new();
    for i in 0..8 {
        let all = all.clone();
        handles.push(std::thread::spawn(move || {
            for round in 0..50 {
                let t = &all[(i + round) % all.len()];
                match round % 4 {
                    0 => t.retry(),
                    1 => t.cancel(),
                    2 => t.reset(),
                    _ => t.start_if_ready(),
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // Whatever interleaving happened, each cell is internally consistent.
    for t in &all {
        let snap = t.snapshot();
        match snap.state {
            TaskState::Finished => assert!(!snap.has_error),
            TaskState::Failed => assert!(!snap.has_result),
            _ => {
                assert!(!snap.has_result, "{}: {snap:?}", t.label());
                assert!(!snap.has_error, "{}: {snap:?}", t.label());
                if !matches!(snap.state, TaskState::Executing) {
                    assert!(snap.completed_at.is_none(), "{}: {snap:?}", t.label());
                }
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn commit_sequence_numbers_are_gapless_per_task() {
    init_tracing();

    let pool = Arc::new(TokioPool::current());
    let seqs: Arc<Mutex<HashMap<TaskUid, Vec<u64>>>> = Arc::new(Mutex::new(HashMap::new()));

    // Park the watched tasks behind a prerequisite that never finishes, so
    // every transition happens on the threads we join below and no pooled
    // body keeps committing after the join.
    let mut builder = GraphBuilder::new(pool).task("root", &[]);
    let mut watched = Vec::new();
    for label in ["a", "b"] {
        let t = Task::new(label);
        let seqs = Arc::clone(&seqs);
        t.on_state_change(move |change| {
            seqs.lock().unwrap().entry(change.task).or_default().push(change.seq);
        });
        builder = builder.task_with(Arc::clone(&t), &["root"]);
        watched.push(t);
    }
    let (_graph, _tasks) = builder.build();

    let mut handles = Vec::new();
    for t in &watched {
        for _ in 0..4 {
            let t = Arc::clone(t);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    t.cancel();
                    t.retry();
                }
            }));
        }
    }
    for h in handles {
        h.join().unwrap();
    }

    // Notification happens outside the guard, so arrival order can be
    // scrambled, but sorting by seq must recover a gapless 1..=n history.
    let seqs = seqs.lock().unwrap();
    for (uid, observed) in seqs.iter() {
        let mut sorted = observed.clone();
        sorted.sort_unstable();
        let expected: Vec<u64> = (1..=sorted.len() as u64).collect();
        assert_eq!(sorted, expected, "task {uid} has gaps or duplicates");
    }
}
