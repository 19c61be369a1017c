use carousel::{RoundRobinExecutor, Task, TaskError, TaskHandle, yield_now};
use std::sync::Arc;

// Loops from start_val to 10, yielding once per iteration, and returns the
// number of iterations. Tasks with a larger start_val finish in fewer rounds.
fn countdown(executor: &Arc<RoundRobinExecutor>, start_val: i32) -> TaskHandle<i32> {
    Task::spawn(executor, move |ctx| async move {
        ctx.register().await;

        let mut acc = 0;
        for _ in start_val..10 {
            acc += 1;
            yield_now().await;
        }

        Ok(acc)
    })
}

fn throwable(executor: &Arc<RoundRobinExecutor>, should_fail: bool) -> TaskHandle<i32> {
    Task::spawn(executor, move |ctx| async move {
        ctx.register().await;

        if should_fail {
            return Err(TaskError::new("error"));
        }

        let mut acc = 0;
        for _ in 0..10 {
            acc += 1;
            yield_now().await;
        }

        Ok(acc)
    })
}

fn drain(executor: &Arc<RoundRobinExecutor>) {
    while executor.size() > 0 {
        executor.step();
    }
}

#[test]
fn test_size_reflects_open_tasks() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let task1 = countdown(&executor, 8);
    let task2 = countdown(&executor, 6);
    let task3 = countdown(&executor, 4);
    let task4 = countdown(&executor, 2);

    assert_eq!(executor.size(), 4, "All four tasks should be open");

    assert!(!task1.is_ready(), "No task should be ready before stepping");
    assert!(!task2.is_ready(), "No task should be ready before stepping");
    assert!(!task3.is_ready(), "No task should be ready before stepping");
    assert!(!task4.is_ready(), "No task should be ready before stepping");
}

#[test]
fn test_stepping_completes_every_task() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let handles: Vec<TaskHandle<i32>> = (0..8).map(|i| countdown(&executor, i)).collect();

    drain(&executor);

    for (i, handle) in handles.into_iter().enumerate() {
        assert!(handle.is_ready(), "Task {} should be ready after drain", i);
        assert_eq!(
            handle.wait(),
            Ok(10 - i as i32),
            "Task {} should produce its designed value",
            i
        );
    }
}

#[test]
fn test_fewest_rounds_finish_first() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let task1 = countdown(&executor, 8);
    let task2 = countdown(&executor, 6);
    let task3 = countdown(&executor, 4);
    let task4 = countdown(&executor, 2);

    // Step until the first task is swept out of the queue.
    while executor.size() == 4 {
        executor.step();
    }

    assert!(task1.is_ready(), "The 2-round task should finish first");
    assert!(!task2.is_ready(), "The 4-round task should still be pending");
    assert!(!task3.is_ready(), "The 6-round task should still be pending");
    assert!(!task4.is_ready(), "The 8-round task should still be pending");

    drain(&executor);

    assert_eq!(task1.wait(), Ok(2));
    assert_eq!(task2.wait(), Ok(4));
    assert_eq!(task3.wait(), Ok(6));
    assert_eq!(task4.wait(), Ok(8));
}

#[test]
fn test_failing_task_does_not_disturb_siblings() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let ok_task = throwable(&executor, false);
    let failing_task = throwable(&executor, true);

    drain(&executor);

    assert_eq!(
        ok_task.wait(),
        Ok(10),
        "The sibling task should still complete normally"
    );

    let error = failing_task
        .wait()
        .expect_err("The failing task should deliver its error at retrieval");
    assert_eq!(error.message(), "error");
}

#[test]
fn test_panic_is_captured_at_retrieval() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let sibling = countdown(&executor, 8);
    let panicking: TaskHandle<i32> = Task::spawn(&executor, |ctx| async move {
        ctx.register().await;
        yield_now().await;
        panic!("boom");
    });

    drain(&executor);

    assert_eq!(sibling.wait(), Ok(2), "Sibling should survive a panic");

    let error = panicking
        .wait()
        .expect_err("A panicking body should fail its channel");
    assert_eq!(error.message(), "boom");
}

#[test]
fn test_double_registration_is_idempotent() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let handle: TaskHandle<()> = Task::spawn(&executor, |ctx| async move {
        // Accidental second registration: must not enqueue twice.
        ctx.register().await;
        ctx.register().await;
        Ok(())
    });

    // Queued once by the first registration.
    assert_eq!(executor.size(), 1);
    executor.step();
    // Second registration suspends but re-queues nothing.
    assert_eq!(executor.size(), 1);
    executor.step();
    // Body returned; continuation awaits its final sweep.
    assert_eq!(executor.size(), 1);
    executor.step();
    // Continuation cleaned up.
    assert_eq!(executor.size(), 0);

    assert_eq!(handle.wait(), Ok(()));
}

#[test]
fn test_unregistered_body_is_inert() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let handle: TaskHandle<i32> = Task::spawn(&executor, |_ctx| async move {
        // Suspends without ever registering: nothing will resume this.
        yield_now().await;
        Ok(1)
    });

    assert_eq!(executor.size(), 0, "An unregistered task is never queued");

    for _ in 0..10 {
        executor.step();
    }

    assert!(
        !handle.is_ready(),
        "The channel of an unregistered task is never fulfilled"
    );
}

#[test]
fn test_background_loop_runs_tasks() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let handles: Vec<TaskHandle<i32>> = (0..4).map(|i| countdown(&executor, i * 2)).collect();

    let loop_thread = executor.start();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.wait(),
            Ok(10 - 2 * i as i32),
            "Task {} should complete under the background loop",
            i
        );
    }

    executor.stop();
    loop_thread.join().expect("loop thread should exit cleanly");
}

#[test]
fn test_stop_leaves_continuations_resumable() {
    let executor = Arc::new(RoundRobinExecutor::new());

    let loop_thread = executor.start();
    executor.stop();
    loop_thread.join().expect("loop thread should exit cleanly");

    // Work scheduled after a stop stays queued until driven again.
    let handle = countdown(&executor, 6);
    assert_eq!(executor.size(), 1);

    let loop_thread = executor.start();
    assert_eq!(
        handle.wait(),
        Ok(4),
        "A restarted executor should resume pending work"
    );

    executor.stop();
    loop_thread.join().expect("loop thread should exit cleanly");
}
