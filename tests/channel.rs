use carousel::{TaskError, TaskHandle, channel};
use std::thread;
use std::time::Duration;

#[test]
fn test_channel_starts_pending() {
    let (_promise, handle) = channel::<i32>();

    assert!(!handle.is_ready(), "No terminal event has been written");
    assert!(handle.try_take().is_none(), "Nothing to take yet");
}

#[test]
fn test_complete_then_take() {
    let (promise, handle) = channel();

    promise.complete(42);

    assert!(handle.is_ready());
    assert_eq!(handle.try_take(), Some(Ok(42)));
    assert!(
        handle.try_take().is_none(),
        "The channel is single-consumer; a take empties the slot"
    );
}

#[test]
fn test_fail_then_wait() {
    let (promise, handle) = channel::<i32>();

    promise.fail(TaskError::new("went wrong"));

    let error = handle.wait().expect_err("The terminal event is an error");
    assert_eq!(error.message(), "went wrong");
}

#[test]
fn test_ready_and_failed_constructors() {
    let resolved = TaskHandle::ready(7);
    assert!(resolved.is_ready());
    assert_eq!(resolved.wait(), Ok(7));

    let failed: TaskHandle<i32> = TaskHandle::failed(TaskError::new("nope"));
    assert!(failed.is_ready(), "A failed handle is a terminal event too");
    assert!(failed.wait().is_err());
}

#[test]
fn test_wait_blocks_until_producer_completes() {
    let (promise, handle) = channel();

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        promise.complete("eventually");
    });

    assert_eq!(handle.wait(), Ok("eventually"));
    producer.join().expect("producer thread should finish");
}

#[test]
fn test_dropped_promise_leaves_handle_pending() {
    let (promise, handle) = channel::<i32>();

    drop(promise);

    assert!(
        !handle.is_ready(),
        "A producer that never completes leaves the channel unfulfilled"
    );
}
