//! Single-producer/single-consumer result channel.
//!
//! A channel is a write-once slot holding exactly one terminal event: a value
//! or a [`TaskError`]. The producer side is a [`Promise`], held by a task body
//! (or by test code emulating one); the consumer side is a [`TaskHandle`],
//! which can be probed without blocking or awaited with blocking semantics.
//!
//! Write-once is enforced by construction: both [`Promise::complete`] and
//! [`Promise::fail`] consume the promise, so a second write does not compile.

use crate::error::TaskError;

use std::sync::{Arc, Condvar, Mutex};

/// Outcome of a task: its value, or the error captured from its body.
pub type TaskResult<T> = Result<T, TaskError>;

/// Shared slot between a promise and its handle.
///
/// The mutex guards the single terminal event; the condvar wakes threads
/// blocked in [`TaskHandle::wait`] when the event is written.
struct Slot<T> {
    value: Mutex<Option<TaskResult<T>>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }
}

/// Creates a connected promise/handle pair.
///
/// The promise writes the single terminal event; the handle observes it.
/// Dropping the promise without writing leaves the handle permanently
/// pending, which is how an unregistered (inert) task manifests.
///
/// # Example
/// ```ignore
/// let (promise, handle) = channel::<i32>();
/// assert!(!handle.is_ready());
/// promise.complete(42);
/// assert_eq!(handle.wait(), Ok(42));
/// ```
pub fn channel<T>() -> (Promise<T>, TaskHandle<T>) {
    let slot = Arc::new(Slot::new());

    (
        Promise { slot: slot.clone() },
        TaskHandle { slot },
    )
}

/// Producer side of a result channel.
///
/// Held by the task machinery: the body's return value (or its captured
/// failure) is written through the promise exactly once. Also constructible
/// directly via [`channel`] for lifting external results into the engine.
pub struct Promise<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Promise<T> {
    /// Writes the terminal value and consumes the promise.
    pub fn complete(self, value: T) {
        self.fulfil(Ok(value));
    }

    /// Writes the terminal error and consumes the promise.
    pub fn fail(self, error: TaskError) {
        self.fulfil(Err(error));
    }

    fn fulfil(self, result: TaskResult<T>) {
        let mut value = self.slot.value.lock().unwrap();
        debug_assert!(value.is_none(), "result channel written twice");
        *value = Some(result);
        self.slot.ready.notify_all();
    }
}

/// Consumer side of a result channel.
///
/// Exactly one holder consumes the terminal event, either by polling
/// ([`Self::is_ready`] + [`Self::try_take`]) or by blocking ([`Self::wait`]).
/// External collaborators (graph queries and the like) interact with the
/// engine entirely through values of this type.
pub struct TaskHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    /// Produces an already-resolved handle from a plain value.
    ///
    /// Useful in tests and for lifting synchronous results into the
    /// combinator algebra.
    pub fn ready(value: T) -> Self {
        let (promise, handle) = channel();
        promise.complete(value);
        handle
    }

    /// Produces an already-failed handle from a plain error.
    pub fn failed(error: TaskError) -> Self {
        let (promise, handle) = channel();
        promise.fail(error);
        handle
    }

    /// Non-blocking readiness probe: true once a terminal event is written.
    pub fn is_ready(&self) -> bool {
        self.slot.value.lock().unwrap().is_some()
    }

    /// Non-blocking extraction of the terminal event.
    ///
    /// Returns `None` while the producer has not completed. The channel is
    /// single-consumer: a successful take empties the slot.
    pub fn try_take(&self) -> Option<TaskResult<T>> {
        self.slot.value.lock().unwrap().take()
    }

    /// Blocks until the terminal event is written and returns it.
    ///
    /// There is no timeout primitive: if the producer never completes (for
    /// example a task body that never registered with a scheduler), this
    /// blocks indefinitely.
    pub fn wait(self) -> TaskResult<T> {
        let mut value = self.slot.value.lock().unwrap();

        while value.is_none() {
            value = self.slot.ready.wait(value).unwrap();
        }

        value.take().expect("result channel emptied while waiting")
    }
}
