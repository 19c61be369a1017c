//! Suspendable single-shot task bound to an explicit scheduler.
//!
//! A task wraps a computation body (a future producing one [`TaskResult`])
//! together with the promise it reports into and a tri-state registration
//! status. Construction polls the body once inline, so it runs synchronously
//! up to its first suspension point — which, by contract, should be the
//! registration hand-off.
//!
//! # Writing a task body
//!
//! The body receives a [`TaskContext`] and must, as its first observable
//! action, await [`TaskContext::register`]. Work before that point is legal
//! but pointless: without registration the task is never resumed and its
//! channel is never fulfilled.
//!
//! ```ignore
//! let handle = Task::spawn(&executor, |ctx| async move {
//!     ctx.register().await;
//!     let mut acc = 0;
//!     for _ in 0..10 {
//!         acc += 1;
//!         yield_now().await;
//!     }
//!     Ok(acc)
//! });
//! ```
//!
//! # Suspension points
//!
//! There are exactly two, both explicit and type-visible:
//!
//! 1. the registration yield ([`Register`]), once, at task entry;
//! 2. the sentinel yield ([`yield_now`]), anywhere thereafter, handing
//!    control back to the scheduler for one round.
//!
//! There is no preemption: a body that never yields holds the sweep for its
//! own duration.
//!
//! # Failure
//!
//! An `Err` returned by the body, or a panic escaping it, is captured and
//! written into the channel as the terminal event. The scheduler is not
//! affected; sibling tasks in the same queue proceed normally.
//!
//! [`yield_now`]: crate::yield_now

use crate::channel::{Promise, TaskHandle, TaskResult, channel};
use crate::error::TaskError;
use crate::scheduler::Schedule;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::task::noop_waker_ref;

/// Registration status of a task.
///
/// The only enqueueing transition is `Unscheduled -> Scheduled`; repeat
/// registration requests observe `Scheduled` and do nothing. This guard is a
/// contract, not an optimization: without it a double registration would put
/// the same continuation in the queue twice, and the second sweep entry would
/// resume a finalized task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Unscheduled,
    Scheduled,
    Complete,
}

/// Resumable suspended state of a task, as seen by a scheduler.
///
/// Owned by the scheduler from registration until [`Self::is_complete`]
/// reports true, at which point the scheduler drops it. A continuation is
/// resumed at most once per sweep and never concurrently with itself.
pub trait Continuation: Send + Sync {
    /// Drives the task through one resumption.
    fn resume(self: Arc<Self>);

    /// True once the task has written its terminal event.
    fn is_complete(&self) -> bool;
}

/// State shared between a task and the context handed to its body.
struct TaskState {
    status: Mutex<Status>,
    scheduler: Arc<dyn Schedule>,
    // Back-pointer to the owning task, weak to avoid a task -> state -> task
    // cycle. Upgraded exactly once, at registration.
    continuation: Mutex<Option<Weak<dyn Continuation>>>,
}

impl TaskState {
    fn new(scheduler: Arc<dyn Schedule>) -> Self {
        Self {
            status: Mutex::new(Status::Unscheduled),
            scheduler,
            continuation: Mutex::new(None),
        }
    }

    /// Guarded scheduler hand-off: enqueues the continuation only on the
    /// `Unscheduled -> Scheduled` transition. Idempotent thereafter.
    fn request_schedule(&self) {
        {
            let mut status = self.status.lock().unwrap();

            if *status != Status::Unscheduled {
                return;
            }

            *status = Status::Scheduled;
        }

        let continuation = self.continuation.lock().unwrap().take();

        if let Some(continuation) = continuation.and_then(|weak| weak.upgrade()) {
            self.scheduler.schedule(continuation);
        }
    }

    fn mark_complete(&self) {
        *self.status.lock().unwrap() = Status::Complete;
    }

    fn is_complete(&self) -> bool {
        *self.status.lock().unwrap() == Status::Complete
    }
}

/// A single-shot suspendable computation registered with a scheduler.
///
/// Created via [`Task::spawn`], which returns the result-channel handle
/// immediately, before any scheduled work runs. The task itself lives in the
/// scheduler's queue (as an `Arc<dyn Continuation>`) from registration until
/// the sweep after its completion.
pub struct Task<T> {
    future: Mutex<Option<Pin<Box<dyn Future<Output = TaskResult<T>> + Send>>>>,
    promise: Mutex<Option<Promise<T>>>,
    state: Arc<TaskState>,
}

impl<T: Send + 'static> Task<T> {
    /// Constructs a task from a body and returns its result handle.
    ///
    /// The scheduler is passed explicitly; the engine keeps no ambient or
    /// global scheduling state. The body is polled once inline before this
    /// function returns, so it reaches its registration point (and the
    /// scheduler's queue) synchronously.
    ///
    /// Do not construct tasks from inside a running task body: registration
    /// takes the scheduler's queue lock, which is held for the duration of an
    /// in-progress sweep.
    ///
    /// # Arguments
    /// * `scheduler` - The scheduler this task registers with
    /// * `body` - Closure producing the task's future from a [`TaskContext`]
    ///
    /// # Returns
    /// The consumer handle of the task's result channel
    pub fn spawn<S, F, Fut>(scheduler: &Arc<S>, body: F) -> TaskHandle<T>
    where
        S: Schedule + 'static,
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        Self::spawn_dyn(Arc::clone(scheduler) as Arc<dyn Schedule>, body)
    }

    /// Object-safe variant of [`Task::spawn`], used by the composer where the
    /// scheduler is already type-erased.
    pub(crate) fn spawn_dyn<F, Fut>(scheduler: Arc<dyn Schedule>, body: F) -> TaskHandle<T>
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let (promise, handle) = channel();
        let state = Arc::new(TaskState::new(scheduler));

        let context = TaskContext {
            state: state.clone(),
        };

        // A panic escaping the body becomes an ordinary captured failure,
        // delivered at retrieval like an Err return.
        let future = AssertUnwindSafe(body(context))
            .catch_unwind()
            .map(|outcome| match outcome {
                Ok(result) => result,
                Err(payload) => Err(TaskError::from_panic(payload.as_ref())),
            });

        let task = Arc::new(Task {
            future: Mutex::new(Some(Box::pin(future))),
            promise: Mutex::new(Some(promise)),
            state: state.clone(),
        });

        {
            let weak: Weak<dyn Continuation> =
                Arc::downgrade(&(Arc::clone(&task) as Arc<dyn Continuation>));
            *state.continuation.lock().unwrap() = Some(weak);
        }

        // Inline first resumption: runs the body up to its registration
        // point. If the body never registers, the task is dropped here and
        // its channel stays pending forever.
        Arc::clone(&task).resume();

        handle
    }
}

impl<T: Send + 'static> Continuation for Task<T> {
    /// Polls the body once.
    ///
    /// A pending body is stored back for the next sweep. A finished body
    /// writes its outcome (value or captured error) into the channel and
    /// flips the status to complete; the scheduler removes the continuation
    /// on the following sweep.
    fn resume(self: Arc<Self>) {
        let mut context = Context::from_waker(noop_waker_ref());

        let mut future_slot = self.future.lock().unwrap();

        if let Some(mut future) = future_slot.take() {
            match future.as_mut().poll(&mut context) {
                Poll::Pending => {
                    *future_slot = Some(future);
                }
                Poll::Ready(result) => {
                    if let Some(promise) = self.promise.lock().unwrap().take() {
                        match result {
                            Ok(value) => promise.complete(value),
                            Err(error) => promise.fail(error),
                        }
                    }

                    self.state.mark_complete();
                }
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.state.is_complete()
    }
}

/// Capability handed to a task body for requesting registration.
///
/// Stands in for the explicit scheduler reference the task was constructed
/// with; it cannot escape into ambient state.
pub struct TaskContext {
    state: Arc<TaskState>,
}

impl TaskContext {
    /// Returns the registration-yield awaitable.
    ///
    /// The first poll performs the guarded hand-off to the scheduler and
    /// suspends for one round; awaiting a second registration suspends again
    /// but enqueues nothing (see [`Register`]).
    pub fn register(&self) -> Register {
        Register {
            state: self.state.clone(),
            suspended: false,
        }
    }
}

/// The registration-yield: suspends the task once, scheduling it on first
/// poll if (and only if) it was not scheduled before.
///
/// Distinct from the sentinel yield returned by [`yield_now`], which never
/// touches the status machine.
///
/// [`yield_now`]: crate::yield_now
pub struct Register {
    state: Arc<TaskState>,
    suspended: bool,
}

impl Future for Register {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.suspended {
            return Poll::Ready(());
        }

        self.suspended = true;
        self.state.request_schedule();

        Poll::Pending
    }
}
