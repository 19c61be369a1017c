//! Scheduler interface and the round-robin executor.
//!
//! The interface is a single operation: accept ownership of a suspended
//! continuation and guarantee its eventual resumption. The concrete
//! [`RoundRobinExecutor`] keeps continuations in FIFO order and sweeps them
//! once per [`step`], either driven manually by the caller or by one
//! dedicated background loop ([`start`]/[`stop`]).
//!
//! [`step`]: RoundRobinExecutor::step
//! [`start`]: RoundRobinExecutor::start
//! [`stop`]: RoundRobinExecutor::stop

use crate::task::Continuation;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// The scheduler interface: one operation.
///
/// Implementations take ownership of the continuation and keep it until it
/// reports completion. Tasks hold their scheduler as `Arc<dyn Schedule>`, so
/// any implementation can stand behind [`Task::spawn`].
///
/// [`Task::spawn`]: crate::Task::spawn
pub trait Schedule: Send + Sync {
    /// Accepts a suspended continuation for future resumption.
    fn schedule(&self, continuation: Arc<dyn Continuation>);
}

/// Round-robin executor over a single FIFO queue of continuations.
///
/// Each [`Self::step`] performs exactly one full sweep: every continuation
/// present at the start of the sweep is removed if complete, otherwise
/// resumed exactly once. Registrations issued while a sweep is in progress
/// wait for the sweep to finish and take effect on the next step.
///
/// # Example
/// ```ignore
/// let executor = Arc::new(RoundRobinExecutor::new());
/// let handle = Task::spawn(&executor, |ctx| async move {
///     ctx.register().await;
///     Ok(42)
/// });
///
/// while executor.size() > 0 {
///     executor.step();
/// }
///
/// assert_eq!(handle.wait(), Ok(42));
/// ```
pub struct RoundRobinExecutor {
    queue: Mutex<VecDeque<Arc<dyn Continuation>>>,
    open_tasks: AtomicUsize,
    running: AtomicBool,
}

impl RoundRobinExecutor {
    /// Creates an executor with an empty continuation queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            open_tasks: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        }
    }

    /// Sweeps the continuation queue once.
    ///
    /// The queue lock is held for the entire sweep, so a concurrent
    /// [`Schedule::schedule`] call blocks until the sweep finishes. Within
    /// the sweep, continuations are visited in FIFO order relative to their
    /// registration; a task that re-suspends during its own resume is not
    /// revisited until the next step.
    ///
    /// A continuation that completed during a previous sweep is destroyed
    /// and removed here, one sweep after its body logically returned.
    pub fn step(&self) {
        let mut queue = self.queue.lock().unwrap();
        let mut index = 0;

        while index < queue.len() {
            if queue[index].is_complete() {
                queue.remove(index);
                self.open_tasks.fetch_sub(1, Ordering::AcqRel);
            } else {
                let continuation = queue[index].clone();
                continuation.resume();
                index += 1;
            }
        }
    }

    /// Launches the background loop, sweeping until [`Self::stop`].
    ///
    /// The run flag is re-armed on every call, so an executor stopped earlier
    /// can be started again; continuations left pending by a previous stop
    /// resume sweeping.
    ///
    /// # Returns
    /// The join handle of the loop thread, so the caller can continue and
    /// later wait for the loop to wind down after `stop`.
    pub fn start(self: &Arc<Self>) -> thread::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        let executor = Arc::clone(self);

        thread::spawn(move || {
            while executor.running.load(Ordering::SeqCst) {
                executor.step();
                thread::yield_now();
            }
        })
    }

    /// Signals the background loop to halt after its current sweep.
    ///
    /// Performs no cleanup: pending continuations stay queued and resumable
    /// through [`Self::step`] or a renewed [`Self::start`].
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Number of continuations not yet finalized.
    ///
    /// Includes tasks whose body has logically returned but which have not
    /// been swept and destroyed yet.
    pub fn size(&self) -> usize {
        self.open_tasks.load(Ordering::Acquire)
    }
}

impl Schedule for RoundRobinExecutor {
    /// Appends the continuation in FIFO order.
    ///
    /// Blocks for the duration of an in-progress sweep; the new entry is
    /// first visited on the following step.
    fn schedule(&self, continuation: Arc<dyn Continuation>) {
        self.queue.lock().unwrap().push_back(continuation);
        self.open_tasks.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for RoundRobinExecutor {
    fn default() -> Self {
        Self::new()
    }
}
