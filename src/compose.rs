//! Combinator algebra over result-channel handles.
//!
//! A [`Composer`] derives new handles from existing ones via map, flatmap,
//! join and collect, without the caller writing any scheduling code. The same
//! algebra runs on two interchangeable backends, selected by [`Backend`]:
//!
//! - **Cooperative**: each stage is a [`Task`] registered on the supplied
//!   scheduler. The stage re-suspends on the sentinel yield until its
//!   dependencies are ready, so composition latency is bounded by the sweep
//!   cadence rather than a wakeup notification.
//! - **Blocking**: each stage is one OS thread performing a blocking wait on
//!   its dependencies. No scheduler is required, but every chained stage
//!   holds a blocked thread for its lifetime.
//!
//! A failure at any stage short-circuits downstream stages: they fail with
//! the same error and never invoke their transforms.
//!
//! # Example
//! ```ignore
//! let record = Composer::cooperative(&executor, search_id_by_name("Ada"))
//!     .map(|id: String| id.parse::<i64>().expect("numeric id"))
//!     .flatmap(|id| fetch_record_by_id(&executor, id))
//!     .take_handle()?;
//! ```

use crate::channel::{TaskHandle, TaskResult, channel};
use crate::error::{HandleError, TaskError};
use crate::scheduler::Schedule;
use crate::task::Task;
use crate::yield_now::yield_now;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

/// Execution strategy for composed stages.
///
/// A sum type rather than two composer types, so the same code (and the same
/// property tests) can run against either backend unchanged.
#[derive(Clone)]
pub enum Backend {
    /// Poll-driven stages registered on the given scheduler.
    Cooperative(Arc<dyn Schedule>),
    /// Thread-per-stage with blocking waits.
    Blocking,
}

/// Composes transformations over one result-channel handle.
///
/// A composer wraps exactly one handle. The chaining combinators consume the
/// composer and return a new one for the derived handle; final extraction via
/// [`Self::take_handle`] is single-use.
pub struct Composer<T> {
    handle: Option<TaskHandle<T>>,
    backend: Backend,
}

impl<T: Send + 'static> Composer<T> {
    /// Wraps a handle with an explicit backend.
    pub fn new(backend: Backend, handle: TaskHandle<T>) -> Self {
        Self {
            handle: Some(handle),
            backend,
        }
    }

    /// Wraps a handle for cooperative composition on `scheduler`.
    ///
    /// Every derived stage becomes a task registered on that scheduler; the
    /// caller (or the scheduler's background loop) must keep stepping it for
    /// the stages to make progress.
    pub fn cooperative<S: Schedule + 'static>(scheduler: &Arc<S>, handle: TaskHandle<T>) -> Self {
        Self::new(
            Backend::Cooperative(Arc::clone(scheduler) as Arc<dyn Schedule>),
            handle,
        )
    }

    /// Wraps a handle for blocking composition (one thread per stage).
    pub fn blocking(handle: TaskHandle<T>) -> Self {
        Self::new(Backend::Blocking, handle)
    }

    /// Derives a handle that completes with `function(value)`.
    ///
    /// If the input fails, the derived handle fails with the same error and
    /// `function` is never invoked.
    pub fn map<U, F>(mut self, function: F) -> Composer<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let input = self.take();
        let backend = self.backend.clone();

        let handle = match &backend {
            Backend::Cooperative(scheduler) => map_task(scheduler.clone(), input, function),
            Backend::Blocking => blocking_stage(move || {
                let value = input.wait()?;
                Ok(function(value))
            }),
        };

        Composer::new(backend, handle)
    }

    /// Derives a handle that awaits the input, applies `function` to obtain
    /// a second handle, awaits that, and completes with its value.
    ///
    /// Failure at either stage is terminal for the derived handle. Note that
    /// on the cooperative backend the composing task stays in the scheduler's
    /// queue until the second handle resolves, so deep flatmap chains keep a
    /// matching number of tasks open.
    pub fn flatmap<U, F>(mut self, function: F) -> Composer<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> TaskHandle<U> + Send + 'static,
    {
        let input = self.take();
        let backend = self.backend.clone();

        let handle = match &backend {
            Backend::Cooperative(scheduler) => flatmap_task(scheduler.clone(), input, function),
            Backend::Blocking => blocking_stage(move || {
                let value = input.wait()?;
                function(value).wait()
            }),
        };

        Composer::new(backend, handle)
    }

    /// Derives a handle that completes with the pair of both inputs.
    ///
    /// The inputs may resolve in either order; failure of either fails the
    /// derived handle.
    pub fn join<U>(mut self, other: TaskHandle<U>) -> Composer<(T, U)>
    where
        U: Send + 'static,
    {
        let left = self.take();
        let backend = self.backend.clone();

        let handle = match &backend {
            Backend::Cooperative(scheduler) => join_task(scheduler.clone(), left, other),
            Backend::Blocking => blocking_stage(move || Ok((left.wait()?, other.wait()?))),
        };

        Composer::new(backend, handle)
    }

    /// Derives a handle that completes once every input handle is ready,
    /// after writing each resolved value into `sink` in input order.
    ///
    /// The sink sees writes for indices `0..n-1` exactly in that order. A
    /// failing input fails the aggregate handle; values already written stay
    /// written.
    pub fn collect<I, F>(backend: Backend, handles: I, sink: F) -> Composer<()>
    where
        I: IntoIterator<Item = TaskHandle<T>>,
        F: FnMut(T) + Send + 'static,
    {
        let handles: Vec<TaskHandle<T>> = handles.into_iter().collect();

        let handle = match &backend {
            Backend::Cooperative(scheduler) => collect_task(scheduler.clone(), handles, sink),
            Backend::Blocking => blocking_stage(move || {
                let mut sink = sink;

                for input in handles {
                    sink(input.wait()?);
                }

                Ok(())
            }),
        };

        Composer::new(backend, handle)
    }

    /// Extracts the underlying handle, invalidating the composer.
    ///
    /// Single-use: a second extraction attempt returns [`HandleError`].
    pub fn take_handle(&mut self) -> Result<TaskHandle<T>, HandleError> {
        self.handle.take().ok_or(HandleError)
    }

    /// Internal extraction for the chaining combinators.
    ///
    /// # Panics
    /// Panics if the handle was already extracted via [`Self::take_handle`];
    /// chaining off an invalidated composer is a usage bug.
    fn take(&mut self) -> TaskHandle<T> {
        self.handle.take().expect("composer handle already extracted")
    }
}

/// Suspends on the sentinel yield until `handle` is ready, then takes its
/// terminal event. The busy-poll is what binds cooperative composition
/// latency to the sweep cadence.
async fn resolve<T>(handle: TaskHandle<T>) -> TaskResult<T> {
    while !handle.is_ready() {
        yield_now().await;
    }

    handle
        .try_take()
        .expect("result channel emptied while resolving")
}

fn map_task<T, U, F>(
    scheduler: Arc<dyn Schedule>,
    input: TaskHandle<T>,
    function: F,
) -> TaskHandle<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnOnce(T) -> U + Send + 'static,
{
    Task::spawn_dyn(scheduler, |ctx| async move {
        ctx.register().await;

        let value = resolve(input).await?;

        Ok(function(value))
    })
}

fn flatmap_task<T, U, F>(
    scheduler: Arc<dyn Schedule>,
    input: TaskHandle<T>,
    function: F,
) -> TaskHandle<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnOnce(T) -> TaskHandle<U> + Send + 'static,
{
    Task::spawn_dyn(scheduler, |ctx| async move {
        ctx.register().await;

        let value = resolve(input).await?;
        let next = function(value);

        resolve(next).await
    })
}

fn join_task<T, U>(
    scheduler: Arc<dyn Schedule>,
    left: TaskHandle<T>,
    right: TaskHandle<U>,
) -> TaskHandle<(T, U)>
where
    T: Send + 'static,
    U: Send + 'static,
{
    Task::spawn_dyn(scheduler, |ctx| async move {
        ctx.register().await;

        let left = resolve(left).await?;
        let right = resolve(right).await?;

        Ok((left, right))
    })
}

fn collect_task<T, F>(
    scheduler: Arc<dyn Schedule>,
    handles: Vec<TaskHandle<T>>,
    sink: F,
) -> TaskHandle<()>
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    Task::spawn_dyn(scheduler, |ctx| async move {
        ctx.register().await;

        let mut sink = sink;

        for input in handles {
            sink(resolve(input).await?);
        }

        Ok(())
    })
}

/// Runs `work` on a dedicated thread and publishes its outcome through a
/// fresh channel. A panic inside `work` (including inside a user transform)
/// is captured as a [`TaskError`], matching the cooperative backend.
fn blocking_stage<U, W>(work: W) -> TaskHandle<U>
where
    U: Send + 'static,
    W: FnOnce() -> TaskResult<U> + Send + 'static,
{
    let (promise, handle) = channel();

    thread::spawn(move || match catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(value)) => promise.complete(value),
        Ok(Err(error)) => promise.fail(error),
        Err(payload) => promise.fail(TaskError::from_panic(payload.as_ref())),
    });

    handle
}
