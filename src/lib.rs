//! Minimal, embeddable cooperative task-execution engine.
//!
//! This crate provides a single-queue cooperative scheduler, a single-shot
//! suspendable task type bound to it, and a combinator algebra for composing
//! asynchronous results. Tasks yield explicitly; there is no preemption, no
//! work stealing and no timers.
//!
//! # Architecture
//!
//! - **Promise / TaskHandle**: write-once result channel holding one terminal
//!   value-or-error, pollable or blockable
//! - **Task**: suspendable computation that registers itself with a scheduler
//!   and reports into its channel on completion or failure
//! - **Schedule**: the scheduler interface — one operation, accept a
//!   suspended continuation
//! - **RoundRobinExecutor**: FIFO queue of continuations swept once per step,
//!   optionally driven by a background loop
//! - **yield_now**: sentinel suspension handing control back for one round
//! - **Composer**: map / flatmap / join / collect over handles, on either a
//!   cooperative (poll-driven) or a blocking (thread-per-stage) backend
//!
//! # Driving tasks
//!
//! The caller constructs tasks against an explicit scheduler reference and
//! then drives that scheduler, either manually:
//!
//! ```ignore
//! let executor = Arc::new(RoundRobinExecutor::new());
//! let handle = Task::spawn(&executor, |ctx| async move {
//!     ctx.register().await;
//!     Ok(1 + 1)
//! });
//!
//! while executor.size() > 0 {
//!     executor.step();
//! }
//! assert_eq!(handle.wait(), Ok(2));
//! ```
//!
//! or through the background loop (`executor.start()` / `executor.stop()`).

mod channel;
mod compose;
mod error;
mod scheduler;
mod task;
mod yield_now;

pub use channel::{Promise, TaskHandle, TaskResult, channel};
pub use compose::{Backend, Composer};
pub use error::{HandleError, TaskError};
pub use scheduler::{RoundRobinExecutor, Schedule};
pub use task::{Continuation, Register, Task, TaskContext};
pub use yield_now::yield_now;
