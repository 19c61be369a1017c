//! Error types for task failures and composer misuse.
//!
//! Failures are terminal events on a result channel, structurally symmetric
//! with successes: a task that fails writes a [`TaskError`] into its channel,
//! and the caller branches on the outcome at retrieval. Nothing is raised
//! mid-sweep inside a scheduler.

use std::any::Any;

use thiserror::Error;

/// An error raised inside a task body, captured at the point of occurrence
/// and delivered when the result channel is read.
///
/// `TaskError` is cheap to clone so that a single failure can short-circuit
/// every stage derived from the failed handle: each downstream combinator
/// fails with the same error without invoking its transform.
///
/// # Example
/// ```ignore
/// let handle = Task::spawn(&executor, |ctx| async move {
///     ctx.register().await;
///     Err(TaskError::new("upstream service unavailable"))
/// });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task failed: {message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    /// Creates a task error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Builds a task error from a captured panic payload.
    ///
    /// Used by the engine when a task body panics instead of returning an
    /// `Err`: the payload is recovered as a message where possible so the
    /// failure still surfaces at retrieval like any other error.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked".to_string()
        };

        Self { message }
    }
}

/// Error returned when a composer's handle is extracted more than once.
///
/// A [`Composer`] wraps exactly one result-channel handle; extraction via
/// [`Composer::take_handle`] is single-use and invalidates the composer.
///
/// [`Composer`]: crate::Composer
/// [`Composer::take_handle`]: crate::Composer::take_handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("composer handle already extracted")]
pub struct HandleError;
