//! Execution schedulers.
//!
//! Connection threads never touch the session directly. They wrap a handler
//! invocation in a [`Job`] and hand it to a [`Scheduler`], which runs it in
//! the engine's single execution context and blocks the caller until the
//! result is available. Two models exist:
//!
//! - [`MainLoopScheduler`] queues jobs for a [`MainLoop`] that the engine's
//!   main thread drains on a fixed tick.
//! - [`LockScheduler`] runs jobs on the calling thread under one session lock.
//!
//! Either way at most one job runs at a time, and a panicking job is reported
//! as [`ExecutionError::Panicked`] without disturbing later jobs.

mod lock;
mod main_loop;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use thiserror::Error;

use cadlink_config::ExecutionModel;

use crate::dispatch::HandlerError;
use crate::session::EngineSession;

pub use lock::LockScheduler;
pub use main_loop::{MainLoop, MainLoopScheduler, TickOutcome, main_loop};

pub(crate) const SCHEDULER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scheduler");

/// Work executed against the session.
pub type Job = Box<dyn FnOnce(&mut EngineSession) -> Result<Value, HandlerError> + Send>;

/// A job plus the context used for logging.
pub struct JobRequest {
    /// Method being executed.
    pub method: String,
    /// Identifier of the connection that submitted the job.
    pub origin: u64,
    /// The work itself.
    pub job: Job,
}

impl JobRequest {
    /// Builds a request.
    pub fn new(method: impl Into<String>, origin: u64, job: Job) -> Self {
        Self {
            method: method.into(),
            origin,
            job,
        }
    }
}

impl std::fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRequest")
            .field("method", &self.method)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Reasons a job produced no value.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The handler reported a failure.
    #[error(transparent)]
    Handler(#[from] HandlerError),
    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The scheduler was closed before the job was accepted.
    #[error("engine is shutting down")]
    ShuttingDown,
    /// The execution context went away while the job was pending.
    #[error("execution context is no longer available")]
    ContextLost,
}

/// Serialises jobs onto the engine's execution context.
pub trait Scheduler: Send + Sync {
    /// Runs a job and waits for its result.
    ///
    /// # Errors
    ///
    /// See [`ExecutionError`].
    fn execute(&self, request: JobRequest) -> Result<Value, ExecutionError>;

    /// Stops accepting jobs. Jobs accepted earlier still run.
    fn close(&self);

    /// Model implemented by this scheduler.
    fn model(&self) -> ExecutionModel;
}

/// Runs a job, converting a panic into [`ExecutionError::Panicked`].
pub(crate) fn run_job(session: &mut EngineSession, job: Job) -> Result<Value, ExecutionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| job(session))) {
        Ok(result) => result.map_err(ExecutionError::Handler),
        Err(payload) => Err(ExecutionError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

#[cfg(test)]
mod tests;
