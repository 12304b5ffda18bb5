//! Single-mutex scheduler.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, error};

use cadlink_config::ExecutionModel;

use super::{ExecutionError, JobRequest, SCHEDULER_TARGET, Scheduler, run_job};
use crate::session::EngineSession;

/// Runs each job on the calling thread while holding the session lock.
///
/// Callers contend for the lock in no particular order, so jobs from
/// different connections interleave arbitrarily; jobs from one connection
/// keep their order because each connection submits synchronously.
#[derive(Debug)]
pub struct LockScheduler {
    session: Mutex<EngineSession>,
    closed: AtomicBool,
}

impl LockScheduler {
    /// Takes ownership of the session.
    #[must_use]
    pub fn new(session: EngineSession) -> Self {
        Self {
            session: Mutex::new(session),
            closed: AtomicBool::new(false),
        }
    }

    /// Gives the session back, for example after shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::ContextLost`] if the lock was poisoned.
    pub fn into_session(self) -> Result<EngineSession, ExecutionError> {
        self.session
            .into_inner()
            .map_err(|_| ExecutionError::ContextLost)
    }
}

impl Scheduler for LockScheduler {
    fn execute(&self, request: JobRequest) -> Result<Value, ExecutionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecutionError::ShuttingDown);
        }
        let JobRequest {
            method,
            origin,
            job,
        } = request;
        let mut session = self.session.lock().map_err(|_| {
            error!(target: SCHEDULER_TARGET, %method, "session lock poisoned");
            ExecutionError::ContextLost
        })?;
        debug!(target: SCHEDULER_TARGET, %method, origin, "executing under session lock");
        run_job(&mut session, job)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn model(&self) -> ExecutionModel {
        ExecutionModel::Lock
    }
}
