//! Main-loop queue scheduler.
//!
//! Connection threads push jobs onto an unbounded FIFO and block on a
//! one-shot reply channel. The engine's main thread owns the session and
//! drains the queue on every tick, so jobs run strictly in the order they
//! were enqueued.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde_json::Value;
use tracing::{debug, info};

use cadlink_config::ExecutionModel;

use super::{ExecutionError, JobRequest, SCHEDULER_TARGET, Scheduler, run_job};
use crate::session::EngineSession;

struct PendingExecution {
    sequence: u64,
    request: JobRequest,
    reply: Sender<Result<Value, ExecutionError>>,
}

/// Submission side of the main-loop queue.
#[derive(Debug)]
pub struct MainLoopScheduler {
    sender: Mutex<Option<Sender<PendingExecution>>>,
    sequence: AtomicU64,
}

/// Execution side of the main-loop queue; owns the session.
pub struct MainLoop {
    receiver: Receiver<PendingExecution>,
    session: EngineSession,
    executed: u64,
}

/// What a single [`MainLoop::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Jobs executed during the tick.
    pub executed: usize,
    /// `true` once the scheduler is closed and the queue is empty.
    pub finished: bool,
}

/// Creates a connected scheduler and main loop around a session.
#[must_use]
pub fn main_loop(session: EngineSession) -> (MainLoopScheduler, MainLoop) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (
        MainLoopScheduler {
            sender: Mutex::new(Some(sender)),
            sequence: AtomicU64::new(0),
        },
        MainLoop {
            receiver,
            session,
            executed: 0,
        },
    )
}

impl Scheduler for MainLoopScheduler {
    fn execute(&self, request: JobRequest) -> Result<Value, ExecutionError> {
        let (reply, response) = crossbeam_channel::bounded(1);
        {
            // Sequence numbers are taken under the lock so they match queue
            // order.
            let guard = self.sender.lock().map_err(|_| ExecutionError::ContextLost)?;
            let sender = guard.as_ref().ok_or(ExecutionError::ShuttingDown)?;
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
            sender
                .send(PendingExecution {
                    sequence,
                    request,
                    reply,
                })
                .map_err(|_| ExecutionError::ContextLost)?;
        }
        response
            .recv()
            .map_err(|_| ExecutionError::ContextLost)?
    }

    fn close(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }

    fn model(&self) -> ExecutionModel {
        ExecutionModel::MainLoop
    }
}

impl MainLoop {
    /// Runs every queued job without waiting for more.
    pub fn tick(&mut self) -> TickOutcome {
        let mut executed = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(pending) => {
                    self.execute(pending);
                    executed += 1;
                }
                Err(TryRecvError::Empty) => {
                    return TickOutcome {
                        executed,
                        finished: false,
                    };
                }
                Err(TryRecvError::Disconnected) => {
                    return TickOutcome {
                        executed,
                        finished: true,
                    };
                }
            }
        }
    }

    /// Drains the queue every `interval` until the scheduler is closed and
    /// every accepted job has run, then returns the session.
    pub fn run(mut self, interval: Duration) -> EngineSession {
        info!(
            target: SCHEDULER_TARGET,
            interval_ms = interval.as_millis(),
            "main loop started"
        );
        loop {
            match self.receiver.recv_timeout(interval) {
                Ok(pending) => {
                    self.execute(pending);
                    if self.tick().finished {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!(
            target: SCHEDULER_TARGET,
            executed = self.executed,
            "main loop stopped"
        );
        self.session
    }

    /// Read access to the session between ticks.
    #[must_use]
    pub const fn session(&self) -> &EngineSession {
        &self.session
    }

    /// Jobs waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Jobs executed so far.
    #[must_use]
    pub const fn executed(&self) -> u64 {
        self.executed
    }

    fn execute(&mut self, pending: PendingExecution) {
        let PendingExecution {
            sequence,
            request,
            reply,
        } = pending;
        debug!(
            target: SCHEDULER_TARGET,
            sequence,
            method = %request.method,
            origin = request.origin,
            "executing on main loop"
        );
        let result = run_job(&mut self.session, request.job);
        self.executed += 1;
        if reply.send(result).is_err() {
            debug!(
                target: SCHEDULER_TARGET,
                sequence,
                "submitter stopped waiting; result dropped"
            );
        }
    }
}

impl std::fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("pending", &self.receiver.len())
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}
