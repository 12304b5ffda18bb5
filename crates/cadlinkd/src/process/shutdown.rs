//! Signal-driven shutdown for the engine process.
//!
//! Handlers are installed before bootstrap so a termination signal that
//! arrives while the engine is still starting ends the run once it is up.

use std::fmt;
use std::io;
use std::sync::{Mutex, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use signal_hook::low_level::signal_name;
use thiserror::Error;

const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// What ended the wait for shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A termination signal arrived.
    Signal(i32),
    /// Shutdown was requested from inside the process.
    Requested,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => match signal_name(*signal) {
                Some(name) => f.write_str(name),
                None => write!(f, "signal {signal}"),
            },
            Self::Requested => f.write_str("requested"),
        }
    }
}

/// Source of the engine's shutdown notification.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the engine should drain.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] if the notification source fails.
    fn wait(&self) -> Result<ShutdownCause, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener fed by SIGTERM, SIGINT, SIGQUIT and SIGHUP.
#[derive(Debug)]
pub struct SystemShutdownSignal {
    signals: Mutex<Signals>,
    handle: Handle,
}

impl SystemShutdownSignal {
    /// Installs the termination signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when the handlers cannot be
    /// registered.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals =
            Signals::new(TERMINATION_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        Ok(Self {
            signals: Mutex::new(signals),
            handle,
        })
    }

    /// Returns a trigger that ends [`ShutdownSignal::wait`] without a signal.
    #[must_use]
    pub fn trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            handle: self.handle.clone(),
        }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<ShutdownCause, ShutdownError> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(signals
            .forever()
            .next()
            .map_or(ShutdownCause::Requested, ShutdownCause::Signal))
    }
}

/// Requests shutdown of an engine waiting on a [`SystemShutdownSignal`].
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    handle: Handle,
}

impl ShutdownTrigger {
    /// Wakes the waiting engine. Later waits return immediately.
    pub fn request(&self) {
        self.handle.close();
    }
}
