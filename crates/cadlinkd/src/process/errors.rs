//! Defines the unified error surface for engine launch and supervision.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::runtime::RuntimeError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the engine process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the engine failed.
    #[error("engine bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// Stopping the engine failed.
    #[error("engine shutdown failed: {source}")]
    Runtime {
        /// Underlying runtime error.
        #[source]
        source: RuntimeError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<RuntimeError> for LaunchError {
    fn from(source: RuntimeError) -> Self {
        Self::Runtime { source }
    }
}
