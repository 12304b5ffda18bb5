//! Engine process supervision: launch sequencing and signal-driven shutdown.

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_engine;
pub use shutdown::{
    ShutdownCause, ShutdownError, ShutdownSignal, ShutdownTrigger, SystemShutdownSignal,
};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
