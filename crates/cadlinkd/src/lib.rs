//! Engine process for the cadlink command substrate.
//!
//! A `cadlinkd` process hosts one engine, either the mesh flavour or the
//! solid flavour, and serves newline-delimited JSON commands over TCP. The
//! pieces line up as a pipeline:
//!
//! - [`transport`] accepts connections and frames each byte stream into
//!   lines, one thread per connection.
//! - [`dispatch`] decodes a line, looks the method up in an immutable
//!   [`Registry`] and checks its parameters against the method's schema.
//! - [`scheduler`] runs the handler in the engine's single execution context:
//!   a main loop draining a FIFO queue for mesh engines, or one session lock
//!   for solid engines.
//! - [`handlers`] implement the engine methods against the
//!   [`session::EngineSession`], delegating geometry to a [`GeometryKernel`].
//!
//! [`bootstrap_with`] loads configuration, installs telemetry and starts an
//! [`EngineRuntime`]; [`run_engine`] adds signal-driven shutdown on top.
//! Shutdown stops the listener, gives connections the grace period, then
//! drains every command the scheduler already accepted.

mod bootstrap;
pub mod dispatch;
pub mod handlers;
mod health;
pub mod kernel;
mod process;
mod runtime;
pub mod scheduler;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Engine, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{Dispatcher, HandlerError, ParamKind, ParamSchema, Registry};
pub use handlers::registry_for;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use kernel::{AnalyticKernel, GeometryKernel};
pub use process::{
    LaunchError, ShutdownCause, ShutdownSignal, ShutdownTrigger, SystemShutdownSignal, run_engine,
};
pub use runtime::{EngineRuntime, RuntimeError};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
