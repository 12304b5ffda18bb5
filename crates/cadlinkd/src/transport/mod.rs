//! TCP transport for engine connections.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread. Every connection gets its own thread running a
//! [`ConnectionHandler`]; the command handler frames the byte stream into
//! lines and answers each one through the dispatcher.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{CommandConnectionHandler, ConnectionContext, ConnectionHandler};
pub use self::listener::{ListenerHandle, ShutdownReport, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, HoldingHandler, echo_dispatcher};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
