//! Gateway-side client for the cadlink engines.
//!
//! The gateway serves many concurrent HTTP and WebSocket callers but talks to
//! each engine over a small, bounded set of TCP connections:
//!
//! - [`ConnectionPool`] lends out connections, dialling new ones up to the
//!   configured size and making further callers wait for a release.
//! - [`PooledConnection`] writes commands and correlates responses by id, so
//!   several commands can be pipelined on one socket.
//! - [`GatewayClient`] wraps acquire and send in a retry loop with jittered
//!   exponential backoff for connection failures and timeouts.
//! - [`translate`] presents engine outcomes as HTTP replies and WebSocket
//!   envelopes.
//!
//! ```no_run
//! use cadlink_config::{EngineKind, GatewayConfig};
//! use cadlink_gateway::GatewayClient;
//! use serde_json::Map;
//!
//! let client = GatewayClient::new(GatewayConfig::default());
//! let response = client.send_command(EngineKind::Solid, "ping", Map::new())?;
//! assert!(response.is_success());
//! # Ok::<(), cadlink_gateway::GatewayError>(())
//! ```

mod client;
mod error;
mod health;
mod pool;
pub mod translate;
mod transport;

pub use client::{CommandSender, GatewayClient, retry_policy};
pub use error::GatewayError;
pub use health::{EngineHealth, HealthStatus};
pub use pool::{ConnectionPool, PoolSettings, PooledConnection};

#[cfg(test)]
mod tests;
