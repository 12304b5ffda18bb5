//! Errors raised by the gateway client.

use std::io;
use std::time::Duration;

use thiserror::Error;

use cadlink_config::EngineKind;

/// Failures of the gateway client itself.
///
/// Domain failures reported by an engine are not errors at this layer: they
/// arrive as a well-formed [`cadlink_protocol::Response`] with an error body.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The engine socket could not be opened, or it failed mid-exchange.
    #[error("{engine} engine at {endpoint} is unreachable: {source}")]
    Connection {
        /// Target engine.
        engine: EngineKind,
        /// Endpoint that was dialled.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// No matching response arrived in time.
    #[error("{engine} engine did not answer '{method}' within {timeout:?}")]
    Timeout {
        /// Target engine.
        engine: EngineKind,
        /// Method that was waiting.
        method: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// Every pooled connection stayed busy for the whole acquire window.
    #[error("no {engine} connection became free within {waited:?}")]
    PoolExhausted {
        /// Target engine.
        engine: EngineKind,
        /// How long the caller waited.
        waited: Duration,
    },
    /// The engine sent something that is not a usable response.
    #[error("{engine} engine broke the protocol: {message}")]
    Protocol {
        /// Target engine.
        engine: EngineKind,
        /// What was wrong with the exchange.
        message: String,
    },
    /// Transient failures persisted through every retry.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: usize,
        /// Error from the final attempt.
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Returns `true` for failures that a fresh attempt may clear.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Returns the error behind any retry wrapper.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use cadlink_config::EngineKind;
    /// use cadlink_gateway::GatewayError;
    ///
    /// let timeout = GatewayError::Timeout {
    ///     engine: EngineKind::Solid,
    ///     method: "ping".to_owned(),
    ///     timeout: Duration::from_secs(1),
    /// };
    /// let wrapped = GatewayError::Exhausted {
    ///     attempts: 3,
    ///     source: Box::new(timeout),
    /// };
    /// assert!(matches!(wrapped.last(), GatewayError::Timeout { .. }));
    /// ```
    #[must_use]
    pub fn last(&self) -> &Self {
        match self {
            Self::Exhausted { source, .. } => source.last(),
            other => other,
        }
    }
}
