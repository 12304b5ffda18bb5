//! Retrying client shared by every gateway request handler.

use std::cell::Cell;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use backon::{BlockingRetryable, ExponentialBuilder};
use serde_json::Map;
use tracing::{debug, warn};

use cadlink_config::{EngineKind, GatewayConfig};
use cadlink_protocol::{Params, Response};

use crate::error::GatewayError;
use crate::health::EngineHealth;
use crate::pool::{ConnectionPool, PoolSettings};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Upper bound on a single backoff sleep.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Anything that can deliver a command to an engine.
///
/// Surface adapters such as [`crate::translate::websocket`] depend on this
/// rather than on [`GatewayClient`] directly.
pub trait CommandSender: Send + Sync {
    /// Sends one command and returns the engine's response.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when no well-formed response was obtained.
    fn send_command(
        &self,
        engine: EngineKind,
        method: &str,
        params: Params,
    ) -> Result<Response, GatewayError>;
}

/// Pooled, retrying access to both engines.
///
/// The client is cheap to share behind an [`Arc`]; each engine has its own
/// bounded [`ConnectionPool`].
#[derive(Debug)]
pub struct GatewayClient {
    config: GatewayConfig,
    mesh: Arc<ConnectionPool>,
    solid: Arc<ConnectionPool>,
}

impl GatewayClient {
    /// Builds a client; no sockets are opened until the first command.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let settings = PoolSettings::from_config(&config);
        let mesh = Arc::new(ConnectionPool::new(
            EngineKind::Mesh,
            config.mesh_endpoint.clone(),
            settings,
        ));
        let solid = Arc::new(ConnectionPool::new(
            EngineKind::Solid,
            config.solid_endpoint.clone(),
            settings,
        ));
        Self {
            config,
            mesh,
            solid,
        }
    }

    /// Configuration the client was built from.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Pool serving `engine`.
    #[must_use]
    pub const fn pool(&self, engine: EngineKind) -> &Arc<ConnectionPool> {
        match engine {
            EngineKind::Mesh => &self.mesh,
            EngineKind::Solid => &self.solid,
        }
    }

    /// Sends a command, retrying transient failures with jittered
    /// exponential backoff.
    ///
    /// Domain errors reported by the engine come back as an error
    /// [`Response`] and are never retried.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Exhausted`] wrapping the last transient error
    /// once `retry_attempts` attempts have failed, or the first
    /// non-transient [`GatewayError`].
    pub fn send_command(
        &self,
        engine: EngineKind,
        method: &str,
        params: Params,
    ) -> Result<Response, GatewayError> {
        let attempts = Cell::new(0_usize);
        let outcome = (|| {
            attempts.set(attempts.get() + 1);
            self.attempt(engine, method, params.clone())
        })
        .retry(retry_policy(&self.config))
        .sleep(thread::sleep)
        .when(GatewayError::is_transient)
        .notify(|error, delay| {
            warn!(
                target: CLIENT_TARGET,
                %engine,
                method,
                attempt = attempts.get(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %error,
                "retrying engine command"
            );
        })
        .call();

        outcome.map_err(|error| {
            if error.is_transient() {
                GatewayError::Exhausted {
                    attempts: attempts.get(),
                    source: Box::new(error),
                }
            } else {
                error
            }
        })
    }

    /// Probes an engine with `ping` and `get_version`, without retrying.
    #[must_use]
    pub fn health(&self, engine: EngineKind) -> EngineHealth {
        let endpoint = self.pool(engine).endpoint().to_string();
        let probe = self
            .attempt(engine, "ping", Map::new())
            .and_then(|pong| {
                let version = self.attempt(engine, "get_version", Map::new())?;
                Ok((pong, version))
            });
        match probe {
            Ok((pong, version)) if pong.is_success() => {
                EngineHealth::reachable(engine, endpoint, version.result)
            }
            Ok((pong, _)) => EngineHealth::unreachable(
                engine,
                endpoint,
                pong.error
                    .map_or_else(|| "ping failed".to_owned(), |error| error.message),
            ),
            Err(error) => EngineHealth::unreachable(engine, endpoint, error.to_string()),
        }
    }

    /// One acquire + send + release cycle.
    fn attempt(
        &self,
        engine: EngineKind,
        method: &str,
        params: Params,
    ) -> Result<Response, GatewayError> {
        let mut connection = self.pool(engine).acquire()?;
        let response = connection.send_command(method, params, self.config.command_timeout())?;
        debug!(
            target: CLIENT_TARGET,
            %engine,
            method,
            success = response.is_success(),
            "engine answered"
        );
        connection.release(true);
        Ok(response)
    }
}

impl CommandSender for GatewayClient {
    fn send_command(
        &self,
        engine: EngineKind,
        method: &str,
        params: Params,
    ) -> Result<Response, GatewayError> {
        Self::send_command(self, engine, method, params)
    }
}

/// Backoff used between attempts: `retry_attempts - 1` sleeps starting at
/// `retry_delay`, doubling each time, with random jitter.
#[must_use]
pub fn retry_policy(config: &GatewayConfig) -> ExponentialBuilder {
    let base = config.retry_delay();
    ExponentialBuilder::default()
        .with_min_delay(base)
        .with_max_delay(base.max(MAX_RETRY_DELAY))
        .with_factor(2.0)
        .with_max_times(config.retry_attempts.saturating_sub(1))
        .with_jitter()
}

#[cfg(test)]
mod tests {
    use backon::BackoffBuilder;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn backoff_grows_and_stops_after_the_configured_attempts() {
        let config = GatewayConfig {
            retry_attempts: 4,
            retry_delay_ms: 10,
            ..GatewayConfig::default()
        };
        let delays: Vec<Duration> = retry_policy(&config).build().collect();
        assert_eq!(delays.len(), 3);
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]), "{delays:?}");
        assert!(delays.iter().all(|delay| *delay >= Duration::from_millis(10)));
    }

    #[rstest]
    fn single_attempt_never_sleeps() {
        let config = GatewayConfig {
            retry_attempts: 1,
            ..GatewayConfig::default()
        };
        assert_eq!(retry_policy(&config).build().count(), 0);
    }
}
