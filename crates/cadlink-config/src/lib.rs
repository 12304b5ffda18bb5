//! Shared configuration for the cadlink engines and gateway.
//!
//! Both structures are layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `<PREFIX>_CONFIG_PATH`), then
//! environment variables, then command-line flags. Configuration is read once
//! at startup and treated as immutable afterwards.
//!
//! - [`EngineConfig`] (prefix `CADLINKD`) configures one engine process.
//! - [`GatewayConfig`] (prefix `CADLINK`) configures the gateway client.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod engine;
mod logging;
mod socket;

pub use defaults::{
    DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_FILTER, DEFAULT_MAX_IDLE_SECS,
    DEFAULT_MAX_REQUEST_BYTES, DEFAULT_MESH_PORT, DEFAULT_POOL_SIZE, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_SHUTDOWN_GRACE_MS, DEFAULT_SOLID_PORT,
    DEFAULT_TICK_INTERVAL_MS, default_log_filter_string, default_log_format,
    default_mesh_endpoint, default_solid_endpoint, default_workspace_dir,
};
pub use engine::{EngineKind, ExecutionModel};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError};

use defaults::{
    default_acquire_timeout_ms, default_command_timeout_ms, default_connect_timeout_ms,
    default_idle_timeout_secs, default_max_idle_secs, default_max_request_bytes,
    default_pool_size, default_retry_attempts, default_retry_delay_ms, default_shutdown_grace_ms,
    default_tick_interval_ms,
};

/// Logging settings shared by every binary.
pub trait LoggingConfig {
    /// `tracing_subscriber::EnvFilter` expression.
    fn log_filter(&self) -> &str;
    /// Output format.
    fn log_format(&self) -> LogFormat;
}

/// Configuration for one engine process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CADLINKD")]
pub struct EngineConfig {
    /// Engine flavour hosted by the process.
    #[serde(default)]
    pub engine: EngineKind,
    /// Listening endpoint; defaults to loopback on the engine's port.
    #[serde(default)]
    pub listen: Option<SocketEndpoint>,
    /// Execution model override.
    #[serde(default)]
    pub execution_model: ExecutionModel,
    /// Seconds a silent connection is kept open.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Milliseconds connections get to finish when shutting down.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Main loop polling interval in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Maximum size of one request line in bytes.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Include panic messages in `INTERNAL_ERROR` responses.
    #[serde(default)]
    pub expose_internal_errors: bool,
    /// Directory relative file paths resolve against.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: Utf8PathBuf,
    /// Log filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_engine(EngineKind::default())
    }
}

impl EngineConfig {
    /// Default configuration for an engine kind.
    #[must_use]
    pub fn for_engine(engine: EngineKind) -> Self {
        Self {
            engine,
            listen: None,
            execution_model: ExecutionModel::Native,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            expose_internal_errors: false,
            workspace_dir: default_workspace_dir(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }

    /// Endpoint the engine binds.
    #[must_use]
    pub fn listen_endpoint(&self) -> SocketEndpoint {
        self.listen
            .clone()
            .unwrap_or_else(|| self.engine.default_endpoint())
    }

    /// Execution model after resolving [`ExecutionModel::Native`].
    #[must_use]
    pub const fn resolved_execution_model(&self) -> ExecutionModel {
        self.execution_model.resolve(self.engine)
    }

    /// Idle timeout as a duration.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Shutdown grace period as a duration.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Main loop tick interval as a duration.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl LoggingConfig for EngineConfig {
    fn log_filter(&self) -> &str {
        &self.log_filter
    }

    fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Configuration for the gateway client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CADLINK")]
pub struct GatewayConfig {
    /// Endpoint of the mesh engine.
    #[serde(default = "default_mesh_endpoint")]
    pub mesh_endpoint: SocketEndpoint,
    /// Endpoint of the solid engine.
    #[serde(default = "default_solid_endpoint")]
    pub solid_endpoint: SocketEndpoint,
    /// Maximum pooled connections per engine.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Per-command timeout in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Wait for a free pooled connection, in milliseconds.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Total attempts per command, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,
    /// Base backoff delay in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Seconds an idle pooled connection is reused.
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,
    /// Log filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mesh_endpoint: default_mesh_endpoint(),
            solid_endpoint: default_solid_endpoint(),
            pool_size: DEFAULT_POOL_SIZE,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_idle_secs: DEFAULT_MAX_IDLE_SECS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl GatewayConfig {
    /// Per-command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// TCP connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Maximum wait for a pooled connection.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Base retry delay.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Idle lifetime of pooled connections.
    #[must_use]
    pub const fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }
}

impl LoggingConfig for GatewayConfig {
    fn log_filter(&self) -> &str {
        &self.log_filter
    }

    fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(EngineKind::Mesh, 9876, ExecutionModel::MainLoop)]
    #[case(EngineKind::Solid, 9877, ExecutionModel::Lock)]
    fn engine_defaults_follow_kind(
        #[case] kind: EngineKind,
        #[case] port: u16,
        #[case] model: ExecutionModel,
    ) {
        let config = EngineConfig::for_engine(kind);
        assert_eq!(config.listen_endpoint(), SocketEndpoint::tcp("127.0.0.1", port));
        assert_eq!(config.resolved_execution_model(), model);
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
    }

    #[rstest]
    fn explicit_listen_endpoint_wins() {
        let config = EngineConfig {
            listen: Some(SocketEndpoint::tcp("0.0.0.0", 7000)),
            ..EngineConfig::for_engine(EngineKind::Solid)
        };
        assert_eq!(config.listen_endpoint().port(), 7000);
    }

    #[rstest]
    fn gateway_defaults_match_engine_ports() {
        let config = GatewayConfig::default();
        assert_eq!(config.mesh_endpoint.port(), DEFAULT_MESH_PORT);
        assert_eq!(config.solid_endpoint.port(), DEFAULT_SOLID_PORT);
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }
}
