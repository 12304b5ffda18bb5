use camino::Utf8PathBuf;

use crate::engine::EngineKind;
use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Port the mesh engine listens on by default.
pub const DEFAULT_MESH_PORT: u16 = 9876;

/// Port the solid engine listens on by default.
pub const DEFAULT_SOLID_PORT: u16 = 9877;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Seconds a connection may stay silent before the engine closes it.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Milliseconds in-flight connections get to finish during shutdown.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2_000;

/// Main loop polling interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

/// Upper bound on one request line.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Maximum pooled connections per engine.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Per-command timeout in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// TCP connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Time a caller waits for a free pooled connection, in milliseconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

/// Total attempts for a command, including the first.
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Base delay between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Seconds an idle pooled connection is kept before being discarded.
pub const DEFAULT_MAX_IDLE_SECS: u64 = 60;

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint the gateway uses for the mesh engine.
pub fn default_mesh_endpoint() -> SocketEndpoint {
    EngineKind::Mesh.default_endpoint()
}

/// Endpoint the gateway uses for the solid engine.
pub fn default_solid_endpoint() -> SocketEndpoint {
    EngineKind::Solid.default_endpoint()
}

/// Directory relative export and save paths resolve against.
pub fn default_workspace_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

pub(crate) const fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

pub(crate) const fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

pub(crate) const fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

pub(crate) const fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

pub(crate) const fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

pub(crate) const fn default_command_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_MS
}

pub(crate) const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

pub(crate) const fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_MS
}

pub(crate) const fn default_retry_attempts() -> usize {
    DEFAULT_RETRY_ATTEMPTS
}

pub(crate) const fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

pub(crate) const fn default_max_idle_secs() -> u64 {
    DEFAULT_MAX_IDLE_SECS
}
