//! Shared fixtures for gateway tests.

mod engine;
mod fake_engine;

pub(crate) use engine::RealEngine;
pub(crate) use fake_engine::{FakeEngine, Mode};

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use cadlink_config::{EngineKind, GatewayConfig, SocketEndpoint};

use crate::pool::{ConnectionPool, PoolSettings};

/// Gateway configuration with short timeouts, pointing both engines at the
/// given endpoints.
pub(crate) fn gateway_config(mesh: SocketEndpoint, solid: SocketEndpoint) -> GatewayConfig {
    GatewayConfig {
        mesh_endpoint: mesh,
        solid_endpoint: solid,
        pool_size: 2,
        command_timeout_ms: 2_000,
        connect_timeout_ms: 500,
        acquire_timeout_ms: 500,
        retry_attempts: 3,
        retry_delay_ms: 10,
        max_idle_secs: 60,
        log_filter: "warn".to_owned(),
        ..GatewayConfig::default()
    }
}

/// Pool limits matching [`gateway_config`].
pub(crate) fn settings(max_size: usize) -> PoolSettings {
    PoolSettings {
        max_size,
        connect_timeout: Duration::from_millis(500),
        acquire_timeout: Duration::from_millis(500),
        max_idle: Duration::from_secs(60),
    }
}

/// Pool for the mesh engine at `endpoint`.
pub(crate) fn pool(endpoint: SocketEndpoint, settings: PoolSettings) -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(EngineKind::Mesh, endpoint, settings))
}

/// Loopback endpoint nothing listens on.
pub(crate) fn refused_endpoint() -> SocketEndpoint {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe listener");
    let port = listener.local_addr().expect("probe address").port();
    drop(listener);
    SocketEndpoint::tcp("127.0.0.1", port)
}
