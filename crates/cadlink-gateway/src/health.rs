//! Engine reachability reports.

use serde::Serialize;
use serde_json::Value;
use strum::Display;

use cadlink_config::EngineKind;

/// Outcome of a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthStatus {
    /// The engine answered `ping`.
    Healthy,
    /// The engine could not be reached or refused the probe.
    Unreachable,
}

/// Result of probing one engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineHealth {
    /// Probed engine.
    pub engine: EngineKind,
    /// Endpoint that was dialled.
    pub endpoint: String,
    /// Probe outcome.
    pub status: HealthStatus,
    /// `get_version` payload when the engine answered.
    pub version: Option<Value>,
    /// Failure description otherwise.
    pub error: Option<String>,
}

impl EngineHealth {
    pub(crate) const fn reachable(
        engine: EngineKind,
        endpoint: String,
        version: Option<Value>,
    ) -> Self {
        Self {
            engine,
            endpoint,
            status: HealthStatus::Healthy,
            version,
            error: None,
        }
    }

    pub(crate) const fn unreachable(engine: EngineKind, endpoint: String, error: String) -> Self {
        Self {
            engine,
            endpoint,
            status: HealthStatus::Unreachable,
            version: None,
            error: Some(error),
        }
    }

    /// Returns `true` when the engine answered the probe.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
