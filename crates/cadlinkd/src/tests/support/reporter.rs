//! Test double for [`HealthReporter`] that records lifecycle events for
//! assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use cadlink_config::{EngineConfig, EngineKind, ExecutionModel};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::transport::ShutdownReport;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded(EngineKind),
    BootstrapFailed(String),
    EngineReady {
        kind: EngineKind,
        model: ExecutionModel,
        address: SocketAddr,
    },
    EngineStopping(EngineKind),
    EngineStopped { kind: EngineKind, forced: usize },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address reported by the most recent `engine_ready` event.
    #[must_use]
    pub fn ready_address(&self) -> Option<SocketAddr> {
        self.events().iter().rev().find_map(|event| match event {
            HealthEvent::EngineReady { address, .. } => Some(*address),
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, config: &EngineConfig) {
        self.record(HealthEvent::BootstrapSucceeded(config.engine));
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn engine_ready(&self, kind: EngineKind, model: ExecutionModel, address: SocketAddr) {
        self.record(HealthEvent::EngineReady {
            kind,
            model,
            address,
        });
    }

    fn engine_stopping(&self, kind: EngineKind) {
        self.record(HealthEvent::EngineStopping(kind));
    }

    fn engine_stopped(&self, kind: EngineKind, report: &ShutdownReport) {
        self.record(HealthEvent::EngineStopped {
            kind,
            forced: report.forced,
        });
    }
}
