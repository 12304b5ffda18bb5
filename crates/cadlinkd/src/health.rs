//! Structured health reporting for engine lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use cadlink_config::{EngineConfig, EngineKind, ExecutionModel};

use crate::bootstrap::BootstrapError;
use crate::transport::ShutdownReport;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once configuration and telemetry are in place.
    fn bootstrap_succeeded(&self, config: &EngineConfig);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when the engine accepts connections.
    fn engine_ready(&self, kind: EngineKind, model: ExecutionModel, address: SocketAddr);

    /// Invoked when shutdown begins.
    fn engine_stopping(&self, kind: EngineKind);

    /// Invoked after the engine drained and stopped.
    fn engine_stopped(&self, kind: EngineKind, report: &ShutdownReport);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &EngineConfig) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn engine_ready(&self, kind: EngineKind, model: ExecutionModel, address: SocketAddr) {
        (**self).engine_ready(kind, model, address);
    }

    fn engine_stopping(&self, kind: EngineKind) {
        (**self).engine_stopping(kind);
    }

    fn engine_stopped(&self, kind: EngineKind, report: &ShutdownReport) {
        (**self).engine_stopped(kind, report);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting engine bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &EngineConfig) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            engine = %config.engine,
            listen = %config.listen_endpoint(),
            model = %config.resolved_execution_model(),
            log_filter = %config.log_filter,
            log_format = %config.log_format,
            "engine bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "engine bootstrap failed"
        );
    }

    fn engine_ready(&self, kind: EngineKind, model: ExecutionModel, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "engine_ready",
            engine = %kind,
            model = %model,
            %address,
            "engine accepting connections"
        );
    }

    fn engine_stopping(&self, kind: EngineKind) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "engine_stopping",
            engine = %kind,
            "engine stopping"
        );
    }

    fn engine_stopped(&self, kind: EngineKind, report: &ShutdownReport) {
        if report.forced > 0 {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "engine_stopped",
                engine = %kind,
                forced = report.forced,
                "engine stopped with connections forced closed"
            );
        } else {
            tracing::info!(
                target: HEALTH_TARGET,
                event = "engine_stopped",
                engine = %kind,
                "engine stopped"
            );
        }
    }
}
