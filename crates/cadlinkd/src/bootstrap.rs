//! Engine bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use cadlink_config::EngineConfig;

use crate::health::HealthReporter;
use crate::kernel::GeometryKernel;
use crate::runtime::{EngineRuntime, RuntimeError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::ShutdownReport;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the engine configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when any configuration layer is invalid.
    fn load(&self) -> Result<EngineConfig, Arc<OrthoError>>;
}

/// Loader that reads defaults, file, environment and command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<EngineConfig, Arc<OrthoError>> {
        EngineConfig::load()
    }
}

/// Loader that returns a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: EngineConfig,
}

impl StaticConfigLoader {
    /// Wraps an already loaded configuration.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<EngineConfig, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The engine runtime could not start.
    #[error("failed to start engine: {source}")]
    Runtime {
        /// Underlying runtime error.
        #[source]
        source: RuntimeError,
    },
}

/// Result of a successful bootstrap: a configured, listening engine.
pub struct Engine {
    config: EngineConfig,
    runtime: EngineRuntime,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Accessor for the running engine.
    #[must_use]
    pub const fn runtime(&self) -> &EngineRuntime {
        &self.runtime
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Stops the engine, reporting the transition.
    ///
    /// # Errors
    ///
    /// Propagates [`RuntimeError`] from [`EngineRuntime::shutdown`].
    pub fn shutdown(self) -> Result<ShutdownReport, RuntimeError> {
        let kind = self.runtime.kind();
        self.reporter.engine_stopping(kind);
        let report = self.runtime.shutdown()?;
        self.reporter.engine_stopped(kind, &report);
        Ok(report)
    }
}

/// Bootstraps an engine using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first step that fails; the reporter
/// sees the same error first.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    kernel: Arc<dyn GeometryKernel>,
) -> Result<Engine, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => return Err(fail(&*reporter, BootstrapError::Configuration { source })),
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => return Err(fail(&*reporter, BootstrapError::Telemetry { source })),
    };
    reporter.bootstrap_succeeded(&config);

    let runtime = match EngineRuntime::start(&config, kernel) {
        Ok(runtime) => runtime,
        Err(source) => return Err(fail(&*reporter, BootstrapError::Runtime { source })),
    };
    reporter.engine_ready(runtime.kind(), runtime.model(), runtime.local_addr());

    Ok(Engine {
        config,
        runtime,
        telemetry,
        reporter,
    })
}

fn fail(reporter: &dyn HealthReporter, error: BootstrapError) -> BootstrapError {
    reporter.bootstrap_failed(&error);
    error
}
