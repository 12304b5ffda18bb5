//! Supervises engine launch sequencing.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::kernel::{AnalyticKernel, GeometryKernel};
use crate::transport::ShutdownReport;

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::PROCESS_TARGET;

/// Collaborators required to launch an engine.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) kernel: Arc<dyn GeometryKernel>,
    pub(crate) shutdown: S,
}

/// Runs an engine with the production collaborators until a termination
/// signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] if bootstrap, signal handling or the drain fails.
pub fn run_engine() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        kernel: Arc::new(AnalyticKernel::new()),
        shutdown: SystemShutdownSignal::install()?,
    };
    run_engine_with(plan).map(|_| ())
}

/// Runs an engine with injected collaborators.
pub(crate) fn run_engine_with<L, S>(plan: LaunchPlan<L, S>) -> Result<ShutdownReport, LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        kernel,
        shutdown,
    } = plan;
    let engine = bootstrap_with(&loader, reporter, kernel)?;
    info!(
        target: PROCESS_TARGET,
        engine = %engine.config().engine,
        address = %engine.runtime().local_addr(),
        "engine running until shutdown signal"
    );
    let grace_ms = engine.config().shutdown_grace_ms;
    let waited = shutdown.wait();
    if let Ok(cause) = &waited {
        info!(target: PROCESS_TARGET, %cause, grace_ms, "draining engine");
    }
    // Drain regardless of how waiting ended.
    let report = engine.shutdown()?;
    waited?;
    info!(
        target: PROCESS_TARGET,
        forced = report.forced,
        "shutdown sequence completed"
    );
    Ok(report)
}
