//! BDD test world: loader, reporter, engine and client state for step
//! functions.

use std::cell::RefCell;
use std::sync::Arc;

use serde_json::Value;

use cadlink_config::EngineKind;

use crate::bootstrap::{BootstrapError, ConfigLoader, Engine, bootstrap_with};
use crate::kernel::AnalyticKernel;
use crate::transport::ShutdownReport;

use super::client::LineClient;
use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    engine: Option<Engine>,
    bootstrap_error: Option<BootstrapError>,
    shutdown_report: Option<ShutdownReport>,
    client: Option<LineClient>,
    responses: Vec<Value>,
}

impl TestWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new(EngineKind::Solid)),
            reporter: Arc::new(RecordingHealthReporter::default()),
            engine: None,
            bootstrap_error: None,
            shutdown_report: None,
            client: None,
            responses: Vec::new(),
        }
    }

    pub fn use_engine(&mut self, kind: EngineKind) {
        self.loader = Box::new(TestConfigLoader::new(kind));
    }

    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader::new());
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.engine.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let reporter = Arc::clone(&self.reporter);
        match bootstrap_with(&*self.loader, reporter, Arc::new(AnalyticKernel::new())) {
            Ok(engine) => self.engine = Some(engine),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    #[must_use]
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    /// Client connected to the running engine, opened on first use.
    pub fn client(&mut self) -> &mut LineClient {
        let address = self
            .engine
            .as_ref()
            .map(|engine| engine.runtime().local_addr())
            .expect("engine must be running");
        self.client
            .get_or_insert_with(|| LineClient::connect(address))
    }

    pub fn record(&mut self, response: Value) {
        self.responses.push(response);
    }

    #[must_use]
    pub fn responses(&self) -> &[Value] {
        &self.responses
    }

    /// Response whose id matches, if one arrived.
    #[must_use]
    pub fn response(&self, id: &str) -> Option<&Value> {
        self.responses
            .iter()
            .find(|response| response["id"].as_str() == Some(id))
    }

    pub fn shutdown(&mut self) {
        self.client = None;
        if let Some(engine) = self.engine.take() {
            let report = engine.shutdown().expect("engine shutdown");
            self.shutdown_report = Some(report);
        }
    }

    #[must_use]
    pub const fn shutdown_report(&self) -> Option<ShutdownReport> {
        self.shutdown_report
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.client = None;
        if let Some(engine) = self.engine.take() {
            let _ = engine.shutdown();
        }
    }
}

pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
